// core/src/models/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::money::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Product {
  pub id: i64,
  pub name: String,
  pub description: String,
  pub price: Money,
  #[serde(rename = "category")]
  pub category_id: i64,
  pub stock_quantity: i64,
  pub image_url: String,
  pub created_at: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub archived_at: Option<DateTime<Utc>>,
}

impl Product {
  pub fn is_archived(&self) -> bool {
    self.archived_at.is_some()
  }
}

/// Client payload for product writes. Every field is optional so that missing fields
/// can be reported per field instead of as a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
  pub name: Option<String>,
  pub description: Option<String>,
  pub price: Option<Money>,
  #[serde(alias = "category_id")]
  pub category: Option<i64>,
  pub stock_quantity: Option<i64>,
  pub image_url: Option<String>,
}

impl ProductInput {
  /// Fills the fields this input leaves out with the current values of `product`.
  pub fn merged_onto(self, product: &Product) -> ProductInput {
    ProductInput {
      name: self.name.or_else(|| Some(product.name.clone())),
      description: self.description.or_else(|| Some(product.description.clone())),
      price: self.price.or(Some(product.price)),
      category: self.category.or(Some(product.category_id)),
      stock_quantity: self.stock_quantity.or(Some(product.stock_quantity)),
      image_url: self.image_url.or_else(|| Some(product.image_url.clone())),
    }
  }
}

/// A product write that already passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
  pub name: String,
  pub description: String,
  pub price: Money,
  pub category_id: i64,
  pub stock_quantity: i64,
  pub image_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
  /// Case-insensitive substring of the name, description or category name.
  pub search: Option<String>,
  pub category_id: Option<i64>,
  pub min_price: Option<Money>,
  pub max_price: Option<Money>,
  /// `Some(true)`: stock > 0, `Some(false)`: stock == 0.
  pub in_stock: Option<bool>,
}

impl ProductFilter {
  /// In-memory evaluation; `category_name` is the name of the product's category.
  pub fn matches(&self, product: &Product, category_name: &str) -> bool {
    if product.is_archived() {
      return false;
    }
    if let Some(category_id) = self.category_id {
      if product.category_id != category_id {
        return false;
      }
    }
    if let Some(min) = self.min_price {
      if product.price < min {
        return false;
      }
    }
    if let Some(max) = self.max_price {
      if product.price > max {
        return false;
      }
    }
    match self.in_stock {
      Some(true) if product.stock_quantity <= 0 => return false,
      Some(false) if product.stock_quantity != 0 => return false,
      _ => {}
    }
    match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
      Some(needle) => {
        let needle = needle.to_lowercase();
        product.name.to_lowercase().contains(&needle)
          || product.description.to_lowercase().contains(&needle)
          || category_name.to_lowercase().contains(&needle)
      }
      None => true,
    }
  }
}
