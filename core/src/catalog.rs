// core/src/catalog.rs

//! Catalog CRUD: field validation on top of the store, plus the deletion policy.
//!
//! Products are never hard-deleted on their own: deleting one archives it so its orders
//! keep a valid reference. Deleting a category removes its products with it, but only when
//! none of them has been ordered; the fallback category cannot be deleted.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::{StorefrontError, StorefrontResult};
use crate::models::{Category, CategoryInput, Product, ProductDraft, ProductFilter, ProductInput};
use crate::store::{CategoryDeletion, Store};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_IMAGE_URL_LEN: usize = 200;
const REQUIRED: &str = "This field is required.";

pub struct CatalogService {
  store: Arc<dyn Store>,
  fallback_category_id: i64,
}

impl CatalogService {
  /// Builds the service, creating the fallback category if it does not exist yet.
  #[instrument(name = "CatalogService::bootstrap", skip(store))]
  pub async fn bootstrap(store: Arc<dyn Store>, fallback_category_name: &str) -> StorefrontResult<Self> {
    let fallback = match store.get_category_by_name(fallback_category_name).await? {
      Some(category) => category,
      None => {
        info!("Creating fallback category.");
        store
          .insert_category(fallback_category_name, "Products without a more specific category.")
          .await?
      }
    };
    Ok(Self {
      store,
      fallback_category_id: fallback.id,
    })
  }

  pub fn fallback_category_id(&self) -> i64 {
    self.fallback_category_id
  }

  // --- Categories ---

  pub async fn list_categories(&self) -> StorefrontResult<Vec<Category>> {
    self.store.list_categories().await
  }

  pub async fn get_category(&self, id: i64) -> StorefrontResult<Category> {
    self
      .store
      .get_category(id)
      .await?
      .ok_or_else(|| StorefrontError::not_found("Category", id))
  }

  #[instrument(name = "CatalogService::create_category", skip(self, input))]
  pub async fn create_category(&self, input: CategoryInput) -> StorefrontResult<Category> {
    let (name, description) = validate_category(input)?;
    let category = self.store.insert_category(&name, &description).await?;
    info!(category_id = category.id, "Category created.");
    Ok(category)
  }

  #[instrument(name = "CatalogService::update_category", skip(self, input))]
  pub async fn update_category(&self, id: i64, input: CategoryInput) -> StorefrontResult<Category> {
    let (name, description) = validate_category(input)?;
    self
      .store
      .update_category(id, &name, &description)
      .await?
      .ok_or_else(|| StorefrontError::not_found("Category", id))
  }

  #[instrument(name = "CatalogService::delete_category", skip(self))]
  pub async fn delete_category(&self, id: i64) -> StorefrontResult<u64> {
    if id == self.fallback_category_id {
      warn!("Refusing to delete the fallback category.");
      return Err(StorefrontError::Conflict(
        "the fallback category cannot be deleted".to_string(),
      ));
    }
    match self.store.delete_category(id).await? {
      CategoryDeletion::Deleted { products_removed } => {
        info!(products_removed, "Category deleted.");
        Ok(products_removed)
      }
      CategoryDeletion::NotFound => Err(StorefrontError::not_found("Category", id)),
      CategoryDeletion::ProductsHaveOrders => {
        warn!("Category deletion refused: some of its products have orders.");
        Err(StorefrontError::Conflict(
          "category has products with orders; archive those products instead".to_string(),
        ))
      }
    }
  }

  pub async fn category_products(&self, id: i64) -> StorefrontResult<Vec<Product>> {
    self.get_category(id).await?;
    self
      .store
      .list_products(&ProductFilter {
        category_id: Some(id),
        ..ProductFilter::default()
      })
      .await
  }

  // --- Products ---

  pub async fn list_products(&self, filter: &ProductFilter) -> StorefrontResult<Vec<Product>> {
    self.store.list_products(filter).await
  }

  /// Archived products are reported as missing.
  pub async fn get_product(&self, id: i64) -> StorefrontResult<Product> {
    self
      .store
      .get_product(id)
      .await?
      .filter(|p| !p.is_archived())
      .ok_or_else(|| StorefrontError::not_found("Product", id))
  }

  #[instrument(name = "CatalogService::create_product", skip(self, input))]
  pub async fn create_product(&self, input: ProductInput) -> StorefrontResult<Product> {
    let draft = self.validate_product(input).await?;
    let product = self.store.insert_product(&draft).await?;
    info!(product_id = product.id, "Product created.");
    Ok(product)
  }

  /// Full replacement: omitted fields are validated as missing.
  #[instrument(name = "CatalogService::replace_product", skip(self, input))]
  pub async fn replace_product(&self, id: i64, input: ProductInput) -> StorefrontResult<Product> {
    self.get_product(id).await?;
    let draft = self.validate_product(input).await?;
    self.write_product(id, &draft).await
  }

  /// Partial update: omitted fields keep their current values.
  #[instrument(name = "CatalogService::patch_product", skip(self, input))]
  pub async fn patch_product(&self, id: i64, input: ProductInput) -> StorefrontResult<Product> {
    let current = self.get_product(id).await?;
    let draft = self.validate_product(input.merged_onto(&current)).await?;
    self.write_product(id, &draft).await
  }

  #[instrument(name = "CatalogService::archive_product", skip(self))]
  pub async fn archive_product(&self, id: i64) -> StorefrontResult<Product> {
    let product = self
      .store
      .archive_product(id)
      .await?
      .ok_or_else(|| StorefrontError::not_found("Product", id))?;
    info!("Product archived.");
    Ok(product)
  }

  async fn write_product(&self, id: i64, draft: &ProductDraft) -> StorefrontResult<Product> {
    self
      .store
      .update_product(id, draft)
      .await?
      .ok_or_else(|| StorefrontError::not_found("Product", id))
  }

  async fn validate_product(&self, input: ProductInput) -> StorefrontResult<ProductDraft> {
    let name = input
      .name
      .map(|n| n.trim().to_string())
      .filter(|n| !n.is_empty())
      .ok_or_else(|| StorefrontError::validation("name", REQUIRED))?;
    if name.chars().count() > MAX_NAME_LEN {
      return Err(StorefrontError::validation(
        "name",
        format!("Ensure this field has no more than {} characters.", MAX_NAME_LEN),
      ));
    }

    let price = input
      .price
      .filter(|p| p.is_positive())
      .ok_or_else(|| StorefrontError::validation("price", "Price must be greater than 0."))?;

    let stock_quantity = input
      .stock_quantity
      .filter(|s| *s >= 0)
      .ok_or_else(|| StorefrontError::validation("stock_quantity", "Stock quantity cannot be negative."))?;

    let category_id = input.category.unwrap_or(self.fallback_category_id);
    if self.store.get_category(category_id).await?.is_none() {
      return Err(StorefrontError::validation("category", "Invalid category."));
    }

    let image_url = input.image_url.map(|u| u.trim().to_string()).unwrap_or_default();
    if !image_url.is_empty() {
      if !(image_url.starts_with("http://") || image_url.starts_with("https://")) {
        return Err(StorefrontError::validation("image_url", "Enter a valid URL."));
      }
      if image_url.chars().count() > MAX_IMAGE_URL_LEN {
        return Err(StorefrontError::validation(
          "image_url",
          format!("Ensure this field has no more than {} characters.", MAX_IMAGE_URL_LEN),
        ));
      }
    }

    Ok(ProductDraft {
      name,
      description: input.description.unwrap_or_default(),
      price,
      category_id,
      stock_quantity,
      image_url,
    })
  }
}

fn validate_category(input: CategoryInput) -> StorefrontResult<(String, String)> {
  let name = input
    .name
    .map(|n| n.trim().to_string())
    .filter(|n| !n.is_empty())
    .ok_or_else(|| StorefrontError::validation("name", REQUIRED))?;
  if name.chars().count() > MAX_NAME_LEN {
    return Err(StorefrontError::validation(
      "name",
      format!("Ensure this field has no more than {} characters.", MAX_NAME_LEN),
    ));
  }
  Ok((name, input.description.unwrap_or_default()))
}
