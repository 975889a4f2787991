// core/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::money::Money;

/// An immutable purchase of `quantity` units of one product.
///
/// `total_price` is fixed when the order is placed; later price edits on the product
/// never touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Order {
  pub id: i64,
  #[serde(rename = "user")]
  pub user_id: i64,
  #[serde(rename = "product")]
  pub product_id: i64,
  pub quantity: i64,
  pub created_at: DateTime<Utc>,
  pub total_price: Money,
}

/// Row the order engine inserts inside its transaction. Every field is server-computed.
#[derive(Debug, Clone)]
pub struct NewOrder {
  pub user_id: i64,
  pub product_id: i64,
  pub quantity: i64,
  pub created_at: DateTime<Utc>,
  pub total_price: Money,
}
