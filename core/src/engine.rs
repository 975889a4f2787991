// core/src/engine.rs

//! The order engine: the only code path that creates orders or decrements stock.
//!
//! `place_order` runs "lock product, compare stock, decrement, insert order" as one store
//! transaction. The product row stays locked from the read until commit, so concurrent
//! orders for the same product are serialized and the sum of committed decrements can never
//! exceed the stock that existed when the first of them started.
//!
//! If the store aborts the transaction because of a concurrent writer
//! ([`StorefrontError::ConcurrencyConflict`]), the whole unit is retried from the start, up to
//! `max_attempts` times in total.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{StorefrontError, StorefrontResult};
use crate::models::{Identity, NewOrder, Order};
use crate::store::Store;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(10);

pub struct OrderEngine {
  store: Arc<dyn Store>,
  max_attempts: u32,
  retry_backoff: Duration,
}

impl OrderEngine {
  pub fn new(store: Arc<dyn Store>) -> Self {
    Self {
      store,
      max_attempts: DEFAULT_MAX_ATTEMPTS,
      retry_backoff: DEFAULT_RETRY_BACKOFF,
    }
  }

  /// Total attempts per order, first try included. Clamped to at least one.
  pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
    self.max_attempts = max_attempts.max(1);
    self
  }

  pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
    self.retry_backoff = backoff;
    self
  }

  pub fn max_attempts(&self) -> u32 {
    self.max_attempts
  }

  /// Places an order for `quantity` units of `product_id` on behalf of `identity`.
  ///
  /// On success exactly one product row (its stock) and one order row are written. On any
  /// error nothing is written.
  #[instrument(
    name = "OrderEngine::place_order",
    skip(self, identity),
    fields(user_id = identity.user_id)
  )]
  pub async fn place_order(&self, identity: &Identity, product_id: i64, quantity: i64) -> StorefrontResult<Order> {
    validate_quantity(quantity)?;

    let mut attempt = 1;
    loop {
      match self.try_place_order(identity, product_id, quantity).await {
        Err(err) if err.is_retryable() && attempt < self.max_attempts => {
          warn!(attempt, max_attempts = self.max_attempts, "Order transaction conflicted; retrying.");
          tokio::time::sleep(self.retry_backoff * attempt).await;
          attempt += 1;
        }
        Ok(order) => {
          info!(order_id = order.id, total_price = %order.total_price, attempt, "Order placed.");
          return Ok(order);
        }
        Err(err) => return Err(err),
      }
    }
  }

  async fn try_place_order(&self, identity: &Identity, product_id: i64, quantity: i64) -> StorefrontResult<Order> {
    // Every early return below drops `tx` uncommitted, which rolls it back.
    let mut tx = self.store.begin().await?;

    let mut product = tx
      .product_for_update(product_id)
      .await?
      .filter(|p| !p.is_archived())
      .ok_or_else(|| StorefrontError::not_found("Product", product_id))?;

    if product.stock_quantity < quantity {
      debug!(available = product.stock_quantity, requested = quantity, "Insufficient stock.");
      return Err(StorefrontError::InsufficientStock {
        product_id,
        requested: quantity,
        available: product.stock_quantity,
      });
    }

    // Priced from the row read under the lock, so the total matches the stock decision.
    let total_price = product
      .price
      .checked_mul(quantity)
      .ok_or_else(|| StorefrontError::validation("quantity", "order total is out of range"))?;

    product.stock_quantity -= quantity;
    tx.save_product_stock(&product).await?;

    let order = tx
      .insert_order(&NewOrder {
        user_id: identity.user_id,
        product_id,
        quantity,
        created_at: Utc::now(),
        total_price,
      })
      .await?;

    tx.commit().await?;
    Ok(order)
  }

  /// The caller's orders, newest first.
  #[instrument(name = "OrderEngine::list_orders", skip(self, identity), fields(user_id = identity.user_id))]
  pub async fn list_orders(&self, identity: &Identity) -> StorefrontResult<Vec<Order>> {
    self.store.list_orders_for_user(identity.user_id).await
  }

  /// One of the caller's orders. Orders of other users are reported as missing.
  #[instrument(name = "OrderEngine::get_order", skip(self, identity), fields(user_id = identity.user_id))]
  pub async fn get_order(&self, identity: &Identity, order_id: i64) -> StorefrontResult<Order> {
    self
      .store
      .get_order(order_id)
      .await?
      .filter(|o| o.user_id == identity.user_id)
      .ok_or_else(|| StorefrontError::not_found("Order", order_id))
  }
}

pub fn validate_quantity(quantity: i64) -> StorefrontResult<()> {
  if quantity < 1 {
    return Err(StorefrontError::validation("quantity", "must be positive"));
  }
  Ok(())
}
