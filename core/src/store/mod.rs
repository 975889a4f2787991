// core/src/store/mod.rs

//! Persistence seams.
//!
//! Services talk to an `Arc<dyn Store>`; two implementations ship with the crate:
//! [`MemoryStore`] for tests and database-less runs, and [`PgStore`] for PostgreSQL.
//!
//! The only multi-statement unit of work is order placement, expressed through
//! [`StoreTx`]. A transaction obtained from [`OrderStore::begin`] holds an exclusive lock on
//! every product it reads with [`StoreTx::product_for_update`] until it is committed or
//! dropped. Dropping an uncommitted transaction rolls it back.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StorefrontResult;
use crate::models::{
  Category, NewOrder, NewUser, Order, Product, ProductDraft, ProductFilter, Session, User, UserChanges,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Outcome of a cascading category delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryDeletion {
  Deleted { products_removed: u64 },
  NotFound,
  /// At least one product of the category has orders; nothing was deleted.
  ProductsHaveOrders,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
  async fn insert_category(&self, name: &str, description: &str) -> StorefrontResult<Category>;
  async fn update_category(&self, id: i64, name: &str, description: &str) -> StorefrontResult<Option<Category>>;
  async fn get_category(&self, id: i64) -> StorefrontResult<Option<Category>>;
  async fn get_category_by_name(&self, name: &str) -> StorefrontResult<Option<Category>>;
  async fn list_categories(&self) -> StorefrontResult<Vec<Category>>;
  /// Deletes the category together with its products, unless one of them has orders.
  async fn delete_category(&self, id: i64) -> StorefrontResult<CategoryDeletion>;

  async fn insert_product(&self, draft: &ProductDraft) -> StorefrontResult<Product>;
  async fn update_product(&self, id: i64, draft: &ProductDraft) -> StorefrontResult<Option<Product>>;
  /// Returns archived products too.
  async fn get_product(&self, id: i64) -> StorefrontResult<Option<Product>>;
  /// Non-archived products matching `filter`, ordered by name.
  async fn list_products(&self, filter: &ProductFilter) -> StorefrontResult<Vec<Product>>;
  /// Sets `archived_at` if unset and returns the product.
  async fn archive_product(&self, id: i64) -> StorefrontResult<Option<Product>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn begin(&self) -> StorefrontResult<Box<dyn StoreTx>>;
  /// Newest first.
  async fn list_orders_for_user(&self, user_id: i64) -> StorefrontResult<Vec<Order>>;
  async fn get_order(&self, id: i64) -> StorefrontResult<Option<Order>>;
}

/// One atomic unit of order placement.
#[async_trait]
pub trait StoreTx: Send {
  /// Exclusive read: the row stays locked until commit or rollback.
  async fn product_for_update(&mut self, product_id: i64) -> StorefrontResult<Option<Product>>;
  /// Persists `product.stock_quantity`. The product must have been read with
  /// [`StoreTx::product_for_update`] in this transaction.
  async fn save_product_stock(&mut self, product: &Product) -> StorefrontResult<()>;
  async fn insert_order(&mut self, order: &NewOrder) -> StorefrontResult<Order>;
  async fn commit(self: Box<Self>) -> StorefrontResult<()>;
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
  async fn insert_user(&self, user: &NewUser) -> StorefrontResult<User>;
  async fn update_user(&self, id: i64, changes: &UserChanges) -> StorefrontResult<Option<User>>;
  async fn get_user(&self, id: i64) -> StorefrontResult<Option<User>>;
  async fn get_user_by_username(&self, username: &str) -> StorefrontResult<Option<User>>;
  async fn list_users(&self) -> StorefrontResult<Vec<User>>;

  async fn insert_session(&self, session: &Session) -> StorefrontResult<()>;
  async fn get_session(&self, token: Uuid) -> StorefrontResult<Option<Session>>;
  /// Returns whether a session was removed.
  async fn delete_session(&self, token: Uuid) -> StorefrontResult<bool>;
}

/// Everything the services need from persistence.
pub trait Store: CatalogStore + OrderStore + IdentityStore {}

impl<T> Store for T where T: CatalogStore + OrderStore + IdentityStore {}
