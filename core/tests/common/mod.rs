// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use std::sync::{
  atomic::{AtomicU32, Ordering},
  Arc,
};
use storefront::models::{NewOrder, ProductDraft};
use storefront::store::{CatalogStore, CategoryDeletion, IdentityStore, OrderStore, StoreTx};
use storefront::{
  CatalogService, Category, Identity, MemoryStore, Money, NewUser, Order, OrderEngine, Product, ProductFilter,
  ProductInput, Session, Store, StorefrontError, StorefrontResult, User, UserChanges,
};
use tracing::Level;
use uuid::Uuid;

pub const FALLBACK_CATEGORY: &str = "Uncategorized";

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// A store plus the services built on it, wired the way the server wires them.
pub struct Fixture {
  pub store: Arc<dyn Store>,
  pub catalog: CatalogService,
  pub engine: OrderEngine,
}

impl Fixture {
  pub async fn new() -> Self {
    Self::with_store(Arc::new(MemoryStore::new())).await
  }

  pub async fn with_store(store: Arc<dyn Store>) -> Self {
    setup_tracing();
    let catalog = CatalogService::bootstrap(store.clone(), FALLBACK_CATEGORY)
      .await
      .expect("fallback category");
    let engine = OrderEngine::new(store.clone());
    Self { store, catalog, engine }
  }

  pub async fn user(&self, username: &str) -> Identity {
    let user = self
      .store
      .insert_user(&NewUser {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password_hash: "not-a-real-hash".to_string(),
      })
      .await
      .expect("insert user");
    Identity::from(&user)
  }

  pub async fn category(&self, name: &str) -> Category {
    self
      .catalog
      .create_category(storefront::CategoryInput {
        name: Some(name.to_string()),
        description: None,
      })
      .await
      .expect("create category")
  }

  pub async fn product(&self, name: &str, price: &str, stock: i64) -> Product {
    self
      .catalog
      .create_product(product_input(name, price, stock))
      .await
      .expect("create product")
  }

  pub async fn stock_of(&self, product_id: i64) -> i64 {
    self
      .store
      .get_product(product_id)
      .await
      .expect("read product")
      .expect("product exists")
      .stock_quantity
  }
}

/// Fires one task per (identity, quantity) against the same product and waits for all.
pub async fn race(
  fx: &Arc<Fixture>,
  product_id: i64,
  buyers: Vec<(Identity, i64)>,
) -> Vec<Result<i64, StorefrontError>> {
  let barrier = Arc::new(tokio::sync::Barrier::new(buyers.len()));
  let handles: Vec<_> = buyers
    .into_iter()
    .map(|(identity, quantity)| {
      let fx = fx.clone();
      let barrier = barrier.clone();
      tokio::spawn(async move {
        barrier.wait().await;
        fx.engine
          .place_order(&identity, product_id, quantity)
          .await
          .map(|order| order.quantity)
      })
    })
    .collect();

  let mut results = Vec::with_capacity(handles.len());
  for handle in handles {
    results.push(handle.await.expect("order task panicked"));
  }
  results
}

pub fn product_input(name: &str, price: &str, stock: i64) -> ProductInput {
  ProductInput {
    name: Some(name.to_string()),
    description: Some(format!("{} description", name)),
    price: Some(price.parse::<Money>().expect("price literal")),
    category: None,
    stock_quantity: Some(stock),
    image_url: None,
  }
}

pub fn money(s: &str) -> Money {
  s.parse().expect("money literal")
}

// --- Store wrapper that aborts the first `failures` transactions with a conflict ---

pub struct ConflictingStore {
  inner: MemoryStore,
  failures_left: AtomicU32,
  pub begins: AtomicU32,
}

impl ConflictingStore {
  pub fn new(inner: MemoryStore, failures: u32) -> Self {
    Self {
      inner,
      failures_left: AtomicU32::new(failures),
      begins: AtomicU32::new(0),
    }
  }
}

struct ConflictingTx {
  inner: Box<dyn StoreTx>,
  fail_commit: bool,
}

#[async_trait]
impl StoreTx for ConflictingTx {
  async fn product_for_update(&mut self, product_id: i64) -> StorefrontResult<Option<Product>> {
    self.inner.product_for_update(product_id).await
  }

  async fn save_product_stock(&mut self, product: &Product) -> StorefrontResult<()> {
    self.inner.save_product_stock(product).await
  }

  async fn insert_order(&mut self, order: &NewOrder) -> StorefrontResult<Order> {
    self.inner.insert_order(order).await
  }

  async fn commit(self: Box<Self>) -> StorefrontResult<()> {
    if self.fail_commit {
      // Dropping the inner transaction rolls it back, like an aborted database commit.
      return Err(StorefrontError::ConcurrencyConflict);
    }
    self.inner.commit().await
  }
}

#[async_trait]
impl OrderStore for ConflictingStore {
  async fn begin(&self) -> StorefrontResult<Box<dyn StoreTx>> {
    self.begins.fetch_add(1, Ordering::SeqCst);
    let fail_commit = self
      .failures_left
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok();
    Ok(Box::new(ConflictingTx {
      inner: self.inner.begin().await?,
      fail_commit,
    }))
  }

  async fn list_orders_for_user(&self, user_id: i64) -> StorefrontResult<Vec<Order>> {
    self.inner.list_orders_for_user(user_id).await
  }

  async fn get_order(&self, id: i64) -> StorefrontResult<Option<Order>> {
    self.inner.get_order(id).await
  }
}

#[async_trait]
impl CatalogStore for ConflictingStore {
  async fn insert_category(&self, name: &str, description: &str) -> StorefrontResult<Category> {
    self.inner.insert_category(name, description).await
  }

  async fn update_category(&self, id: i64, name: &str, description: &str) -> StorefrontResult<Option<Category>> {
    self.inner.update_category(id, name, description).await
  }

  async fn get_category(&self, id: i64) -> StorefrontResult<Option<Category>> {
    self.inner.get_category(id).await
  }

  async fn get_category_by_name(&self, name: &str) -> StorefrontResult<Option<Category>> {
    self.inner.get_category_by_name(name).await
  }

  async fn list_categories(&self) -> StorefrontResult<Vec<Category>> {
    self.inner.list_categories().await
  }

  async fn delete_category(&self, id: i64) -> StorefrontResult<CategoryDeletion> {
    self.inner.delete_category(id).await
  }

  async fn insert_product(&self, draft: &ProductDraft) -> StorefrontResult<Product> {
    self.inner.insert_product(draft).await
  }

  async fn update_product(&self, id: i64, draft: &ProductDraft) -> StorefrontResult<Option<Product>> {
    self.inner.update_product(id, draft).await
  }

  async fn get_product(&self, id: i64) -> StorefrontResult<Option<Product>> {
    self.inner.get_product(id).await
  }

  async fn list_products(&self, filter: &ProductFilter) -> StorefrontResult<Vec<Product>> {
    self.inner.list_products(filter).await
  }

  async fn archive_product(&self, id: i64) -> StorefrontResult<Option<Product>> {
    self.inner.archive_product(id).await
  }
}

#[async_trait]
impl IdentityStore for ConflictingStore {
  async fn insert_user(&self, user: &NewUser) -> StorefrontResult<User> {
    self.inner.insert_user(user).await
  }

  async fn update_user(&self, id: i64, changes: &UserChanges) -> StorefrontResult<Option<User>> {
    self.inner.update_user(id, changes).await
  }

  async fn get_user(&self, id: i64) -> StorefrontResult<Option<User>> {
    self.inner.get_user(id).await
  }

  async fn get_user_by_username(&self, username: &str) -> StorefrontResult<Option<User>> {
    self.inner.get_user_by_username(username).await
  }

  async fn list_users(&self) -> StorefrontResult<Vec<User>> {
    self.inner.list_users().await
  }

  async fn insert_session(&self, session: &Session) -> StorefrontResult<()> {
    self.inner.insert_session(session).await
  }

  async fn get_session(&self, token: Uuid) -> StorefrontResult<Option<Session>> {
    self.inner.get_session(token).await
  }

  async fn delete_session(&self, token: Uuid) -> StorefrontResult<bool> {
    self.inner.delete_session(token).await
  }
}
