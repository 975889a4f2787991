// core/src/store/memory.rs

//! In-process store.
//!
//! Tables live behind one `parking_lot::RwLock` that is only ever held for the duration of a
//! synchronous section. Row-level exclusion for products comes from a per-product
//! `tokio::sync::Mutex`: order transactions and catalog edits both take it, so a product
//! read "for update" cannot change underneath the transaction that read it.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{CatalogStore, CategoryDeletion, IdentityStore, OrderStore, StoreTx};
use crate::error::{StorefrontError, StorefrontResult};
use crate::models::{
  Category, NewOrder, NewUser, Order, Product, ProductDraft, ProductFilter, Session, User, UserChanges,
};

#[derive(Default)]
struct Tables {
  categories: BTreeMap<i64, Category>,
  products: BTreeMap<i64, Product>,
  orders: BTreeMap<i64, Order>,
  users: BTreeMap<i64, User>,
  sessions: HashMap<Uuid, Session>,
  last_category_id: i64,
  last_product_id: i64,
  last_user_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
  *counter += 1;
  *counter
}

impl Tables {
  fn category_name_taken(&self, name: &str, except: Option<i64>) -> bool {
    self.categories.values().any(|c| c.name == name && Some(c.id) != except)
  }

  fn product_name_taken(&self, name: &str, except: Option<i64>) -> bool {
    self.products.values().any(|p| p.name == name && Some(p.id) != except)
  }

  fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
    self.users.values().any(|u| u.username == username && Some(u.id) != except)
  }

  fn check_product_draft(&self, draft: &ProductDraft, except: Option<i64>) -> StorefrontResult<()> {
    if self.product_name_taken(&draft.name, except) {
      return Err(StorefrontError::Conflict(format!(
        "a product named '{}' already exists",
        draft.name
      )));
    }
    if !self.categories.contains_key(&draft.category_id) {
      return Err(StorefrontError::Conflict(format!(
        "category {} does not exist",
        draft.category_id
      )));
    }
    Ok(())
  }
}

#[derive(Default)]
struct Inner {
  tables: RwLock<Tables>,
  row_locks: Mutex<HashMap<i64, Arc<RowLock<()>>>>,
  // Sequence semantics: ids consumed by rolled-back transactions are not reused.
  last_order_id: AtomicI64,
}

impl Inner {
  async fn lock_product(&self, product_id: i64) -> OwnedMutexGuard<()> {
    let row_lock = { self.row_locks.lock().entry(product_id).or_default().clone() };
    row_lock.lock_owned().await
  }

  /// Releases a row lock taken on a product that turned out not to exist.
  fn release_missing(&self, product_id: i64, guard: OwnedMutexGuard<()>) {
    drop(guard);
    self.forget_row_lock(product_id);
  }

  /// Forgets the row lock of `product_id` unless someone still holds or waits on it.
  fn forget_row_lock(&self, product_id: i64) {
    let mut row_locks = self.row_locks.lock();
    if row_locks
      .get(&product_id)
      .is_some_and(|row_lock| Arc::strong_count(row_lock) == 1)
    {
      row_locks.remove(&product_id);
    }
  }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
  inner: Arc<Inner>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl CatalogStore for MemoryStore {
  async fn insert_category(&self, name: &str, description: &str) -> StorefrontResult<Category> {
    let mut tables = self.inner.tables.write();
    if tables.category_name_taken(name, None) {
      return Err(StorefrontError::Conflict(format!("a category named '{}' already exists", name)));
    }
    let category = Category {
      id: next_id(&mut tables.last_category_id),
      name: name.to_string(),
      description: description.to_string(),
    };
    tables.categories.insert(category.id, category.clone());
    Ok(category)
  }

  async fn update_category(&self, id: i64, name: &str, description: &str) -> StorefrontResult<Option<Category>> {
    let mut tables = self.inner.tables.write();
    if !tables.categories.contains_key(&id) {
      return Ok(None);
    }
    if tables.category_name_taken(name, Some(id)) {
      return Err(StorefrontError::Conflict(format!("a category named '{}' already exists", name)));
    }
    let category = tables.categories.get_mut(&id).map(|c| {
      c.name = name.to_string();
      c.description = description.to_string();
      c.clone()
    });
    Ok(category)
  }

  async fn get_category(&self, id: i64) -> StorefrontResult<Option<Category>> {
    Ok(self.inner.tables.read().categories.get(&id).cloned())
  }

  async fn get_category_by_name(&self, name: &str) -> StorefrontResult<Option<Category>> {
    Ok(self.inner.tables.read().categories.values().find(|c| c.name == name).cloned())
  }

  async fn list_categories(&self) -> StorefrontResult<Vec<Category>> {
    let mut categories: Vec<Category> = self.inner.tables.read().categories.values().cloned().collect();
    categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    Ok(categories)
  }

  #[instrument(name = "MemoryStore::delete_category", skip(self))]
  async fn delete_category(&self, id: i64) -> StorefrontResult<CategoryDeletion> {
    // BTreeMap iteration yields ascending ids, so every caller locks rows in the same order.
    let product_ids: Vec<i64> = {
      let tables = self.inner.tables.read();
      tables
        .products
        .values()
        .filter(|p| p.category_id == id)
        .map(|p| p.id)
        .collect()
    };
    let mut held = Vec::with_capacity(product_ids.len());
    for product_id in &product_ids {
      held.push(self.inner.lock_product(*product_id).await);
    }

    let doomed: HashSet<i64> = {
      let mut tables = self.inner.tables.write();
      if !tables.categories.contains_key(&id) {
        return Ok(CategoryDeletion::NotFound);
      }
      let doomed: HashSet<i64> = tables
        .products
        .values()
        .filter(|p| p.category_id == id)
        .map(|p| p.id)
        .collect();
      if tables.orders.values().any(|o| doomed.contains(&o.product_id)) {
        return Ok(CategoryDeletion::ProductsHaveOrders);
      }
      tables.products.retain(|pid, _| !doomed.contains(pid));
      tables.categories.remove(&id);
      doomed
    };
    drop(held);
    for product_id in &doomed {
      self.inner.forget_row_lock(*product_id);
    }
    debug!(products_removed = doomed.len(), "Category deleted with its products.");
    Ok(CategoryDeletion::Deleted {
      products_removed: doomed.len() as u64,
    })
  }

  async fn insert_product(&self, draft: &ProductDraft) -> StorefrontResult<Product> {
    let mut tables = self.inner.tables.write();
    tables.check_product_draft(draft, None)?;
    let product = Product {
      id: next_id(&mut tables.last_product_id),
      name: draft.name.clone(),
      description: draft.description.clone(),
      price: draft.price,
      category_id: draft.category_id,
      stock_quantity: draft.stock_quantity,
      image_url: draft.image_url.clone(),
      created_at: Utc::now(),
      archived_at: None,
    };
    tables.products.insert(product.id, product.clone());
    Ok(product)
  }

  async fn update_product(&self, id: i64, draft: &ProductDraft) -> StorefrontResult<Option<Product>> {
    let row = self.inner.lock_product(id).await;
    if !self.inner.tables.read().products.contains_key(&id) {
      self.inner.release_missing(id, row);
      return Ok(None);
    }
    let mut tables = self.inner.tables.write();
    if !tables.products.contains_key(&id) {
      return Ok(None);
    }
    tables.check_product_draft(draft, Some(id))?;
    let product = tables.products.get_mut(&id).map(|p| {
      p.name = draft.name.clone();
      p.description = draft.description.clone();
      p.price = draft.price;
      p.category_id = draft.category_id;
      p.stock_quantity = draft.stock_quantity;
      p.image_url = draft.image_url.clone();
      p.clone()
    });
    Ok(product)
  }

  async fn get_product(&self, id: i64) -> StorefrontResult<Option<Product>> {
    Ok(self.inner.tables.read().products.get(&id).cloned())
  }

  async fn list_products(&self, filter: &ProductFilter) -> StorefrontResult<Vec<Product>> {
    let tables = self.inner.tables.read();
    let mut products: Vec<Product> = tables
      .products
      .values()
      .filter(|p| {
        let category_name = tables.categories.get(&p.category_id).map(|c| c.name.as_str()).unwrap_or("");
        filter.matches(p, category_name)
      })
      .cloned()
      .collect();
    products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    Ok(products)
  }

  async fn archive_product(&self, id: i64) -> StorefrontResult<Option<Product>> {
    let row = self.inner.lock_product(id).await;
    if !self.inner.tables.read().products.contains_key(&id) {
      self.inner.release_missing(id, row);
      return Ok(None);
    }
    let mut tables = self.inner.tables.write();
    Ok(tables.products.get_mut(&id).map(|p| {
      if p.archived_at.is_none() {
        p.archived_at = Some(Utc::now());
      }
      p.clone()
    }))
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn begin(&self) -> StorefrontResult<Box<dyn StoreTx>> {
    Ok(Box::new(MemoryTx {
      inner: self.inner.clone(),
      held: HashMap::new(),
      products: HashMap::new(),
      dirty: HashSet::new(),
      orders: Vec::new(),
    }))
  }

  async fn list_orders_for_user(&self, user_id: i64) -> StorefrontResult<Vec<Order>> {
    let mut orders: Vec<Order> = self
      .inner
      .tables
      .read()
      .orders
      .values()
      .filter(|o| o.user_id == user_id)
      .cloned()
      .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(orders)
  }

  async fn get_order(&self, id: i64) -> StorefrontResult<Option<Order>> {
    Ok(self.inner.tables.read().orders.get(&id).cloned())
  }
}

/// Staged writes plus the row locks they depend on. Nothing reaches the tables until
/// `commit`; dropping the value releases the locks and discards the staged writes.
struct MemoryTx {
  inner: Arc<Inner>,
  held: HashMap<i64, OwnedMutexGuard<()>>,
  products: HashMap<i64, Product>,
  dirty: HashSet<i64>,
  orders: Vec<Order>,
}

#[async_trait]
impl StoreTx for MemoryTx {
  async fn product_for_update(&mut self, product_id: i64) -> StorefrontResult<Option<Product>> {
    if let Some(product) = self.products.get(&product_id) {
      return Ok(Some(product.clone()));
    }
    let guard = self.inner.lock_product(product_id).await;
    let current = { self.inner.tables.read().products.get(&product_id).cloned() };
    match current {
      Some(product) => {
        self.held.insert(product_id, guard);
        self.products.insert(product_id, product.clone());
        Ok(Some(product))
      }
      None => {
        self.inner.release_missing(product_id, guard);
        Ok(None)
      }
    }
  }

  async fn save_product_stock(&mut self, product: &Product) -> StorefrontResult<()> {
    if product.stock_quantity < 0 {
      return Err(StorefrontError::validation("stock_quantity", "Stock quantity cannot be negative."));
    }
    let staged = self.products.get_mut(&product.id).ok_or_else(|| {
      StorefrontError::Internal(format!("product {} was not locked by this transaction", product.id))
    })?;
    staged.stock_quantity = product.stock_quantity;
    self.dirty.insert(product.id);
    Ok(())
  }

  async fn insert_order(&mut self, order: &NewOrder) -> StorefrontResult<Order> {
    {
      let tables = self.inner.tables.read();
      if !tables.users.contains_key(&order.user_id) {
        return Err(StorefrontError::Conflict(format!("user {} does not exist", order.user_id)));
      }
      if !self.products.contains_key(&order.product_id) && !tables.products.contains_key(&order.product_id) {
        return Err(StorefrontError::Conflict(format!(
          "product {} does not exist",
          order.product_id
        )));
      }
    }
    let order = Order {
      id: self.inner.last_order_id.fetch_add(1, Ordering::SeqCst) + 1,
      user_id: order.user_id,
      product_id: order.product_id,
      quantity: order.quantity,
      created_at: order.created_at,
      total_price: order.total_price,
    };
    self.orders.push(order.clone());
    Ok(order)
  }

  async fn commit(self: Box<Self>) -> StorefrontResult<()> {
    let MemoryTx {
      inner,
      held,
      products,
      dirty,
      orders,
    } = *self;
    {
      let mut tables = inner.tables.write();
      // Validate everything before applying anything.
      if let Some(missing) = dirty.iter().find(|id| !tables.products.contains_key(id)) {
        return Err(StorefrontError::not_found("Product", *missing));
      }
      for id in &dirty {
        if let (Some(row), Some(staged)) = (tables.products.get_mut(id), products.get(id)) {
          row.stock_quantity = staged.stock_quantity;
        }
      }
      for order in orders {
        tables.orders.insert(order.id, order);
      }
    }
    drop(held);
    Ok(())
  }
}

#[async_trait]
impl IdentityStore for MemoryStore {
  async fn insert_user(&self, user: &NewUser) -> StorefrontResult<User> {
    let mut tables = self.inner.tables.write();
    if tables.username_taken(&user.username, None) {
      return Err(StorefrontError::Conflict(format!(
        "username '{}' is already taken",
        user.username
      )));
    }
    let user = User {
      id: next_id(&mut tables.last_user_id),
      username: user.username.clone(),
      email: user.email.clone(),
      password_hash: user.password_hash.clone(),
      created_at: Utc::now(),
    };
    tables.users.insert(user.id, user.clone());
    Ok(user)
  }

  async fn update_user(&self, id: i64, changes: &UserChanges) -> StorefrontResult<Option<User>> {
    let mut tables = self.inner.tables.write();
    if !tables.users.contains_key(&id) {
      return Ok(None);
    }
    if tables.username_taken(&changes.username, Some(id)) {
      return Err(StorefrontError::Conflict(format!(
        "username '{}' is already taken",
        changes.username
      )));
    }
    Ok(tables.users.get_mut(&id).map(|u| {
      u.username = changes.username.clone();
      u.email = changes.email.clone();
      u.clone()
    }))
  }

  async fn get_user(&self, id: i64) -> StorefrontResult<Option<User>> {
    Ok(self.inner.tables.read().users.get(&id).cloned())
  }

  async fn get_user_by_username(&self, username: &str) -> StorefrontResult<Option<User>> {
    Ok(self.inner.tables.read().users.values().find(|u| u.username == username).cloned())
  }

  async fn list_users(&self) -> StorefrontResult<Vec<User>> {
    Ok(self.inner.tables.read().users.values().cloned().collect())
  }

  async fn insert_session(&self, session: &Session) -> StorefrontResult<()> {
    let mut tables = self.inner.tables.write();
    if !tables.users.contains_key(&session.user_id) {
      return Err(StorefrontError::Conflict(format!("user {} does not exist", session.user_id)));
    }
    tables.sessions.insert(session.token, session.clone());
    Ok(())
  }

  async fn get_session(&self, token: Uuid) -> StorefrontResult<Option<Session>> {
    Ok(self.inner.tables.read().sessions.get(&token).cloned())
  }

  async fn delete_session(&self, token: Uuid) -> StorefrontResult<bool> {
    Ok(self.inner.tables.write().sessions.remove(&token).is_some())
  }
}
