// core/src/store/postgres.rs

//! PostgreSQL store (runtime-checked `sqlx` queries).
//!
//! Order placement relies on `SELECT ... FOR UPDATE` to serialize transactions touching the
//! same product. Serialization failures and deadlocks surface as
//! [`StorefrontError::ConcurrencyConflict`] through the `From<sqlx::Error>` conversion.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{CatalogStore, CategoryDeletion, IdentityStore, OrderStore, StoreTx};
use crate::error::{StorefrontError, StorefrontResult};
use crate::models::{
  Category, NewOrder, NewUser, Order, Product, ProductDraft, ProductFilter, Session, User, UserChanges,
};

const PRODUCT_COLUMNS: &str =
  "id, name, description, price, category_id, stock_quantity, image_url, created_at, archived_at";
const ORDER_COLUMNS: &str = "id, user_id, product_id, quantity, created_at, total_price";
const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";

#[derive(Clone, Debug)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn from_pool(pool: PgPool) -> Self {
    Self { pool }
  }

  #[instrument(name = "PgStore::connect", skip(database_url))]
  pub async fn connect(database_url: &str, max_connections: u32) -> StorefrontResult<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(max_connections)
      .connect(database_url)
      .await?;
    info!("Connected to PostgreSQL.");
    Ok(Self { pool })
  }

  /// Applies the migrations embedded from `core/migrations`.
  pub async fn migrate(&self) -> StorefrontResult<()> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    info!("Database migrations applied.");
    Ok(())
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside an ILIKE pattern.
fn like_pattern(needle: &str) -> String {
  let mut escaped = String::with_capacity(needle.len() + 2);
  escaped.push('%');
  for c in needle.chars() {
    if matches!(c, '%' | '_' | '\\') {
      escaped.push('\\');
    }
    escaped.push(c);
  }
  escaped.push('%');
  escaped
}

#[async_trait]
impl CatalogStore for PgStore {
  async fn insert_category(&self, name: &str, description: &str) -> StorefrontResult<Category> {
    let category = sqlx::query_as::<_, Category>(
      "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING id, name, description",
    )
    .bind(name)
    .bind(description)
    .fetch_one(&self.pool)
    .await?;
    Ok(category)
  }

  async fn update_category(&self, id: i64, name: &str, description: &str) -> StorefrontResult<Option<Category>> {
    let category = sqlx::query_as::<_, Category>(
      "UPDATE categories SET name = $1, description = $2 WHERE id = $3 RETURNING id, name, description",
    )
    .bind(name)
    .bind(description)
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(category)
  }

  async fn get_category(&self, id: i64) -> StorefrontResult<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT id, name, description FROM categories WHERE id = $1")
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(category)
  }

  async fn get_category_by_name(&self, name: &str) -> StorefrontResult<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT id, name, description FROM categories WHERE name = $1")
      .bind(name)
      .fetch_optional(&self.pool)
      .await?;
    Ok(category)
  }

  async fn list_categories(&self) -> StorefrontResult<Vec<Category>> {
    let categories =
      sqlx::query_as::<_, Category>("SELECT id, name, description FROM categories ORDER BY name ASC, id ASC")
        .fetch_all(&self.pool)
        .await?;
    Ok(categories)
  }

  #[instrument(name = "PgStore::delete_category", skip(self))]
  async fn delete_category(&self, id: i64) -> StorefrontResult<CategoryDeletion> {
    let mut tx = self.pool.begin().await?;

    let found = sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE id = $1 FOR UPDATE")
      .bind(id)
      .fetch_optional(&mut *tx)
      .await?;
    if found.is_none() {
      return Ok(CategoryDeletion::NotFound);
    }

    // Locking the products makes in-flight orders for them finish (or wait) first.
    sqlx::query("SELECT id FROM products WHERE category_id = $1 ORDER BY id FOR UPDATE")
      .bind(id)
      .fetch_all(&mut *tx)
      .await?;

    let has_orders = sqlx::query_scalar::<_, bool>(
      "SELECT EXISTS (SELECT 1 FROM orders o JOIN products p ON p.id = o.product_id WHERE p.category_id = $1)",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    if has_orders {
      return Ok(CategoryDeletion::ProductsHaveOrders);
    }

    let products_removed = sqlx::query("DELETE FROM products WHERE category_id = $1")
      .bind(id)
      .execute(&mut *tx)
      .await?
      .rows_affected();
    sqlx::query("DELETE FROM categories WHERE id = $1")
      .bind(id)
      .execute(&mut *tx)
      .await?;
    tx.commit().await?;

    debug!(products_removed, "Category deleted with its products.");
    Ok(CategoryDeletion::Deleted { products_removed })
  }

  async fn insert_product(&self, draft: &ProductDraft) -> StorefrontResult<Product> {
    let sql = format!(
      "INSERT INTO products (name, description, price, category_id, stock_quantity, image_url) \
       VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
      PRODUCT_COLUMNS
    );
    let product = sqlx::query_as::<_, Product>(&sql)
      .bind(&draft.name)
      .bind(&draft.description)
      .bind(draft.price)
      .bind(draft.category_id)
      .bind(draft.stock_quantity)
      .bind(&draft.image_url)
      .fetch_one(&self.pool)
      .await?;
    Ok(product)
  }

  async fn update_product(&self, id: i64, draft: &ProductDraft) -> StorefrontResult<Option<Product>> {
    let sql = format!(
      "UPDATE products SET name = $1, description = $2, price = $3, category_id = $4, \
       stock_quantity = $5, image_url = $6 WHERE id = $7 RETURNING {}",
      PRODUCT_COLUMNS
    );
    let product = sqlx::query_as::<_, Product>(&sql)
      .bind(&draft.name)
      .bind(&draft.description)
      .bind(draft.price)
      .bind(draft.category_id)
      .bind(draft.stock_quantity)
      .bind(&draft.image_url)
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(product)
  }

  async fn get_product(&self, id: i64) -> StorefrontResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
    let product = sqlx::query_as::<_, Product>(&sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(product)
  }

  async fn list_products(&self, filter: &ProductFilter) -> StorefrontResult<Vec<Product>> {
    let mut qb = QueryBuilder::<Postgres>::new(
      "SELECT p.id, p.name, p.description, p.price, p.category_id, p.stock_quantity, p.image_url, \
       p.created_at, p.archived_at FROM products p JOIN categories c ON c.id = p.category_id \
       WHERE p.archived_at IS NULL",
    );
    if let Some(category_id) = filter.category_id {
      qb.push(" AND p.category_id = ").push_bind(category_id);
    }
    if let Some(min) = filter.min_price {
      qb.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
      qb.push(" AND p.price <= ").push_bind(max);
    }
    match filter.in_stock {
      Some(true) => {
        qb.push(" AND p.stock_quantity > 0");
      }
      Some(false) => {
        qb.push(" AND p.stock_quantity = 0");
      }
      None => {}
    }
    if let Some(needle) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
      let pattern = like_pattern(needle);
      qb.push(" AND (p.name ILIKE ")
        .push_bind(pattern.clone())
        .push(" OR p.description ILIKE ")
        .push_bind(pattern.clone())
        .push(" OR c.name ILIKE ")
        .push_bind(pattern)
        .push(")");
    }
    qb.push(" ORDER BY p.name ASC, p.id ASC");

    let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;
    Ok(products)
  }

  async fn archive_product(&self, id: i64) -> StorefrontResult<Option<Product>> {
    let sql = format!(
      "UPDATE products SET archived_at = COALESCE(archived_at, now()) WHERE id = $1 RETURNING {}",
      PRODUCT_COLUMNS
    );
    let product = sqlx::query_as::<_, Product>(&sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(product)
  }
}

#[async_trait]
impl OrderStore for PgStore {
  async fn begin(&self) -> StorefrontResult<Box<dyn StoreTx>> {
    let tx = self.pool.begin().await?;
    Ok(Box::new(PgTx { tx }))
  }

  async fn list_orders_for_user(&self, user_id: i64) -> StorefrontResult<Vec<Order>> {
    let sql = format!(
      "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
      ORDER_COLUMNS
    );
    let orders = sqlx::query_as::<_, Order>(&sql)
      .bind(user_id)
      .fetch_all(&self.pool)
      .await?;
    Ok(orders)
  }

  async fn get_order(&self, id: i64) -> StorefrontResult<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
    let order = sqlx::query_as::<_, Order>(&sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(order)
  }
}

struct PgTx {
  tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
  async fn product_for_update(&mut self, product_id: i64) -> StorefrontResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = $1 FOR UPDATE", PRODUCT_COLUMNS);
    let product = sqlx::query_as::<_, Product>(&sql)
      .bind(product_id)
      .fetch_optional(&mut *self.tx)
      .await?;
    Ok(product)
  }

  async fn save_product_stock(&mut self, product: &Product) -> StorefrontResult<()> {
    if product.stock_quantity < 0 {
      return Err(StorefrontError::validation("stock_quantity", "Stock quantity cannot be negative."));
    }
    let updated = sqlx::query("UPDATE products SET stock_quantity = $1 WHERE id = $2")
      .bind(product.stock_quantity)
      .bind(product.id)
      .execute(&mut *self.tx)
      .await?
      .rows_affected();
    if updated == 0 {
      return Err(StorefrontError::not_found("Product", product.id));
    }
    Ok(())
  }

  async fn insert_order(&mut self, order: &NewOrder) -> StorefrontResult<Order> {
    let sql = format!(
      "INSERT INTO orders (user_id, product_id, quantity, created_at, total_price) \
       VALUES ($1, $2, $3, $4, $5) RETURNING {}",
      ORDER_COLUMNS
    );
    let order = sqlx::query_as::<_, Order>(&sql)
      .bind(order.user_id)
      .bind(order.product_id)
      .bind(order.quantity)
      .bind(order.created_at)
      .bind(order.total_price)
      .fetch_one(&mut *self.tx)
      .await?;
    Ok(order)
  }

  async fn commit(self: Box<Self>) -> StorefrontResult<()> {
    self.tx.commit().await?;
    Ok(())
  }
}

#[async_trait]
impl IdentityStore for PgStore {
  async fn insert_user(&self, user: &NewUser) -> StorefrontResult<User> {
    let sql = format!(
      "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {}",
      USER_COLUMNS
    );
    let user = sqlx::query_as::<_, User>(&sql)
      .bind(&user.username)
      .bind(&user.email)
      .bind(&user.password_hash)
      .fetch_one(&self.pool)
      .await?;
    Ok(user)
  }

  async fn update_user(&self, id: i64, changes: &UserChanges) -> StorefrontResult<Option<User>> {
    let sql = format!(
      "UPDATE users SET username = $1, email = $2 WHERE id = $3 RETURNING {}",
      USER_COLUMNS
    );
    let user = sqlx::query_as::<_, User>(&sql)
      .bind(&changes.username)
      .bind(&changes.email)
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(user)
  }

  async fn get_user(&self, id: i64) -> StorefrontResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
    let user = sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&self.pool).await?;
    Ok(user)
  }

  async fn get_user_by_username(&self, username: &str) -> StorefrontResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
    let user = sqlx::query_as::<_, User>(&sql)
      .bind(username)
      .fetch_optional(&self.pool)
      .await?;
    Ok(user)
  }

  async fn list_users(&self) -> StorefrontResult<Vec<User>> {
    let sql = format!("SELECT {} FROM users ORDER BY id ASC", USER_COLUMNS);
    let users = sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?;
    Ok(users)
  }

  async fn insert_session(&self, session: &Session) -> StorefrontResult<()> {
    sqlx::query("INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)")
      .bind(session.token)
      .bind(session.user_id)
      .bind(session.created_at)
      .bind(session.expires_at)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn get_session(&self, token: Uuid) -> StorefrontResult<Option<Session>> {
    let session = sqlx::query_as::<_, Session>(
      "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = $1",
    )
    .bind(token)
    .fetch_optional(&self.pool)
    .await?;
    Ok(session)
  }

  async fn delete_session(&self, token: Uuid) -> StorefrontResult<bool> {
    let removed = sqlx::query("DELETE FROM sessions WHERE token = $1")
      .bind(token)
      .execute(&self.pool)
      .await?
      .rows_affected();
    Ok(removed > 0)
  }
}
