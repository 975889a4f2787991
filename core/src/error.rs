// core/src/error.rs
use thiserror::Error;

/// Postgres SQLSTATE for `serialization_failure`.
const PG_SERIALIZATION_FAILURE: &str = "40001";
/// Postgres SQLSTATE for `deadlock_detected`.
const PG_DEADLOCK_DETECTED: &str = "40P01";
/// Postgres SQLSTATE for `unique_violation`.
const PG_UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for `foreign_key_violation`.
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, Error)]
pub enum StorefrontError {
  /// Field-level input rejection. `field` is the name the client sent (or should have sent).
  #[error("Validation failed for '{field}': {message}")]
  Validation { field: String, message: String },

  #[error("{entity} with id {id} not found")]
  NotFound { entity: &'static str, id: i64 },

  #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
  InsufficientStock {
    product_id: i64,
    requested: i64,
    available: i64,
  },

  /// Uniqueness or referential rule that the caller can fix by changing the request.
  #[error("Conflict: {0}")]
  Conflict(String),

  /// The store aborted a transaction because of a concurrent writer. Retryable.
  #[error("Concurrent modification detected; transaction aborted")]
  ConcurrencyConflict,

  #[error("Database error: {0}")]
  Database(#[source] sqlx::Error),

  #[error("Migration error: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("Internal storefront error: {0}")]
  Internal(String),
}

impl StorefrontError {
  pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
    StorefrontError::Validation {
      field: field.into(),
      message: message.into(),
    }
  }

  pub fn not_found(entity: &'static str, id: i64) -> Self {
    StorefrontError::NotFound { entity, id }
  }

  /// Whether the whole atomic unit may be retried from the start.
  pub fn is_retryable(&self) -> bool {
    matches!(self, StorefrontError::ConcurrencyConflict)
  }
}

// Classifies the database errors the services care about; everything else stays opaque.
impl From<sqlx::Error> for StorefrontError {
  fn from(err: sqlx::Error) -> Self {
    if let sqlx::Error::Database(db_err) = &err {
      match db_err.code().as_deref() {
        Some(PG_SERIALIZATION_FAILURE) | Some(PG_DEADLOCK_DETECTED) => {
          return StorefrontError::ConcurrencyConflict;
        }
        Some(PG_UNIQUE_VIOLATION) => {
          let what = db_err.constraint().unwrap_or("unique constraint").to_string();
          return StorefrontError::Conflict(format!("duplicate value violates {}", what));
        }
        Some(PG_FOREIGN_KEY_VIOLATION) => {
          let what = db_err.constraint().unwrap_or("foreign key").to_string();
          return StorefrontError::Conflict(format!("referenced row is missing or still in use ({})", what));
        }
        _ => {}
      }
    }
    StorefrontError::Database(err)
  }
}

pub type StorefrontResult<T, E = StorefrontError> = std::result::Result<T, E>;
