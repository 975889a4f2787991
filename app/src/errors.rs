// app/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::{json, Map, Value};
use storefront::StorefrontError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  /// Request-level field error that never reached the core services.
  #[error("Validation Error: {field}: {message}")]
  Validation { field: String, message: String },

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error(transparent)]
  Storefront(#[from] StorefrontError),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
    AppError::Validation {
      field: field.into(),
      message: message.into(),
    }
  }
}

// Glue code (startup, seeding) works with anyhow; keep core errors intact when they round-trip.
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<AppError>() {
      Ok(app_err) => app_err,
      Err(err) => match err.downcast::<StorefrontError>() {
        Ok(core_err) => AppError::Storefront(core_err),
        Err(err) => AppError::Internal(format!("{:#}", err)),
      },
    }
  }
}

fn field_error(field: &str, message: &str) -> Value {
  let mut body = Map::new();
  body.insert(field.to_string(), Value::String(message.to_string()));
  Value::Object(body)
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation { .. } => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
      AppError::Storefront(err) => match err {
        StorefrontError::Validation { .. } | StorefrontError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
        StorefrontError::NotFound { .. } => StatusCode::NOT_FOUND,
        StorefrontError::Conflict(_) => StatusCode::CONFLICT,
        StorefrontError::ConcurrencyConflict => StatusCode::SERVICE_UNAVAILABLE,
        StorefrontError::Database(_) | StorefrontError::Migration(_) | StorefrontError::Internal(_) => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Rejecting request");
    }

    let body = match self {
      AppError::Validation { field, message } => field_error(field, message),
      AppError::Auth(m) => json!({"error": m}),
      AppError::Config(_) => json!({"error": "Configuration issue"}),
      AppError::Internal(_) => json!({"error": "An internal error occurred"}),
      AppError::Storefront(err) => match err {
        StorefrontError::Validation { field, message } => field_error(field, message),
        StorefrontError::InsufficientStock { .. } => field_error("stock_quantity", "Insufficient stock"),
        StorefrontError::NotFound { .. } => json!({"error": err.to_string()}),
        StorefrontError::Conflict(m) => json!({"error": m}),
        StorefrontError::ConcurrencyConflict => {
          json!({"error": "The request conflicted with concurrent updates. Please retry."})
        }
        StorefrontError::Database(_) => json!({"error": "Database operation failed"}),
        StorefrontError::Migration(_) | StorefrontError::Internal(_) => {
          json!({"error": "An internal error occurred"})
        }
      },
    };
    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
