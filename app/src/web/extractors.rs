// app/src/web/extractors.rs

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use storefront::Identity;
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::auth_service;
use crate::state::AppState;

/// Caller resolved from an `Authorization: Bearer <session token>` header.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub identity: Identity,
  pub token: Uuid,
}

fn bearer_token(req: &HttpRequest) -> Result<Uuid, AppError> {
  let value = req
    .headers()
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or_else(|| AppError::Auth("Authentication credentials were not provided.".to_string()))?;

  let (scheme, token) = value
    .trim()
    .split_once(' ')
    .ok_or_else(|| AppError::Auth("Malformed Authorization header.".to_string()))?;
  if !scheme.eq_ignore_ascii_case("bearer") {
    return Err(AppError::Auth("Unsupported authorization scheme.".to_string()));
  }
  Uuid::parse_str(token.trim()).map_err(|_| AppError::Auth("Invalid or expired session token.".to_string()))
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let token = bearer_token(req);
    let state = req.app_data::<web::Data<AppState>>().cloned();

    Box::pin(async move {
      let token = token.map_err(|e| {
        warn!(error = %e, "AuthenticatedUser extractor: rejecting request.");
        e
      })?;
      let state = state.ok_or_else(|| AppError::Internal("AppState is not registered".to_string()))?;
      let identity = auth_service::resolve_token(&state, token).await?;
      Ok(AuthenticatedUser { identity, token })
    })
  }
}
