// app/src/web/handlers/user_handlers.rs

use actix_web::{web, HttpResponse};
use storefront::StorefrontError;
use tracing::instrument;

use crate::errors::Result;
use crate::state::AppState;

#[instrument(name = "handler::list_users", skip_all)]
pub async fn list_users_handler(app_state: web::Data<AppState>) -> Result<HttpResponse> {
  let users = app_state.store.list_users().await?;
  Ok(HttpResponse::Ok().json(users))
}

#[instrument(name = "handler::get_user", skip(app_state, path), fields(user_id = %path.as_ref()))]
pub async fn get_user_handler(app_state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
  let user_id = path.into_inner();
  let user = app_state
    .store
    .get_user(user_id)
    .await?
    .ok_or_else(|| StorefrontError::not_found("User", user_id))?;
  Ok(HttpResponse::Ok().json(user))
}
