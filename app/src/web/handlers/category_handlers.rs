// app/src/web/handlers/category_handlers.rs

use actix_web::{web, HttpResponse};
use storefront::CategoryInput;
use tracing::{info, instrument};

use crate::errors::Result;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[instrument(name = "handler::list_categories", skip_all)]
pub async fn list_categories_handler(
  app_state: web::Data<AppState>,
  _auth_user: AuthenticatedUser,
) -> Result<HttpResponse> {
  let categories = app_state.catalog.list_categories().await?;
  Ok(HttpResponse::Ok().json(categories))
}

#[instrument(name = "handler::create_category", skip_all)]
pub async fn create_category_handler(
  app_state: web::Data<AppState>,
  _auth_user: AuthenticatedUser,
  payload: web::Json<CategoryInput>,
) -> Result<HttpResponse> {
  let category = app_state.catalog.create_category(payload.into_inner()).await?;
  Ok(HttpResponse::Created().json(category))
}

#[instrument(name = "handler::get_category", skip(app_state, path, _auth_user), fields(category_id = %path.as_ref()))]
pub async fn get_category_handler(
  app_state: web::Data<AppState>,
  _auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse> {
  let category = app_state.catalog.get_category(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(category))
}

#[instrument(name = "handler::update_category", skip(app_state, path, payload, _auth_user), fields(category_id = %path.as_ref()))]
pub async fn update_category_handler(
  app_state: web::Data<AppState>,
  _auth_user: AuthenticatedUser,
  path: web::Path<i64>,
  payload: web::Json<CategoryInput>,
) -> Result<HttpResponse> {
  let category = app_state
    .catalog
    .update_category(path.into_inner(), payload.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(category))
}

#[instrument(name = "handler::delete_category", skip(app_state, path, _auth_user), fields(category_id = %path.as_ref()))]
pub async fn delete_category_handler(
  app_state: web::Data<AppState>,
  _auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse> {
  let products_removed = app_state.catalog.delete_category(path.into_inner()).await?;
  info!(products_removed, "Category and its products deleted.");
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::category_products", skip(app_state, path, _auth_user), fields(category_id = %path.as_ref()))]
pub async fn category_products_handler(
  app_state: web::Data<AppState>,
  _auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse> {
  let products = app_state.catalog.category_products(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(products))
}
