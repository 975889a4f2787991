// app/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use storefront::{Money, ProductFilter, ProductInput};
use tracing::{info, instrument};

use crate::errors::{AppError, Result};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

/// Raw query parameters; parsed by hand so a bad value names its parameter.
#[derive(Deserialize, Debug, Default)]
pub struct ListProductsQuery {
  pub search: Option<String>,
  pub category: Option<String>,
  pub min_price: Option<String>,
  pub max_price: Option<String>,
  pub in_stock: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn price_param(field: &str, value: &Option<String>) -> Result<Option<Money>> {
  non_empty(value)
    .map(|raw| raw.parse::<Money>().map_err(|_| AppError::validation(field, "Enter a number.")))
    .transpose()
}

impl ListProductsQuery {
  pub fn to_filter(&self) -> Result<ProductFilter> {
    let category_id = non_empty(&self.category)
      .map(|raw| {
        raw
          .parse::<i64>()
          .map_err(|_| AppError::validation("category", "Enter a whole number."))
      })
      .transpose()?;

    // Only the exact words `true` and `false` switch the stock filter on.
    let in_stock = non_empty(&self.in_stock).and_then(|raw| match raw {
      "true" => Some(true),
      "false" => Some(false),
      _ => None,
    });

    Ok(ProductFilter {
      search: non_empty(&self.search).map(str::to_string),
      category_id,
      min_price: price_param("min_price", &self.min_price)?,
      max_price: price_param("max_price", &self.max_price)?,
      in_stock,
    })
  }
}

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query_params: web::Query<ListProductsQuery>,
) -> Result<HttpResponse> {
  let filter = query_params.to_filter()?;
  let products = app_state.catalog.list_products(&filter).await?;
  info!("Successfully fetched {} products.", products.len());
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(app_state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
  let product = app_state.catalog.get_product(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::create_product", skip(app_state, payload, auth_user), fields(user_id = auth_user.identity.user_id))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<ProductInput>,
) -> Result<HttpResponse> {
  let product = app_state.catalog.create_product(payload.into_inner()).await?;
  Ok(HttpResponse::Created().json(product))
}

#[instrument(name = "handler::replace_product", skip(app_state, path, payload, _auth_user), fields(product_id = %path.as_ref()))]
pub async fn replace_product_handler(
  app_state: web::Data<AppState>,
  _auth_user: AuthenticatedUser,
  path: web::Path<i64>,
  payload: web::Json<ProductInput>,
) -> Result<HttpResponse> {
  let product = app_state
    .catalog
    .replace_product(path.into_inner(), payload.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::patch_product", skip(app_state, path, payload, _auth_user), fields(product_id = %path.as_ref()))]
pub async fn patch_product_handler(
  app_state: web::Data<AppState>,
  _auth_user: AuthenticatedUser,
  path: web::Path<i64>,
  payload: web::Json<ProductInput>,
) -> Result<HttpResponse> {
  let product = app_state
    .catalog
    .patch_product(path.into_inner(), payload.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(product))
}

/// Archives the product; its orders keep pointing at it.
#[instrument(name = "handler::delete_product", skip(app_state, path, _auth_user), fields(product_id = %path.as_ref()))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  _auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse> {
  app_state.catalog.archive_product(path.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}
