// app/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::errors::{AppError, Result};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

/// Order request body. Fields are kept loose so a wrong type is reported per field; anything
/// else the client sends (`user`, `total_price`, `created_at`, `id`) is ignored.
#[derive(Deserialize, Debug, Default)]
pub struct PlaceOrderPayload {
  #[serde(default, alias = "product")]
  pub product_id: Option<Value>,
  #[serde(default)]
  pub quantity: Option<Value>,
}

fn integer_field(field: &str, value: Option<&Value>) -> Result<i64> {
  match value {
    None | Some(Value::Null) => Err(AppError::validation(field, "This field is required.")),
    Some(Value::Number(n)) => n
      .as_i64()
      .ok_or_else(|| AppError::validation(field, "must be an integer")),
    Some(Value::String(s)) => s
      .trim()
      .parse::<i64>()
      .map_err(|_| AppError::validation(field, "must be an integer")),
    Some(_) => Err(AppError::validation(field, "must be an integer")),
  }
}

#[instrument(
  name = "handler::place_order",
  skip(app_state, payload, auth_user),
  fields(user_id = auth_user.identity.user_id)
)]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<PlaceOrderPayload>,
) -> Result<HttpResponse> {
  let payload = payload.into_inner();
  let product_id = integer_field("product_id", payload.product_id.as_ref())?;
  let quantity = integer_field("quantity", payload.quantity.as_ref())?;

  let order = app_state
    .engine
    .place_order(&auth_user.identity, product_id, quantity)
    .await?;
  info!(order_id = order.id, product_id, quantity, "Order placed.");
  Ok(HttpResponse::Created().json(order))
}

#[instrument(name = "handler::list_orders", skip(app_state, auth_user), fields(user_id = auth_user.identity.user_id))]
pub async fn list_orders_handler(app_state: web::Data<AppState>, auth_user: AuthenticatedUser) -> Result<HttpResponse> {
  let orders = app_state.engine.list_orders(&auth_user.identity).await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::get_order", skip(app_state, path, auth_user), fields(user_id = auth_user.identity.user_id))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse> {
  let order = app_state.engine.get_order(&auth_user.identity, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(order))
}
