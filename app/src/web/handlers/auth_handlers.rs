// app/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::Result;
use crate::services::auth_service;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

// --- Request DTOs ---
#[derive(Deserialize)]
pub struct RegisterRequestPayload {
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequestPayload {
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct UpdateProfilePayload {
  pub username: Option<String>,
  pub email: Option<String>,
}

// --- Handler Implementations ---

#[instrument(name = "handler::register", skip(app_state, req_payload), fields(username = %req_payload.username))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<RegisterRequestPayload>,
) -> Result<HttpResponse> {
  let (user, session) = auth_service::register(
    &app_state,
    &req_payload.username,
    &req_payload.email,
    &req_payload.password,
  )
  .await?;
  Ok(HttpResponse::Created().json(json!({
      "user": user,
      "token": session.token,
      "expires_at": session.expires_at,
  })))
}

#[instrument(name = "handler::login", skip(app_state, req_payload), fields(username = %req_payload.username))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<LoginRequestPayload>,
) -> Result<HttpResponse> {
  let (user, session) = auth_service::login(&app_state, &req_payload.username, &req_payload.password).await?;
  Ok(HttpResponse::Ok().json(json!({
      "user": user,
      "token": session.token,
      "expires_at": session.expires_at,
  })))
}

#[instrument(name = "handler::logout", skip_all, fields(user_id = auth_user.identity.user_id))]
pub async fn logout_handler(app_state: web::Data<AppState>, auth_user: AuthenticatedUser) -> Result<HttpResponse> {
  auth_service::logout(&app_state, auth_user.token).await?;
  info!("Session revoked.");
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::me", skip_all, fields(user_id = auth_user.identity.user_id))]
pub async fn me_handler(app_state: web::Data<AppState>, auth_user: AuthenticatedUser) -> Result<HttpResponse> {
  let user = auth_service::current_user(&app_state, &auth_user.identity).await?;
  Ok(HttpResponse::Ok().json(user))
}

#[instrument(name = "handler::update_me", skip_all, fields(user_id = auth_user.identity.user_id))]
pub async fn update_me_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<UpdateProfilePayload>,
) -> Result<HttpResponse> {
  let user = auth_service::update_profile(
    &app_state,
    &auth_user.identity,
    req_payload.username.as_deref(),
    req_payload.email.as_deref(),
  )
  .await?;
  Ok(HttpResponse::Ok().json(user))
}
