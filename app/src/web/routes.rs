// app/src/web/routes.rs

use actix_web::{error::InternalError, web, HttpResponse};
use serde_json::json;

use crate::web::handlers::{auth_handlers, category_handlers, order_handlers, product_handlers, user_handlers};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "status": "ok" }))
}

// Malformed JSON bodies get the same `{"error": ...}` shape as every other rejection.
fn json_config() -> web::JsonConfig {
  web::JsonConfig::default().error_handler(|err, _req| {
    let message = err.to_string();
    tracing::warn!(error = %message, "Rejecting malformed JSON body.");
    InternalError::from_response(err, HttpResponse::BadRequest().json(json!({ "error": message }))).into()
  })
}

/// Mounts every route under `/api`. Called from `main.rs` and from the handler tests.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.app_data(json_config()).service(
    web::scope("/api")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/register", web::post().to(auth_handlers::register_handler))
          .route("/login", web::post().to(auth_handlers::login_handler))
          .route("/logout", web::post().to(auth_handlers::logout_handler))
          .route("/me", web::get().to(auth_handlers::me_handler))
          .route("/me", web::put().to(auth_handlers::update_me_handler)),
      )
      .service(
        web::scope("/users")
          .route("", web::get().to(user_handlers::list_users_handler))
          .route("/{user_id}", web::get().to(user_handlers::get_user_handler)),
      )
      .service(
        web::scope("/categories")
          .route("", web::get().to(category_handlers::list_categories_handler))
          .route("", web::post().to(category_handlers::create_category_handler))
          .route("/{category_id}", web::get().to(category_handlers::get_category_handler))
          .route("/{category_id}", web::put().to(category_handlers::update_category_handler))
          .route("/{category_id}", web::delete().to(category_handlers::delete_category_handler))
          .route(
            "/{category_id}/products",
            web::get().to(category_handlers::category_products_handler),
          ),
      )
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list_products_handler))
          .route("", web::post().to(product_handlers::create_product_handler))
          .route("/{product_id}", web::get().to(product_handlers::get_product_handler))
          .route("/{product_id}", web::put().to(product_handlers::replace_product_handler))
          .route("/{product_id}", web::patch().to(product_handlers::patch_product_handler))
          .route("/{product_id}", web::delete().to(product_handlers::delete_product_handler)),
      )
      .service(
        web::scope("/orders")
          .route("", web::get().to(order_handlers::list_orders_handler))
          .route("", web::post().to(order_handlers::place_order_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler)),
      ),
  );
}
