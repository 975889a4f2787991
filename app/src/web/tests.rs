// app/src/web/tests.rs

use actix_web::http::{header::ContentType, StatusCode};
use actix_web::{test, web, App};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use storefront::{CategoryInput, MemoryStore, NewUser, ProductInput, Session, Store};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::web::configure_app_routes;

async fn test_state() -> AppState {
  let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
  AppState::build(store, Arc::new(AppConfig::default())).await.unwrap()
}

macro_rules! test_app {
  ($state:expr) => {
    test::init_service(
      App::new()
        .app_data(web::Data::new($state.clone()))
        .configure(configure_app_routes),
    )
    .await
  };
}

/// A user with a live session, created without going through password hashing.
async fn signed_in(state: &AppState, username: &str) -> (i64, String) {
  let user = state
    .store
    .insert_user(&NewUser {
      username: username.to_string(),
      email: format!("{}@example.com", username),
      password_hash: String::new(),
    })
    .await
    .unwrap();
  let now = Utc::now();
  let token = Uuid::new_v4();
  state
    .store
    .insert_session(&Session {
      token,
      user_id: user.id,
      created_at: now,
      expires_at: now + Duration::hours(1),
    })
    .await
    .unwrap();
  (user.id, format!("Bearer {}", token))
}

async fn product(state: &AppState, name: &str, price: &str, stock: i64) -> i64 {
  state
    .catalog
    .create_product(ProductInput {
      name: Some(name.to_string()),
      price: Some(price.parse().unwrap()),
      stock_quantity: Some(stock),
      ..ProductInput::default()
    })
    .await
    .unwrap()
    .id
}

async fn stock_of(state: &AppState, product_id: i64) -> i64 {
  state.store.get_product(product_id).await.unwrap().unwrap().stock_quantity
}

fn order_request(auth: Option<&str>, body: Value) -> test::TestRequest {
  let req = test::TestRequest::post().uri("/api/orders").set_json(body);
  match auth {
    Some(auth) => req.insert_header(("Authorization", auth.to_string())),
    None => req,
  }
}

#[actix_web::test]
async fn test_health_check() {
  let state = test_state().await;
  let app = test_app!(state);

  let resp = test::call_service(&app, test::TestRequest::get().uri("/api/health").to_request()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body, json!({"status": "ok"}));
}

#[actix_web::test]
async fn test_place_order_returns_created_order_and_ignores_server_fields() {
  let state = test_state().await;
  let app = test_app!(state);
  let (alice_id, auth) = signed_in(&state, "alice").await;
  let product_id = product(&state, "Widget", "9.99", 5).await;

  let req = order_request(
    Some(&auth),
    json!({"product_id": product_id, "quantity": 3, "total_price": "0.01", "user": 999, "id": 7}),
  );
  let resp = test::call_service(&app, req.to_request()).await;

  assert_eq!(resp.status(), StatusCode::CREATED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["user"], json!(alice_id));
  assert_eq!(body["product"], json!(product_id));
  assert_eq!(body["quantity"], json!(3));
  assert_eq!(body["total_price"], json!("29.97"));
  assert!(body["id"].is_i64());
  assert!(body["created_at"].is_string());
  assert_eq!(stock_of(&state, product_id).await, 2);
}

#[actix_web::test]
async fn test_order_payload_errors_name_their_field() {
  let state = test_state().await;
  let app = test_app!(state);
  let (_, auth) = signed_in(&state, "alice").await;
  let product_id = product(&state, "Pen", "1.00", 10).await;

  let cases = [
    (
      json!({"product_id": product_id, "quantity": 0}),
      json!({"quantity": "must be positive"}),
    ),
    (
      json!({"product_id": product_id, "quantity": -4}),
      json!({"quantity": "must be positive"}),
    ),
    (
      json!({"product_id": product_id, "quantity": "many"}),
      json!({"quantity": "must be an integer"}),
    ),
    (
      json!({"product_id": product_id, "quantity": 1.5}),
      json!({"quantity": "must be an integer"}),
    ),
    (json!({"quantity": 1}), json!({"product_id": "This field is required."})),
  ];

  for (payload, expected) in cases {
    let resp = test::call_service(&app, order_request(Some(&auth), payload.clone()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "payload {}", payload);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, expected, "payload {}", payload);
  }
  assert_eq!(stock_of(&state, product_id).await, 10);
}

#[actix_web::test]
async fn test_insufficient_stock_is_a_400_on_stock_quantity() {
  let state = test_state().await;
  let app = test_app!(state);
  let (_, alice) = signed_in(&state, "alice").await;
  let (_, bob) = signed_in(&state, "bob").await;
  let product_id = product(&state, "Widget", "9.99", 5).await;

  let resp = test::call_service(
    &app,
    order_request(Some(&alice), json!({"product_id": product_id, "quantity": 3})).to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let resp = test::call_service(
    &app,
    order_request(Some(&bob), json!({"product_id": product_id, "quantity": 3})).to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body, json!({"stock_quantity": "Insufficient stock"}));
  assert_eq!(stock_of(&state, product_id).await, 2);
}

#[actix_web::test]
async fn test_orders_require_a_valid_session() {
  let state = test_state().await;
  let app = test_app!(state);
  let product_id = product(&state, "Pen", "1.00", 10).await;
  let payload = json!({"product_id": product_id, "quantity": 1});

  let unknown = format!("Bearer {}", Uuid::new_v4());
  for auth in [None, Some("Bearer not-a-token"), Some("Basic YWxpY2U6cHc="), Some(unknown.as_str())] {
    let resp = test::call_service(&app, order_request(auth, payload.clone()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "auth {:?}", auth);
  }

  let resp = test::call_service(&app, test::TestRequest::get().uri("/api/orders").to_request()).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(stock_of(&state, product_id).await, 10);
}

#[actix_web::test]
async fn test_expired_session_is_rejected_and_removed() {
  let state = test_state().await;
  let app = test_app!(state);
  let (user_id, _) = signed_in(&state, "alice").await;
  let token = Uuid::new_v4();
  let past = Utc::now() - Duration::hours(2);
  state
    .store
    .insert_session(&Session {
      token,
      user_id,
      created_at: past,
      expires_at: past + Duration::hours(1),
    })
    .await
    .unwrap();

  let req = test::TestRequest::get()
    .uri("/api/auth/me")
    .insert_header(("Authorization", format!("Bearer {}", token)))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(state.store.get_session(token).await.unwrap().is_none());
}

#[actix_web::test]
async fn test_unknown_product_is_404() {
  let state = test_state().await;
  let app = test_app!(state);
  let (_, auth) = signed_in(&state, "alice").await;

  let resp = test::call_service(
    &app,
    order_request(Some(&auth), json!({"product_id": 4040, "quantity": 1})).to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_order_reads_are_scoped_to_the_caller() {
  let state = test_state().await;
  let app = test_app!(state);
  let (alice_id, alice) = signed_in(&state, "alice").await;
  let (_, bob) = signed_in(&state, "bob").await;
  let product_id = product(&state, "Notebook", "3.00", 50).await;

  let resp = test::call_service(
    &app,
    order_request(Some(&alice), json!({"product_id": product_id, "quantity": 2})).to_request(),
  )
  .await;
  let alice_order: Value = test::read_body_json(resp).await;
  test::call_service(
    &app,
    order_request(Some(&bob), json!({"product_id": product_id, "quantity": 1})).to_request(),
  )
  .await;

  let req = test::TestRequest::get()
    .uri("/api/orders")
    .insert_header(("Authorization", alice.clone()))
    .to_request();
  let orders: Value = test::call_and_read_body_json(&app, req).await;
  let orders = orders.as_array().unwrap();
  assert_eq!(orders.len(), 1);
  assert_eq!(orders[0]["user"], json!(alice_id));

  let uri = format!("/api/orders/{}", alice_order["id"]);
  let req = test::TestRequest::get()
    .uri(&uri)
    .insert_header(("Authorization", bob))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

  let req = test::TestRequest::get()
    .uri(&uri)
    .insert_header(("Authorization", alice))
    .to_request();
  let order: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(order, alice_order);
}

#[actix_web::test]
async fn test_public_product_listing_filters() {
  let state = test_state().await;
  let app = test_app!(state);
  product(&state, "Mug", "4.00", 10).await;
  product(&state, "Teapot", "25.00", 0).await;
  product(&state, "Spoon", "1.50", 3).await;

  let names = |body: Value| -> Vec<String> {
    body
      .as_array()
      .unwrap()
      .iter()
      .map(|p| p["name"].as_str().unwrap().to_string())
      .collect()
  };

  let req = test::TestRequest::get().uri("/api/products").to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(names(body.clone()), vec!["Mug", "Spoon", "Teapot"]);
  assert_eq!(body[0]["price"], json!("4.00"));
  assert_eq!(body[0]["category"], json!(state.catalog.fallback_category_id()));

  let req = test::TestRequest::get()
    .uri("/api/products?in_stock=true&max_price=5")
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(names(body), vec!["Mug", "Spoon"]);

  let req = test::TestRequest::get().uri("/api/products?search=TEA").to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(names(body), vec!["Teapot"]);

  let req = test::TestRequest::get().uri("/api/products?min_price=abc").to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body, json!({"min_price": "Enter a number."}));
}

#[actix_web::test]
async fn test_product_writes_require_auth_and_validate_fields() {
  let state = test_state().await;
  let app = test_app!(state);
  let (_, auth) = signed_in(&state, "editor").await;

  let req = test::TestRequest::post()
    .uri("/api/products")
    .set_json(json!({"name": "Lamp", "price": "20.00", "stock_quantity": 2}))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

  let req = test::TestRequest::post()
    .uri("/api/products")
    .insert_header(("Authorization", auth.clone()))
    .set_json(json!({"name": "Lamp", "price": "0", "stock_quantity": 2}))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body, json!({"price": "Price must be greater than 0."}));

  let req = test::TestRequest::post()
    .uri("/api/products")
    .insert_header(("Authorization", auth.clone()))
    .set_json(json!({"name": "Lamp", "price": 20, "stock_quantity": 2, "image_url": "https://example.com/lamp.png"}))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let created: Value = test::read_body_json(resp).await;
  assert_eq!(created["price"], json!("20.00"));
  let uri = format!("/api/products/{}", created["id"]);

  let req = test::TestRequest::patch()
    .uri(&uri)
    .insert_header(("Authorization", auth.clone()))
    .set_json(json!({"stock_quantity": 7}))
    .to_request();
  let patched: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(patched["stock_quantity"], json!(7));
  assert_eq!(patched["name"], json!("Lamp"));

  let req = test::TestRequest::delete()
    .uri(&uri)
    .insert_header(("Authorization", auth))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

  let req = test::TestRequest::get().uri(&uri).to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_category_with_ordered_products_cannot_be_deleted() {
  let state = test_state().await;
  let app = test_app!(state);
  let (_, auth) = signed_in(&state, "alice").await;
  let category = state
    .catalog
    .create_category(CategoryInput {
      name: Some("Tools".into()),
      description: None,
    })
    .await
    .unwrap();
  let saw = state
    .catalog
    .create_product(ProductInput {
      name: Some("Saw".into()),
      price: Some("18.00".parse().unwrap()),
      stock_quantity: Some(3),
      category: Some(category.id),
      ..ProductInput::default()
    })
    .await
    .unwrap();
  test::call_service(
    &app,
    order_request(Some(&auth), json!({"product_id": saw.id, "quantity": 1})).to_request(),
  )
  .await;

  let uri = format!("/api/categories/{}", category.id);
  let req = test::TestRequest::delete()
    .uri(&uri)
    .insert_header(("Authorization", auth.clone()))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

  let req = test::TestRequest::get()
    .uri(&format!("{}/products", uri))
    .insert_header(("Authorization", auth))
    .to_request();
  let products: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(products.as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn test_register_login_logout_flow() {
  let state = test_state().await;
  let app = test_app!(state);

  let req = test::TestRequest::post()
    .uri("/api/auth/register")
    .set_json(json!({"username": "carol", "email": "carol@example.com", "password": "s3cret-pass"}))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let registered: Value = test::read_body_json(resp).await;
  assert_eq!(registered["user"]["username"], json!("carol"));
  assert!(registered["user"].get("password_hash").is_none());
  let first_token = format!("Bearer {}", registered["token"].as_str().unwrap());

  let req = test::TestRequest::post()
    .uri("/api/auth/login")
    .set_json(json!({"username": "carol", "password": "wrong-pass"}))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

  let req = test::TestRequest::post()
    .uri("/api/auth/login")
    .set_json(json!({"username": "carol", "password": "s3cret-pass"}))
    .to_request();
  let logged_in: Value = test::call_and_read_body_json(&app, req).await;
  let second_token = format!("Bearer {}", logged_in["token"].as_str().unwrap());

  let req = test::TestRequest::put()
    .uri("/api/auth/me")
    .insert_header(("Authorization", first_token.clone()))
    .set_json(json!({"email": "carol@shop.example"}))
    .to_request();
  let me: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(me["email"], json!("carol@shop.example"));
  assert_eq!(me["username"], json!("carol"));

  let req = test::TestRequest::post()
    .uri("/api/auth/logout")
    .insert_header(("Authorization", first_token.clone()))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

  let req = test::TestRequest::get()
    .uri("/api/auth/me")
    .insert_header(("Authorization", first_token))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

  let req = test::TestRequest::get()
    .uri("/api/auth/me")
    .insert_header(("Authorization", second_token))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_registration_rejects_bad_fields_and_duplicates() {
  let state = test_state().await;
  let app = test_app!(state);
  signed_in(&state, "dave").await;

  let req = test::TestRequest::post()
    .uri("/api/auth/register")
    .set_json(json!({"username": "erin", "email": "erin@example.com", "password": "short"}))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert!(body.get("password").is_some());

  let req = test::TestRequest::post()
    .uri("/api/auth/register")
    .set_json(json!({"username": "erin", "email": "not-an-email", "password": "long enough"}))
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body, json!({"email": "Enter a valid email address."}));

  let req = test::TestRequest::post()
    .uri("/api/auth/register")
    .set_json(json!({"username": "dave", "email": "dave2@example.com", "password": "long enough"}))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_user_listing_never_exposes_password_hashes() {
  let state = test_state().await;
  let app = test_app!(state);
  let (alice_id, _) = signed_in(&state, "alice").await;

  let req = test::TestRequest::get().uri("/api/users").to_request();
  let users: Value = test::call_and_read_body_json(&app, req).await;
  let users = users.as_array().unwrap();
  assert_eq!(users.len(), 1);
  assert!(users[0].get("password_hash").is_none());

  let req = test::TestRequest::get()
    .uri(&format!("/api/users/{}", alice_id))
    .to_request();
  let user: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(user["username"], json!("alice"));

  let req = test::TestRequest::get().uri("/api/users/999").to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_malformed_json_body_is_a_400() {
  let state = test_state().await;
  let app = test_app!(state);
  let (_, auth) = signed_in(&state, "alice").await;

  let req = test::TestRequest::post()
    .uri("/api/orders")
    .insert_header(ContentType::json())
    .insert_header(("Authorization", auth))
    .set_payload("{\"product_id\": 1, ")
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["error"].is_string());
}

#[actix_web::test]
async fn test_anonymous_write_with_bad_body_is_401() {
  let state = test_state().await;
  let app = test_app!(state);
  let product_id = product(&state, "Pen", "1.00", 10).await;

  let targets = [
    test::TestRequest::post().uri("/api/orders"),
    test::TestRequest::post().uri("/api/products"),
    test::TestRequest::put().uri(&format!("/api/products/{}", product_id)),
    test::TestRequest::patch().uri(&format!("/api/products/{}", product_id)),
    test::TestRequest::post().uri("/api/categories"),
    test::TestRequest::put().uri("/api/categories/1"),
    test::TestRequest::put().uri("/api/auth/me"),
  ];
  for req in targets {
    let req = req
      .insert_header(ContentType::json())
      .set_payload("{not json")
      .to_request();
    let path = req.path().to_string();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", path);
  }

  let req = test::TestRequest::post().uri("/api/orders").to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(stock_of(&state, product_id).await, 10);
}

#[actix_web::test]
async fn test_in_stock_filter_only_understands_true_and_false() {
  let state = test_state().await;
  let app = test_app!(state);
  product(&state, "Mug", "4.00", 10).await;
  product(&state, "Teapot", "25.00", 0).await;

  for (query, expected) in [("true", 1), ("false", 1), ("1", 2), ("TRUE", 2), ("yes", 2)] {
    let req = test::TestRequest::get()
      .uri(&format!("/api/products?in_stock={}", query))
      .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), expected, "in_stock={}", query);
  }
}
