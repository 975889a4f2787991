// app/src/state.rs
use crate::config::AppConfig;
use crate::errors::Result;
use std::sync::Arc;
use storefront::{CatalogService, OrderEngine, Store};

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub catalog: Arc<CatalogService>,
  pub engine: Arc<OrderEngine>,
  pub config: Arc<AppConfig>, // Share loaded config
}

impl AppState {
  /// Wires the services onto `store`, creating the fallback category if needed.
  pub async fn build(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Result<Self> {
    let catalog = CatalogService::bootstrap(store.clone(), &config.fallback_category).await?;
    let engine = OrderEngine::new(store.clone()).with_max_attempts(config.order_max_attempts);
    Ok(Self {
      store,
      catalog: Arc::new(catalog),
      engine: Arc::new(engine),
      config,
    })
  }
}
