// app/src/seed.rs

//! Sample catalog for local runs. Safe to run on every start: existing rows are kept.

use anyhow::Context;
use storefront::{CategoryInput, Money, ProductInput, StorefrontError};
use tracing::{info, instrument};

use crate::state::AppState;

const CATEGORIES: &[(&str, &str)] = &[
  ("Electronics", "Gadgets and accessories."),
  ("Books", "Printed and bound."),
  ("Kitchen", "Cookware and tableware."),
];

// (name, category, price, stock)
const PRODUCTS: &[(&str, &str, &str, i64)] = &[
  ("USB-C Cable", "Electronics", "9.99", 120),
  ("Mechanical Keyboard", "Electronics", "89.00", 15),
  ("Noise Cancelling Headphones", "Electronics", "199.50", 4),
  ("The Rust Programming Language", "Books", "39.95", 30),
  ("Database Internals", "Books", "54.00", 0),
  ("Cast Iron Skillet", "Kitchen", "34.90", 25),
  ("Pour-over Coffee Set", "Kitchen", "27.50", 8),
];

#[instrument(name = "seed::seed_catalog", skip_all, err)]
pub async fn seed_catalog(state: &AppState) -> anyhow::Result<()> {
  let mut created = 0usize;

  for (name, description) in CATEGORIES {
    match state
      .catalog
      .create_category(CategoryInput {
        name: Some(name.to_string()),
        description: Some(description.to_string()),
      })
      .await
    {
      Ok(_) => created += 1,
      Err(StorefrontError::Conflict(_)) => {}
      Err(e) => return Err(e).with_context(|| format!("seeding category '{}'", name)),
    }
  }

  let categories = state.catalog.list_categories().await?;
  for (name, category_name, price, stock) in PRODUCTS {
    let category = categories
      .iter()
      .find(|c| c.name == *category_name)
      .with_context(|| format!("seed category '{}' is missing", category_name))?;
    let input = ProductInput {
      name: Some(name.to_string()),
      description: Some(format!("Sample {} product.", category_name.to_lowercase())),
      price: Some(price.parse::<Money>().with_context(|| format!("seed price '{}'", price))?),
      category: Some(category.id),
      stock_quantity: Some(*stock),
      image_url: None,
    };
    match state.catalog.create_product(input).await {
      Ok(_) => created += 1,
      Err(StorefrontError::Conflict(_)) => {}
      Err(e) => return Err(e).with_context(|| format!("seeding product '{}'", name)),
    }
  }

  info!(created, "Database seeding finished.");
  Ok(())
}
