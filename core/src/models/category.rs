// core/src/models/category.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Category {
  pub id: i64,
  pub name: String,
  pub description: String,
}

/// Client payload for creating or replacing a category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryInput {
  pub name: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
}
