// core/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
  pub id: i64,
  pub username: String,
  pub email: String,
  #[serde(skip_serializing)] // Never send password hash to client
  pub password_hash: String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
  pub username: String,
  pub email: String,
  pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct UserChanges {
  pub username: String,
  pub email: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct Session {
  pub token: Uuid,
  pub user_id: i64,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

impl Session {
  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    self.expires_at <= now
  }
}

/// An authenticated caller. Every order operation takes one explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
  pub user_id: i64,
  pub username: String,
}

impl Identity {
  pub fn new(user_id: i64, username: impl Into<String>) -> Self {
    Self {
      user_id,
      username: username.into(),
    }
  }
}

impl From<&User> for Identity {
  fn from(user: &User) -> Self {
    Identity::new(user.id, user.username.clone())
  }
}
