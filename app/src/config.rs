// app/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// `None` runs the server on the in-memory store.
  pub database_url: Option<String>,
  pub database_max_connections: u32,
  pub run_migrations: bool,
  pub seed_db: bool,

  /// Category assigned to products created without one.
  pub fallback_category: String,
  pub order_max_attempts: u32,
  pub session_ttl_hours: i64,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      database_url: None,
      database_max_connections: 10,
      run_migrations: true,
      seed_db: false,
      fallback_category: "Uncategorized".to_string(),
      order_max_attempts: storefront::engine::DEFAULT_MAX_ATTEMPTS,
      session_ttl_hours: 24,
    }
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let defaults = Self::default();
    let get_env = |var_name: &str| env::var(var_name).ok().filter(|v| !v.trim().is_empty());

    let config = Self {
      server_host: get_env("SERVER_HOST").unwrap_or(defaults.server_host),
      server_port: parse_env("SERVER_PORT", defaults.server_port)?,
      database_url: get_env("DATABASE_URL"),
      database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", defaults.database_max_connections)?,
      run_migrations: parse_env("RUN_MIGRATIONS", defaults.run_migrations)?,
      seed_db: parse_env("SEED_DB", defaults.seed_db)?,
      fallback_category: get_env("FALLBACK_CATEGORY").unwrap_or(defaults.fallback_category),
      order_max_attempts: parse_env("ORDER_MAX_ATTEMPTS", defaults.order_max_attempts)?,
      session_ttl_hours: parse_env("SESSION_TTL_HOURS", defaults.session_ttl_hours)?,
    };

    if config.order_max_attempts == 0 {
      return Err(AppError::Config("ORDER_MAX_ATTEMPTS must be at least 1".to_string()));
    }
    if config.session_ttl_hours <= 0 {
      return Err(AppError::Config("SESSION_TTL_HOURS must be positive".to_string()));
    }
    if config.database_max_connections == 0 {
      return Err(AppError::Config("DATABASE_MAX_CONNECTIONS must be at least 1".to_string()));
    }

    // Never log the database URL, it usually carries credentials.
    tracing::info!(
      host = %config.server_host,
      port = config.server_port,
      persistent = config.database_url.is_some(),
      "Application configuration loaded successfully."
    );
    Ok(config)
  }
}

fn parse_env<T>(var_name: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: Display,
{
  match env::var(var_name) {
    Ok(raw) if !raw.trim().is_empty() => raw
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", var_name, raw, e))),
    _ => Ok(default),
  }
}
