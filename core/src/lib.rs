// core/src/lib.rs

//! Storefront core: catalog records and an order engine that keeps stock consistent.
//!
//!  - [`OrderEngine`] places orders atomically: stock check, stock decrement and order insert
//!    happen under one product row lock, so stock never goes negative under concurrency.
//!  - [`CatalogService`] validates catalog edits and applies the deletion policy.
//!  - [`store`] defines the persistence seams with in-memory and PostgreSQL implementations.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod models;
pub mod money;
pub mod store;

// --- Re-exports for the Public API ---

pub use crate::catalog::CatalogService;
pub use crate::engine::OrderEngine;
pub use crate::error::{StorefrontError, StorefrontResult};
pub use crate::models::{
  Category, CategoryInput, Identity, NewUser, Order, Product, ProductFilter, ProductInput, Session, User,
  UserChanges,
};
pub use crate::money::Money;
pub use crate::store::{MemoryStore, PgStore, Store};
