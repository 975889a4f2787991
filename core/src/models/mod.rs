// core/src/models/mod.rs

//! Records owned by the stores, plus the validated drafts the services hand to them.

pub mod category;
pub mod order;
pub mod product;
pub mod user;

pub use category::{Category, CategoryInput};
pub use order::{NewOrder, Order};
pub use product::{Product, ProductDraft, ProductFilter, ProductInput};
pub use user::{Identity, NewUser, Session, User, UserChanges};
