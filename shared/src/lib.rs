//! Shared types for the Kasir terminal core
//!
//! Pure domain logic used by the terminal client: catalog and order models,
//! the cart and quantity resolver, the order lifecycle transition table,
//! push channel wire types and the error taxonomy. No I/O and no async.

pub mod cart;
pub mod error;
pub mod message;
pub mod models;
pub mod order;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use cart::{Cart, CartAction, CartLineItem, QuantityInput, StepDirection};
pub use error::{AppError, AppResult, ErrorCode};
pub use message::{ChangeEvent, ChangeKind, OrderRecord};
pub use order::{OrderAction, OrderStatus, Transition};
