//! Data models
//!
//! Shared between the terminal core and the backend services (via JSON).
//! All ids are UUIDs; all money and quantities are `Decimal`.

pub mod order;
pub mod product;

// Re-exports
pub use order::*;
pub use product::*;
