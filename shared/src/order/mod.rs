//! Order lifecycle module
//!
//! - `lifecycle`: status model and the PENDING → PAID | CANCELLED transitions
//! - `ids`: short id and invoice id formatting shared with the backend

pub mod ids;
pub mod lifecycle;

// Re-exports
pub use ids::{format_invoice_id, format_short_id, invoice_id_for, store_date};
pub use lifecycle::{OrderAction, OrderStatus, Transition, UnknownStatus};
