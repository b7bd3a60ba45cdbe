//! Cart and quantity computation
//!
//! - [`quantity`]: resolves weight or nominal-amount input into a quantity
//! - [`Cart`]: terminal-local line items with price snapshots and totals

mod line_item;
mod manager;
pub mod quantity;

pub use line_item::CartLineItem;
pub use manager::{Cart, CartAction, StepDirection};
pub use quantity::{MAX_QUANTITY, QuantityInput, parse_amount, resolve, round_quantity};
