//! Kasir Client - order and cart concurrency core for POS terminals
//!
//! Several terminals share one order service. Each keeps its own cart,
//! submits orders, pays or cancels them, and watches a pending queue kept
//! fresh by push events plus periodic snapshots.

pub mod actions;
pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod push;
pub mod scanner;
pub mod service;
pub mod submit;
pub mod sync;
pub mod terminal;

pub use actions::{CancelConfirmation, OrderActions};
pub use config::{ClientConfig, PushConfig, SyncConfig};
pub use error::{ClientError, ClientResult};
pub use http::HttpClient;
pub use memory::{Fault, InMemoryBackend, Operation};
pub use push::{MemoryConnector, PushChannel, PushConnector, PushError, TcpConnector};
pub use scanner::{ScanOutcome, Scanner, normalize_barcode};
pub use service::{CatalogService, OrderService, PAID_PAGE_SIZE};
pub use submit::OrderSubmitter;
pub use sync::{PendingView, SyncHandle, SyncInput, Synchronizer};
pub use terminal::Terminal;

// Re-export shared types for convenience
pub use shared::cart::{Cart, CartAction, QuantityInput, StepDirection};
pub use shared::models::{Order, OrderSummary, Product};
pub use shared::order::OrderStatus;
