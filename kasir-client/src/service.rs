//! Service seams
//!
//! The terminal talks to the catalog and order services only through these
//! traits. [`crate::HttpClient`] implements them over REST and
//! [`crate::InMemoryBackend`] implements them in-process.

use crate::ClientResult;
use async_trait::async_trait;
use shared::models::{
    CancelReceipt, CreateOrderRequest, HistoryQuery, Order, OrderPage, PaymentReceipt,
    PendingOrders, Product, ProductList, ProductQuery,
};
use uuid::Uuid;

/// Default page size of the paid orders listing
pub const PAID_PAGE_SIZE: u32 = 6;

/// Product catalog
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// List active products matching the filter
    async fn list_products(&self, query: &ProductQuery) -> ClientResult<ProductList>;

    /// Resolve a barcode; a miss is [`crate::ClientError::NotFound`]
    async fn get_by_barcode(&self, code: &str) -> ClientResult<Product>;
}

/// Order service, the single arbiter of order status
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Create a PENDING order. Not idempotent.
    async fn create(&self, request: &CreateOrderRequest) -> ClientResult<Order>;

    async fn get(&self, id: Uuid) -> ClientResult<Order>;

    /// All PENDING orders, oldest first
    async fn get_pending(&self) -> ClientResult<PendingOrders>;

    /// PAID orders, newest first
    async fn get_paid(&self, page: u32, page_size: u32) -> ClientResult<OrderPage>;

    /// PENDING → PAID
    async fn pay(&self, id: Uuid) -> ClientResult<PaymentReceipt>;

    /// PENDING → CANCELLED
    async fn cancel(&self, id: Uuid) -> ClientResult<CancelReceipt>;

    async fn get_history(&self, query: &HistoryQuery) -> ClientResult<OrderPage>;
}
