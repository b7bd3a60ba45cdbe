//! Order Model

use crate::order::{OrderStatus, format_short_id, invoice_id_for};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order line as stored by the order service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub product_id: Uuid,
    pub product_name: String,
    /// Units, or kg for weight products
    pub quantity: Decimal,
    /// Price in currency unit
    pub price_at_purchase: Decimal,
    pub subtotal: Decimal,
}

/// Order entity (authoritative copy lives in the order service)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    /// Server-assigned sequence number, restarts every store day
    #[serde(default)]
    pub daily_id: u32,
    /// Formatted daily id (`#007`)
    #[serde(default)]
    pub short_id: String,
    #[serde(default)]
    pub invoice_id: String,
    #[serde(default)]
    pub status: OrderStatus,
    /// Total amount in currency unit
    pub total_amount: Decimal,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Fill identifiers the payload omitted, using the server's formatting rule
    pub fn fill_identifiers(&mut self, offset: FixedOffset) {
        if self.short_id.is_empty() {
            self.short_id = format_short_id(self.daily_id);
        }
        if self.invoice_id.is_empty() {
            self.invoice_id = invoice_id_for(self.daily_id, self.created_at, offset);
        }
    }
}

/// Order projection used by queue and list views
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSummary {
    pub id: Uuid,
    #[serde(default)]
    pub daily_id: u32,
    #[serde(default)]
    pub short_id: String,
    #[serde(default)]
    pub invoice_id: String,
    pub total_amount: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub item_count: u32,
    pub created_at: DateTime<Utc>,
}

impl OrderSummary {
    /// Fill identifiers the payload omitted, using the server's formatting rule
    pub fn fill_identifiers(&mut self, offset: FixedOffset) {
        if self.short_id.is_empty() {
            self.short_id = format_short_id(self.daily_id);
        }
        if self.invoice_id.is_empty() {
            self.invoice_id = invoice_id_for(self.daily_id, self.created_at, offset);
        }
    }
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            daily_id: order.daily_id,
            short_id: order.short_id.clone(),
            invoice_id: order.invoice_id.clone(),
            total_amount: order.total_amount,
            status: order.status,
            item_count: u32::try_from(order.items.len()).unwrap_or(u32::MAX),
            created_at: order.created_at,
        }
    }
}

/// One requested line in a create-order call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    /// Sent as a JSON number (units or kg)
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner_id: Option<Uuid>,
}

/// Pending queue response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingOrders {
    pub orders: Vec<OrderSummary>,
    #[serde(default)]
    pub total: u64,
}

/// Paginated order listing (paid queue, history)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPage {
    pub orders: Vec<OrderSummary>,
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default = "first_page")]
    pub total_pages: u32,
}

fn first_page() -> u32 {
    1
}

impl OrderPage {
    /// Number of pages for a result set, never less than one
    pub fn page_count(total: u64, page_size: u32) -> u32 {
        if total == 0 || page_size == 0 {
            return 1;
        }
        let pages = total.div_ceil(u64::from(page_size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }
}

/// Transaction history filter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryQuery {
    pub page: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    /// Matches invoice id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            status: None,
            date_from: None,
            date_to: None,
            search: None,
        }
    }
}

/// Payment confirmation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentReceipt {
    pub id: Uuid,
    pub short_id: String,
    #[serde(default)]
    pub invoice_id: String,
    pub status: OrderStatus,
    pub paid_at: DateTime<Utc>,
}

/// Cancellation confirmation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CancelReceipt {
    pub message: String,
    pub short_id: String,
}
