//! Cart line item

use crate::models::{OrderItemRequest, Product};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One product in the cart with its quantity.
///
/// Holds the product exactly as it was when first added, so the price
/// charged never follows later catalog edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub product: Product,
    pub quantity: Decimal,
}

impl CartLineItem {
    pub fn product_id(&self) -> Uuid {
        self.product.id
    }

    /// Price captured at add time
    pub fn price_at_purchase(&self) -> Decimal {
        self.product.price
    }

    /// price × quantity, rounded to cents
    pub fn subtotal(&self) -> Decimal {
        (self.product.price * self.quantity)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    pub fn to_request(&self) -> OrderItemRequest {
        OrderItemRequest {
            product_id: self.product.id,
            quantity: self.quantity,
        }
    }
}
