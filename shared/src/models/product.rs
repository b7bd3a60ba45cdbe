//! Product Model

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Pricing basis of a product
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    /// Priced per item, counted in whole units
    #[default]
    Item,
    /// Priced per kilogram
    Weight,
    /// Priced per piece, counted in whole units
    Pcs,
}

impl UnitType {
    /// Whether quantities of this unit are whole numbers
    pub const fn is_counted(&self) -> bool {
        matches!(self, UnitType::Item | UnitType::Pcs)
    }

    /// Decimal places a quantity of this unit is rounded to
    pub const fn scale(&self) -> u32 {
        if self.is_counted() { 0 } else { 2 }
    }

    /// Increment used by the +/- stepper
    pub fn step(&self) -> Decimal {
        if self.is_counted() {
            Decimal::ONE
        } else {
            Decimal::new(1, 1)
        }
    }

    /// Round a quantity to this unit's precision, half away from zero
    pub fn round(&self, quantity: Decimal) -> Decimal {
        quantity
            .round_dp_with_strategy(self.scale(), RoundingStrategy::MidpointAwayFromZero)
            .normalize()
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitType::Item => write!(f, "item"),
            UnitType::Weight => write!(f, "weight"),
            UnitType::Pcs => write!(f, "pcs"),
        }
    }
}

/// Product entity as served by the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    /// Unit price in currency unit (per item, per kg, or per piece)
    pub price: Decimal,
    #[serde(default)]
    pub unit_type: UnitType,
    #[serde(default)]
    pub stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

/// Catalog listing filter
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Matches name or barcode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl ProductQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }
}

/// Catalog listing response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductList {
    pub products: Vec<Product>,
    pub total: u64,
}
