//! Quantity resolver
//!
//! Turns what the cashier typed into a line-item quantity for products sold
//! by weight. Counted products (`item`/`pcs`) never go through here: they are
//! added one unit per click and stepped in whole units by the cart.

use crate::error::{AppError, AppResult, ErrorCode};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Decimal places for resolved quantities
const QUANTITY_PLACES: u32 = 2;

/// Largest quantity one cart line may hold, in units or kg
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// What the cashier entered for a weight product
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityInput {
    /// Weight in kg
    Weight(Decimal),
    /// Amount of money the customer wants to spend
    Nominal(Decimal),
}

/// Round half away from zero to 2 decimal places
pub fn round_quantity(value: Decimal) -> Decimal {
    value
        .round_dp_with_strategy(QUANTITY_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// Resolve an input into a positive quantity for a product priced at
/// `unit_price` per kg.
pub fn resolve(unit_price: Decimal, input: QuantityInput) -> AppResult<Decimal> {
    let quantity = match input {
        QuantityInput::Weight(weight) => {
            if weight <= Decimal::ZERO {
                return Err(AppError::invalid_quantity("Weight must be greater than zero")
                    .with_detail("input", weight.to_string()));
            }
            round_quantity(weight)
        }
        QuantityInput::Nominal(nominal) => {
            if unit_price <= Decimal::ZERO {
                return Err(AppError::with_message(
                    ErrorCode::ProductInvalidPrice,
                    "Product price must be greater than zero to sell by amount",
                ));
            }
            if nominal <= Decimal::ZERO {
                return Err(AppError::invalid_quantity("Amount must be greater than zero")
                    .with_detail("input", nominal.to_string()));
            }
            let raw = nominal.checked_div(unit_price).ok_or_else(|| {
                AppError::invalid_quantity("Amount is out of range")
                    .with_detail("input", nominal.to_string())
            })?;
            round_quantity(raw)
        }
    };

    // 0.004 kg rounds to zero
    if quantity <= Decimal::ZERO {
        return Err(AppError::invalid_quantity("Quantity is too small"));
    }
    ensure_within_limit(quantity)
}

/// Reject a quantity above [`MAX_QUANTITY`]
pub fn ensure_within_limit(quantity: Decimal) -> AppResult<Decimal> {
    if quantity > MAX_QUANTITY {
        return Err(
            AppError::invalid_quantity(format!("Quantity cannot exceed {MAX_QUANTITY}"))
                .with_detail("input", quantity.to_string()),
        );
    }
    Ok(quantity)
}

/// Parse a typed amount.
///
/// Accepts digits with at most one decimal separator, `.` or `,`. Anything
/// else (letters, exponents, thousands grouping) is rejected.
pub fn parse_amount(raw: &str) -> AppResult<Decimal> {
    let trimmed = raw.trim();
    let invalid = || {
        AppError::with_message(ErrorCode::InvalidFormat, "Please enter a valid number")
            .with_detail("input", raw.to_string())
    };

    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(invalid());
    }

    let mut separators = 0;
    for c in digits.chars() {
        match c {
            '0'..='9' => {}
            '.' | ',' => separators += 1,
            _ => return Err(invalid()),
        }
    }
    if separators > 1 || !digits.chars().any(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    Decimal::from_str(&trimmed.replace(',', ".")).map_err(|_| invalid())
}
