//! Cart manager
//!
//! In-memory, insertion-ordered collection of line items owned by a single
//! terminal. Pure: no I/O, no clocks, no async.

use super::line_item::CartLineItem;
use super::quantity::{self, QuantityInput};
use crate::error::{AppError, AppResult, ErrorCode};
use crate::models::{CreateOrderRequest, Product};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Highest unit price the cart accepts
const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Direction of a +/- stepper press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Up,
    Down,
}

/// Reducer action accepted by [`Cart::apply`]
#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    /// Add an explicit quantity (merged into an existing line)
    Add { product: Product, quantity: Decimal },
    /// One click on a counted product
    AddOne(Product),
    /// Weight product with a weight or nominal amount
    AddResolved { product: Product, input: QuantityInput },
    SetQuantity { product_id: Uuid, quantity: Decimal },
    Step { product_id: Uuid, direction: StepDirection },
    Remove(Uuid),
    Clear,
}

/// Terminal-local cart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartLineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, product_id: Uuid) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.product_id() == product_id)
    }

    fn position(&self, product_id: Uuid) -> Option<usize> {
        self.items.iter().position(|item| item.product_id() == product_id)
    }

    /// Add `quantity` of `product`.
    ///
    /// Quantities of a product already in the cart are summed and the line
    /// keeps the snapshot taken on the first add. Returns the line's new
    /// quantity.
    pub fn add(&mut self, product: &Product, quantity: Decimal) -> AppResult<Decimal> {
        ensure_sellable(product)?;
        let quantity = normalize_new_quantity(product, quantity)?;

        if let Some(line) = self.items.iter_mut().find(|i| i.product_id() == product.id) {
            let merged = line.quantity.checked_add(quantity).unwrap_or(Decimal::MAX);
            line.quantity = quantity::ensure_within_limit(merged)?;
            return Ok(line.quantity);
        }

        self.items.push(CartLineItem {
            product: product.clone(),
            quantity,
        });
        Ok(quantity)
    }

    /// One click on a counted product adds exactly one unit
    pub fn add_one(&mut self, product: &Product) -> AppResult<Decimal> {
        if !product.unit_type.is_counted() {
            return Err(AppError::validation(format!(
                "'{}' is sold by weight, enter a weight or amount",
                product.name
            )));
        }
        self.add(product, Decimal::ONE)
    }

    /// Add a weight product through the quantity resolver
    pub fn add_resolved(&mut self, product: &Product, input: QuantityInput) -> AppResult<Decimal> {
        if product.unit_type.is_counted() {
            return Err(AppError::validation(format!(
                "'{}' is sold per {}, add it by count",
                product.name, product.unit_type
            )));
        }
        ensure_sellable(product)?;
        let quantity = quantity::resolve(product.price, input)?;
        self.add(product, quantity)
    }

    /// Replace a line's quantity.
    ///
    /// The value is rounded per unit type first; a result of zero or less
    /// removes the line and returns `None`.
    pub fn set_quantity(&mut self, product_id: Uuid, quantity: Decimal) -> AppResult<Option<Decimal>> {
        let index = self
            .position(product_id)
            .ok_or_else(|| AppError::new(ErrorCode::CartItemNotFound))?;

        let unit = self.items[index].product.unit_type;
        let rounded = unit.round(quantity);
        if rounded <= Decimal::ZERO {
            self.items.remove(index);
            return Ok(None);
        }

        let rounded = quantity::ensure_within_limit(rounded)?;
        self.items[index].quantity = rounded;
        Ok(Some(rounded))
    }

    /// Step a line by one unit (counted) or 0.1 kg (weight)
    pub fn step(&mut self, product_id: Uuid, direction: StepDirection) -> AppResult<Option<Decimal>> {
        let line = self
            .get(product_id)
            .ok_or_else(|| AppError::new(ErrorCode::CartItemNotFound))?;

        let step = line.product.unit_type.step();
        let next = match direction {
            StepDirection::Up => line.quantity + step,
            StepDirection::Down => line.quantity - step,
        };
        self.set_quantity(product_id, next)
    }

    /// Remove a line; removing an absent product is a no-op
    pub fn remove(&mut self, product_id: Uuid) -> Option<CartLineItem> {
        let index = self.position(product_id)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Σ price_at_purchase × quantity over all lines
    pub fn total(&self) -> Decimal {
        self.items.iter().map(CartLineItem::subtotal).sum()
    }

    /// Build the create-order payload.
    pub fn to_request(&self) -> AppResult<CreateOrderRequest> {
        if self.is_empty() {
            return Err(AppError::empty_cart());
        }
        Ok(CreateOrderRequest {
            items: self.items.iter().map(CartLineItem::to_request).collect(),
            runner_id: None,
        })
    }

    /// Reducer entry point: apply one action atomically.
    ///
    /// On error the cart is left exactly as it was.
    pub fn apply(&mut self, action: CartAction) -> AppResult<()> {
        match action {
            CartAction::Add { product, quantity } => self.add(&product, quantity).map(|_| ()),
            CartAction::AddOne(product) => self.add_one(&product).map(|_| ()),
            CartAction::AddResolved { product, input } => {
                self.add_resolved(&product, input).map(|_| ())
            }
            CartAction::SetQuantity { product_id, quantity } => {
                self.set_quantity(product_id, quantity).map(|_| ())
            }
            CartAction::Step { product_id, direction } => {
                self.step(product_id, direction).map(|_| ())
            }
            CartAction::Remove(product_id) => {
                self.remove(product_id);
                Ok(())
            }
            CartAction::Clear => {
                self.clear();
                Ok(())
            }
        }
    }
}

fn ensure_sellable(product: &Product) -> AppResult<()> {
    if !product.is_active {
        return Err(AppError::with_message(
            ErrorCode::ProductInactive,
            format!("Product '{}' is not available", product.name),
        ));
    }
    if product.price < Decimal::ZERO || product.price > MAX_PRICE {
        return Err(AppError::new(ErrorCode::ProductInvalidPrice)
            .with_detail("product_id", product.id.to_string()));
    }
    Ok(())
}

fn normalize_new_quantity(product: &Product, quantity: Decimal) -> AppResult<Decimal> {
    if quantity <= Decimal::ZERO {
        return Err(AppError::invalid_quantity("Quantity must be greater than zero")
            .with_detail("input", quantity.to_string()));
    }
    if product.unit_type.is_counted() && !quantity.fract().is_zero() {
        return Err(AppError::invalid_quantity(format!(
            "'{}' is sold per {}, quantity must be a whole number",
            product.name, product.unit_type
        )));
    }
    let rounded = product.unit_type.round(quantity);
    if rounded <= Decimal::ZERO {
        return Err(AppError::invalid_quantity("Quantity is too small"));
    }
    quantity::ensure_within_limit(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UnitType;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn product(name: &str, price: &str, unit_type: UnitType) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: "Sembako".to_string(),
            price: dec(price),
            unit_type,
            stock: 100,
            barcode: None,
            image_url: None,
            is_active: true,
            created_at: None,
        }
    }

    #[test]
    fn test_weight_line_subtotal() {
        let beef = product("Daging Sapi", "20000", UnitType::Weight);
        let mut cart = Cart::new();
        cart.add_resolved(&beef, QuantityInput::Weight(dec("0.5"))).unwrap();

        assert_eq!(cart.items()[0].subtotal(), dec("10000"));
        assert_eq!(cart.total(), dec("10000"));
    }

    #[test]
    fn test_nominal_line_quantity() {
        let beef = product("Daging Sapi", "20000", UnitType::Weight);
        let mut cart = Cart::new();
        let q = cart
            .add_resolved(&beef, QuantityInput::Nominal(dec("15000")))
            .unwrap();
        assert_eq!(q, dec("0.75"));
        assert_eq!(cart.total(), dec("15000"));
    }

    #[test]
    fn test_add_merges_and_keeps_order() {
        let rice = product("Beras", "12000", UnitType::Item);
        let egg = product("Telur", "2500", UnitType::Pcs);
        let mut cart = Cart::new();

        cart.add_one(&rice).unwrap();
        cart.add_one(&egg).unwrap();
        cart.add(&rice, dec("2")).unwrap();

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.items()[0].product_id(), rice.id);
        assert_eq!(cart.items()[0].quantity, dec("3"));
        assert_eq!(cart.items()[1].product_id(), egg.id);
        assert_eq!(cart.total(), dec("38500"));
    }

    #[test]
    fn test_price_snapshot_survives_catalog_change() {
        let mut rice = product("Beras", "12000", UnitType::Item);
        let mut cart = Cart::new();
        cart.add_one(&rice).unwrap();

        // Catalog reprices mid-session, cashier adds again
        rice.price = dec("15000");
        cart.add_one(&rice).unwrap();

        let line = cart.get(rice.id).unwrap();
        assert_eq!(line.price_at_purchase(), dec("12000"));
        assert_eq!(cart.total(), dec("24000"));
    }

    #[test]
    fn test_total_is_sum_of_snapshot_subtotals() {
        let beef = product("Daging", "123456.78", UnitType::Weight);
        let rice = product("Beras", "9999.99", UnitType::Item);
        let mut cart = Cart::new();
        for w in ["0.25", "1.11", "0.37"] {
            cart.add(&beef, dec(w)).unwrap();
        }
        for _ in 0..4 {
            cart.add_one(&rice).unwrap();
        }
        let expected: Decimal = cart
            .items()
            .iter()
            .map(|l| (l.price_at_purchase() * l.quantity).round_dp(2))
            .sum();
        assert_eq!(cart.total(), expected);
        assert_eq!(cart.get(beef.id).unwrap().quantity, dec("1.73"));
    }

    #[test]
    fn test_counted_rejects_fractional_add() {
        let rice = product("Beras", "12000", UnitType::Item);
        let mut cart = Cart::new();
        let err = cart.add(&rice, dec("1.5")).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidQuantity);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_invalid_input_leaves_cart_unchanged() {
        let beef = product("Daging", "20000", UnitType::Weight);
        let mut cart = Cart::new();
        cart.add(&beef, dec("1")).unwrap();
        let before = cart.clone();

        assert!(cart.add_resolved(&beef, QuantityInput::Weight(dec("-1"))).is_err());
        assert!(cart.add_resolved(&beef, QuantityInput::Weight(Decimal::ZERO)).is_err());
        assert!(cart.add(&beef, dec("-3")).is_err());
        assert_eq!(cart, before);
    }

    #[test]
    fn test_oversized_quantity_leaves_cart_usable() {
        let beef = product("Daging", "20000", UnitType::Weight);
        let egg = product("Telur", "2500", UnitType::Pcs);
        let mut cart = Cart::new();

        let typed = quantity::parse_amount("99999999999999999999999999").unwrap();
        let err = cart.add_resolved(&beef, QuantityInput::Weight(typed)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidQuantity);
        assert!(cart.is_empty());

        cart.add(&egg, dec("6000")).unwrap();
        let err = cart.add(&egg, dec("6000")).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidQuantity);
        assert_eq!(cart.get(egg.id).unwrap().quantity, dec("6000"));
        assert!(cart.set_quantity(egg.id, dec("20000")).is_err());
        assert_eq!(cart.total(), dec("15000000"));

        let mut gold = product("Emas", "1", UnitType::Item);
        gold.price = Decimal::MAX;
        let err = cart.add_one(&gold).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductInvalidPrice);
    }

    #[test]
    fn test_inactive_product_rejected() {
        let mut rice = product("Beras", "12000", UnitType::Item);
        rice.is_active = false;
        let mut cart = Cart::new();
        let err = cart.add_one(&rice).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductInactive);
        assert_eq!(err.message, "Product 'Beras' is not available");
    }

    #[test]
    fn test_resolver_is_bypassed_for_counted_units() {
        let rice = product("Beras", "12000", UnitType::Item);
        let beef = product("Daging", "20000", UnitType::Weight);
        let mut cart = Cart::new();
        assert!(cart.add_resolved(&rice, QuantityInput::Weight(dec("1"))).is_err());
        assert!(cart.add_one(&beef).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_rounds_and_removes() {
        let rice = product("Beras", "12000", UnitType::Item);
        let beef = product("Daging", "20000", UnitType::Weight);
        let mut cart = Cart::new();
        cart.add_one(&rice).unwrap();
        cart.add(&beef, dec("1")).unwrap();

        assert_eq!(cart.set_quantity(rice.id, dec("2.6")).unwrap(), Some(dec("3")));
        assert_eq!(cart.set_quantity(beef.id, dec("0.456")).unwrap(), Some(dec("0.46")));

        assert_eq!(cart.set_quantity(rice.id, Decimal::ZERO).unwrap(), None);
        assert!(cart.get(rice.id).is_none());
        assert_eq!(cart.set_quantity(beef.id, dec("0.004")).unwrap(), None);
        assert!(cart.is_empty());

        let err = cart.set_quantity(beef.id, dec("1")).unwrap_err();
        assert_eq!(err.code, ErrorCode::CartItemNotFound);
    }

    #[test]
    fn test_weight_steps_do_not_drift() {
        let beef = product("Daging", "20000", UnitType::Weight);
        let mut cart = Cart::new();
        cart.add(&beef, dec("0.5")).unwrap();

        for _ in 0..7 {
            cart.step(beef.id, StepDirection::Up).unwrap();
        }
        for _ in 0..7 {
            cart.step(beef.id, StepDirection::Down).unwrap();
        }
        assert_eq!(cart.get(beef.id).unwrap().quantity, dec("0.5"));

        for _ in 0..5 {
            cart.step(beef.id, StepDirection::Down).unwrap();
        }
        assert!(cart.is_empty());
    }

    #[test]
    fn test_counted_step_removes_at_zero() {
        let egg = product("Telur", "2500", UnitType::Pcs);
        let mut cart = Cart::new();
        cart.add_one(&egg).unwrap();
        cart.step(egg.id, StepDirection::Up).unwrap();
        assert_eq!(cart.get(egg.id).unwrap().quantity, dec("2"));
        cart.step(egg.id, StepDirection::Down).unwrap();
        cart.step(egg.id, StepDirection::Down).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new();
        assert!(cart.remove(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_to_request() {
        let mut cart = Cart::new();
        assert_eq!(cart.to_request().unwrap_err().code, ErrorCode::CartEmpty);

        let rice = product("Beras", "12000", UnitType::Item);
        let beef = product("Daging", "20000", UnitType::Weight);
        cart.add(&rice, dec("2")).unwrap();
        cart.add(&beef, dec("0.75")).unwrap();

        let request = cart.to_request().unwrap();
        assert_eq!(request.items.len(), 2);
        assert_eq!(request.items[0].product_id, rice.id);
        assert_eq!(request.items[0].quantity, dec("2"));
        assert_eq!(request.items[1].quantity, dec("0.75"));
    }

    #[test]
    fn test_apply_reducer() {
        let rice = product("Beras", "12000", UnitType::Item);
        let beef = product("Daging", "20000", UnitType::Weight);
        let mut cart = Cart::new();

        cart.apply(CartAction::AddOne(rice.clone())).unwrap();
        cart.apply(CartAction::AddResolved {
            product: beef.clone(),
            input: QuantityInput::Nominal(dec("15000")),
        })
        .unwrap();
        cart.apply(CartAction::Step {
            product_id: rice.id,
            direction: StepDirection::Up,
        })
        .unwrap();
        assert_eq!(cart.total(), dec("39000"));

        cart.apply(CartAction::Remove(rice.id)).unwrap();
        assert_eq!(cart.len(), 1);

        cart.apply(CartAction::Clear).unwrap();
        assert!(cart.is_empty());
    }
}
