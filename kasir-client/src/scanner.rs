//! Barcode scan flow
//!
//! A counted product goes straight into the cart. A weight product needs an
//! amount first, so the scan hands it back for the quantity prompt.

use crate::service::CatalogService;
use crate::{ClientError, ClientResult};
use rust_decimal::Decimal;
use shared::cart::Cart;
use shared::error::{AppError, ErrorCode};
use shared::models::Product;
use std::sync::Arc;

const MIN_BARCODE_LEN: usize = 3;
const MAX_BARCODE_LEN: usize = 50;

/// Trim scanner input and check its length
pub fn normalize_barcode(raw: &str) -> ClientResult<&str> {
    let code = raw.trim();
    let len = code.chars().count();
    if !(MIN_BARCODE_LEN..=MAX_BARCODE_LEN).contains(&len) {
        return Err(AppError::with_message(
            ErrorCode::InvalidBarcode,
            format!("Barcode must be {MIN_BARCODE_LEN}-{MAX_BARCODE_LEN} characters"),
        )
        .into());
    }
    Ok(code)
}

/// Result of one scan
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Added to the cart; `quantity` is the line total afterwards
    Added { product: Product, quantity: Decimal },
    /// Weight product, ask for an amount then call `Cart::add_resolved`
    NeedsQuantity(Product),
    /// No product carries this barcode
    Unknown { code: String },
}

/// Resolves scanned barcodes against the catalog
#[derive(Clone)]
pub struct Scanner {
    catalog: Arc<dyn CatalogService>,
}

impl Scanner {
    pub fn new(catalog: Arc<dyn CatalogService>) -> Self {
        Self { catalog }
    }

    pub async fn scan(&self, raw: &str, cart: &mut Cart) -> ClientResult<ScanOutcome> {
        let code = normalize_barcode(raw)?;

        let product = match self.catalog.get_by_barcode(code).await {
            Ok(product) => product,
            Err(ClientError::NotFound(_)) => {
                tracing::debug!(barcode = code, "Barcode not in catalog");
                return Ok(ScanOutcome::Unknown {
                    code: code.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        if !product.unit_type.is_counted() {
            return Ok(ScanOutcome::NeedsQuantity(product));
        }

        let quantity = cart.add_one(&product)?;
        tracing::debug!(barcode = code, product = %product.name, %quantity, "Scanned into cart");
        Ok(ScanOutcome::Added { product, quantity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Fault, InMemoryBackend, Operation};
    use shared::cart::QuantityInput;
    use shared::models::UnitType;
    use uuid::Uuid;

    fn product(name: &str, barcode: &str, unit_type: UnitType) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: "Umum".to_string(),
            price: Decimal::from(20000),
            unit_type,
            stock: 5,
            barcode: Some(barcode.to_string()),
            image_url: None,
            is_active: true,
            created_at: None,
        }
    }

    fn scanner() -> (InMemoryBackend, Scanner) {
        let backend = InMemoryBackend::default();
        backend.upsert_product(product("Indomie", "8991002", UnitType::Pcs));
        backend.upsert_product(product("Daging Sapi", "2100001", UnitType::Weight));
        let scanner = Scanner::new(Arc::new(backend.clone()));
        (backend, scanner)
    }

    #[test]
    fn test_normalize_barcode() {
        assert_eq!(normalize_barcode("  8991002\n").unwrap(), "8991002");
        assert!(normalize_barcode("12").is_err());
        assert!(normalize_barcode(&"9".repeat(51)).is_err());
        assert_eq!(
            normalize_barcode("  ").unwrap_err().code(),
            ErrorCode::InvalidBarcode
        );
    }

    #[tokio::test]
    async fn test_counted_product_is_added() {
        let (_, scanner) = scanner();
        let mut cart = Cart::new();

        scanner.scan("8991002", &mut cart).await.unwrap();
        let outcome = scanner.scan("8991002 ", &mut cart).await.unwrap();

        match outcome {
            ScanOutcome::Added { quantity, .. } => assert_eq!(quantity, Decimal::from(2)),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(cart.len(), 1);
    }

    #[tokio::test]
    async fn test_weight_product_needs_quantity() {
        let (_, scanner) = scanner();
        let mut cart = Cart::new();

        let outcome = scanner.scan("2100001", &mut cart).await.unwrap();
        let ScanOutcome::NeedsQuantity(meat) = outcome else {
            panic!("expected quantity prompt");
        };
        assert!(cart.is_empty());

        cart.add_resolved(&meat, QuantityInput::Nominal(Decimal::from(10000)))
            .unwrap();
        assert_eq!(cart.total(), Decimal::from(10000));
    }

    #[tokio::test]
    async fn test_unknown_barcode() {
        let (_, scanner) = scanner();
        let mut cart = Cart::new();
        let outcome = scanner.scan("0000000", &mut cart).await.unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::Unknown {
                code: "0000000".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let (backend, scanner) = scanner();
        backend.inject(Operation::BarcodeLookup, Fault::Unreachable);
        let mut cart = Cart::new();
        let err = scanner.scan("8991002", &mut cart).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(cart.is_empty());
    }
}
