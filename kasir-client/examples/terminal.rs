//! Two terminals on one in-process backend
//!
//! Terminal A scans and weighs a cart and submits it; terminal B sees the
//! order appear in its pending queue and takes the payment. A late cancel
//! from A then loses the race.
//!
//! Run: cargo run -p kasir-client --example terminal

use kasir_client::{
    CancelConfirmation, ClientConfig, InMemoryBackend, Product, QuantityInput, ScanOutcome,
    Terminal,
};
use rust_decimal::Decimal;
use shared::models::UnitType;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

fn product(name: &str, price: i64, unit_type: UnitType, barcode: &str) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        category: "Demo".to_string(),
        price: Decimal::from(price),
        unit_type,
        stock: 100,
        barcode: Some(barcode.to_string()),
        image_url: None,
        is_active: true,
        created_at: None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,kasir_client=debug")),
        )
        .init();

    let backend = InMemoryBackend::default();
    backend.upsert_product(product("Indomie Goreng", 3500, UnitType::Pcs, "8998866200301"));
    backend.upsert_product(product("Daging Sapi", 120000, UnitType::Weight, "2100001"));

    let config = ClientConfig::from_env()?;
    let mut till_a = Terminal::in_memory(&backend, &config);
    let till_b = Terminal::in_memory(&backend, &config);

    for code in ["8998866200301", "8998866200301", "2100001"] {
        match till_a.scan(code).await? {
            ScanOutcome::Added { product, quantity } => {
                println!("+ {} x{}", product.name, quantity);
            }
            ScanOutcome::NeedsQuantity(product) => {
                let quantity = till_a.add_weighed(&product, QuantityInput::Nominal(Decimal::from(50000)))?;
                println!("+ {} {} kg (Rp 50000)", product.name, quantity);
            }
            ScanOutcome::Unknown { code } => println!("? unknown barcode {code}"),
        }
    }
    println!("Cart total: Rp {}", till_a.cart().total());

    let order = till_a.submit().await?;
    println!("Submitted {} ({}) Rp {}", order.short_id, order.invoice_id, order.total_amount);

    let view = till_b
        .sync()
        .wait_for(Duration::from_secs(5), |v| v.contains(order.id))
        .await?;
    println!("Terminal B pending queue: {} order(s)", view.len());

    let receipt = till_b.pay(order.id).await?;
    println!("Terminal B paid {} at {}", receipt.short_id, receipt.paid_at);

    match till_a.cancel(CancelConfirmation::confirmed(order.id)).await {
        Ok(_) => println!("Terminal A cancelled (unexpected)"),
        Err(e) => println!("Terminal A cancel refused: {e}"),
    }

    till_a
        .sync()
        .wait_for(Duration::from_secs(5), |v| !v.contains(order.id))
        .await?;
    println!("Both queues empty: A={} B={}", till_a.pending().len(), till_b.pending().len());

    till_a.shutdown().await;
    till_b.shutdown().await;
    Ok(())
}
