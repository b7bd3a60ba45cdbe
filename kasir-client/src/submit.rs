//! Order submission pipeline
//!
//! One user press, one create call. The service is not idempotent, so a
//! failed submission is never retried here and a second press while the
//! first is in flight is refused locally.

use crate::service::OrderService;
use crate::sync::{SyncHandle, SyncInput};
use crate::{ClientError, ClientResult};
use chrono::FixedOffset;
use shared::cart::Cart;
use shared::models::Order;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Clears the in-flight flag when the submission ends, however it ends
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> ClientResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| ClientError::SubmissionInFlight)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Submits carts to the order service
#[derive(Clone)]
pub struct OrderSubmitter {
    orders: Arc<dyn OrderService>,
    sync: Option<SyncHandle>,
    in_flight: Arc<AtomicBool>,
    offset: FixedOffset,
}

impl OrderSubmitter {
    pub fn new(orders: Arc<dyn OrderService>, offset: FixedOffset) -> Self {
        Self {
            orders,
            sync: None,
            in_flight: Arc::new(AtomicBool::new(false)),
            offset,
        }
    }

    /// Report created orders to a synchronizer
    pub fn with_sync(mut self, sync: SyncHandle) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Whether the submit control should be disabled
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Create an order from the cart.
    ///
    /// The cart is only read. Errors from the service are returned verbatim.
    pub async fn submit(&self, cart: &Cart) -> ClientResult<Order> {
        let request = cart.to_request()?;
        let _guard = InFlight::acquire(&self.in_flight)?;

        tracing::debug!(lines = request.items.len(), "Submitting order");
        let mut order = match self.orders.create(&request).await {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!(error = %e, retryable = e.is_retryable(), "Order submission failed");
                return Err(e);
            }
        };
        order.fill_identifiers(self.offset);

        tracing::info!(
            order_id = %order.id,
            short_id = %order.short_id,
            total = %order.total_amount,
            "Order submitted"
        );
        if let Some(sync) = &self.sync {
            sync.notify(SyncInput::Created(order.clone())).await;
        }
        Ok(order)
    }

    /// Submit and clear the cart, only once the service confirmed the order
    pub async fn submit_and_clear(&self, cart: &mut Cart) -> ClientResult<Order> {
        let order = self.submit(cart).await?;
        cart.clear();
        Ok(order)
    }
}
