//! Pay and cancel
//!
//! The order service decides every transition. When a call fails the
//! terminal fetches the order once to learn what actually happened: a lost
//! response may hide a win, and a conflict means another terminal got there
//! first. Whatever is learned goes to the synchronizer so the queue stops
//! showing an order that is no longer pending.

use crate::service::OrderService;
use crate::sync::{SyncHandle, SyncInput};
use crate::{ClientError, ClientResult};
use chrono::Utc;
use shared::models::{CancelReceipt, Order, PaymentReceipt};
use shared::order::{OrderAction, OrderStatus};
use std::sync::Arc;
use uuid::Uuid;

/// Proof that the operator confirmed a cancellation
///
/// Cancelling is destructive, so the only way to reach
/// [`OrderActions::cancel`] is through a value built after the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelConfirmation {
    order_id: Uuid,
}

impl CancelConfirmation {
    /// Record that the operator answered yes for this order
    pub fn confirmed(order_id: Uuid) -> Self {
        Self { order_id }
    }

    pub fn order_id(&self) -> Uuid {
        self.order_id
    }
}

/// What a failed action turned out to be
enum Recovery {
    /// Our action was applied; only the response was lost
    Won(Order),
    /// Someone else finalized the order first
    Lost(Order),
    /// Still pending, or unknown; keep the original error
    Unresolved,
}

/// Lifecycle actions against the order service
#[derive(Clone)]
pub struct OrderActions {
    orders: Arc<dyn OrderService>,
    sync: Option<SyncHandle>,
}

impl OrderActions {
    pub fn new(orders: Arc<dyn OrderService>) -> Self {
        Self { orders, sync: None }
    }

    pub fn with_sync(mut self, sync: SyncHandle) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Mark a pending order as paid
    pub async fn pay(&self, id: Uuid) -> ClientResult<PaymentReceipt> {
        match self.orders.pay(id).await {
            Ok(receipt) => {
                tracing::info!(order_id = %id, short_id = %receipt.short_id, "Order paid");
                self.notify(SyncInput::Finalized(id)).await;
                Ok(receipt)
            }
            Err(e) => match self.recover(id, OrderAction::Pay, &e).await {
                Recovery::Won(order) => {
                    tracing::info!(order_id = %id, "Payment applied despite failed response");
                    Ok(PaymentReceipt {
                        id: order.id,
                        short_id: order.short_id,
                        invoice_id: order.invoice_id,
                        status: order.status,
                        paid_at: order.updated_at.unwrap_or_else(Utc::now),
                    })
                }
                Recovery::Lost(order) => Err(conflict(&order, e)),
                Recovery::Unresolved => Err(e),
            },
        }
    }

    /// Cancel a pending order after the operator confirmed it
    pub async fn cancel(&self, confirmation: CancelConfirmation) -> ClientResult<CancelReceipt> {
        let id = confirmation.order_id();
        match self.orders.cancel(id).await {
            Ok(receipt) => {
                tracing::info!(order_id = %id, short_id = %receipt.short_id, "Order cancelled");
                self.notify(SyncInput::Finalized(id)).await;
                Ok(receipt)
            }
            Err(e) => match self.recover(id, OrderAction::Cancel, &e).await {
                Recovery::Won(order) => {
                    tracing::info!(order_id = %id, "Cancellation applied despite failed response");
                    Ok(CancelReceipt {
                        message: "Order cancelled".to_string(),
                        short_id: order.short_id,
                    })
                }
                Recovery::Lost(order) => Err(conflict(&order, e)),
                Recovery::Unresolved => Err(e),
            },
        }
    }

    /// Fetch the authoritative order after a failed action
    async fn recover(&self, id: Uuid, action: OrderAction, cause: &ClientError) -> Recovery {
        tracing::warn!(order_id = %id, %action, error = %cause, "Order action failed, checking order");

        let order = match self.orders.get(id).await {
            Ok(order) => order,
            Err(ClientError::NotFound(_)) => {
                self.notify(SyncInput::Gone(id)).await;
                return Recovery::Unresolved;
            }
            Err(e) => {
                tracing::warn!(order_id = %id, error = %e, "Order check failed");
                self.notify(SyncInput::Resync).await;
                return Recovery::Unresolved;
            }
        };

        self.notify(SyncInput::Reconciled(order.clone())).await;
        match order.status {
            OrderStatus::Pending => Recovery::Unresolved,
            // A refusal means our request was not applied, whoever finalized it
            status if status == action.target() && response_lost(cause) => Recovery::Won(order),
            _ => {
                tracing::info!(order_id = %id, status = %order.status, "Order already finalized elsewhere");
                self.notify(SyncInput::Resync).await;
                Recovery::Lost(order)
            }
        }
    }

    async fn notify(&self, input: SyncInput) {
        if let Some(sync) = &self.sync {
            sync.notify(input).await;
        }
    }
}

/// The request may have been applied even though no usable answer came back
fn response_lost(cause: &ClientError) -> bool {
    matches!(
        cause,
        ClientError::TransientNetwork(_) | ClientError::InvalidResponse(_)
    )
}

/// Conflict carrying the service's message when it sent one
fn conflict(order: &Order, cause: ClientError) -> ClientError {
    let message = match cause {
        ClientError::Conflict { message, .. } | ClientError::Rejected { message, .. } => message,
        _ => format!("Order is already {}", order.status),
    };
    ClientError::Conflict {
        order_id: order.id,
        status: order.status,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Fault, InMemoryBackend, Operation};
    use rust_decimal::Decimal;
    use shared::models::{CreateOrderRequest, OrderItemRequest, Product, UnitType};

    async fn backend_with_order() -> (InMemoryBackend, Uuid) {
        let backend = InMemoryBackend::default();
        let product = Product {
            id: Uuid::new_v4(),
            name: "Teh Botol".to_string(),
            category: "Minuman".to_string(),
            price: Decimal::from(5000),
            unit_type: UnitType::Pcs,
            stock: 24,
            barcode: None,
            image_url: None,
            is_active: true,
            created_at: None,
        };
        backend.upsert_product(product.clone());
        let order = backend
            .create(&CreateOrderRequest {
                items: vec![OrderItemRequest {
                    product_id: product.id,
                    quantity: Decimal::ONE,
                }],
                runner_id: None,
            })
            .await
            .unwrap();
        (backend, order.id)
    }

    #[tokio::test]
    async fn test_pay_pending_order() {
        let (backend, id) = backend_with_order().await;
        let actions = OrderActions::new(Arc::new(backend.clone()));

        let receipt = actions.pay(id).await.unwrap();
        assert_eq!(receipt.status, OrderStatus::Paid);
        assert_eq!(backend.status_of(id), Some(OrderStatus::Paid));
    }

    #[tokio::test]
    async fn test_cancel_after_pay_conflicts_with_server_message() {
        let (backend, id) = backend_with_order().await;
        let actions = OrderActions::new(Arc::new(backend.clone()));
        actions.pay(id).await.unwrap();

        let err = actions
            .cancel(CancelConfirmation::confirmed(id))
            .await
            .unwrap_err();
        match err {
            ClientError::Conflict { status, message, .. } => {
                assert_eq!(status, OrderStatus::Paid);
                assert_eq!(message, "Only pending orders can be cancelled");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(backend.status_of(id), Some(OrderStatus::Paid));
    }

    #[tokio::test]
    async fn test_lost_pay_response_is_recovered() {
        let (backend, id) = backend_with_order().await;
        backend.inject(Operation::Pay, Fault::ResponseLost);
        let actions = OrderActions::new(Arc::new(backend.clone()));

        let receipt = actions.pay(id).await.unwrap();
        assert_eq!(receipt.id, id);
        assert_eq!(receipt.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_cancel_receipt_message() {
        let (backend, id) = backend_with_order().await;
        let actions = OrderActions::new(Arc::new(backend.clone()));
        let receipt = actions.cancel(CancelConfirmation::confirmed(id)).await.unwrap();
        assert_eq!(receipt.message, "Order cancelled");

        let (backend, id) = backend_with_order().await;
        backend.inject(Operation::Cancel, Fault::ResponseLost);
        let actions = OrderActions::new(Arc::new(backend.clone()));
        let receipt = actions.cancel(CancelConfirmation::confirmed(id)).await.unwrap();
        assert_eq!(receipt.message, "Order cancelled");
        assert_eq!(backend.status_of(id), Some(OrderStatus::Cancelled));
    }

    #[tokio::test]
    async fn test_unreachable_service_keeps_original_error() {
        let (backend, id) = backend_with_order().await;
        backend.inject(Operation::Cancel, Fault::Unreachable);
        let actions = OrderActions::new(Arc::new(backend.clone()));

        let err = actions
            .cancel(CancelConfirmation::confirmed(id))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(backend.status_of(id), Some(OrderStatus::Pending));
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let backend = InMemoryBackend::default();
        let actions = OrderActions::new(Arc::new(backend));
        let err = actions.pay(Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
