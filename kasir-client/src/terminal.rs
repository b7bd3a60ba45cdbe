//! Terminal session
//!
//! Everything one till needs, wired together: its cart, the scan flow,
//! submission, pay/cancel and the live pending queue. The cart belongs to
//! this terminal alone; the queue is a read-only copy of server state.

use crate::actions::{CancelConfirmation, OrderActions};
use crate::config::ClientConfig;
use crate::memory::InMemoryBackend;
use crate::push::{MemoryConnector, PushChannel, PushConnector, TcpConnector};
use crate::scanner::{ScanOutcome, Scanner};
use crate::service::{CatalogService, OrderService, PAID_PAGE_SIZE};
use crate::submit::OrderSubmitter;
use crate::sync::{PendingView, SyncHandle, Synchronizer};
use crate::ClientResult;
use rust_decimal::Decimal;
use shared::cart::{Cart, CartAction, QuantityInput};
use shared::models::{
    CancelReceipt, HistoryQuery, Order, OrderPage, PaymentReceipt, Product, ProductList,
    ProductQuery,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One POS terminal
pub struct Terminal {
    cart: Cart,
    catalog: Arc<dyn CatalogService>,
    orders: Arc<dyn OrderService>,
    scanner: Scanner,
    submitter: OrderSubmitter,
    actions: OrderActions,
    sync: SyncHandle,
    tasks: Vec<JoinHandle<()>>,
}

impl Terminal {
    /// Start a terminal on the given services.
    ///
    /// Spawns the synchronizer, and the push channel when a connector is
    /// given. Without one the queue relies on periodic snapshots alone.
    pub fn start<C>(
        catalog: Arc<dyn CatalogService>,
        orders: Arc<dyn OrderService>,
        connector: Option<C>,
        config: &ClientConfig,
    ) -> Self
    where
        C: PushConnector + 'static,
    {
        let cancel = CancellationToken::new();
        let (sync, sync_task) = Synchronizer::spawn(
            Arc::clone(&orders),
            config.sync.clone(),
            config.push.queue_capacity,
            cancel.clone(),
        );

        let mut tasks = vec![sync_task];
        match connector {
            Some(connector) => {
                let channel = PushChannel::new(connector, config.push.clone(), sync.sender(), cancel);
                tasks.push(channel.spawn());
            }
            None => tracing::info!("No push endpoint configured, using periodic refresh only"),
        }

        let offset = config.sync.invoice_offset;
        Self {
            cart: Cart::new(),
            scanner: Scanner::new(Arc::clone(&catalog)),
            submitter: OrderSubmitter::new(Arc::clone(&orders), offset).with_sync(sync.clone()),
            actions: OrderActions::new(Arc::clone(&orders)).with_sync(sync.clone()),
            catalog,
            orders,
            sync,
            tasks,
        }
    }

    /// Terminal on an in-process backend, fed by its push feed
    pub fn in_memory(backend: &InMemoryBackend, config: &ClientConfig) -> Self {
        let connector = MemoryConnector::new(backend.event_sender());
        Self::start(
            Arc::new(backend.clone()),
            Arc::new(backend.clone()),
            Some(connector),
            config,
        )
    }

    /// Terminal on the REST services, with TCP push if `push_addr` is set
    pub fn connect(config: &ClientConfig) -> ClientResult<Self> {
        let http = Arc::new(config.build_http_client()?);
        tracing::info!(base_url = %http.base_url(), push = ?config.push_addr, "Terminal connecting");
        let connector = config.push_addr.as_deref().map(TcpConnector::new);
        Ok(Self::start(http.clone(), http, connector, config))
    }

    // ========== Cart ==========

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn apply(&mut self, action: CartAction) -> ClientResult<()> {
        Ok(self.cart.apply(action)?)
    }

    pub async fn scan(&mut self, barcode: &str) -> ClientResult<ScanOutcome> {
        self.scanner.scan(barcode, &mut self.cart).await
    }

    /// Add a weight product by kg or by money amount
    pub fn add_weighed(&mut self, product: &Product, input: QuantityInput) -> ClientResult<Decimal> {
        Ok(self.cart.add_resolved(product, input)?)
    }

    pub async fn search_products(&self, query: &ProductQuery) -> ClientResult<ProductList> {
        self.catalog.list_products(query).await
    }

    // ========== Orders ==========

    /// Submit the cart; it is cleared only if the order was created
    pub async fn submit(&mut self) -> ClientResult<Order> {
        self.submitter.submit_and_clear(&mut self.cart).await
    }

    pub fn is_submitting(&self) -> bool {
        self.submitter.is_in_flight()
    }

    pub async fn pay(&self, order_id: Uuid) -> ClientResult<PaymentReceipt> {
        self.actions.pay(order_id).await
    }

    pub async fn cancel(&self, confirmation: CancelConfirmation) -> ClientResult<CancelReceipt> {
        self.actions.cancel(confirmation).await
    }

    pub async fn order(&self, order_id: Uuid) -> ClientResult<Order> {
        self.orders.get(order_id).await
    }

    /// Paid orders, newest first
    pub async fn paid(&self, page: u32) -> ClientResult<OrderPage> {
        self.orders.get_paid(page, PAID_PAGE_SIZE).await
    }

    pub async fn history(&self, query: &HistoryQuery) -> ClientResult<OrderPage> {
        self.orders.get_history(query).await
    }

    // ========== Pending queue ==========

    pub fn pending(&self) -> PendingView {
        self.sync.view()
    }

    pub fn sync(&self) -> &SyncHandle {
        &self.sync
    }

    /// Stop background tasks and wait for them
    pub async fn shutdown(self) {
        self.sync.shutdown();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Terminal task ended abnormally");
            }
        }
        tracing::info!("Terminal stopped");
    }
}
