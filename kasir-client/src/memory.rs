//! In-process catalog and order service
//!
//! Behaves like the REST backend: assigns daily sequence numbers, prices
//! orders from the live catalog, arbitrates pay/cancel races and publishes
//! every order mutation on a broadcast push feed. Several terminals sharing
//! one backend (clones share state) reproduce multi-terminal races without
//! a network.

use crate::service::{CatalogService, OrderService};
use crate::{ClientError, ClientResult};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use shared::message::{ChangeEvent, OrderRecord};
use shared::models::{
    CancelReceipt, CreateOrderRequest, HistoryQuery, Order, OrderItem, OrderPage, OrderSummary,
    PaymentReceipt, PendingOrders, Product, ProductList, ProductQuery,
};
use shared::order::{OrderAction, OrderStatus, Transition, format_short_id, invoice_id_for, store_date};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Service operations that faults and delays can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListProducts,
    BarcodeLookup,
    Create,
    Get,
    GetPending,
    Pay,
    Cancel,
}

/// Injected failure, consumed by the next call of its operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The request never reaches the service
    Unreachable,
    /// The service applies the request but the response is lost
    ResponseLost,
    /// The service refuses with this status and message
    Reject { status: u16, message: String },
}

#[derive(Debug, Default)]
struct BackendState {
    products: Vec<Product>,
    orders: HashMap<Uuid, Order>,
    paid_at: HashMap<Uuid, DateTime<Utc>>,
    counter_day: Option<NaiveDate>,
    last_daily_id: u32,
    faults: HashMap<Operation, VecDeque<Fault>>,
    delays: HashMap<Operation, Duration>,
    push_muted: bool,
}

/// In-memory backend; clones share the same state and push feed
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    state: Arc<Mutex<BackendState>>,
    events: broadcast::Sender<ChangeEvent>,
    offset: FixedOffset,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

impl InMemoryBackend {
    /// Create an empty backend whose store day follows `offset`
    pub fn new(offset: FixedOffset) -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            state: Arc::new(Mutex::new(BackendState::default())),
            events,
            offset,
        }
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Add or replace a catalog product
    pub fn upsert_product(&self, product: Product) {
        let mut state = self.state();
        match state.products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => state.products.push(product),
        }
    }

    /// Subscribe to the push feed
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    /// Sender side of the push feed
    pub fn event_sender(&self) -> broadcast::Sender<ChangeEvent> {
        self.events.clone()
    }

    /// Publish an arbitrary event (duplicates, stale replays)
    pub fn publish(&self, event: ChangeEvent) {
        if let Err(e) = self.events.send(event) {
            tracing::trace!("No push subscribers: {}", e);
        }
    }

    /// Stop or resume publishing mutations, simulating lost push events
    pub fn mute_push(&self, muted: bool) {
        self.state().push_muted = muted;
    }

    /// Fail the next call of `op`
    pub fn inject(&self, op: Operation, fault: Fault) {
        self.state().faults.entry(op).or_default().push_back(fault);
    }

    /// Delay every call of `op`
    pub fn set_delay(&self, op: Operation, delay: Duration) {
        self.state().delays.insert(op, delay);
    }

    /// Authoritative status of an order
    pub fn status_of(&self, id: Uuid) -> Option<OrderStatus> {
        self.state().orders.get(&id).map(|o| o.status)
    }

    pub fn order_count(&self) -> usize {
        self.state().orders.len()
    }

    /// Apply an injected fault or delay before the operation runs
    async fn enter(&self, op: Operation) -> ClientResult<Option<Fault>> {
        let delay = self.state().delays.get(&op).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let fault = self.state().faults.get_mut(&op).and_then(VecDeque::pop_front);
        match fault {
            Some(Fault::Unreachable) => Err(ClientError::TransientNetwork(format!(
                "{op:?}: connection refused"
            ))),
            Some(Fault::Reject { status, message }) => Err(ClientError::Rejected { status, message }),
            other => Ok(other),
        }
    }

    fn emit(&self, state: &BackendState, event: ChangeEvent) {
        if state.push_muted {
            tracing::debug!(event = %event.event, "Push muted, event dropped");
            return;
        }
        self.publish(event);
    }

    fn next_daily_id(&self, state: &mut BackendState, now: DateTime<Utc>) -> u32 {
        let today = store_date(now, self.offset);
        if state.counter_day != Some(today) {
            state.counter_day = Some(today);
            state.last_daily_id = 0;
        }
        state.last_daily_id += 1;
        state.last_daily_id
    }

    /// Run a pay/cancel transition through the arbiter
    fn transition(&self, id: Uuid, action: OrderAction) -> ClientResult<Order> {
        let mut state = self.state();
        let order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| ClientError::NotFound("Order not found".to_string()))?;

        match order.status.apply(action) {
            Transition::AlreadyFinal(status) => {
                let message = match action {
                    OrderAction::Pay => format!("Order is already {status}"),
                    OrderAction::Cancel => "Only pending orders can be cancelled".to_string(),
                };
                Err(ClientError::Conflict {
                    order_id: id,
                    status,
                    message,
                })
            }
            Transition::Applied { to, .. } => {
                let now = Utc::now();
                order.status = to;
                order.updated_at = Some(now);
                let order = order.clone();
                if to == OrderStatus::Paid {
                    state.paid_at.insert(id, now);
                }
                self.emit(&state, ChangeEvent::update(record_of(&order)));
                Ok(order)
            }
        }
    }

    fn page(mut orders: Vec<OrderSummary>, page: u32, page_size: u32) -> OrderPage {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let total = orders.len() as u64;
        let start = ((page - 1) as usize).saturating_mul(page_size as usize);
        let orders = if start >= orders.len() {
            Vec::new()
        } else {
            orders.drain(start..).take(page_size as usize).collect()
        };
        OrderPage {
            orders,
            total,
            page,
            page_size,
            total_pages: OrderPage::page_count(total, page_size),
        }
    }
}

/// Row image published for an order
fn record_of(order: &Order) -> OrderRecord {
    OrderRecord {
        id: order.id,
        daily_id: order.daily_id,
        total_amount: order.total_amount,
        status: order.status,
        created_at: Some(order.created_at),
        short_id: None,
        invoice_id: Some(order.invoice_id.clone()),
    }
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[async_trait]
impl CatalogService for InMemoryBackend {
    async fn list_products(&self, query: &ProductQuery) -> ClientResult<ProductList> {
        self.enter(Operation::ListProducts).await?;

        let search = query.search.as_deref().map(str::to_lowercase);
        let state = self.state();
        let mut products: Vec<Product> = state
            .products
            .iter()
            .filter(|p| p.is_active)
            .filter(|p| query.category.as_ref().is_none_or(|c| &p.category == c))
            .filter(|p| {
                search.as_ref().is_none_or(|s| {
                    p.name.to_lowercase().contains(s.as_str())
                        || p.barcode.as_deref() == Some(s.as_str())
                })
            })
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));

        let total = products.len() as u64;
        if let (Some(page), Some(size)) = (query.page, query.page_size) {
            let start = (page.max(1) as usize - 1).saturating_mul(size as usize);
            products = products.into_iter().skip(start).take(size as usize).collect();
        }
        Ok(ProductList { products, total })
    }

    async fn get_by_barcode(&self, code: &str) -> ClientResult<Product> {
        self.enter(Operation::BarcodeLookup).await?;

        let code = code.trim();
        self.state()
            .products
            .iter()
            .find(|p| p.barcode.as_deref() == Some(code))
            .cloned()
            .ok_or_else(|| ClientError::NotFound("Product not found".to_string()))
    }
}

#[async_trait]
impl OrderService for InMemoryBackend {
    async fn create(&self, request: &CreateOrderRequest) -> ClientResult<Order> {
        let fault = self.enter(Operation::Create).await?;

        let reject = |message: String| ClientError::Rejected { status: 400, message };
        if request.items.is_empty() {
            return Err(ClientError::Rejected {
                status: 422,
                message: "Order must contain at least one item".to_string(),
            });
        }

        let mut state = self.state();
        let mut items = Vec::with_capacity(request.items.len());
        let mut total_amount = Decimal::ZERO;
        for line in &request.items {
            let product = state
                .products
                .iter()
                .find(|p| p.id == line.product_id)
                .ok_or_else(|| reject(format!("Product {} not found", line.product_id)))?;
            if !product.is_active {
                return Err(reject(format!("Product '{}' is not available", product.name)));
            }
            if line.quantity <= Decimal::ZERO {
                return Err(ClientError::Rejected {
                    status: 422,
                    message: "Quantity must be greater than zero".to_string(),
                });
            }
            let subtotal = round_money(product.price * line.quantity);
            total_amount += subtotal;
            items.push(OrderItem {
                id: Some(Uuid::new_v4()),
                product_id: product.id,
                product_name: product.name.clone(),
                quantity: line.quantity,
                price_at_purchase: product.price,
                subtotal,
            });
        }

        let now = Utc::now();
        let daily_id = self.next_daily_id(&mut state, now);
        let order = Order {
            id: Uuid::new_v4(),
            daily_id,
            short_id: format_short_id(daily_id),
            invoice_id: invoice_id_for(daily_id, now, self.offset),
            status: OrderStatus::Pending,
            total_amount,
            items,
            created_at: now,
            updated_at: Some(now),
        };
        state.orders.insert(order.id, order.clone());
        self.emit(&state, ChangeEvent::insert(record_of(&order)));
        tracing::debug!(order_id = %order.id, short_id = %order.short_id, "Order created");

        match fault {
            Some(Fault::ResponseLost) => Err(ClientError::TransientNetwork(
                "Create: response lost".to_string(),
            )),
            _ => Ok(order),
        }
    }

    async fn get(&self, id: Uuid) -> ClientResult<Order> {
        self.enter(Operation::Get).await?;
        self.state()
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound("Order not found".to_string()))
    }

    async fn get_pending(&self) -> ClientResult<PendingOrders> {
        self.enter(Operation::GetPending).await?;

        let state = self.state();
        let mut orders: Vec<OrderSummary> = state
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::Pending)
            .map(OrderSummary::from)
            .collect();
        orders.sort_by_key(|o| o.created_at);
        let total = orders.len() as u64;
        Ok(PendingOrders { orders, total })
    }

    async fn get_paid(&self, page: u32, page_size: u32) -> ClientResult<OrderPage> {
        let (orders, paid_at) = {
            let state = self.state();
            let orders: Vec<Order> = state
                .orders
                .values()
                .filter(|o| o.status == OrderStatus::Paid)
                .cloned()
                .collect();
            (orders, state.paid_at.clone())
        };

        let mut orders = orders;
        orders.sort_by(|a, b| {
            let at = |o: &Order| paid_at.get(&o.id).copied().unwrap_or(o.created_at);
            at(b).cmp(&at(a))
        });
        let summaries = orders.iter().map(OrderSummary::from).collect();
        Ok(Self::page(summaries, page, page_size))
    }

    async fn pay(&self, id: Uuid) -> ClientResult<PaymentReceipt> {
        let fault = self.enter(Operation::Pay).await?;
        let order = self.transition(id, OrderAction::Pay)?;
        tracing::debug!(order_id = %id, "Order paid");

        if fault == Some(Fault::ResponseLost) {
            return Err(ClientError::TransientNetwork("Pay: response lost".to_string()));
        }
        Ok(PaymentReceipt {
            id: order.id,
            short_id: order.short_id,
            invoice_id: order.invoice_id,
            status: order.status,
            paid_at: order.updated_at.unwrap_or_else(Utc::now),
        })
    }

    async fn cancel(&self, id: Uuid) -> ClientResult<CancelReceipt> {
        let fault = self.enter(Operation::Cancel).await?;
        let order = self.transition(id, OrderAction::Cancel)?;
        tracing::debug!(order_id = %id, "Order cancelled");

        if fault == Some(Fault::ResponseLost) {
            return Err(ClientError::TransientNetwork("Cancel: response lost".to_string()));
        }
        Ok(CancelReceipt {
            message: "Order cancelled".to_string(),
            short_id: order.short_id,
        })
    }

    async fn get_history(&self, query: &HistoryQuery) -> ClientResult<OrderPage> {
        let search = query.search.as_deref().map(str::to_uppercase);
        let mut orders: Vec<Order> = self
            .state()
            .orders
            .values()
            .filter(|o| query.status.is_none_or(|s| o.status == s))
            .filter(|o| {
                let day = store_date(o.created_at, self.offset);
                query.date_from.is_none_or(|from| day >= from)
                    && query.date_to.is_none_or(|to| day <= to)
            })
            .filter(|o| {
                search
                    .as_ref()
                    .is_none_or(|s| o.invoice_id.to_uppercase().contains(s.as_str()))
            })
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let summaries = orders.iter().map(OrderSummary::from).collect();
        Ok(Self::page(summaries, query.page, query.page_size))
    }
}
