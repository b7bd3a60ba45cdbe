//! Pending queue reconciliation policy
//!
//! [`SyncState`] folds two uncoordinated streams into one cache of orders
//! believed PENDING: bulk snapshots from the order service and row-change
//! events from the push channel. It is pure and synchronous; the runtime
//! owns the clocks and the network.
//!
//! Rules:
//! - status is the only per-order fact that matters; sequence numbers and
//!   arrival order are ignored
//! - PAID, CANCELLED and deleted ids go into a bounded [`FinalizedLog`] and
//!   are never admitted again, whatever arrives later
//! - a snapshot replaces the cache; only entries provably newer than the
//!   snapshot survive it
//! - a PENDING row that the latest snapshot should have contained but did
//!   not is verified with a single-order fetch instead of trusted
//! - a verification answer older than the latest snapshot loses to it

use chrono::{DateTime, FixedOffset, Utc};
use shared::message::{ChangeEvent, ChangeKind};
use shared::models::{Order, OrderSummary};
use shared::order::OrderStatus;
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

/// Bounded FIFO of order ids known to have left PENDING
#[derive(Debug, Clone)]
pub struct FinalizedLog {
    ids: HashSet<Uuid>,
    order: VecDeque<Uuid>,
    capacity: usize,
}

impl FinalizedLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ids: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Remember `id`; returns false if it was already known
    pub fn record(&mut self, id: Uuid) -> bool {
        if !self.ids.insert(id) {
            return false;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.ids.remove(&evicted);
            }
        }
        true
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Effect of one input on the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    Inserted(Uuid),
    Updated(Uuid),
    Removed(Uuid),
    /// Already reflected; nothing changed
    Unchanged,
    /// PENDING row for a finalized id, dropped
    Suppressed(Uuid),
    /// PENDING row not trusted; fetch the order and feed the result back
    Verify(Uuid),
    /// Cache replaced by a snapshot
    Replaced { count: usize, verify: Vec<Uuid> },
    /// Snapshot issued before the one already applied
    StaleSnapshot,
    /// Not an order row
    Ignored,
}

impl Reconciled {
    /// Whether the visible cache changed
    pub fn changed(&self) -> bool {
        matches!(
            self,
            Reconciled::Inserted(_)
                | Reconciled::Updated(_)
                | Reconciled::Removed(_)
                | Reconciled::Replaced { .. }
        )
    }
}

/// The pending order cache and everything needed to keep it honest
#[derive(Debug, Clone)]
pub struct SyncState {
    pending: HashMap<Uuid, OrderSummary>,
    finalized: FinalizedLog,
    /// Ids present in the latest applied snapshot
    snapshot_ids: HashSet<Uuid>,
    /// Local time the latest applied snapshot was requested
    snapshot_issued_at: Option<DateTime<Utc>>,
    /// Local time the latest snapshot was applied
    snapshot_applied_at: Option<DateTime<Utc>>,
    verifying: HashSet<Uuid>,
    channel_connected: bool,
    offset: FixedOffset,
    skew: chrono::Duration,
}

impl SyncState {
    pub fn new(finalized_capacity: usize, skew: std::time::Duration, offset: FixedOffset) -> Self {
        Self {
            pending: HashMap::new(),
            finalized: FinalizedLog::new(finalized_capacity),
            snapshot_ids: HashSet::new(),
            snapshot_issued_at: None,
            snapshot_applied_at: None,
            verifying: HashSet::new(),
            channel_connected: false,
            offset,
            skew: chrono::Duration::from_std(skew).unwrap_or(chrono::Duration::zero()),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<&OrderSummary> {
        self.pending.get(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.pending.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_finalized(&self, id: &Uuid) -> bool {
        self.finalized.contains(id)
    }

    pub fn is_verifying(&self, id: &Uuid) -> bool {
        self.verifying.contains(id)
    }

    pub fn channel_connected(&self) -> bool {
        self.channel_connected
    }

    pub fn last_snapshot_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot_applied_at
    }

    /// Pending orders, oldest first
    pub fn orders(&self) -> Vec<OrderSummary> {
        let mut orders: Vec<OrderSummary> = self.pending.values().cloned().collect();
        orders.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.daily_id.cmp(&b.daily_id))
        });
        orders
    }

    /// Returns true if the flag flipped
    pub fn set_channel_connected(&mut self, connected: bool) -> bool {
        let flipped = self.channel_connected != connected;
        self.channel_connected = connected;
        flipped
    }

    /// Apply a push channel event
    pub fn apply_event(&mut self, event: &ChangeEvent, received_at: DateTime<Utc>) -> Reconciled {
        if !event.is_orders() {
            return Reconciled::Ignored;
        }

        if event.event == ChangeKind::Delete {
            return match event.order_id() {
                Some(id) => self.finalize(id),
                None => Reconciled::Ignored,
            };
        }

        let Some(record) = event.new.as_ref() else {
            tracing::debug!(event = %event.event, "Order event without row image ignored");
            return Reconciled::Ignored;
        };

        if record.status.is_terminal() {
            return self.finalize(record.id);
        }
        if self.finalized.contains(&record.id) {
            return Reconciled::Suppressed(record.id);
        }

        let trusted = self.pending.contains_key(&record.id) || !self.is_suspect(record.id, record.created_at);
        let mut summary = record.to_summary(self.offset, received_at);
        if let Some(existing) = self.pending.get(&record.id) {
            // No timestamp on the row: arrival time must not move a cached order
            if record.created_at.is_none() {
                summary.created_at = existing.created_at;
                if record.invoice_id.is_none() {
                    summary.invoice_id = existing.invoice_id.clone();
                }
            }
        }
        if trusted {
            self.admit(summary)
        } else {
            self.request_verification(record.id)
        }
    }

    /// Replace the cache with a bulk snapshot requested at `issued_at`
    pub fn replace_snapshot(
        &mut self,
        orders: Vec<OrderSummary>,
        issued_at: DateTime<Utc>,
        applied_at: DateTime<Utc>,
    ) -> Reconciled {
        if self.snapshot_issued_at.is_some_and(|prev| issued_at < prev) {
            return Reconciled::StaleSnapshot;
        }

        let mut next = HashMap::with_capacity(orders.len());
        for mut summary in orders {
            if summary.status.is_terminal() {
                self.finalized.record(summary.id);
                continue;
            }
            if self.finalized.contains(&summary.id) {
                tracing::debug!(order_id = %summary.id, "Finalized order in snapshot suppressed");
                continue;
            }
            summary.fill_identifiers(self.offset);
            next.insert(summary.id, summary);
        }
        let snapshot_ids: HashSet<Uuid> = next.keys().copied().collect();

        // Entries the snapshot could not have seen survive; entries close to
        // the snapshot boundary are dropped and verified
        let newer_than = issued_at + self.skew;
        let older_than = issued_at - self.skew;
        let mut verify = Vec::new();
        for (id, summary) in self.pending.drain() {
            if snapshot_ids.contains(&id) {
                continue;
            }
            if summary.created_at > newer_than {
                next.insert(id, summary);
            } else if summary.created_at > older_than && self.verifying.insert(id) {
                verify.push(id);
            }
        }

        self.pending = next;
        self.snapshot_ids = snapshot_ids;
        self.snapshot_issued_at = Some(issued_at);
        self.snapshot_applied_at = Some(applied_at);

        Reconciled::Replaced {
            count: self.pending.len(),
            verify,
        }
    }

    /// Apply the authoritative copy of one order (verification, reconciliation)
    pub fn apply_order(&mut self, order: &Order) -> Reconciled {
        self.verifying.remove(&order.id);
        if order.status.is_terminal() {
            return self.finalize(order.id);
        }
        let mut summary = OrderSummary::from(order);
        summary.fill_identifiers(self.offset);
        self.admit(summary)
    }

    /// Apply the answer to a verification fetch requested at `issued_at`.
    ///
    /// A PENDING answer is dropped when a snapshot requested after the fetch
    /// has been applied and left the order out.
    pub fn apply_verified(&mut self, order: &Order, issued_at: DateTime<Utc>) -> Reconciled {
        let superseded = self.snapshot_issued_at.is_some_and(|snapshot| snapshot > issued_at)
            && !self.snapshot_ids.contains(&order.id);
        if superseded && !order.status.is_terminal() {
            self.verifying.remove(&order.id);
            tracing::debug!(order_id = %order.id, "Verification older than snapshot discarded");
            return Reconciled::Unchanged;
        }
        self.apply_order(order)
    }

    /// A verification fetch failed; the next snapshot decides
    pub fn verification_failed(&mut self, id: Uuid) {
        self.verifying.remove(&id);
    }

    /// Order created by this terminal, confirmed by the service
    pub fn record_created(&mut self, order: &Order) -> Reconciled {
        self.apply_order(order)
    }

    /// Order left PENDING (paid, cancelled or deleted)
    pub fn finalize(&mut self, id: Uuid) -> Reconciled {
        self.verifying.remove(&id);
        self.finalized.record(id);
        match self.pending.remove(&id) {
            Some(_) => Reconciled::Removed(id),
            None => Reconciled::Unchanged,
        }
    }

    /// A PENDING row for an id absent from the latest snapshot is suspect
    /// unless it was created after the snapshot could have seen it
    fn is_suspect(&self, id: Uuid, created_at: Option<DateTime<Utc>>) -> bool {
        let Some(issued_at) = self.snapshot_issued_at else {
            return false;
        };
        if self.snapshot_ids.contains(&id) {
            return false;
        }
        match created_at {
            Some(created_at) => created_at <= issued_at + self.skew,
            None => true,
        }
    }

    fn request_verification(&mut self, id: Uuid) -> Reconciled {
        if self.verifying.insert(id) {
            Reconciled::Verify(id)
        } else {
            Reconciled::Unchanged
        }
    }

    fn admit(&mut self, mut summary: OrderSummary) -> Reconciled {
        let id = summary.id;
        if self.finalized.contains(&id) {
            return Reconciled::Suppressed(id);
        }
        match self.pending.get(&id) {
            Some(existing) => {
                // Row images carry no item count
                if summary.item_count == 0 {
                    summary.item_count = existing.item_count;
                }
                if *existing == summary {
                    Reconciled::Unchanged
                } else {
                    self.pending.insert(id, summary);
                    Reconciled::Updated(id)
                }
            }
            None => {
                self.pending.insert(id, summary);
                Reconciled::Inserted(id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use shared::message::OrderRecord;
    use std::time::Duration;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn state() -> SyncState {
        SyncState::new(512, Duration::from_secs(5), utc())
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 14, 9, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    fn record(id: Uuid, daily_id: u32, status: OrderStatus, created: i64) -> OrderRecord {
        OrderRecord {
            id,
            daily_id,
            total_amount: Decimal::from(10_000),
            status,
            created_at: Some(at(created)),
            short_id: None,
            invoice_id: None,
        }
    }

    fn summary(id: Uuid, daily_id: u32, created: i64) -> OrderSummary {
        record(id, daily_id, OrderStatus::Pending, created).to_summary(utc(), at(created))
    }

    fn pending_order(id: Uuid, daily_id: u32, created: i64) -> Order {
        Order {
            id,
            daily_id,
            short_id: String::new(),
            invoice_id: String::new(),
            status: OrderStatus::Pending,
            total_amount: Decimal::from(10_000),
            items: vec![],
            created_at: at(created),
            updated_at: None,
        }
    }

    #[test]
    fn test_insert_synthesizes_identifiers() {
        let mut s = state();
        let id = Uuid::new_v4();
        let out = s.apply_event(&ChangeEvent::insert(record(id, 7, OrderStatus::Pending, 0)), at(1));
        assert_eq!(out, Reconciled::Inserted(id));

        let cached = s.get(&id).unwrap();
        assert_eq!(cached.short_id, "#007");
        assert_eq!(cached.invoice_id, "INV-20250114-007");
    }

    #[test]
    fn test_update_to_terminal_removes_and_is_idempotent() {
        let mut s = state();
        let id = Uuid::new_v4();
        s.apply_event(&ChangeEvent::insert(record(id, 1, OrderStatus::Pending, 0)), at(0));

        let paid = ChangeEvent::update(record(id, 1, OrderStatus::Paid, 0));
        assert_eq!(s.apply_event(&paid, at(1)), Reconciled::Removed(id));
        let after_once = s.orders();
        assert_eq!(s.apply_event(&paid, at(2)), Reconciled::Unchanged);
        assert_eq!(s.orders(), after_once);
    }

    #[test]
    fn test_update_for_absent_id_is_noop() {
        let mut s = state();
        let id = Uuid::new_v4();
        let out = s.apply_event(&ChangeEvent::update(record(id, 1, OrderStatus::Cancelled, 0)), at(0));
        assert_eq!(out, Reconciled::Unchanged);
        assert!(s.is_finalized(&id));
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let mut s = state();
        let id = Uuid::new_v4();
        let insert = ChangeEvent::insert(record(id, 3, OrderStatus::Pending, 0));
        s.apply_event(&insert, at(0));
        assert_eq!(s.apply_event(&insert, at(1)), Reconciled::Unchanged);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_finalized_id_never_resurrects() {
        let mut s = state();
        let id = Uuid::new_v4();
        s.apply_event(&ChangeEvent::update(record(id, 4, OrderStatus::Paid, 0)), at(1));

        // Stale insert
        let out = s.apply_event(&ChangeEvent::insert(record(id, 4, OrderStatus::Pending, 0)), at(2));
        assert_eq!(out, Reconciled::Suppressed(id));

        // Stale snapshot still listing it
        s.replace_snapshot(vec![summary(id, 4, 0)], at(3), at(4));
        assert!(!s.contains(&id));

        // Stale single-order fetch
        let mut order = Order {
            id,
            daily_id: 4,
            short_id: String::new(),
            invoice_id: String::new(),
            status: OrderStatus::Pending,
            total_amount: Decimal::from(10_000),
            items: vec![],
            created_at: at(0),
            updated_at: None,
        };
        assert_eq!(s.apply_order(&order), Reconciled::Suppressed(id));
        order.status = OrderStatus::Paid;
        assert_eq!(s.apply_order(&order), Reconciled::Unchanged);
        assert!(!s.contains(&id));
    }

    #[test]
    fn test_snapshot_replaces_instead_of_merging() {
        let mut s = state();
        let kept = Uuid::new_v4();
        let dropped = Uuid::new_v4();
        s.apply_event(&ChangeEvent::insert(record(kept, 1, OrderStatus::Pending, 0)), at(0));
        s.apply_event(&ChangeEvent::insert(record(dropped, 2, OrderStatus::Pending, 0)), at(0));

        let fresh = Uuid::new_v4();
        let out = s.replace_snapshot(vec![summary(kept, 1, 0), summary(fresh, 3, 10)], at(60), at(61));
        assert_eq!(out, Reconciled::Replaced { count: 2, verify: vec![] });
        assert!(s.contains(&kept));
        assert!(s.contains(&fresh));
        assert!(!s.contains(&dropped));
        assert_eq!(s.last_snapshot_at(), Some(at(61)));
    }

    #[test]
    fn test_snapshot_keeps_orders_created_after_it_was_issued() {
        let mut s = state();
        let late = Uuid::new_v4();
        s.apply_event(&ChangeEvent::insert(record(late, 9, OrderStatus::Pending, 100)), at(100));

        let out = s.replace_snapshot(vec![], at(60), at(101));
        assert_eq!(out, Reconciled::Replaced { count: 1, verify: vec![] });
        assert!(s.contains(&late));
    }

    #[test]
    fn test_snapshot_boundary_entries_are_verified() {
        let mut s = state();
        let edge = Uuid::new_v4();
        s.apply_event(&ChangeEvent::insert(record(edge, 5, OrderStatus::Pending, 58)), at(58));

        let out = s.replace_snapshot(vec![], at(60), at(61));
        assert_eq!(out, Reconciled::Replaced { count: 0, verify: vec![edge] });
        assert!(s.is_verifying(&edge));
    }

    #[test]
    fn test_older_snapshot_is_discarded() {
        let mut s = state();
        let id = Uuid::new_v4();
        s.replace_snapshot(vec![], at(60), at(61));
        assert_eq!(s.replace_snapshot(vec![summary(id, 1, 0)], at(30), at(62)), Reconciled::StaleSnapshot);
        assert!(s.is_empty());
    }

    #[test]
    fn test_stale_insert_after_snapshot_is_verified() {
        // #7 was paid before the fetch; the fetch omitted it; the INSERT
        // arrives late and its UPDATE was lost
        let mut s = state();
        let seven = Uuid::new_v4();
        s.replace_snapshot(vec![], at(60), at(61));

        let stale = ChangeEvent::insert(record(seven, 7, OrderStatus::Pending, 10));
        assert_eq!(s.apply_event(&stale, at(62)), Reconciled::Verify(seven));
        assert!(!s.contains(&seven));
        // Duplicate while the fetch is in flight
        assert_eq!(s.apply_event(&stale, at(63)), Reconciled::Unchanged);

        let paid = Order {
            id: seven,
            daily_id: 7,
            short_id: "#007".into(),
            invoice_id: "INV-20250114-007".into(),
            status: OrderStatus::Paid,
            total_amount: Decimal::from(10_000),
            items: vec![],
            created_at: at(10),
            updated_at: Some(at(30)),
        };
        assert_eq!(s.apply_order(&paid), Reconciled::Unchanged);
        assert!(!s.contains(&seven));
        assert!(s.is_finalized(&seven));
    }

    #[test]
    fn test_verification_older_than_snapshot_is_discarded() {
        // Verification issued at 62; the order is paid elsewhere and the
        // UPDATE is lost; the 64 snapshot omits it; the PENDING answer lands
        let mut s = state();
        let seven = Uuid::new_v4();
        s.replace_snapshot(vec![], at(60), at(61));
        let stale = ChangeEvent::insert(record(seven, 7, OrderStatus::Pending, 10));
        assert_eq!(s.apply_event(&stale, at(62)), Reconciled::Verify(seven));

        s.replace_snapshot(vec![], at(64), at(65));
        let pending = pending_order(seven, 7, 10);
        assert_eq!(s.apply_verified(&pending, at(62)), Reconciled::Unchanged);
        assert!(!s.contains(&seven));
        assert!(!s.is_verifying(&seven));
    }

    #[test]
    fn test_verification_newer_than_snapshot_is_admitted() {
        let mut s = state();
        let seven = Uuid::new_v4();
        s.replace_snapshot(vec![], at(60), at(61));
        let stale = ChangeEvent::insert(record(seven, 7, OrderStatus::Pending, 10));
        assert_eq!(s.apply_event(&stale, at(62)), Reconciled::Verify(seven));

        let pending = pending_order(seven, 7, 10);
        assert_eq!(s.apply_verified(&pending, at(62)), Reconciled::Inserted(seven));
        assert!(s.contains(&seven));

        // A later snapshot listing it does not invalidate the answer
        let other = Uuid::new_v4();
        s.replace_snapshot(vec![summary(seven, 7, 10)], at(70), at(71));
        let late = ChangeEvent::insert(record(other, 8, OrderStatus::Pending, 20));
        assert_eq!(s.apply_event(&late, at(72)), Reconciled::Verify(other));
        s.replace_snapshot(vec![summary(seven, 7, 10)], at(75), at(76));
        assert_eq!(s.apply_verified(&pending_order(other, 8, 20), at(72)), Reconciled::Unchanged);
        assert_eq!(s.apply_verified(&pending, at(68)), Reconciled::Unchanged);
        assert!(s.contains(&seven));
        assert!(!s.contains(&other));
    }

    #[test]
    fn test_timestampless_duplicate_keeps_created_at() {
        let mut s = state();
        let id = Uuid::new_v4();
        let mut row = record(id, 7, OrderStatus::Pending, 0);
        row.created_at = None;
        let insert = ChangeEvent::insert(row.clone());

        assert_eq!(s.apply_event(&insert, at(0)), Reconciled::Inserted(id));
        let before = s.get(&id).unwrap().clone();
        assert_eq!(before.invoice_id, "INV-20250114-007");

        // A day later
        assert_eq!(s.apply_event(&insert, at(100_000)), Reconciled::Unchanged);
        assert_eq!(s.apply_event(&ChangeEvent::update(row), at(100_001)), Reconciled::Unchanged);
        assert_eq!(s.get(&id), Some(&before));
    }

    #[test]
    fn test_insert_newer_than_snapshot_is_trusted() {
        let mut s = state();
        s.replace_snapshot(vec![], at(60), at(61));
        let id = Uuid::new_v4();
        let out = s.apply_event(&ChangeEvent::insert(record(id, 8, OrderStatus::Pending, 90)), at(90));
        assert_eq!(out, Reconciled::Inserted(id));
    }

    #[test]
    fn test_delete_tombstones() {
        let mut s = state();
        let id = Uuid::new_v4();
        s.apply_event(&ChangeEvent::insert(record(id, 2, OrderStatus::Pending, 0)), at(0));
        assert_eq!(s.apply_event(&ChangeEvent::delete(id), at(1)), Reconciled::Removed(id));
        assert_eq!(
            s.apply_event(&ChangeEvent::insert(record(id, 2, OrderStatus::Pending, 0)), at(2)),
            Reconciled::Suppressed(id)
        );
    }

    #[test]
    fn test_other_tables_are_ignored() {
        let mut s = state();
        let mut event = ChangeEvent::insert(record(Uuid::new_v4(), 1, OrderStatus::Pending, 0));
        event.table = "products".into();
        assert_eq!(s.apply_event(&event, at(0)), Reconciled::Ignored);
    }

    #[test]
    fn test_finalized_log_is_bounded_fifo() {
        let mut log = FinalizedLog::new(2);
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert!(log.record(a));
        assert!(log.record(b));
        assert!(!log.record(a));
        log.record(c);
        assert_eq!(log.len(), 2);
        assert!(!log.contains(&a));
        assert!(log.contains(&b) && log.contains(&c));
    }

    #[test]
    fn test_update_keeps_item_count() {
        let mut s = state();
        let id = Uuid::new_v4();
        let mut first = summary(id, 1, 0);
        first.item_count = 3;
        s.replace_snapshot(vec![first], at(60), at(61));

        let mut changed = record(id, 1, OrderStatus::Pending, 0);
        changed.total_amount = Decimal::from(12_000);
        assert_eq!(s.apply_event(&ChangeEvent::update(changed), at(62)), Reconciled::Updated(id));
        assert_eq!(s.get(&id).unwrap().item_count, 3);
    }

    #[test]
    fn test_interleavings_converge() {
        // Every arrival order of {insert, paid update, snapshot} ends without the order
        let id = Uuid::new_v4();
        let insert = ChangeEvent::insert(record(id, 6, OrderStatus::Pending, 0));
        let paid = ChangeEvent::update(record(id, 6, OrderStatus::Paid, 0));
        let stale_snapshot = vec![summary(id, 6, 0)];

        let orders = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        for order in orders {
            let mut s = state();
            for step in order {
                match step {
                    0 => {
                        s.apply_event(&insert, at(1));
                    }
                    1 => {
                        s.apply_event(&paid, at(2));
                    }
                    _ => {
                        s.replace_snapshot(stale_snapshot.clone(), at(0), at(3));
                    }
                }
            }
            assert!(!s.contains(&id), "arrival order {order:?}");
        }
    }
}
