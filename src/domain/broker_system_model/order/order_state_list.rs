use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::domain::broker_system_model::order::order::{OrderHandle, OrderState};
use crate::domain::broker_system_model::utils::id::OrderId;
use crate::error::{BrokerError, BrokerResult};

#[derive(Debug, Default)]
struct ListInner {
    orders: Vec<OrderHandle>,
    cursor: usize,

    /// Bumped on every addition and on `wake_all`; waiters compare against it.
    generation: u64,
}

/// Thread-safe collection of the orders that currently share one state.
///
/// Traversal is round-robin through `next`, which only holds the internal lock
/// long enough to advance the cursor.
#[derive(Debug)]
pub struct OrderStateList {
    state: OrderState,
    inner: Mutex<ListInner>,
    changed: Condvar,
}

impl OrderStateList {
    pub fn new(state: OrderState) -> Self {
        OrderStateList { state, inner: Mutex::new(ListInner::default()), changed: Condvar::new() }
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    fn lock(&self) -> MutexGuard<'_, ListInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends the order. Fails with `Unexpected` if an order with the same id is already present.
    pub fn add(&self, order: OrderHandle) -> BrokerResult<()> {
        let mut inner = self.lock();
        if inner.orders.iter().any(|o| o.id() == order.id()) {
            return Err(BrokerError::Unexpected(format!("Order {} is already in the {} list", order.id(), self.state)));
        }

        inner.orders.push(order);
        inner.generation += 1;
        self.changed.notify_all();
        Ok(())
    }

    /// Detaches the order with the given id. Returns `false` if it was not present.
    pub fn remove(&self, order_id: &OrderId) -> bool {
        let mut inner = self.lock();
        let Some(index) = inner.orders.iter().position(|o| o.id() == order_id) else {
            return false;
        };

        inner.orders.remove(index);
        if index < inner.cursor {
            inner.cursor -= 1;
        }
        true
    }

    /// Next order in round-robin order, without removing it.
    ///
    /// Returns `None` once the end of the list is reached; the following call starts again at the head.
    pub fn next(&self) -> Option<OrderHandle> {
        let mut inner = self.lock();
        if inner.cursor < inner.orders.len() {
            let order = inner.orders[inner.cursor].clone();
            inner.cursor += 1;
            Some(order)
        } else {
            inner.cursor = 0;
            None
        }
    }

    pub fn reset_cursor(&self) {
        self.lock().cursor = 0;
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.lock().orders.iter().any(|o| o.id() == order_id)
    }

    pub fn find(&self, order_id: &OrderId) -> Option<OrderHandle> {
        self.lock().orders.iter().find(|o| o.id() == order_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().orders.is_empty()
    }

    pub fn snapshot(&self) -> Vec<OrderHandle> {
        self.lock().orders.clone()
    }

    /// Blocks until an order is added, `wake_all` is called, `stop` returns true, or the timeout elapses.
    ///
    /// Returns `true` if woken before the timeout.
    pub fn wait_for_addition(&self, timeout: Duration, stop: impl Fn() -> bool) -> bool {
        let inner = self.lock();
        let seen = inner.generation;
        let (_inner, result) =
            self.changed.wait_timeout_while(inner, timeout, |inner| inner.generation == seen && !stop()).unwrap_or_else(PoisonError::into_inner);
        !result.timed_out()
    }

    pub fn wake_all(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        self.changed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::broker_system_model::order::order::{Order, SystemUser};
    use crate::domain::broker_system_model::order::order_payload::{OrderPayload, VolumeSpec};
    use crate::domain::broker_system_model::utils::id::{CloudName, MemberId};
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn handle(name: &str) -> OrderHandle {
        let order = Order::new(
            MemberId::new("m"),
            MemberId::new("m"),
            CloudName::new("c"),
            SystemUser::new("u", "u", "idp"),
            OrderPayload::Volume(VolumeSpec { name: name.to_string(), size_gb: 1 }),
        )
        .with_id(OrderId::new(name));
        OrderHandle::new(order)
    }

    fn drain_ids(list: &OrderStateList) -> Vec<String> {
        let mut ids = Vec::new();
        while let Some(order) = list.next() {
            ids.push(order.id().to_string());
        }
        ids
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let list = OrderStateList::new(OrderState::Open);
        list.add(handle("a")).unwrap();
        assert!(matches!(list.add(handle("a")), Err(BrokerError::Unexpected(_))));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_round_robin_and_reset() {
        let list = OrderStateList::new(OrderState::Open);
        for id in ["a", "b", "c"] {
            list.add(handle(id)).unwrap();
        }

        assert_eq!(drain_ids(&list), vec!["a", "b", "c"]);
        // Exhausted once, the next pass starts at the head again.
        assert_eq!(list.next().unwrap().id().as_str(), "a");
        list.reset_cursor();
        assert_eq!(list.next().unwrap().id().as_str(), "a");
    }

    #[test]
    fn test_remove_before_cursor_keeps_position() {
        let list = OrderStateList::new(OrderState::Spawning);
        for id in ["a", "b", "c"] {
            list.add(handle(id)).unwrap();
        }
        assert_eq!(list.next().unwrap().id().as_str(), "a");
        assert_eq!(list.next().unwrap().id().as_str(), "b");

        assert!(list.remove(&OrderId::new("a")));
        assert_eq!(list.next().unwrap().id().as_str(), "c");
        assert!(list.next().is_none());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let list = OrderStateList::new(OrderState::Failed);
        list.add(handle("a")).unwrap();
        assert!(!list.remove(&OrderId::new("zzz")));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_empty_list_returns_none() {
        let list = OrderStateList::new(OrderState::Fulfilled);
        assert!(list.next().is_none());
        assert!(list.next().is_none());
    }

    #[test]
    fn test_wait_times_out_without_additions() {
        let list = OrderStateList::new(OrderState::Open);
        let started = Instant::now();
        assert!(!list.wait_for_addition(Duration::from_millis(30), || false));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_wait_is_woken_by_addition() {
        let list = Arc::new(OrderStateList::new(OrderState::Open));
        let waiter = {
            let list = list.clone();
            thread::spawn(move || list.wait_for_addition(Duration::from_secs(10), || false))
        };

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut added = 0;
        while !waiter.is_finished() && Instant::now() < deadline {
            list.add(handle(&format!("late-{}", added))).unwrap();
            added += 1;
            thread::sleep(Duration::from_millis(10));
        }
        assert!(waiter.join().unwrap());
    }
}
