use slotmap::{SlotMap, new_key_type};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::domain::broker_system_model::order::order::OrderHandle;
use crate::domain::broker_system_model::utils::id::OrderId;
use crate::error::{BrokerError, BrokerResult};

new_key_type! {
    pub struct OrderKey;
}

#[derive(Debug, Default)]
struct StoreInner {
    /// Order storage.
    slots: SlotMap<OrderKey, OrderHandle>,

    /// Lookup of the internal key by order id.
    id_index: HashMap<OrderId, OrderKey>,
}

/// All non-closed orders of this member, keyed by order id.
#[derive(Debug, Default)]
pub struct ActiveOrderStore {
    /// Both maps are protected with a single lock.
    inner: RwLock<StoreInner>,
}

impl ActiveOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the order. Fails with `Unexpected` when an order with the same id is already active.
    pub fn insert(&self, order: OrderHandle) -> BrokerResult<OrderKey> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if guard.id_index.contains_key(order.id()) {
            return Err(BrokerError::Unexpected(format!("Order {} is already active", order.id())));
        }

        let id = order.id().clone();
        let key = guard.slots.insert(order);
        guard.id_index.insert(id, key);
        Ok(key)
    }

    pub fn get(&self, order_id: &OrderId) -> Option<OrderHandle> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let key = guard.id_index.get(order_id)?;
        guard.slots.get(*key).cloned()
    }

    pub fn get_by_key(&self, key: OrderKey) -> Option<OrderHandle> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.slots.get(key).cloned()
    }

    pub fn remove(&self, order_id: &OrderId) -> Option<OrderHandle> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let key = guard.id_index.remove(order_id)?;
        guard.slots.remove(key)
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.id_index.contains_key(order_id)
    }

    pub fn all(&self) -> Vec<OrderHandle> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.slots.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
