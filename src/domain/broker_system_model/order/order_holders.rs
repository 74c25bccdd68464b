use crate::domain::broker_system_model::order::order::OrderState;
use crate::domain::broker_system_model::order::order_state_list::OrderStateList;
use crate::domain::broker_system_model::order::order_store::ActiveOrderStore;

/// The active order store plus one `OrderStateList` per non-terminal state.
#[derive(Debug)]
pub struct OrderHolders {
    active_orders: ActiveOrderStore,
    open: OrderStateList,
    pending: OrderStateList,
    spawning: OrderStateList,
    fulfilled: OrderStateList,
    failed: OrderStateList,
}

impl OrderHolders {
    pub fn new() -> Self {
        OrderHolders {
            active_orders: ActiveOrderStore::new(),
            open: OrderStateList::new(OrderState::Open),
            pending: OrderStateList::new(OrderState::Pending),
            spawning: OrderStateList::new(OrderState::Spawning),
            fulfilled: OrderStateList::new(OrderState::Fulfilled),
            failed: OrderStateList::new(OrderState::Failed),
        }
    }

    pub fn active_orders(&self) -> &ActiveOrderStore {
        &self.active_orders
    }

    /// The list bound to `state`, `None` for CLOSED.
    pub fn list_for(&self, state: OrderState) -> Option<&OrderStateList> {
        match state {
            OrderState::Open => Some(&self.open),
            OrderState::Pending => Some(&self.pending),
            OrderState::Spawning => Some(&self.spawning),
            OrderState::Fulfilled => Some(&self.fulfilled),
            OrderState::Failed => Some(&self.failed),
            OrderState::Closed => None,
        }
    }

    pub fn lists(&self) -> [&OrderStateList; 5] {
        [&self.open, &self.pending, &self.spawning, &self.fulfilled, &self.failed]
    }

    pub fn wake_all(&self) {
        for list in self.lists() {
            list.wake_all();
        }
    }
}

impl Default for OrderHolders {
    fn default() -> Self {
        Self::new()
    }
}
