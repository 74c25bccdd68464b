use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::domain::broker_system_model::order::order::{OrderGuard, OrderHandle, OrderState};
use crate::domain::broker_system_model::order::order_holders::OrderHolders;
use crate::domain::broker_system_model::order::order_state_transitioner::OrderStateTransitioner;
use crate::error::{BrokerError, BrokerResult};

/// One state-specific step of the order lifecycle.
pub trait OrderProcessor: Send + Sync {
    fn name(&self) -> &'static str;

    /// State of the list this processor drains.
    fn state(&self) -> OrderState;

    /// Runs the step on an order whose lock is held and whose state was re-checked.
    fn process_order(&self, order: &mut OrderGuard<'_>) -> BrokerResult<()>;

    /// Locks the order and runs the step, unless the order left this state in the meantime.
    fn process(&self, handle: &OrderHandle) -> BrokerResult<()> {
        let mut order = handle.lock();
        if order.state() != self.state() {
            log::debug!("{}: order {} is {} now, skipping", self.name(), order.id(), order.state());
            return Ok(());
        }
        self.process_order(&mut order)
    }
}

/// Records `cause` on the order and moves it to FAILED.
pub fn fail_order(transitioner: &OrderStateTransitioner, order: &mut OrderGuard<'_>, cause: &BrokerError) -> BrokerResult<()> {
    log::warn!("Order {} failed in state {}: {}", order.id(), order.state(), cause);
    order.set_once_fault_message(cause.to_string());
    transitioner.transition(order, OrderState::Failed)
}

/// Loop of one processor thread over the list bound to its state.
pub struct ProcessorWorker {
    processor: Arc<dyn OrderProcessor>,
    holders: Arc<OrderHolders>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl ProcessorWorker {
    pub fn new(processor: Arc<dyn OrderProcessor>, holders: Arc<OrderHolders>, interval: Duration, shutdown: Arc<AtomicBool>) -> Self {
        ProcessorWorker { processor, holders, interval, shutdown }
    }

    pub fn name(&self) -> &'static str {
        self.processor.name()
    }

    fn is_stopped(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub fn run(&self) {
        let Some(list) = self.holders.list_for(self.processor.state()) else {
            log::error!("{}: no list holds {} orders", self.name(), self.processor.state());
            return;
        };

        log::info!("{} started (interval {:?})", self.name(), self.interval);
        while !self.is_stopped() {
            match list.next() {
                Some(handle) => self.process_guarded(&handle),
                None => {
                    list.reset_cursor();
                    list.wait_for_addition(self.interval, || self.is_stopped());
                }
            }
        }
        log::info!("{} stopped", self.name());
    }

    /// One pass over the list, returning the number of orders visited.
    pub fn run_pass(&self) -> usize {
        let Some(list) = self.holders.list_for(self.processor.state()) else {
            return 0;
        };

        let mut visited = 0;
        while let Some(handle) = list.next() {
            self.process_guarded(&handle);
            visited += 1;
        }
        visited
    }

    fn process_guarded(&self, handle: &OrderHandle) {
        match catch_unwind(AssertUnwindSafe(|| self.processor.process(handle))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("{}: error while processing order {}: {}", self.name(), handle.id(), e),
            Err(_) => log::error!("{}: panic while processing order {}", self.name(), handle.id()),
        }
    }
}
