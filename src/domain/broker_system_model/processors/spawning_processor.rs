use std::sync::Arc;

use crate::domain::broker_system_model::cloud_connector::cloud_connector_factory::CloudConnectorFactory;
use crate::domain::broker_system_model::cloud_connector::reachability::ReachabilityChecker;
use crate::domain::broker_system_model::order::order::{OrderGuard, OrderState, ResourceType};
use crate::domain::broker_system_model::order::order_state_transitioner::OrderStateTransitioner;
use crate::domain::broker_system_model::processors::order_processor::{OrderProcessor, fail_order};
use crate::error::{BrokerError, BrokerResult};

/// Polls the cloud for SPAWNING orders until the instance is ready (and reachable, for compute) or failed.
pub struct SpawningProcessor {
    connectors: Arc<CloudConnectorFactory>,
    transitioner: Arc<OrderStateTransitioner>,
    reachability: Arc<dyn ReachabilityChecker>,
    max_reachability_attempts: u32,
}

impl SpawningProcessor {
    pub fn new(
        connectors: Arc<CloudConnectorFactory>,
        transitioner: Arc<OrderStateTransitioner>,
        reachability: Arc<dyn ReachabilityChecker>,
        max_reachability_attempts: u32,
    ) -> Self {
        SpawningProcessor { connectors, transitioner, reachability, max_reachability_attempts }
    }
}

impl OrderProcessor for SpawningProcessor {
    fn name(&self) -> &'static str {
        "spawning-processor"
    }

    fn state(&self) -> OrderState {
        OrderState::Spawning
    }

    fn process_order(&self, order: &mut OrderGuard<'_>) -> BrokerResult<()> {
        let instance = match self.connectors.connector_for_order(order).and_then(|connector| connector.get_instance(order)) {
            Ok(instance) => instance,
            Err(e) => return fail_order(&self.transitioner, order, &e),
        };

        if instance.state.is_failed() {
            let cause = instance.fault_message.clone().unwrap_or_else(|| format!("Instance of order {} failed in the cloud", order.id()));
            return fail_order(&self.transitioner, order, &BrokerError::Unexpected(cause));
        }

        if !instance.state.is_ready() {
            log::debug!("Order {} is still {} in the cloud", order.id(), instance.state);
            return Ok(());
        }

        if order.resource_type() != ResourceType::Compute || self.reachability.is_reachable(order, &instance) {
            return self.transitioner.transition(order, OrderState::Fulfilled);
        }

        let attempts = order.increment_reachability_attempts();
        if attempts >= self.max_reachability_attempts {
            let cause = BrokerError::Unexpected(format!("Instance of order {} unreachable after {} attempts", order.id(), attempts));
            return fail_order(&self.transitioner, order, &cause);
        }

        log::debug!("Order {} not reachable yet ({}/{})", order.id(), attempts, self.max_reachability_attempts);
        Ok(())
    }
}
