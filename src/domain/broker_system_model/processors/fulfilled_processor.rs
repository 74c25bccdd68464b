use std::sync::Arc;

use crate::domain::broker_system_model::cloud_connector::cloud_connector_factory::CloudConnectorFactory;
use crate::domain::broker_system_model::cloud_connector::reachability::ReachabilityChecker;
use crate::domain::broker_system_model::instance::instance::InstanceState;
use crate::domain::broker_system_model::order::order::{OrderGuard, OrderState, ResourceType};
use crate::domain::broker_system_model::order::order_state_transitioner::OrderStateTransitioner;
use crate::domain::broker_system_model::processors::order_processor::{OrderProcessor, fail_order};
use crate::domain::broker_system_model::utils::id::MemberId;
use crate::error::{BrokerError, BrokerResult};

/// Health monitoring of FULFILLED orders.
///
/// Remote orders are checked through get-order on their provider; reachability is
/// only probed for local compute instances.
pub struct FulfilledProcessor {
    local_member: MemberId,
    connectors: Arc<CloudConnectorFactory>,
    transitioner: Arc<OrderStateTransitioner>,
    reachability: Arc<dyn ReachabilityChecker>,
}

impl FulfilledProcessor {
    pub fn new(
        local_member: MemberId,
        connectors: Arc<CloudConnectorFactory>,
        transitioner: Arc<OrderStateTransitioner>,
        reachability: Arc<dyn ReachabilityChecker>,
    ) -> Self {
        FulfilledProcessor { local_member, connectors, transitioner, reachability }
    }
}

impl OrderProcessor for FulfilledProcessor {
    fn name(&self) -> &'static str {
        "fulfilled-processor"
    }

    fn state(&self) -> OrderState {
        OrderState::Fulfilled
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

        // stopped on request of the owner
        if instance.state == InstanceState::Stopped {
            return Ok(());
        }

        let local_compute = order.is_provider_local(&self.local_member) && order.resource_type() == ResourceType::Compute;
        if local_compute && !self.reachability.is_reachable(order, &instance) {
            let cause = BrokerError::Unexpected(format!("Instance of order {} is no longer reachable", order.id()));
            return fail_order(&self.transitioner, order, &cause);
        }

        Ok(())
    }
}
