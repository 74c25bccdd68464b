use std::sync::Arc;

use crate::domain::broker_system_model::cloud_connector::cloud_connector_factory::CloudConnectorFactory;
use crate::domain::broker_system_model::order::order::{OrderGuard, OrderState};
use crate::domain::broker_system_model::order::order_state_transitioner::OrderStateTransitioner;
use crate::domain::broker_system_model::processors::order_processor::{OrderProcessor, fail_order};
use crate::domain::broker_system_model::utils::id::MemberId;
use crate::error::{BrokerError, BrokerResult};

/// Hands OPEN orders to their provider.
///
/// Local orders move to SPAWNING with the instance id returned by the cloud,
/// remote orders move to PENDING once the provider accepted the create-order request.
pub struct OpenProcessor {
    local_member: MemberId,
    connectors: Arc<CloudConnectorFactory>,
    transitioner: Arc<OrderStateTransitioner>,
}

impl OpenProcessor {
    pub fn new(local_member: MemberId, connectors: Arc<CloudConnectorFactory>, transitioner: Arc<OrderStateTransitioner>) -> Self {
        OpenProcessor { local_member, connectors, transitioner }
    }
}

impl OpenProcessor {
    /// Gives back an instance the order could not move on with, so the next pass starts clean.
    fn release_untracked(&self, order: &mut OrderGuard<'_>) {
        let released = self.connectors.connector_for_order(order).and_then(|connector| connector.delete_instance(order));
        if let Err(e) = released {
            log::warn!("Could not release instance {:?} of order {}: {}", order.instance_id(), order.id(), e);
        }
        order.clear_instance_id();
    }
}

impl OrderProcessor for OpenProcessor {
    fn name(&self) -> &'static str {
        "open-processor"
    }

    fn state(&self) -> OrderState {
        OrderState::Open
    }

    fn process_order(&self, order: &mut OrderGuard<'_>) -> BrokerResult<()> {
        let requested = self.connectors.connector_for_order(order).and_then(|connector| connector.request_instance(order));

        match requested {
            Ok(Some(instance_id)) if order.is_provider_local(&self.local_member) => {
                order.set_instance_id(instance_id);
                if let Err(e) = self.transitioner.transition(order, OrderState::Spawning) {
                    self.release_untracked(order);
                    return Err(e);
                }
                Ok(())
            }
            Ok(None) if !order.is_provider_local(&self.local_member) => {
                order.mark_delegated();
                self.transitioner.transition(order, OrderState::Pending)
            }
            Ok(_) => {
                let cause = BrokerError::Unexpected(format!("Provider {} answered order {} inconsistently", order.provider(), order.id()));
                fail_order(&self.transitioner, order, &cause)
            }
            Err(e) => fail_order(&self.transitioner, order, &e),
        }
    }
}
