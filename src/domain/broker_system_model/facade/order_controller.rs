use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::broker_system_model::cloud_connector::cloud_connector_factory::CloudConnectorFactory;
use crate::domain::broker_system_model::instance::instance::{Instance, InstanceState, InstanceStatus};
use crate::domain::broker_system_model::instance::quota::Allocation;
use crate::domain::broker_system_model::instance::security_rule::SecurityRule;
use crate::domain::broker_system_model::order::order::{Order, OrderGuard, OrderHandle, OrderState, ResourceType, SystemUser};
use crate::domain::broker_system_model::order::order_holders::OrderHolders;
use crate::domain::broker_system_model::order::order_state_transitioner::OrderStateTransitioner;
use crate::domain::broker_system_model::utils::id::{CloudName, MemberId, OrderId};
use crate::error::{BrokerError, BrokerResult};

/// Order bookkeeping shared by the application and the remote facade.
pub struct OrderController {
    local_member: MemberId,
    holders: Arc<OrderHolders>,
    transitioner: Arc<OrderStateTransitioner>,
    connectors: Arc<CloudConnectorFactory>,
    activation: Mutex<()>,
}

impl OrderController {
    pub fn new(local_member: MemberId, holders: Arc<OrderHolders>, transitioner: Arc<OrderStateTransitioner>, connectors: Arc<CloudConnectorFactory>) -> Self {
        OrderController { local_member, holders, transitioner, connectors, activation: Mutex::new(()) }
    }

    pub fn local_member(&self) -> &MemberId {
        &self.local_member
    }

    /// Registers a new order as OPEN in the active store and the OPEN list.
    pub fn activate_order(&self, mut order: Order) -> BrokerResult<OrderHandle> {
        order.set_state(OrderState::Open);
        let summary = format!("{} (requester {}, provider {})", order.id(), order.requester(), order.provider());
        let handle = OrderHandle::new(order);

        let _activation = self.activation.lock().unwrap_or_else(PoisonError::into_inner);
        self.holders.active_orders().insert(handle.clone())?;

        let open = self.holders.list_for(OrderState::Open).ok_or_else(|| BrokerError::Unexpected("No list holds OPEN orders".to_string()))?;
        if let Err(e) = open.add(handle.clone()) {
            self.holders.active_orders().remove(handle.id());
            return Err(e);
        }

        log::info!("Activated order {}", summary);
        Ok(handle)
    }

    pub fn get_order(&self, order_id: &OrderId) -> BrokerResult<OrderHandle> {
        self.holders.active_orders().get(order_id).ok_or_else(|| BrokerError::NotFound(format!("Order {} does not exist", order_id)))
    }

    /// Instance behind the order, or a placeholder derived from the order state when there is none to ask for.
    pub fn get_resource_instance(&self, order: &Order) -> BrokerResult<Instance> {
        if order.state() == OrderState::Closed {
            return Err(BrokerError::NotFound(format!("Order {} is closed", order.id())));
        }

        if !order.is_provider_local(&self.local_member) && matches!(order.state(), OrderState::Open | OrderState::Failed) {
            let mut instance = Instance::empty(order.resource_type(), InstanceState::from_order_state(order.state()));
            instance.fault_message = order.fault_message().map(str::to_string);
            return Ok(instance);
        }

        self.connectors.connector_for_order(order)?.get_instance(order)
    }

    /// Releases the cloud resource (locally or at the provider) and closes the order.
    ///
    /// A delegated remote order is released without holding its lock, so an unresponsive
    /// provider delays only this call, by at most the RPC timeout. A FAILED order whose
    /// provider is unavailable is closed anyway; an undelegated one never contacts it.
    pub fn delete_order(&self, handle: &OrderHandle) -> BrokerResult<()> {
        let delegated_copy = {
            let order = handle.lock();
            order.ensure_not_closed()?;
            (!order.is_provider_local(&self.local_member) && order.is_delegated()).then(|| Order::clone(&order))
        };
        let released_remotely = delegated_copy.as_ref().map(|order| self.release_resource(order));

        let mut order = handle.lock();
        order.ensure_not_closed()?;

        let released = match released_remotely {
            Some(outcome) => outcome,
            // delegation may have happened since the first look
            None if self.holds_resource(&order) => self.release_resource(&order),
            None => Ok(()),
        };
        match released {
            Ok(()) => {}
            Err(BrokerError::ProviderUnavailable(message)) if order.state() == OrderState::Failed => {
                log::warn!("Closing failed order {} without releasing it at {}: {}", order.id(), order.provider(), message);
            }
            Err(e) => return Err(e),
        }

        self.transitioner.transition(&mut order, OrderState::Closed)?;
        self.holders.active_orders().remove(order.id());
        log::info!("Closed order {}", order.id());
        Ok(())
    }

    fn holds_resource(&self, order: &Order) -> bool {
        order.is_provider_local(&self.local_member) || order.is_delegated()
    }

    /// Deletes the instance behind the order. An instance that is already gone counts as released.
    fn release_resource(&self, order: &Order) -> BrokerResult<()> {
        match self.connectors.connector_for_order(order)?.delete_instance(order) {
            Ok(()) => Ok(()),
            Err(BrokerError::NotFound(message)) => {
                log::debug!("Resource of order {} already gone: {}", order.id(), message);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Stops the instance of a FULFILLED compute order. The order state does not change.
    pub fn stop_order(&self, order: &OrderGuard<'_>) -> BrokerResult<()> {
        order.ensure_not_closed()?;
        if order.resource_type() != ResourceType::Compute {
            return Err(BrokerError::InvalidParameter(format!("Order {} is a {} order; only compute orders can be stopped", order.id(), order.resource_type())));
        }
        if order.state() != OrderState::Fulfilled {
            return Err(BrokerError::InvalidParameter(format!("Order {} is {}; only fulfilled orders can be stopped", order.id(), order.state())));
        }

        self.connectors.connector_for_order(order)?.stop_instance(order)
    }

    pub fn get_instances_status(&self, system_user: &SystemUser, resource_type: ResourceType) -> Vec<InstanceStatus> {
        let mut orders: Vec<Order> = self
            .holders
            .active_orders()
            .all()
            .iter()
            .map(OrderHandle::snapshot)
            .filter(|order| order.system_user().is_same_user(system_user) && order.resource_type() == resource_type)
            .collect();
        orders.sort_by_key(Order::created_at);

        orders
            .into_iter()
            .map(|order| InstanceStatus {
                order_id: order.id().clone(),
                name: order.payload().name().map(str::to_string),
                provider: order.provider().clone(),
                cloud_name: order.cloud_name().clone(),
                state: InstanceState::from_order_state(order.state()),
            })
            .collect()
    }

    /// Resources held by the user's FULFILLED orders at `provider`/`cloud_name`.
    pub fn get_user_allocation(&self, provider: &MemberId, cloud_name: &CloudName, system_user: &SystemUser, resource_type: ResourceType) -> Allocation {
        self.holders
            .active_orders()
            .all()
            .iter()
            .map(OrderHandle::snapshot)
            .filter(|order| {
                order.state() == OrderState::Fulfilled
                    && order.provider() == provider
                    && order.cloud_name() == cloud_name
                    && order.system_user().is_same_user(system_user)
                    && order.resource_type() == resource_type
            })
            .fold(Allocation::zero(resource_type), |sum, order| sum.add(Allocation::of_payload(order.payload())))
    }

    pub fn create_security_rule(&self, order: &Order, rule: &SecurityRule) -> BrokerResult<String> {
        Self::ensure_accepts_security_rules(order)?;
        rule.validate()?;
        self.connectors.connector_for_order(order)?.create_security_rule(order, rule)
    }

    pub fn get_all_security_rules(&self, order: &Order) -> BrokerResult<Vec<SecurityRule>> {
        Self::ensure_accepts_security_rules(order)?;
        self.connectors.connector_for_order(order)?.get_all_security_rules(order)
    }

    fn ensure_accepts_security_rules(order: &Order) -> BrokerResult<()> {
        match order.resource_type() {
            ResourceType::Network | ResourceType::PublicIp => Ok(()),
            other => Err(BrokerError::InvalidParameter(format!("{} orders do not accept security rules", other))),
        }
    }
}
