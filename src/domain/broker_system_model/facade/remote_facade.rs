use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::broker_system_model::cloud_connector::cloud_connector_factory::CloudConnectorFactory;
use crate::domain::broker_system_model::facade::order_controller::OrderController;
use crate::domain::broker_system_model::instance::image::{GenericRequest, GenericResponse, Image};
use crate::domain::broker_system_model::instance::instance::Instance;
use crate::domain::broker_system_model::instance::quota::Quota;
use crate::domain::broker_system_model::instance::security_rule::SecurityRule;
use crate::domain::broker_system_model::intercomponent::requests::OrderReference;
use crate::domain::broker_system_model::order::order::{Order, OrderHandle, OrderState, ResourceType, SystemUser};
use crate::domain::broker_system_model::order::order_state_transitioner::OrderStateTransitioner;
use crate::domain::broker_system_model::utils::id::{CloudName, MemberId};
use crate::error::{BrokerError, BrokerResult};

/// Entry point for requests that arrive from other members.
///
/// Orders created here are provided by this member on behalf of the requesting
/// member; every verb that names an order checks that the caller is its requester.
pub struct RemoteFacade {
    local_member: MemberId,
    controller: Arc<OrderController>,
    connectors: Arc<CloudConnectorFactory>,
    transitioner: Arc<OrderStateTransitioner>,
}

impl RemoteFacade {
    pub fn new(local_member: MemberId, controller: Arc<OrderController>, connectors: Arc<CloudConnectorFactory>, transitioner: Arc<OrderStateTransitioner>) -> Self {
        RemoteFacade { local_member, controller, connectors, transitioner }
    }

    pub fn activate_order(&self, requester: &MemberId, order: Order) -> BrokerResult<()> {
        if order.requester() != requester {
            return Err(BrokerError::Unauthorized(format!("Member {} cannot create orders on behalf of {}", requester, order.requester())));
        }
        if !order.is_provider_local(&self.local_member) {
            return Err(BrokerError::InvalidParameter(format!("Order {} is addressed to {}, not {}", order.id(), order.provider(), self.local_member)));
        }
        order.payload().validate()?;

        self.controller.activate_order(order)?;
        Ok(())
    }

    /// Stored order named by `reference`, if `requester` asked for it.
    fn requested_order(&self, requester: &MemberId, reference: &OrderReference) -> BrokerResult<OrderHandle> {
        let handle = self.controller.get_order(&reference.order_id)?;
        {
            let order = handle.lock();
            if order.requester() != requester {
                return Err(BrokerError::Unauthorized(format!("Member {} did not request order {}", requester, order.id())));
            }
            if order.resource_type() != reference.resource_type {
                return Err(BrokerError::NotFound(format!("No {} order {}", reference.resource_type, order.id())));
            }
            if !order.system_user().is_same_user(&reference.system_user) {
                return Err(BrokerError::Unauthorized(format!("User {} does not own order {}", reference.system_user.user_id, order.id())));
            }
        }
        Ok(handle)
    }

    pub fn get_resource_instance(&self, requester: &MemberId, reference: &OrderReference) -> BrokerResult<Instance> {
        let order = self.requested_order(requester, reference)?.snapshot();
        self.controller.get_resource_instance(&order)
    }

    pub fn delete_order(&self, requester: &MemberId, reference: &OrderReference) -> BrokerResult<()> {
        let handle = self.requested_order(requester, reference)?;
        self.controller.delete_order(&handle)
    }

    pub fn stop_order(&self, requester: &MemberId, reference: &OrderReference) -> BrokerResult<()> {
        let handle = self.requested_order(requester, reference)?;
        let order = handle.lock();
        self.controller.stop_order(&order)
    }

    /// Applies the outcome the provider reported for one of our PENDING orders.
    pub fn handle_remote_event(&self, signalling_member: &MemberId, remote: Order, new_state: OrderState) -> BrokerResult<()> {
        if !matches!(new_state, OrderState::Fulfilled | OrderState::Failed) {
            return Err(BrokerError::InvalidParameter(format!("Event for order {} carries state {}", remote.id(), new_state)));
        }
        if remote.provider() != signalling_member {
            return Err(BrokerError::Unexpected(format!("Member {} signalled order {} provided by {}", signalling_member, remote.id(), remote.provider())));
        }

        let handle = match self.controller.get_order(remote.id()) {
            Ok(handle) => handle,
            Err(BrokerError::NotFound(_)) => {
                log::debug!("Dropping event for unknown order {}", remote.id());
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let mut order = handle.lock();
        if order.provider() != signalling_member {
            return Err(BrokerError::Unexpected(format!("Member {} is not the provider of order {}", signalling_member, order.id())));
        }
        if order.state() != OrderState::Pending {
            log::debug!("Dropping {} event for order {} in state {}", new_state, order.id(), order.state());
            return Ok(());
        }

        order.update_from_remote(&remote);
        self.transitioner.transition(&mut order, new_state)
    }

    pub fn get_user_quota(&self, requester: &MemberId, cloud_name: &CloudName, system_user: &SystemUser, resource_type: ResourceType) -> BrokerResult<Quota> {
        log::debug!("Quota of {} in cloud {} requested by {}", system_user.user_id, cloud_name, requester);
        self.connectors.connector_for(&self.local_member, cloud_name)?.get_user_quota(system_user, resource_type)
    }

    pub fn get_all_images(&self, requester: &MemberId, cloud_name: &CloudName, system_user: &SystemUser) -> BrokerResult<BTreeMap<String, String>> {
        log::debug!("Images of cloud {} requested by {}", cloud_name, requester);
        self.connectors.connector_for(&self.local_member, cloud_name)?.get_all_images(system_user)
    }

    pub fn get_image(&self, requester: &MemberId, cloud_name: &CloudName, image_id: &str, system_user: &SystemUser) -> BrokerResult<Image> {
        log::debug!("Image {} of cloud {} requested by {}", image_id, cloud_name, requester);
        self.connectors.connector_for(&self.local_member, cloud_name)?.get_image(image_id, system_user)
    }

    pub fn get_cloud_names(&self, requester: &MemberId, system_user: &SystemUser) -> BrokerResult<Vec<String>> {
        log::debug!("Cloud names requested by {}", requester);
        self.connectors.cloud_names(&self.local_member, system_user)
    }

    pub fn create_security_rule(&self, requester: &MemberId, reference: &OrderReference, rule: &SecurityRule) -> BrokerResult<String> {
        let order = self.requested_order(requester, reference)?.snapshot();
        self.controller.create_security_rule(&order, rule)
    }

    pub fn get_all_security_rules(&self, requester: &MemberId, reference: &OrderReference) -> BrokerResult<Vec<SecurityRule>> {
        let order = self.requested_order(requester, reference)?.snapshot();
        self.controller.get_all_security_rules(&order)
    }

    pub fn delete_security_rule(&self, requester: &MemberId, cloud_name: &CloudName, rule_id: &str, system_user: &SystemUser) -> BrokerResult<()> {
        log::debug!("Deletion of security rule {} requested by {}", rule_id, requester);
        self.connectors.connector_for(&self.local_member, cloud_name)?.delete_security_rule(rule_id, system_user)
    }

    pub fn generic_request(&self, requester: &MemberId, cloud_name: &CloudName, system_user: &SystemUser, request: &GenericRequest) -> BrokerResult<GenericResponse> {
        log::debug!("Generic request to cloud {} from {}", cloud_name, requester);
        self.connectors.connector_for(&self.local_member, cloud_name)?.generic_request(request, system_user)
    }
}
