use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::order_dto::OrderDto;
use crate::domain::broker_system_model::cloud_connector::cloud_connector_factory::CloudConnectorFactory;
use crate::domain::broker_system_model::facade::order_controller::OrderController;
use crate::domain::broker_system_model::instance::image::{GenericRequest, GenericResponse, Image};
use crate::domain::broker_system_model::instance::instance::{Instance, InstanceStatus};
use crate::domain::broker_system_model::instance::quota::{Allocation, Quota};
use crate::domain::broker_system_model::instance::security_rule::SecurityRule;
use crate::domain::broker_system_model::order::order::{Order, OrderHandle, ResourceType, SystemUser};
use crate::domain::broker_system_model::order::order_payload::OrderPayload;
use crate::domain::broker_system_model::utils::id::{CloudName, MemberId, OrderId};
use crate::error::{BrokerError, BrokerResult, ConversionError};

/// What a user asks for. Missing provider and cloud fall back to this member and its default cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(default)]
    pub provider: Option<MemberId>,
    #[serde(default)]
    pub cloud_name: Option<CloudName>,
    pub payload: OrderPayload,
}

/// Entry point for the local API layer. Every operation takes the caller identity.
pub struct ApplicationFacade {
    local_member: MemberId,
    default_cloud: Option<CloudName>,
    controller: Arc<OrderController>,
    connectors: Arc<CloudConnectorFactory>,
}

impl ApplicationFacade {
    pub fn new(local_member: MemberId, default_cloud: Option<CloudName>, controller: Arc<OrderController>, connectors: Arc<CloudConnectorFactory>) -> Self {
        ApplicationFacade { local_member, default_cloud, controller, connectors }
    }

    pub fn create_order(&self, system_user: &SystemUser, request: OrderRequest) -> BrokerResult<OrderId> {
        request.payload.validate()?;

        let provider = request.provider.unwrap_or_else(|| self.local_member.clone());
        let cloud_name = request
            .cloud_name
            .or_else(|| self.default_cloud.clone())
            .ok_or_else(|| BrokerError::InvalidParameter("No cloud name given and no default cloud configured".to_string()))?;

        for referenced in request.payload.referenced_orders() {
            self.check_referenced_order(system_user, &provider, referenced)?;
        }

        let order = Order::new(self.local_member.clone(), provider, cloud_name, system_user.clone(), request.payload);
        let handle = self.controller.activate_order(order)?;
        Ok(handle.id().clone())
    }

    fn check_referenced_order(&self, system_user: &SystemUser, provider: &MemberId, order_id: &OrderId) -> BrokerResult<()> {
        let referenced = self
            .controller
            .get_order(order_id)
            .map_err(|_| BrokerError::InvalidParameter(format!("Referenced order {} does not exist", order_id)))?
            .snapshot();

        if !referenced.system_user().is_same_user(system_user) {
            return Err(BrokerError::InvalidParameter(format!("Referenced order {} belongs to another user", order_id)));
        }
        if referenced.provider() != provider {
            return Err(BrokerError::InvalidParameter(format!("Referenced order {} is provided by {}, not {}", order_id, referenced.provider(), provider)));
        }
        Ok(())
    }

    /// The order, if it exists and belongs to the caller.
    fn owned_order(&self, system_user: &SystemUser, order_id: &OrderId) -> BrokerResult<OrderHandle> {
        let handle = self.controller.get_order(order_id)?;
        if !handle.lock().system_user().is_same_user(system_user) {
            return Err(BrokerError::Unauthorized(format!("User {} does not own order {}", system_user.user_id, order_id)));
        }
        Ok(handle)
    }

    /// Owned order of the given type. A type mismatch hides the order.
    fn owned_order_of_type(&self, system_user: &SystemUser, order_id: &OrderId, resource_type: ResourceType) -> BrokerResult<Order> {
        let order = self.owned_order(system_user, order_id)?.snapshot();
        if order.resource_type() != resource_type {
            return Err(BrokerError::NotFound(format!("No {} order {}", resource_type, order_id)));
        }
        Ok(order)
    }

    pub fn get_order(&self, system_user: &SystemUser, order_id: &OrderId) -> BrokerResult<Order> {
        Ok(self.owned_order(system_user, order_id)?.snapshot())
    }

    pub fn get_resource_instance(&self, system_user: &SystemUser, order_id: &OrderId) -> BrokerResult<Instance> {
        let order = self.owned_order(system_user, order_id)?.snapshot();
        self.controller.get_resource_instance(&order)
    }

    pub fn delete_order(&self, system_user: &SystemUser, order_id: &OrderId) -> BrokerResult<()> {
        let handle = self.owned_order(system_user, order_id)?;
        self.controller.delete_order(&handle)
    }

    pub fn stop_order(&self, system_user: &SystemUser, order_id: &OrderId) -> BrokerResult<()> {
        let handle = self.owned_order(system_user, order_id)?;
        let order = handle.lock();
        self.controller.stop_order(&order)
    }

    pub fn get_instances_status(&self, system_user: &SystemUser, resource_type: ResourceType) -> Vec<InstanceStatus> {
        self.controller.get_instances_status(system_user, resource_type)
    }

    pub fn get_user_quota(&self, system_user: &SystemUser, member: &MemberId, cloud_name: &CloudName, resource_type: ResourceType) -> BrokerResult<Quota> {
        self.connectors.connector_for(member, cloud_name)?.get_user_quota(system_user, resource_type)
    }

    pub fn get_user_allocation(&self, system_user: &SystemUser, member: &MemberId, cloud_name: &CloudName, resource_type: ResourceType) -> Allocation {
        self.controller.get_user_allocation(member, cloud_name, system_user, resource_type)
    }

    pub fn get_all_images(&self, system_user: &SystemUser, member: &MemberId, cloud_name: &CloudName) -> BrokerResult<BTreeMap<String, String>> {
        self.connectors.connector_for(member, cloud_name)?.get_all_images(system_user)
    }

    pub fn get_image(&self, system_user: &SystemUser, member: &MemberId, cloud_name: &CloudName, image_id: &str) -> BrokerResult<Image> {
        self.connectors.connector_for(member, cloud_name)?.get_image(image_id, system_user)
    }

    pub fn get_cloud_names(&self, system_user: &SystemUser, member: &MemberId) -> BrokerResult<Vec<String>> {
        self.connectors.cloud_names(member, system_user)
    }

    pub fn create_security_rule(&self, system_user: &SystemUser, order_id: &OrderId, resource_type: ResourceType, rule: &SecurityRule) -> BrokerResult<String> {
        let order = self.owned_order_of_type(system_user, order_id, resource_type)?;
        self.controller.create_security_rule(&order, rule)
    }

    pub fn get_all_security_rules(&self, system_user: &SystemUser, order_id: &OrderId, resource_type: ResourceType) -> BrokerResult<Vec<SecurityRule>> {
        let order = self.owned_order_of_type(system_user, order_id, resource_type)?;
        self.controller.get_all_security_rules(&order)
    }

    pub fn delete_security_rule(&self, system_user: &SystemUser, member: &MemberId, cloud_name: &CloudName, rule_id: &str) -> BrokerResult<()> {
        self.connectors.connector_for(member, cloud_name)?.delete_security_rule(rule_id, system_user)
    }

    pub fn generic_request(&self, system_user: &SystemUser, member: &MemberId, cloud_name: &CloudName, request: &GenericRequest) -> BrokerResult<GenericResponse> {
        self.connectors.connector_for(member, cloud_name)?.generic_request(request, system_user)
    }
}

impl TryFrom<OrderDto> for OrderRequest {
    type Error = ConversionError;

    fn try_from(dto: OrderDto) -> Result<Self, Self::Error> {
        let resource_type = ResourceType::from_str(&dto.resource_type)?;
        if resource_type != dto.spec.resource_type() {
            let name = dto.spec.name().unwrap_or(&dto.resource_type).to_string();
            return Err(ConversionError::InvalidOrder(name, format!("spec describes a {} resource, not {}", dto.spec.resource_type(), resource_type)));
        }

        Ok(OrderRequest { provider: dto.provider.map(MemberId::new), cloud_name: dto.cloud_name.map(CloudName::new), payload: dto.spec })
    }
}
