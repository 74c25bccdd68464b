use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::broker_system_model::cloud_connector::cloud_connector_trait::CloudConnector;
use crate::domain::broker_system_model::instance::image::{GenericRequest, GenericResponse, Image};
use crate::domain::broker_system_model::instance::instance::Instance;
use crate::domain::broker_system_model::instance::quota::Quota;
use crate::domain::broker_system_model::instance::security_rule::SecurityRule;
use crate::domain::broker_system_model::intercomponent::requests::*;
use crate::domain::broker_system_model::order::order::{Order, ResourceType, SystemUser};
use crate::domain::broker_system_model::utils::id::{CloudName, MemberId};
use crate::error::BrokerResult;

/// Forwards every connector call to the providing member as one remote request.
pub struct RemoteCloudConnector {
    provider: MemberId,
    cloud_name: CloudName,
    client: Arc<RpcClient>,
}

impl RemoteCloudConnector {
    pub fn new(provider: MemberId, cloud_name: CloudName, client: Arc<RpcClient>) -> Self {
        RemoteCloudConnector { provider, cloud_name, client }
    }
}

impl CloudConnector for RemoteCloudConnector {
    fn request_instance(&self, order: &Order) -> BrokerResult<Option<String>> {
        RemoteCreateOrderRequest { provider: self.provider.clone(), order: order.clone() }.send(&self.client)?;
        Ok(None)
    }

    fn get_instance(&self, order: &Order) -> BrokerResult<Instance> {
        RemoteGetOrderRequest { provider: self.provider.clone(), reference: OrderReference::of(order) }.send(&self.client)
    }

    fn delete_instance(&self, order: &Order) -> BrokerResult<()> {
        RemoteDeleteOrderRequest { provider: self.provider.clone(), reference: OrderReference::of(order) }.send(&self.client)
    }

    fn stop_instance(&self, order: &Order) -> BrokerResult<()> {
        RemoteStopOrderRequest { provider: self.provider.clone(), reference: OrderReference::of(order) }.send(&self.client)
    }

    fn get_user_quota(&self, system_user: &SystemUser, resource_type: ResourceType) -> BrokerResult<Quota> {
        RemoteGetUserQuotaRequest { provider: self.provider.clone(), cloud_name: self.cloud_name.clone(), system_user: system_user.clone(), resource_type }
            .send(&self.client)
    }

    fn get_all_images(&self, system_user: &SystemUser) -> BrokerResult<BTreeMap<String, String>> {
        RemoteGetAllImagesRequest { provider: self.provider.clone(), cloud_name: self.cloud_name.clone(), system_user: system_user.clone() }.send(&self.client)
    }

    fn get_image(&self, image_id: &str, system_user: &SystemUser) -> BrokerResult<Image> {
        RemoteGetImageRequest {
            provider: self.provider.clone(),
            cloud_name: self.cloud_name.clone(),
            image_id: image_id.to_string(),
            system_user: system_user.clone(),
        }
        .send(&self.client)
    }

    fn create_security_rule(&self, order: &Order, rule: &SecurityRule) -> BrokerResult<String> {
        RemoteCreateSecurityRuleRequest { provider: self.provider.clone(), reference: OrderReference::of(order), security_rule: rule.clone() }
            .send(&self.client)
    }

    fn get_all_security_rules(&self, order: &Order) -> BrokerResult<Vec<SecurityRule>> {
        RemoteGetAllSecurityRulesRequest { provider: self.provider.clone(), reference: OrderReference::of(order) }.send(&self.client)
    }

    fn delete_security_rule(&self, rule_id: &str, system_user: &SystemUser) -> BrokerResult<()> {
        RemoteDeleteSecurityRuleRequest {
            provider: self.provider.clone(),
            cloud_name: self.cloud_name.clone(),
            rule_id: rule_id.to_string(),
            system_user: system_user.clone(),
        }
        .send(&self.client)
    }

    fn generic_request(&self, request: &GenericRequest, system_user: &SystemUser) -> BrokerResult<GenericResponse> {
        RemoteGenericRequest {
            provider: self.provider.clone(),
            cloud_name: self.cloud_name.clone(),
            system_user: system_user.clone(),
            generic_request: request.clone(),
        }
        .send(&self.client)
    }
}
