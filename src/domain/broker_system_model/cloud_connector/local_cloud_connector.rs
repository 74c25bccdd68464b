use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::broker_system_model::cloud_connector::cloud_connector_trait::CloudConnector;
use crate::domain::broker_system_model::cloud_connector::cloud_plugin::CloudPlugin;
use crate::domain::broker_system_model::instance::image::{GenericRequest, GenericResponse, Image};
use crate::domain::broker_system_model::instance::instance::{Instance, InstanceState};
use crate::domain::broker_system_model::instance::quota::Quota;
use crate::domain::broker_system_model::instance::security_rule::SecurityRule;
use crate::domain::broker_system_model::order::order::{Order, OrderState, ResourceType, SystemUser};
use crate::domain::broker_system_model::utils::id::CloudName;
use crate::error::{BrokerError, BrokerResult};

pub struct LocalCloudConnector {
    cloud_name: CloudName,
    plugin: Arc<dyn CloudPlugin>,
}

impl LocalCloudConnector {
    pub fn new(cloud_name: CloudName, plugin: Arc<dyn CloudPlugin>) -> Self {
        LocalCloudConnector { cloud_name, plugin }
    }

    fn require_instance_id<'a>(&self, order: &'a Order) -> BrokerResult<&'a str> {
        order.instance_id().ok_or_else(|| BrokerError::NotFound(format!("Order {} has no instance in cloud {}", order.id(), self.cloud_name)))
    }
}

impl CloudConnector for LocalCloudConnector {
    fn request_instance(&self, order: &Order) -> BrokerResult<Option<String>> {
        let instance_id = self.plugin.request_instance(order)?;
        log::debug!("Cloud {} accepted order {} as instance {}", self.cloud_name, order.id(), instance_id);
        Ok(Some(instance_id))
    }

    fn get_instance(&self, order: &Order) -> BrokerResult<Instance> {
        let mut instance = match order.instance_id() {
            Some(instance_id) => self.plugin.get_instance(instance_id, order)?,
            None => Instance::empty(order.resource_type(), InstanceState::from_order_state(order.state())),
        };

        if order.state() == OrderState::Failed {
            instance.state = InstanceState::Failed;
            if instance.fault_message.is_none() {
                instance.fault_message = order.fault_message().map(str::to_string);
            }
        }

        Ok(instance)
    }

    fn delete_instance(&self, order: &Order) -> BrokerResult<()> {
        match order.instance_id() {
            Some(instance_id) => self.plugin.delete_instance(instance_id, order),
            None => {
                log::debug!("Order {} never got an instance; nothing to delete", order.id());
                Ok(())
            }
        }
    }

    fn stop_instance(&self, order: &Order) -> BrokerResult<()> {
        let instance_id = self.require_instance_id(order)?;
        self.plugin.stop_instance(instance_id, order)
    }

    fn get_user_quota(&self, system_user: &SystemUser, resource_type: ResourceType) -> BrokerResult<Quota> {
        self.plugin.get_user_quota(system_user, resource_type)
    }

    fn get_all_images(&self, system_user: &SystemUser) -> BrokerResult<BTreeMap<String, String>> {
        self.plugin.get_all_images(system_user)
    }

    fn get_image(&self, image_id: &str, system_user: &SystemUser) -> BrokerResult<Image> {
        self.plugin.get_image(image_id, system_user)
    }

    fn create_security_rule(&self, order: &Order, rule: &SecurityRule) -> BrokerResult<String> {
        let instance_id = self.require_instance_id(order)?;
        self.plugin.create_security_rule(instance_id, order, rule)
    }

    fn get_all_security_rules(&self, order: &Order) -> BrokerResult<Vec<SecurityRule>> {
        let instance_id = self.require_instance_id(order)?;
        self.plugin.get_all_security_rules(instance_id, order)
    }

    fn delete_security_rule(&self, rule_id: &str, system_user: &SystemUser) -> BrokerResult<()> {
        self.plugin.delete_security_rule(rule_id, system_user)
    }

    fn generic_request(&self, request: &GenericRequest, system_user: &SystemUser) -> BrokerResult<GenericResponse> {
        self.plugin.generic_request(request, system_user)
    }
}
