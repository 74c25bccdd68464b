use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::domain::broker_system_model::instance::image::{GenericRequest, GenericResponse, Image};
use crate::domain::broker_system_model::instance::instance::Instance;
use crate::domain::broker_system_model::instance::quota::Quota;
use crate::domain::broker_system_model::instance::security_rule::SecurityRule;
use crate::domain::broker_system_model::order::order::{Order, ResourceType, SystemUser};
use crate::domain::broker_system_model::utils::id::CloudName;
use crate::error::{BrokerError, BrokerResult};

/// Narrow contract of a concrete cloud (OpenStack, AWS, a simulator ...).
///
/// Instance-scoped calls receive the provider-assigned instance id next to the order.
pub trait CloudPlugin: Send + Sync {
    fn request_instance(&self, order: &Order) -> BrokerResult<String>;

    fn get_instance(&self, instance_id: &str, order: &Order) -> BrokerResult<Instance>;

    /// Fails with `NotFound` if the instance no longer exists.
    fn delete_instance(&self, instance_id: &str, order: &Order) -> BrokerResult<()>;

    fn stop_instance(&self, instance_id: &str, order: &Order) -> BrokerResult<()>;

    fn get_user_quota(&self, system_user: &SystemUser, resource_type: ResourceType) -> BrokerResult<Quota>;

    fn get_all_images(&self, system_user: &SystemUser) -> BrokerResult<BTreeMap<String, String>>;

    fn get_image(&self, image_id: &str, system_user: &SystemUser) -> BrokerResult<Image>;

    fn create_security_rule(&self, instance_id: &str, order: &Order, rule: &SecurityRule) -> BrokerResult<String>;

    fn get_all_security_rules(&self, instance_id: &str, order: &Order) -> BrokerResult<Vec<SecurityRule>>;

    fn delete_security_rule(&self, rule_id: &str, system_user: &SystemUser) -> BrokerResult<()>;

    fn generic_request(&self, request: &GenericRequest, system_user: &SystemUser) -> BrokerResult<GenericResponse>;
}

/// Cloud plugins available at this member, by cloud name.
#[derive(Clone, Default)]
pub struct CloudPluginRegistry {
    plugins: HashMap<CloudName, Arc<dyn CloudPlugin>>,
}

impl CloudPluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, cloud_name: CloudName, plugin: Arc<dyn CloudPlugin>) {
        log::debug!("Registered cloud plugin for cloud {}", cloud_name);
        self.plugins.insert(cloud_name, plugin);
    }

    pub fn with_plugin(mut self, cloud_name: CloudName, plugin: Arc<dyn CloudPlugin>) -> Self {
        self.register(cloud_name, plugin);
        self
    }

    pub fn get(&self, cloud_name: &CloudName) -> BrokerResult<Arc<dyn CloudPlugin>> {
        self.plugins.get(cloud_name).cloned().ok_or_else(|| BrokerError::NotFound(format!("Cloud {} is not served by this member", cloud_name)))
    }

    /// Sorted cloud names.
    pub fn cloud_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.plugins.keys().map(|name| name.to_string()).collect();
        names.sort();
        names
    }
}
