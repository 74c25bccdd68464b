use std::collections::BTreeMap;

use crate::domain::broker_system_model::instance::image::{GenericRequest, GenericResponse, Image};
use crate::domain::broker_system_model::instance::instance::Instance;
use crate::domain::broker_system_model::instance::quota::Quota;
use crate::domain::broker_system_model::instance::security_rule::SecurityRule;
use crate::domain::broker_system_model::order::order::{Order, ResourceType, SystemUser};
use crate::error::BrokerResult;

/// What processors and facades use to act on a resource, wherever it lives.
///
/// A connector is bound to one (member, cloud) pair. The local variant calls the
/// cloud plugin directly; the remote variant forwards each call to the providing member.
pub trait CloudConnector: Send + Sync {
    /// Returns the instance id for local orders, `None` for orders delegated to a remote provider.
    fn request_instance(&self, order: &Order) -> BrokerResult<Option<String>>;

    fn get_instance(&self, order: &Order) -> BrokerResult<Instance>;

    fn delete_instance(&self, order: &Order) -> BrokerResult<()>;

    fn stop_instance(&self, order: &Order) -> BrokerResult<()>;

    fn get_user_quota(&self, system_user: &SystemUser, resource_type: ResourceType) -> BrokerResult<Quota>;

    fn get_all_images(&self, system_user: &SystemUser) -> BrokerResult<BTreeMap<String, String>>;

    fn get_image(&self, image_id: &str, system_user: &SystemUser) -> BrokerResult<Image>;

    fn create_security_rule(&self, order: &Order, rule: &SecurityRule) -> BrokerResult<String>;

    fn get_all_security_rules(&self, order: &Order) -> BrokerResult<Vec<SecurityRule>>;

    fn delete_security_rule(&self, rule_id: &str, system_user: &SystemUser) -> BrokerResult<()>;

    fn generic_request(&self, request: &GenericRequest, system_user: &SystemUser) -> BrokerResult<GenericResponse>;
}
