use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::domain::broker_system_model::cloud_connector::cloud_plugin::CloudPlugin;
use crate::domain::broker_system_model::instance::image::{GenericRequest, GenericResponse, Image};
use crate::domain::broker_system_model::instance::instance::{Instance, InstanceDetails, InstanceState};
use crate::domain::broker_system_model::instance::quota::{Allocation, Quota};
use crate::domain::broker_system_model::instance::security_rule::SecurityRule;
use crate::domain::broker_system_model::order::order::{Order, ResourceType, SystemUser};
use crate::domain::broker_system_model::order::order_payload::OrderPayload;
use crate::domain::broker_system_model::utils::id::CloudName;
use crate::error::{BrokerError, BrokerResult};

#[derive(Debug)]
struct SimulatedInstance {
    owner: SystemUser,
    state: InstanceState,
    polls: u32,
    details: InstanceDetails,
    allocation: Allocation,
}

#[derive(Debug, Default)]
struct CloudState {
    instances: HashMap<String, SimulatedInstance>,
    rules: HashMap<String, Vec<SecurityRule>>,
    next_rule: u64,
}

/// Simulated cloud used by the broker binary.
///
/// Instances are created in state CREATING and become READY after
/// `provisioning_polls` status reads. Security rule ids have the form `<instanceId>/<sequence>`.
#[derive(Debug)]
pub struct InMemoryCloud {
    cloud_name: CloudName,
    provisioning_polls: u32,
    images: BTreeMap<String, Image>,
    state: Mutex<CloudState>,
}

impl InMemoryCloud {
    pub fn new(cloud_name: CloudName, provisioning_polls: u32) -> Self {
        let images = [("ubuntu-24.04", "Ubuntu 24.04 LTS", 2_361_393_152u64), ("debian-12", "Debian 12", 1_932_735_283u64)]
            .into_iter()
            .map(|(id, name, size)| (id.to_string(), Image { id: id.to_string(), name: name.to_string(), size, min_disk: 10, min_ram: 512, status: "active".to_string() }))
            .collect();

        InMemoryCloud { cloud_name, provisioning_polls, images, state: Mutex::new(CloudState::default()) }
    }

    fn lock(&self) -> MutexGuard<'_, CloudState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn total_for(resource_type: ResourceType) -> Allocation {
        match resource_type {
            ResourceType::Compute => Allocation::Compute { instances: 20, vcpu: 64, memory_mb: 131_072, disk_gb: 2_000 },
            ResourceType::Network => Allocation::Network { instances: 10 },
            ResourceType::Volume => Allocation::Volume { instances: 40, storage_gb: 4_000 },
            ResourceType::Attachment => Allocation::Attachment { instances: 40 },
            ResourceType::PublicIp => Allocation::PublicIp { instances: 10 },
        }
    }

    fn used_by(state: &CloudState, system_user: &SystemUser, resource_type: ResourceType) -> Allocation {
        state
            .instances
            .values()
            .filter(|instance| instance.owner.is_same_user(system_user) && instance.allocation.resource_type() == resource_type)
            .fold(Allocation::zero(resource_type), |used, instance| used.add(instance.allocation))
    }

    fn details_for(payload: &OrderPayload) -> InstanceDetails {
        match payload {
            OrderPayload::Compute(spec) => {
                let mut rng = rand::rng();
                let address = format!("10.{}.{}.{}", rng.random_range(0..=255), rng.random_range(0..=255), rng.random_range(2..=254));
                InstanceDetails::Compute {
                    hostname: spec.name.clone(),
                    vcpu: spec.vcpu,
                    memory_mb: spec.memory_mb,
                    disk_gb: spec.disk_gb,
                    ip_addresses: vec![address],
                }
            }
            OrderPayload::Network(spec) => InstanceDetails::Network { cidr: spec.cidr.clone(), gateway: spec.gateway.clone(), allocation_mode: spec.allocation_mode },
            OrderPayload::Volume(spec) => InstanceDetails::Volume { size_gb: spec.size_gb },
            OrderPayload::Attachment(spec) => InstanceDetails::Attachment {
                compute_id: spec.compute_order_id.to_string(),
                volume_id: spec.volume_order_id.to_string(),
                device: spec.device.clone(),
            },
            OrderPayload::PublicIp(spec) => {
                let mut rng = rand::rng();
                let address = format!("203.0.113.{}", rng.random_range(1..=254));
                InstanceDetails::PublicIp { ip: address, compute_id: spec.compute_order_id.to_string() }
            }
        }
    }

    fn parse_rule_id(rule_id: &str) -> BrokerResult<(&str, u64)> {
        let fields: Vec<&str> = rule_id.split('/').collect();
        let [instance_id, sequence] = fields.as_slice() else {
            return Err(BrokerError::InvalidParameter(format!("Security rule id '{}' must have two fields", rule_id)));
        };

        let sequence = sequence.parse().map_err(|_| BrokerError::InvalidParameter(format!("Security rule id '{}' has a non-numeric sequence", rule_id)))?;
        Ok((instance_id, sequence))
    }
}

impl CloudPlugin for InMemoryCloud {
    fn request_instance(&self, order: &Order) -> BrokerResult<String> {
        let resource_type = order.resource_type();
        let allocation = Allocation::of_payload(order.payload());

        let mut state = self.lock();
        let used = Self::used_by(&state, order.system_user(), resource_type);
        if used.add(allocation).exceeds(Self::total_for(resource_type)) {
            return Err(BrokerError::Unauthorized(format!("Quota for {} exceeded in cloud {}", resource_type, self.cloud_name)));
        }

        let instance_id = format!("{}-{}", resource_type.to_string().to_lowercase(), &Uuid::new_v4().simple().to_string()[..12]);
        let instance =
            SimulatedInstance { owner: order.system_user().clone(), state: InstanceState::Creating, polls: 0, details: Self::details_for(order.payload()), allocation };
        state.instances.insert(instance_id.clone(), instance);

        log::info!("Cloud {}: created {} for order {}", self.cloud_name, instance_id, order.id());
        Ok(instance_id)
    }

    fn get_instance(&self, instance_id: &str, _order: &Order) -> BrokerResult<Instance> {
        let mut state = self.lock();
        let instance = state.instances.get_mut(instance_id).ok_or_else(|| BrokerError::NotFound(format!("Instance {} does not exist", instance_id)))?;

        instance.polls += 1;
        if instance.state == InstanceState::Creating && instance.polls >= self.provisioning_polls {
            instance.state = InstanceState::Ready;
        }

        Ok(Instance::new(instance_id, instance.state, instance.details.clone()))
    }

    fn delete_instance(&self, instance_id: &str, _order: &Order) -> BrokerResult<()> {
        let mut state = self.lock();
        state.instances.remove(instance_id).ok_or_else(|| BrokerError::NotFound(format!("Instance {} does not exist", instance_id)))?;
        state.rules.remove(instance_id);
        log::info!("Cloud {}: deleted {}", self.cloud_name, instance_id);
        Ok(())
    }

    fn stop_instance(&self, instance_id: &str, _order: &Order) -> BrokerResult<()> {
        let mut state = self.lock();
        let instance = state.instances.get_mut(instance_id).ok_or_else(|| BrokerError::NotFound(format!("Instance {} does not exist", instance_id)))?;
        if instance.state != InstanceState::Ready {
            return Err(BrokerError::InvalidParameter(format!("Instance {} is {} and cannot be stopped", instance_id, instance.state)));
        }
        instance.state = InstanceState::Stopped;
        Ok(())
    }

    fn get_user_quota(&self, system_user: &SystemUser, resource_type: ResourceType) -> BrokerResult<Quota> {
        let state = self.lock();
        Ok(Quota::new(Self::total_for(resource_type), Self::used_by(&state, system_user, resource_type)))
    }

    fn get_all_images(&self, _system_user: &SystemUser) -> BrokerResult<BTreeMap<String, String>> {
        Ok(self.images.values().map(|image| (image.id.clone(), image.name.clone())).collect())
    }

    fn get_image(&self, image_id: &str, _system_user: &SystemUser) -> BrokerResult<Image> {
        self.images.get(image_id).cloned().ok_or_else(|| BrokerError::NotFound(format!("Image {} does not exist in cloud {}", image_id, self.cloud_name)))
    }

    fn create_security_rule(&self, instance_id: &str, _order: &Order, rule: &SecurityRule) -> BrokerResult<String> {
        rule.validate()?;

        let mut state = self.lock();
        if !state.instances.contains_key(instance_id) {
            return Err(BrokerError::NotFound(format!("Instance {} does not exist", instance_id)));
        }

        state.next_rule += 1;
        let rule_id = format!("{}/{}", instance_id, state.next_rule);
        let mut stored = rule.clone();
        stored.id = Some(rule_id.clone());
        state.rules.entry(instance_id.to_string()).or_default().push(stored);
        Ok(rule_id)
    }

    fn get_all_security_rules(&self, instance_id: &str, _order: &Order) -> BrokerResult<Vec<SecurityRule>> {
        let state = self.lock();
        if !state.instances.contains_key(instance_id) {
            return Err(BrokerError::NotFound(format!("Instance {} does not exist", instance_id)));
        }
        Ok(state.rules.get(instance_id).cloned().unwrap_or_default())
    }

    fn delete_security_rule(&self, rule_id: &str, _system_user: &SystemUser) -> BrokerResult<()> {
        let (instance_id, _) = Self::parse_rule_id(rule_id)?;

        let mut state = self.lock();
        let rules = state.rules.get_mut(instance_id).ok_or_else(|| BrokerError::NotFound(format!("Security rule {} does not exist", rule_id)))?;
        let before = rules.len();
        rules.retain(|rule| rule.id.as_deref() != Some(rule_id));
        if rules.len() == before {
            return Err(BrokerError::NotFound(format!("Security rule {} does not exist", rule_id)));
        }
        Ok(())
    }

    fn generic_request(&self, request: &GenericRequest, _system_user: &SystemUser) -> BrokerResult<GenericResponse> {
        if request.url.trim().is_empty() {
            return Err(BrokerError::InvalidParameter("Generic request without url".to_string()));
        }
        Ok(GenericResponse { content: format!("{} {} handled by {}", request.method, request.url, self.cloud_name) })
    }
}
