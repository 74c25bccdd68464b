#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use federation_broker::domain::broker_system_model::broker_config::BrokerConfig;
use federation_broker::domain::broker_system_model::cloud_connector::cloud_plugin::{CloudPlugin, CloudPluginRegistry};
use federation_broker::domain::broker_system_model::cloud_connector::reachability::ReachabilityChecker;
use federation_broker::domain::broker_system_model::facade::application_facade::OrderRequest;
use federation_broker::domain::broker_system_model::instance::image::{GenericRequest, GenericResponse, Image};
use federation_broker::domain::broker_system_model::instance::instance::{Instance, InstanceDetails, InstanceState};
use federation_broker::domain::broker_system_model::instance::quota::{Allocation, Quota};
use federation_broker::domain::broker_system_model::instance::security_rule::SecurityRule;
use federation_broker::domain::broker_system_model::intercomponent::transport::LoopbackNetwork;
use federation_broker::domain::broker_system_model::member::Member;
use federation_broker::domain::broker_system_model::order::order::{Order, OrderHandle, ResourceType, SystemUser};
use federation_broker::domain::broker_system_model::order::order_payload::{AllocationMode, ComputeSpec, NetworkSpec, OrderPayload, VolumeSpec};
use federation_broker::domain::broker_system_model::utils::id::{CloudName, MemberId, OrderId};
use federation_broker::error::{BrokerError, BrokerResult};

pub const CLOUD: &str = "cloud";

/// Cloud plugin whose instance states are set by the test.
///
/// Instance ids are `i-1`, `i-2`, ... in request order.
pub struct ScriptedCloud {
    initial_state: Mutex<InstanceState>,
    instances: Mutex<HashMap<String, InstanceState>>,
    rules: Mutex<Vec<SecurityRule>>,
    next_id: AtomicUsize,
    fail_requests: AtomicBool,
    pub requests: AtomicUsize,
    pub deletions: AtomicUsize,
}

impl ScriptedCloud {
    pub fn new() -> Self {
        ScriptedCloud {
            initial_state: Mutex::new(InstanceState::Ready),
            instances: Mutex::new(HashMap::new()),
            rules: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
            fail_requests: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
            deletions: AtomicUsize::new(0),
        }
    }

    pub fn set_initial_state(&self, state: InstanceState) {
        *self.initial_state.lock().unwrap() = state;
    }

    pub fn set_state(&self, instance_id: &str, state: InstanceState) {
        self.instances.lock().unwrap().insert(instance_id.to_string(), state);
    }

    pub fn state_of(&self, instance_id: &str) -> Option<InstanceState> {
        self.instances.lock().unwrap().get(instance_id).copied()
    }

    pub fn forget(&self, instance_id: &str) {
        self.instances.lock().unwrap().remove(instance_id);
    }

    pub fn fail_requests(&self, fail: bool) {
        self.fail_requests.store(fail, Ordering::SeqCst);
    }

    fn details(order: &Order) -> InstanceDetails {
        match order.payload() {
            OrderPayload::Compute(spec) => InstanceDetails::Compute {
                hostname: spec.name.clone(),
                vcpu: spec.vcpu,
                memory_mb: spec.memory_mb,
                disk_gb: spec.disk_gb,
                ip_addresses: vec!["10.0.0.1".to_string()],
            },
            OrderPayload::Volume(spec) => InstanceDetails::Volume { size_gb: spec.size_gb },
            OrderPayload::Network(spec) => InstanceDetails::Network { cidr: spec.cidr.clone(), gateway: spec.gateway.clone(), allocation_mode: spec.allocation_mode },
            _ => InstanceDetails::Empty { resource_type: order.resource_type() },
        }
    }
}

impl CloudPlugin for ScriptedCloud {
    fn request_instance(&self, _order: &Order) -> BrokerResult<String> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.fail_requests.load(Ordering::SeqCst) {
            return Err(BrokerError::Unexpected("cloud refused the request".to_string()));
        }

        let instance_id = format!("i-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let state = *self.initial_state.lock().unwrap();
        self.instances.lock().unwrap().insert(instance_id.clone(), state);
        Ok(instance_id)
    }

    fn get_instance(&self, instance_id: &str, order: &Order) -> BrokerResult<Instance> {
        let state = self.state_of(instance_id).ok_or_else(|| BrokerError::NotFound(format!("no instance {}", instance_id)))?;
        Ok(Instance::new(instance_id, state, Self::details(order)))
    }

    fn delete_instance(&self, instance_id: &str, _order: &Order) -> BrokerResult<()> {
        self.deletions.fetch_add(1, Ordering::SeqCst);
        self.instances.lock().unwrap().remove(instance_id).map(|_| ()).ok_or_else(|| BrokerError::NotFound(format!("no instance {}", instance_id)))
    }

    fn stop_instance(&self, instance_id: &str, _order: &Order) -> BrokerResult<()> {
        self.set_state(instance_id, InstanceState::Stopped);
        Ok(())
    }

    fn get_user_quota(&self, _system_user: &SystemUser, resource_type: ResourceType) -> BrokerResult<Quota> {
        let total = match resource_type {
            ResourceType::Volume => Allocation::Volume { instances: 10, storage_gb: 100 },
            other => Allocation::zero(other),
        };
        Ok(Quota::new(total, Allocation::zero(resource_type)))
    }

    fn get_all_images(&self, _system_user: &SystemUser) -> BrokerResult<BTreeMap<String, String>> {
        Ok(BTreeMap::from([("img-1".to_string(), "Debian".to_string())]))
    }

    fn get_image(&self, image_id: &str, _system_user: &SystemUser) -> BrokerResult<Image> {
        if image_id != "img-1" {
            return Err(BrokerError::NotFound(format!("no image {}", image_id)));
        }
        Ok(Image { id: "img-1".to_string(), name: "Debian".to_string(), size: 1024, min_disk: 1, min_ram: 256, status: "active".to_string() })
    }

    fn create_security_rule(&self, instance_id: &str, _order: &Order, rule: &SecurityRule) -> BrokerResult<String> {
        let mut rules = self.rules.lock().unwrap();
        let rule_id = format!("{}/{}", instance_id, rules.len() + 1);
        let mut stored = rule.clone();
        stored.id = Some(rule_id.clone());
        rules.push(stored);
        Ok(rule_id)
    }

    fn get_all_security_rules(&self, instance_id: &str, _order: &Order) -> BrokerResult<Vec<SecurityRule>> {
        let prefix = format!("{}/", instance_id);
        Ok(self.rules.lock().unwrap().iter().filter(|rule| rule.id.as_deref().is_some_and(|id| id.starts_with(&prefix))).cloned().collect())
    }

    fn delete_security_rule(&self, rule_id: &str, _system_user: &SystemUser) -> BrokerResult<()> {
        let mut rules = self.rules.lock().unwrap();
        let before = rules.len();
        rules.retain(|rule| rule.id.as_deref() != Some(rule_id));
        if rules.len() == before { Err(BrokerError::NotFound(format!("no rule {}", rule_id))) } else { Ok(()) }
    }

    fn generic_request(&self, request: &GenericRequest, _system_user: &SystemUser) -> BrokerResult<GenericResponse> {
        Ok(GenericResponse { content: format!("{} {}", request.method, request.url) })
    }
}

pub struct StubReachability {
    reachable: AtomicBool,
}

impl StubReachability {
    pub fn new(reachable: bool) -> Self {
        StubReachability { reachable: AtomicBool::new(reachable) }
    }

    pub fn set(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

impl ReachabilityChecker for StubReachability {
    fn is_reachable(&self, _order: &Order, _instance: &Instance) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}

pub struct TestMember {
    pub member: Member,
    pub cloud: Arc<ScriptedCloud>,
    pub reachability: Arc<StubReachability>,
}

impl TestMember {
    pub fn id(&self) -> MemberId {
        self.member.id().clone()
    }

    pub fn handle(&self, order_id: &OrderId) -> OrderHandle {
        self.member.context().controller.get_order(order_id).unwrap()
    }
}

pub fn test_config(member_id: &str) -> BrokerConfig {
    let mut config = BrokerConfig::new(MemberId::new(member_id));
    config.default_cloud = Some(CloudName::new(CLOUD));
    config.open_interval = Duration::from_millis(20);
    config.spawning_interval = Duration::from_millis(20);
    config.fulfilled_interval = Duration::from_millis(50);
    config.rpc_timeout = Duration::from_secs(2);
    config.max_reachability_attempts = 3;
    config
}

/// Members connected through one loopback network, each with its own scripted cloud named `cloud`.
pub fn federation(member_ids: &[&str]) -> (Arc<LoopbackNetwork>, Vec<TestMember>) {
    let network = Arc::new(LoopbackNetwork::new());
    let members = member_ids
        .iter()
        .map(|member_id| {
            let cloud = Arc::new(ScriptedCloud::new());
            let reachability = Arc::new(StubReachability::new(true));
            let plugins = CloudPluginRegistry::new().with_plugin(CloudName::new(CLOUD), cloud.clone());
            let member = Member::new(test_config(member_id), plugins, reachability.clone(), network.clone());
            network.register(member.id().clone(), member.router());
            TestMember { member, cloud, reachability }
        })
        .collect();
    (network, members)
}

pub fn single_member() -> TestMember {
    federation(&["m1"]).1.remove(0)
}

pub fn user() -> SystemUser {
    SystemUser::new("u-1", "alice", "ldap")
}

pub fn other_user() -> SystemUser {
    SystemUser::new("u-2", "bob", "ldap")
}

pub fn volume_request(provider: Option<&str>) -> OrderRequest {
    OrderRequest {
        provider: provider.map(MemberId::new),
        cloud_name: None,
        payload: OrderPayload::Volume(VolumeSpec { name: "data".to_string(), size_gb: 10 }),
    }
}

pub fn compute_request(provider: Option<&str>) -> OrderRequest {
    OrderRequest {
        provider: provider.map(MemberId::new),
        cloud_name: None,
        payload: OrderPayload::Compute(ComputeSpec {
            name: "vm".to_string(),
            vcpu: 2,
            memory_mb: 2048,
            disk_gb: 20,
            image_id: "img-1".to_string(),
            public_key: None,
            network_ids: vec![],
        }),
    }
}

pub fn network_request(cidr: &str) -> OrderRequest {
    OrderRequest {
        provider: None,
        cloud_name: None,
        payload: OrderPayload::Network(NetworkSpec { name: "net".to_string(), cidr: cidr.to_string(), gateway: None, allocation_mode: AllocationMode::Dynamic }),
    }
}

/// Polls `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
