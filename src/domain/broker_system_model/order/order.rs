use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::broker_system_model::order::order_payload::OrderPayload;
use crate::domain::broker_system_model::utils::id::{CloudName, MemberId, OrderId};
use crate::error::{BrokerError, ConversionError};

/// Lifecycle state of an order.
///
/// ```text
/// OPEN      -> SPAWNING | PENDING | FAILED
/// PENDING   -> FULFILLED | FAILED
/// SPAWNING  -> FULFILLED | FAILED
/// FULFILLED -> FAILED
/// any non-terminal -> CLOSED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    /// Accepted by the broker, waiting for the Open processor.
    Open,

    /// Delegated to a remote provider, waiting for its notification.
    Pending,

    /// The local cloud accepted the request and is provisioning the instance.
    Spawning,

    /// The instance is active (and reachable, for compute).
    Fulfilled,

    /// Provisioning or health monitoring failed. Only deletion leaves this state.
    Failed,

    /// Deleted by its owner. Terminal.
    Closed,
}

impl OrderState {
    /// States backed by an `OrderStateList`. CLOSED orders are not held anywhere.
    pub const LISTED: [OrderState; 5] = [OrderState::Open, OrderState::Pending, OrderState::Spawning, OrderState::Fulfilled, OrderState::Failed];

    pub fn can_transition_to(self, target: OrderState) -> bool {
        use OrderState::*;

        match (self, target) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Open, Spawning | Pending | Failed) => true,
            (Pending, Fulfilled | Failed) => true,
            (Spawning, Fulfilled | Failed) => true,
            (Fulfilled, Failed) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == OrderState::Closed
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderState::Open => "OPEN",
            OrderState::Pending => "PENDING",
            OrderState::Spawning => "SPAWNING",
            OrderState::Fulfilled => "FULFILLED",
            OrderState::Failed => "FAILED",
            OrderState::Closed => "CLOSED",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Compute,
    Network,
    Volume,
    Attachment,
    PublicIp,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceType::Compute => "COMPUTE",
            ResourceType::Network => "NETWORK",
            ResourceType::Volume => "VOLUME",
            ResourceType::Attachment => "ATTACHMENT",
            ResourceType::PublicIp => "PUBLIC_IP",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ResourceType {
    type Err = ConversionError;

    fn from_str(resource_type: &str) -> Result<ResourceType, Self::Err> {
        match resource_type.to_ascii_uppercase().as_str() {
            "COMPUTE" => Ok(ResourceType::Compute),
            "NETWORK" => Ok(ResourceType::Network),
            "VOLUME" => Ok(ResourceType::Volume),
            "ATTACHMENT" => Ok(ResourceType::Attachment),
            "PUBLIC_IP" | "PUBLICIP" => Ok(ResourceType::PublicIp),
            _ => Err(ConversionError::UnknownResourceType(resource_type.to_string())),
        }
    }
}

/// Identity of the end user an order runs for. Forwarded between members, never interpreted by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemUser {
    pub user_id: String,
    pub user_name: String,
    pub identity_provider: String,
}

impl SystemUser {
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>, identity_provider: impl Into<String>) -> Self {
        SystemUser { user_id: user_id.into(), user_name: user_name.into(), identity_provider: identity_provider.into() }
    }

    pub fn is_same_user(&self, other: &SystemUser) -> bool {
        self.user_id == other.user_id && self.identity_provider == other.identity_provider
    }
}

/// A request for one cloud resource plus its lifecycle bookkeeping.
///
/// `id`, the resource type, `requester` and `provider` never change after construction.
/// The state is only rewritten by the `OrderStateTransitioner`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    state: OrderState,
    requester: MemberId,
    provider: MemberId,
    cloud_name: CloudName,
    system_user: SystemUser,
    instance_id: Option<String>,
    /// Set once a remote provider accepted the create-order request.
    #[serde(default)]
    delegated: bool,
    fault_message: Option<String>,
    reachability_attempts: u32,
    created_at: DateTime<Utc>,
    payload: OrderPayload,
}

impl Order {
    pub fn new(requester: MemberId, provider: MemberId, cloud_name: CloudName, system_user: SystemUser, payload: OrderPayload) -> Self {
        Order {
            id: OrderId::random(),
            state: OrderState::Open,
            requester,
            provider,
            cloud_name,
            system_user,
            instance_id: None,
            delegated: false,
            fault_message: None,
            reachability_attempts: 0,
            created_at: Utc::now(),
            payload,
        }
    }

    /// Replaces the generated id. Only meaningful before the order is handed to the broker.
    pub fn with_id(mut self, id: OrderId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> &OrderId {
        &self.id
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn resource_type(&self) -> ResourceType {
        self.payload.resource_type()
    }

    pub fn requester(&self) -> &MemberId {
        &self.requester
    }

    pub fn provider(&self) -> &MemberId {
        &self.provider
    }

    pub fn cloud_name(&self) -> &CloudName {
        &self.cloud_name
    }

    pub fn system_user(&self) -> &SystemUser {
        &self.system_user
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    /// True when a remote provider holds (or held) a resource for this order.
    pub fn is_delegated(&self) -> bool {
        self.delegated
    }

    pub fn fault_message(&self) -> Option<&str> {
        self.fault_message.as_deref()
    }

    pub fn reachability_attempts(&self) -> u32 {
        self.reachability_attempts
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn payload(&self) -> &OrderPayload {
        &self.payload
    }

    pub fn is_provider_local(&self, local_member: &MemberId) -> bool {
        &self.provider == local_member
    }

    pub fn is_requester_remote(&self, local_member: &MemberId) -> bool {
        &self.requester != local_member
    }

    pub(crate) fn set_state(&mut self, state: OrderState) {
        self.state = state;
    }

    pub(crate) fn set_instance_id(&mut self, instance_id: impl Into<String>) {
        self.instance_id = Some(instance_id.into());
    }

    pub(crate) fn clear_instance_id(&mut self) {
        self.instance_id = None;
    }

    pub(crate) fn mark_delegated(&mut self) {
        self.delegated = true;
    }

    /// Records the first failure cause. Later causes are ignored.
    pub(crate) fn set_once_fault_message(&mut self, message: impl Into<String>) {
        if self.fault_message.is_none() {
            self.fault_message = Some(message.into());
        }
    }

    pub(crate) fn increment_reachability_attempts(&mut self) -> u32 {
        self.reachability_attempts += 1;
        self.reachability_attempts
    }

    /// Copies the provider-side fields of a remote copy into this one.
    pub(crate) fn update_from_remote(&mut self, remote: &Order) {
        if let Some(instance_id) = remote.instance_id() {
            self.instance_id = Some(instance_id.to_string());
        }
        if let Some(message) = remote.fault_message() {
            self.set_once_fault_message(message);
        }
    }
}

/// Shared handle of an order held by the lists and the active store.
///
/// The embedded mutex is the per-order critical section: a processor or facade
/// acquires it, re-checks the state and releases it once its transition is done.
#[derive(Debug, Clone)]
pub struct OrderHandle {
    id: OrderId,
    inner: Arc<Mutex<Order>>,
}

impl OrderHandle {
    pub fn new(order: Order) -> Self {
        OrderHandle { id: order.id().clone(), inner: Arc::new(Mutex::new(order)) }
    }

    pub fn id(&self) -> &OrderId {
        &self.id
    }

    pub fn lock(&self) -> OrderGuard<'_> {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        OrderGuard { handle: self, order: guard }
    }

    /// Copy of the current order, taken under the lock.
    pub fn snapshot(&self) -> Order {
        self.lock().clone()
    }

    pub fn state(&self) -> OrderState {
        self.lock().state()
    }

    pub fn ptr_eq(&self, other: &OrderHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Exclusive access to one order. Dereferences to the `Order`.
pub struct OrderGuard<'a> {
    handle: &'a OrderHandle,
    order: MutexGuard<'a, Order>,
}

impl<'a> OrderGuard<'a> {
    pub fn handle(&self) -> &'a OrderHandle {
        self.handle
    }

    /// Fails with `NotFound` when the order is already closed.
    pub fn ensure_not_closed(&self) -> Result<(), BrokerError> {
        if self.order.state().is_terminal() {
            return Err(BrokerError::NotFound(format!("Order {} is closed", self.order.id())));
        }
        Ok(())
    }
}

impl Deref for OrderGuard<'_> {
    type Target = Order;

    fn deref(&self) -> &Order {
        &self.order
    }
}

impl DerefMut for OrderGuard<'_> {
    fn deref_mut(&mut self) -> &mut Order {
        &mut self.order
    }
}
