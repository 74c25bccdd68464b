use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::broker_system_model::order::order::{OrderState, ResourceType};
use crate::domain::broker_system_model::order::order_payload::AllocationMode;
use crate::domain::broker_system_model::utils::id::{CloudName, MemberId, OrderId};

/// State of a resource as reported by the cloud that holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceState {
    Dispatched,
    Pending,
    Spawning,
    Creating,
    Ready,
    Busy,
    Stopped,
    Failed,
    Unknown,
}

impl InstanceState {
    pub fn is_ready(self) -> bool {
        self == InstanceState::Ready
    }

    pub fn is_failed(self) -> bool {
        self == InstanceState::Failed
    }

    /// Cloud-side view of an order that has no instance to ask about yet.
    pub fn from_order_state(state: OrderState) -> Self {
        match state {
            OrderState::Open => InstanceState::Dispatched,
            OrderState::Pending => InstanceState::Pending,
            OrderState::Spawning => InstanceState::Spawning,
            OrderState::Fulfilled => InstanceState::Ready,
            OrderState::Failed => InstanceState::Failed,
            OrderState::Closed => InstanceState::Unknown,
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InstanceDetails {
    #[serde(rename_all = "camelCase")]
    Compute { hostname: String, vcpu: u32, memory_mb: u32, disk_gb: u32, ip_addresses: Vec<String> },
    #[serde(rename_all = "camelCase")]
    Network { cidr: String, gateway: Option<String>, allocation_mode: AllocationMode },
    #[serde(rename_all = "camelCase")]
    Volume { size_gb: u32 },
    #[serde(rename_all = "camelCase")]
    Attachment { compute_id: String, volume_id: String, device: Option<String> },
    #[serde(rename_all = "camelCase")]
    PublicIp { ip: String, compute_id: String },
    /// Placeholder for orders whose resource does not exist (yet).
    #[serde(rename_all = "camelCase")]
    Empty { resource_type: ResourceType },
}

impl InstanceDetails {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            InstanceDetails::Compute { .. } => ResourceType::Compute,
            InstanceDetails::Network { .. } => ResourceType::Network,
            InstanceDetails::Volume { .. } => ResourceType::Volume,
            InstanceDetails::Attachment { .. } => ResourceType::Attachment,
            InstanceDetails::PublicIp { .. } => ResourceType::PublicIp,
            InstanceDetails::Empty { resource_type } => *resource_type,
        }
    }
}

/// Provider-side realization of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: Option<String>,
    pub state: InstanceState,
    pub fault_message: Option<String>,
    pub details: InstanceDetails,
}

impl Instance {
    pub fn new(id: impl Into<String>, state: InstanceState, details: InstanceDetails) -> Self {
        Instance { id: Some(id.into()), state, fault_message: None, details }
    }

    pub fn empty(resource_type: ResourceType, state: InstanceState) -> Self {
        Instance { id: None, state, fault_message: None, details: InstanceDetails::Empty { resource_type } }
    }

    pub fn resource_type(&self) -> ResourceType {
        self.details.resource_type()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.details, InstanceDetails::Empty { .. })
    }
}

/// Lightweight per-order status used for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStatus {
    pub order_id: OrderId,
    pub name: Option<String>,
    pub provider: MemberId,
    pub cloud_name: CloudName,
    pub state: InstanceState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_state_mapping() {
        assert_eq!(InstanceState::from_order_state(OrderState::Open), InstanceState::Dispatched);
        assert_eq!(InstanceState::from_order_state(OrderState::Pending), InstanceState::Pending);
        assert_eq!(InstanceState::from_order_state(OrderState::Fulfilled), InstanceState::Ready);
        assert!(InstanceState::from_order_state(OrderState::Failed).is_failed());
    }

    #[test]
    fn test_empty_instance_keeps_resource_type() {
        let instance = Instance::empty(ResourceType::Network, InstanceState::Pending);
        assert!(instance.is_empty());
        assert_eq!(instance.resource_type(), ResourceType::Network);
        assert!(instance.id.is_none());
    }
}
