use serde::{Deserialize, Serialize};

use crate::domain::broker_system_model::order::order::ResourceType;
use crate::domain::broker_system_model::order::order_payload::OrderPayload;

/// Resources of one type, either granted to a user or held by them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Allocation {
    #[serde(rename_all = "camelCase")]
    Compute { instances: u32, vcpu: u32, memory_mb: u32, disk_gb: u32 },
    #[serde(rename_all = "camelCase")]
    Network { instances: u32 },
    #[serde(rename_all = "camelCase")]
    Volume { instances: u32, storage_gb: u32 },
    #[serde(rename_all = "camelCase")]
    Attachment { instances: u32 },
    #[serde(rename_all = "camelCase")]
    PublicIp { instances: u32 },
}

impl Allocation {
    pub fn zero(resource_type: ResourceType) -> Self {
        match resource_type {
            ResourceType::Compute => Allocation::Compute { instances: 0, vcpu: 0, memory_mb: 0, disk_gb: 0 },
            ResourceType::Network => Allocation::Network { instances: 0 },
            ResourceType::Volume => Allocation::Volume { instances: 0, storage_gb: 0 },
            ResourceType::Attachment => Allocation::Attachment { instances: 0 },
            ResourceType::PublicIp => Allocation::PublicIp { instances: 0 },
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        match self {
            Allocation::Compute { .. } => ResourceType::Compute,
            Allocation::Network { .. } => ResourceType::Network,
            Allocation::Volume { .. } => ResourceType::Volume,
            Allocation::Attachment { .. } => ResourceType::Attachment,
            Allocation::PublicIp { .. } => ResourceType::PublicIp,
        }
    }

    /// Resources consumed by one order.
    pub fn of_payload(payload: &OrderPayload) -> Allocation {
        match payload {
            OrderPayload::Compute(spec) => Allocation::Compute { instances: 1, vcpu: spec.vcpu, memory_mb: spec.memory_mb, disk_gb: spec.disk_gb },
            OrderPayload::Network(_) => Allocation::Network { instances: 1 },
            OrderPayload::Volume(spec) => Allocation::Volume { instances: 1, storage_gb: spec.size_gb },
            OrderPayload::Attachment(_) => Allocation::Attachment { instances: 1 },
            OrderPayload::PublicIp(_) => Allocation::PublicIp { instances: 1 },
        }
    }

    /// Component-wise sum. Allocations of different types leave `self` unchanged.
    pub fn add(self, other: Allocation) -> Allocation {
        self.combine(other, u32::saturating_add)
    }

    /// Component-wise difference, floored at zero.
    pub fn subtract(self, other: Allocation) -> Allocation {
        self.combine(other, u32::saturating_sub)
    }

    /// True when any component is above the same component of `limit`.
    pub fn exceeds(self, limit: Allocation) -> bool {
        self.resource_type() == limit.resource_type() && self.subtract(limit) != Allocation::zero(self.resource_type())
    }

    fn combine(self, other: Allocation, op: fn(u32, u32) -> u32) -> Allocation {
        use Allocation::*;

        match (self, other) {
            (Compute { instances: a, vcpu: b, memory_mb: c, disk_gb: d }, Compute { instances: w, vcpu: x, memory_mb: y, disk_gb: z }) => {
                Compute { instances: op(a, w), vcpu: op(b, x), memory_mb: op(c, y), disk_gb: op(d, z) }
            }
            (Network { instances: a }, Network { instances: b }) => Network { instances: op(a, b) },
            (Volume { instances: a, storage_gb: b }, Volume { instances: x, storage_gb: y }) => Volume { instances: op(a, x), storage_gb: op(b, y) },
            (Attachment { instances: a }, Attachment { instances: b }) => Attachment { instances: op(a, b) },
            (PublicIp { instances: a }, PublicIp { instances: b }) => PublicIp { instances: op(a, b) },
            (unchanged, _) => unchanged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quota {
    pub total: Allocation,
    pub used: Allocation,
    pub available: Allocation,
}

impl Quota {
    pub fn new(total: Allocation, used: Allocation) -> Self {
        Quota { total, used, available: total.subtract(used) }
    }

    pub fn resource_type(&self) -> ResourceType {
        self.total.resource_type()
    }
}
