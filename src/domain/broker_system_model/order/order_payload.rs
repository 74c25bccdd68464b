use serde::{Deserialize, Serialize};

use crate::domain::broker_system_model::order::order::ResourceType;
use crate::domain::broker_system_model::utils::cidr::parse_cidr;
use crate::domain::broker_system_model::utils::id::OrderId;
use crate::error::{BrokerError, BrokerResult};

/// Type-specific part of an order. Only cloud connectors look inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OrderPayload {
    Compute(ComputeSpec),
    Network(NetworkSpec),
    Volume(VolumeSpec),
    Attachment(AttachmentSpec),
    PublicIp(PublicIpSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeSpec {
    pub name: String,
    pub vcpu: u32,
    pub memory_mb: u32,
    pub disk_gb: u32,
    pub image_id: String,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub network_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AllocationMode {
    Dynamic,
    Static,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    pub name: String,
    pub cidr: String,
    #[serde(default)]
    pub gateway: Option<String>,
    pub allocation_mode: AllocationMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSpec {
    pub name: String,
    pub size_gb: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentSpec {
    pub compute_order_id: OrderId,
    pub volume_order_id: OrderId,
    #[serde(default)]
    pub device: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpSpec {
    pub compute_order_id: OrderId,
}

impl OrderPayload {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            OrderPayload::Compute(_) => ResourceType::Compute,
            OrderPayload::Network(_) => ResourceType::Network,
            OrderPayload::Volume(_) => ResourceType::Volume,
            OrderPayload::Attachment(_) => ResourceType::Attachment,
            OrderPayload::PublicIp(_) => ResourceType::PublicIp,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            OrderPayload::Compute(spec) => Some(&spec.name),
            OrderPayload::Network(spec) => Some(&spec.name),
            OrderPayload::Volume(spec) => Some(&spec.name),
            OrderPayload::Attachment(_) | OrderPayload::PublicIp(_) => None,
        }
    }

    /// Orders this payload depends on (the compute and volume behind an attachment, the compute behind a public IP).
    pub fn referenced_orders(&self) -> Vec<&OrderId> {
        match self {
            OrderPayload::Attachment(spec) => vec![&spec.compute_order_id, &spec.volume_order_id],
            OrderPayload::PublicIp(spec) => vec![&spec.compute_order_id],
            _ => Vec::new(),
        }
    }

    /// Field-level checks that need no knowledge of other orders.
    pub fn validate(&self) -> BrokerResult<()> {
        match self {
            OrderPayload::Compute(spec) => {
                if spec.vcpu == 0 || spec.memory_mb == 0 {
                    return Err(BrokerError::InvalidParameter("Compute orders need at least one vCPU and some memory".to_string()));
                }
                if spec.image_id.trim().is_empty() {
                    return Err(BrokerError::InvalidParameter("Compute orders need an image id".to_string()));
                }
            }
            OrderPayload::Network(spec) => {
                let network = parse_cidr(&spec.cidr)?;
                if let Some(gateway) = &spec.gateway {
                    let gateway: std::net::IpAddr =
                        gateway.parse().map_err(|_| BrokerError::InvalidParameter(format!("Gateway '{}' is not an IP address", gateway)))?;
                    if gateway.is_ipv4() != network.is_ipv4() {
                        return Err(BrokerError::InvalidParameter(format!("Gateway '{}' does not match the family of {}", gateway, spec.cidr)));
                    }
                }
            }
            OrderPayload::Volume(spec) => {
                if spec.size_gb == 0 {
                    return Err(BrokerError::InvalidParameter("Volume size must be positive".to_string()));
                }
            }
            OrderPayload::Attachment(spec) => {
                if spec.compute_order_id == spec.volume_order_id {
                    return Err(BrokerError::InvalidParameter("Attachment must reference two different orders".to_string()));
                }
            }
            OrderPayload::PublicIp(_) => {}
        }
        Ok(())
    }
}
