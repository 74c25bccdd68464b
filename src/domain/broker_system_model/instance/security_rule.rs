use serde::{Deserialize, Serialize};

use crate::domain::broker_system_model::utils::cidr::parse_cidr;
use crate::error::{BrokerError, BrokerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EtherType {
    IPv4,
    IPv6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRule {
    /// Assigned by the cloud on creation; ignored on input.
    pub id: Option<String>,
    pub direction: Direction,
    pub port_from: u32,
    pub port_to: u32,
    pub cidr: String,
    pub ether_type: EtherType,
    pub protocol: Protocol,
}

impl SecurityRule {
    pub fn validate(&self) -> BrokerResult<()> {
        if self.port_from > 65535 || self.port_to > 65535 {
            return Err(BrokerError::InvalidParameter(format!("Ports {}-{} are out of range", self.port_from, self.port_to)));
        }
        if self.port_from > self.port_to {
            return Err(BrokerError::InvalidParameter(format!("Port range {}-{} is inverted", self.port_from, self.port_to)));
        }

        let address = parse_cidr(&self.cidr)?;
        let matches_ether_type = match self.ether_type {
            EtherType::IPv4 => address.is_ipv4(),
            EtherType::IPv6 => address.is_ipv6(),
        };
        if !matches_ether_type {
            return Err(BrokerError::InvalidParameter(format!("CIDR {} does not match ether type {:?}", self.cidr, self.ether_type)));
        }

        Ok(())
    }
}
