use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::api::member_config_dto::{CloudDto, MemberConfigDto};
use crate::domain::broker_system_model::cloud_connector::cloud_type::CloudType;
use crate::domain::broker_system_model::utils::id::{CloudName, MemberId};
use crate::error::ConversionError;

/// Validated configuration of one federation member.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub member_id: MemberId,
    pub listen_address: Option<SocketAddr>,
    pub peers: HashMap<MemberId, SocketAddr>,
    pub default_cloud: Option<CloudName>,
    pub clouds: Vec<CloudDto>,
    pub open_interval: Duration,
    pub spawning_interval: Duration,
    pub fulfilled_interval: Duration,
    pub rpc_timeout: Duration,
    pub max_reachability_attempts: u32,
}

impl BrokerConfig {
    /// Configuration with defaults and no clouds, peers or listener.
    pub fn new(member_id: MemberId) -> Self {
        BrokerConfig {
            member_id,
            listen_address: None,
            peers: HashMap::new(),
            default_cloud: None,
            clouds: Vec::new(),
            open_interval: Duration::from_millis(1000),
            spawning_interval: Duration::from_millis(1000),
            fulfilled_interval: Duration::from_millis(5000),
            rpc_timeout: Duration::from_millis(10_000),
            max_reachability_attempts: 5,
        }
    }
}

fn parse_address(member_id: &str, address: &str) -> Result<SocketAddr, ConversionError> {
    SocketAddr::from_str(address).map_err(|_| ConversionError::InvalidAddress(member_id.to_string(), address.to_string()))
}

impl TryFrom<MemberConfigDto> for BrokerConfig {
    type Error = ConversionError;

    fn try_from(dto: MemberConfigDto) -> Result<Self, Self::Error> {
        if dto.member_id.trim().is_empty() {
            return Err(ConversionError::EmptyMemberId);
        }

        let listen_address = dto.listen_address.as_deref().map(|address| parse_address(&dto.member_id, address)).transpose()?;

        let mut peers = HashMap::new();
        for peer in &dto.peers {
            let address = parse_address(&peer.member_id, &peer.address)?;
            if peers.insert(MemberId::new(peer.member_id.clone()), address).is_some() {
                return Err(ConversionError::DuplicatePeer(peer.member_id.clone()));
            }
        }

        for cloud in &dto.clouds {
            CloudType::from_str(&cloud.typ)?;
        }

        let default_cloud = match dto.default_cloud {
            Some(name) if dto.clouds.iter().any(|cloud| cloud.name == name) => Some(CloudName::new(name)),
            Some(name) => return Err(ConversionError::UnknownDefaultCloud(name)),
            None => dto.clouds.first().map(|cloud| CloudName::new(cloud.name.clone())),
        };

        Ok(BrokerConfig {
            member_id: MemberId::new(dto.member_id),
            listen_address,
            peers,
            default_cloud,
            clouds: dto.clouds,
            open_interval: Duration::from_millis(dto.open_sleep_ms),
            spawning_interval: Duration::from_millis(dto.spawning_sleep_ms),
            fulfilled_interval: Duration::from_millis(dto.fulfilled_sleep_ms),
            rpc_timeout: Duration::from_millis(dto.rpc_timeout_ms),
            max_reachability_attempts: dto.max_reachability_attempts,
        })
    }
}
