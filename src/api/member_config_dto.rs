use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberConfigDto {
    pub member_id: String,
    #[serde(default)]
    pub listen_address: Option<String>,
    #[serde(default)]
    pub peers: Vec<PeerDto>,
    #[serde(default)]
    pub default_cloud: Option<String>,
    #[serde(default)]
    pub clouds: Vec<CloudDto>,
    #[serde(default = "default_open_sleep_ms")]
    pub open_sleep_ms: u64,
    #[serde(default = "default_spawning_sleep_ms")]
    pub spawning_sleep_ms: u64,
    #[serde(default = "default_fulfilled_sleep_ms")]
    pub fulfilled_sleep_ms: u64,
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,
    #[serde(default = "default_max_reachability_attempts")]
    pub max_reachability_attempts: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerDto {
    pub member_id: String,
    pub address: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudDto {
    pub name: String,
    pub typ: String,
    #[serde(default = "default_provisioning_polls")]
    pub provisioning_polls: u32,
}

fn default_open_sleep_ms() -> u64 {
    1000
}

fn default_spawning_sleep_ms() -> u64 {
    1000
}

fn default_fulfilled_sleep_ms() -> u64 {
    5000
}

fn default_rpc_timeout_ms() -> u64 {
    10_000
}

fn default_max_reachability_attempts() -> u32 {
    5
}

fn default_provisioning_polls() -> u32 {
    2
}
