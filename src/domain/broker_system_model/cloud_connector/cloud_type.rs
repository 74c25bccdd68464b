use std::str::FromStr;
use std::sync::Arc;

use crate::api::member_config_dto::CloudDto;
use crate::domain::broker_system_model::cloud_connector::cloud_plugin::{CloudPlugin, CloudPluginRegistry};
use crate::domain::broker_system_model::cloud_connector::in_memory_cloud::InMemoryCloud;
use crate::domain::broker_system_model::utils::id::CloudName;
use crate::error::ConversionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudType {
    InMemory,
}

impl CloudType {
    pub fn get_instance(dto: &CloudDto) -> Result<Arc<dyn CloudPlugin>, ConversionError> {
        match CloudType::from_str(&dto.typ)? {
            CloudType::InMemory => Ok(Arc::new(InMemoryCloud::new(CloudName::new(dto.name.clone()), dto.provisioning_polls))),
        }
    }

    /// Plugin registry with one plugin per configured cloud.
    pub fn build_registry(clouds: &[CloudDto]) -> Result<CloudPluginRegistry, ConversionError> {
        let mut registry = CloudPluginRegistry::new();
        for dto in clouds {
            registry.register(CloudName::new(dto.name.clone()), Self::get_instance(dto)?);
        }
        Ok(registry)
    }
}

impl FromStr for CloudType {
    type Err = ConversionError;

    fn from_str(cloud_type: &str) -> Result<CloudType, Self::Err> {
        match cloud_type {
            "InMemory" | "inMemory" => Ok(CloudType::InMemory),
            _ => Err(ConversionError::UnknownCloudType(cloud_type.to_string())),
        }
    }
}
