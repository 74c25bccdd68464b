pub mod cloud_connector_factory;
pub mod cloud_connector_trait;
pub mod cloud_plugin;
pub mod cloud_type;
pub mod in_memory_cloud;
pub mod local_cloud_connector;
pub mod reachability;
pub mod remote_cloud_connector;
