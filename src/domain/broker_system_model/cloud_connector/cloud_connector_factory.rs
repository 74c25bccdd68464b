use std::sync::Arc;

use crate::domain::broker_system_model::cloud_connector::cloud_connector_trait::CloudConnector;
use crate::domain::broker_system_model::cloud_connector::cloud_plugin::CloudPluginRegistry;
use crate::domain::broker_system_model::cloud_connector::local_cloud_connector::LocalCloudConnector;
use crate::domain::broker_system_model::cloud_connector::remote_cloud_connector::RemoteCloudConnector;
use crate::domain::broker_system_model::intercomponent::requests::{RemoteGetCloudNamesRequest, RemoteRequest, RpcClient};
use crate::domain::broker_system_model::order::order::{Order, SystemUser};
use crate::domain::broker_system_model::utils::id::{CloudName, MemberId};
use crate::error::BrokerResult;

/// Picks the Local connector for this member's clouds and the Remote one for everybody else.
pub struct CloudConnectorFactory {
    local_member: MemberId,
    plugins: CloudPluginRegistry,
    client: Arc<RpcClient>,
}

impl CloudConnectorFactory {
    pub fn new(local_member: MemberId, plugins: CloudPluginRegistry, client: Arc<RpcClient>) -> Self {
        CloudConnectorFactory { local_member, plugins, client }
    }

    pub fn local_member(&self) -> &MemberId {
        &self.local_member
    }

    pub fn connector_for(&self, member: &MemberId, cloud_name: &CloudName) -> BrokerResult<Box<dyn CloudConnector>> {
        if member == &self.local_member {
            let plugin = self.plugins.get(cloud_name)?;
            Ok(Box::new(LocalCloudConnector::new(cloud_name.clone(), plugin)))
        } else {
            Ok(Box::new(RemoteCloudConnector::new(member.clone(), cloud_name.clone(), self.client.clone())))
        }
    }

    pub fn connector_for_order(&self, order: &Order) -> BrokerResult<Box<dyn CloudConnector>> {
        self.connector_for(order.provider(), order.cloud_name())
    }

    pub fn cloud_names(&self, member: &MemberId, system_user: &SystemUser) -> BrokerResult<Vec<String>> {
        if member == &self.local_member {
            Ok(self.plugins.cloud_names())
        } else {
            RemoteGetCloudNamesRequest { provider: member.clone(), system_user: system_user.clone() }.send(&self.client)
        }
    }
}
