use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::broker_system_model::broker_config::BrokerConfig;
use crate::domain::broker_system_model::broker_context::BrokerContext;
use crate::domain::broker_system_model::cloud_connector::cloud_plugin::CloudPluginRegistry;
use crate::domain::broker_system_model::cloud_connector::cloud_type::CloudType;
use crate::domain::broker_system_model::cloud_connector::reachability::{AssumeReachable, ReachabilityChecker};
use crate::domain::broker_system_model::facade::application_facade::ApplicationFacade;
use crate::domain::broker_system_model::intercomponent::handlers::RpcRouter;
use crate::domain::broker_system_model::intercomponent::tcp::{TcpPacketSender, TcpRpcServer};
use crate::domain::broker_system_model::intercomponent::transport::PacketSender;
use crate::domain::broker_system_model::processors::processors_thread_controller::ProcessorsThreadController;
use crate::domain::broker_system_model::utils::id::MemberId;
use crate::error::Result;

/// One federation member: its context, its processor threads and, when configured, its RPC listener.
pub struct Member {
    config: BrokerConfig,
    context: BrokerContext,
    processors: ProcessorsThreadController,
    server: Mutex<Option<TcpRpcServer>>,
}

impl Member {
    pub fn new(config: BrokerConfig, plugins: CloudPluginRegistry, reachability: Arc<dyn ReachabilityChecker>, sender: Arc<dyn PacketSender>) -> Self {
        let context = BrokerContext::new(&config, plugins, reachability, sender);
        let processors = ProcessorsThreadController::new(context.holders.clone(), context.processors(&config));
        Member { config, context, processors, server: Mutex::new(None) }
    }

    /// Member with simulated clouds and the TCP transport, as run by the binary.
    pub fn from_config(config: BrokerConfig) -> Result<Self> {
        let plugins = CloudType::build_registry(&config.clouds)?;
        let sender = Arc::new(TcpPacketSender::new(config.peers.clone())?);
        Ok(Member::new(config, plugins, Arc::new(AssumeReachable), sender))
    }

    pub fn id(&self) -> &MemberId {
        &self.context.local_member
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn context(&self) -> &BrokerContext {
        &self.context
    }

    pub fn application_facade(&self) -> Arc<ApplicationFacade> {
        self.context.application_facade.clone()
    }

    pub fn router(&self) -> Arc<RpcRouter> {
        self.context.router.clone()
    }

    /// Address the RPC server listens on, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.lock().unwrap_or_else(PoisonError::into_inner).as_ref().map(TcpRpcServer::local_addr)
    }

    pub fn start(&self) -> Result<()> {
        if let Some(address) = self.config.listen_address {
            let mut server = self.server.lock().unwrap_or_else(PoisonError::into_inner);
            if server.is_none() {
                *server = Some(TcpRpcServer::bind(address, self.router())?);
            }
        }

        self.processors.start()?;
        log::info!("Member {} started", self.id());
        Ok(())
    }

    pub fn shutdown(&self) {
        self.processors.stop();
        if let Some(server) = self.server.lock().unwrap_or_else(PoisonError::into_inner).take() {
            server.shutdown();
        }
        log::info!("Member {} shut down", self.id());
    }
}
