use std::sync::Arc;
use std::time::Duration;

use crate::domain::broker_system_model::broker_config::BrokerConfig;
use crate::domain::broker_system_model::cloud_connector::cloud_connector_factory::CloudConnectorFactory;
use crate::domain::broker_system_model::cloud_connector::cloud_plugin::CloudPluginRegistry;
use crate::domain::broker_system_model::cloud_connector::reachability::ReachabilityChecker;
use crate::domain::broker_system_model::facade::application_facade::ApplicationFacade;
use crate::domain::broker_system_model::facade::order_controller::OrderController;
use crate::domain::broker_system_model::facade::remote_facade::RemoteFacade;
use crate::domain::broker_system_model::intercomponent::handlers::RpcRouter;
use crate::domain::broker_system_model::intercomponent::remote_event_notifier::RemoteEventNotifier;
use crate::domain::broker_system_model::intercomponent::requests::RpcClient;
use crate::domain::broker_system_model::intercomponent::transport::PacketSender;
use crate::domain::broker_system_model::order::order_holders::OrderHolders;
use crate::domain::broker_system_model::order::order_state_transitioner::OrderStateTransitioner;
use crate::domain::broker_system_model::processors::fulfilled_processor::FulfilledProcessor;
use crate::domain::broker_system_model::processors::open_processor::OpenProcessor;
use crate::domain::broker_system_model::processors::order_processor::OrderProcessor;
use crate::domain::broker_system_model::processors::spawning_processor::SpawningProcessor;
use crate::domain::broker_system_model::utils::id::MemberId;

/// Every shared component of one member, wired together once and handed to whoever needs it.
pub struct BrokerContext {
    pub local_member: MemberId,
    pub holders: Arc<OrderHolders>,
    pub client: Arc<RpcClient>,
    pub transitioner: Arc<OrderStateTransitioner>,
    pub connectors: Arc<CloudConnectorFactory>,
    pub controller: Arc<OrderController>,
    pub application_facade: Arc<ApplicationFacade>,
    pub remote_facade: Arc<RemoteFacade>,
    pub router: Arc<RpcRouter>,
    pub open_processor: Arc<OpenProcessor>,
    pub spawning_processor: Arc<SpawningProcessor>,
    pub fulfilled_processor: Arc<FulfilledProcessor>,
}

impl BrokerContext {
    pub fn new(config: &BrokerConfig, plugins: CloudPluginRegistry, reachability: Arc<dyn ReachabilityChecker>, sender: Arc<dyn PacketSender>) -> Self {
        let local_member = config.member_id.clone();
        let holders = Arc::new(OrderHolders::new());
        let client = Arc::new(RpcClient::new(local_member.clone(), sender, config.rpc_timeout));

        let notifier = Arc::new(RemoteEventNotifier::new(client.clone()));
        let transitioner = Arc::new(OrderStateTransitioner::new(local_member.clone(), holders.clone(), notifier));
        let connectors = Arc::new(CloudConnectorFactory::new(local_member.clone(), plugins, client.clone()));

        let controller = Arc::new(OrderController::new(local_member.clone(), holders.clone(), transitioner.clone(), connectors.clone()));
        let application_facade = Arc::new(ApplicationFacade::new(local_member.clone(), config.default_cloud.clone(), controller.clone(), connectors.clone()));
        let remote_facade = Arc::new(RemoteFacade::new(local_member.clone(), controller.clone(), connectors.clone(), transitioner.clone()));
        let router = Arc::new(RpcRouter::new(local_member.clone(), remote_facade.clone()));

        let open_processor = Arc::new(OpenProcessor::new(local_member.clone(), connectors.clone(), transitioner.clone()));
        let spawning_processor =
            Arc::new(SpawningProcessor::new(connectors.clone(), transitioner.clone(), reachability.clone(), config.max_reachability_attempts));
        let fulfilled_processor = Arc::new(FulfilledProcessor::new(local_member.clone(), connectors.clone(), transitioner.clone(), reachability));

        BrokerContext {
            local_member,
            holders,
            client,
            transitioner,
            connectors,
            controller,
            application_facade,
            remote_facade,
            router,
            open_processor,
            spawning_processor,
            fulfilled_processor,
        }
    }

    /// The three processors with the interval each one idles for.
    pub fn processors(&self, config: &BrokerConfig) -> Vec<(Arc<dyn OrderProcessor>, Duration)> {
        vec![
            (self.open_processor.clone() as Arc<dyn OrderProcessor>, config.open_interval),
            (self.spawning_processor.clone() as Arc<dyn OrderProcessor>, config.spawning_interval),
            (self.fulfilled_processor.clone() as Arc<dyn OrderProcessor>, config.fulfilled_interval),
        ]
    }
}
