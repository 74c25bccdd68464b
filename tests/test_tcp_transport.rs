mod common;

use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use common::*;
use federation_broker::domain::broker_system_model::cloud_connector::cloud_plugin::CloudPluginRegistry;
use federation_broker::domain::broker_system_model::instance::instance::InstanceState;
use federation_broker::domain::broker_system_model::intercomponent::tcp::{TcpPacketSender, TcpRpcServer};
use federation_broker::domain::broker_system_model::member::Member;
use federation_broker::domain::broker_system_model::order::order::OrderState;
use federation_broker::domain::broker_system_model::processors::order_processor::OrderProcessor;
use federation_broker::domain::broker_system_model::utils::id::{CloudName, MemberId};
use federation_broker::error::BrokerError;

/// A local address nobody listens on.
fn closed_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Provider `m2` served over TCP and requester `m1` talking to it through `peers`.
fn tcp_pair(extra_peers: &[(&str, SocketAddr)]) -> (TestMember, TestMember, TcpRpcServer) {
    let unused = Arc::new(TcpPacketSender::new(HashMap::new()).unwrap());
    let provider = member("m2", unused);
    let server = TcpRpcServer::bind("127.0.0.1:0".parse().unwrap(), provider.member.router()).unwrap();

    let mut peers = HashMap::from([(MemberId::new("m2"), server.local_addr())]);
    for (member_id, address) in extra_peers {
        peers.insert(MemberId::new(*member_id), *address);
    }
    let requester = member("m1", Arc::new(TcpPacketSender::new(peers).unwrap()));

    (requester, provider, server)
}

fn member(member_id: &str, sender: Arc<TcpPacketSender>) -> TestMember {
    let cloud = Arc::new(ScriptedCloud::new());
    let reachability = Arc::new(StubReachability::new(true));
    let plugins = CloudPluginRegistry::new().with_plugin(CloudName::new(CLOUD), cloud.clone());
    let member = Member::new(test_config(member_id), plugins, reachability.clone(), sender);
    TestMember { member, cloud, reachability }
}

#[test]
fn queries_travel_over_tcp() {
    let (m1, _m2, _server) = tcp_pair(&[]);
    let facade = m1.member.application_facade();
    let m2 = MemberId::new("m2");
    let cloud = CloudName::new(CLOUD);

    assert_eq!(facade.get_cloud_names(&user(), &m2).unwrap(), vec![CLOUD.to_string()]);
    assert_eq!(facade.get_image(&user(), &m2, &cloud, "img-1").unwrap().name, "Debian");
    assert!(facade.get_all_images(&user(), &m2, &cloud).unwrap().contains_key("img-1"));
}

#[test]
fn remote_errors_keep_their_kind_over_tcp() {
    let (m1, _m2, _server) = tcp_pair(&[]);
    let facade = m1.member.application_facade();

    let missing_image = facade.get_image(&user(), &MemberId::new("m2"), &CloudName::new(CLOUD), "img-404");
    assert!(matches!(missing_image, Err(BrokerError::NotFound(_))));

    let missing_cloud = facade.get_all_images(&user(), &MemberId::new("m2"), &CloudName::new("elsewhere"));
    assert!(matches!(missing_cloud, Err(BrokerError::NotFound(_))));
}

#[test]
fn remote_order_is_created_at_the_provider_over_tcp() {
    let (m1, m2, _server) = tcp_pair(&[]);
    let facade = m1.member.application_facade();

    let order_id = facade.create_order(&user(), volume_request(Some("m2"))).unwrap();
    let handle = m1.handle(&order_id);
    m1.member.context().open_processor.process(&handle).unwrap();

    assert_eq!(handle.state(), OrderState::Pending);
    assert_eq!(m2.handle(&order_id).state(), OrderState::Open);

    let instance = facade.get_resource_instance(&user(), &order_id).unwrap();
    assert_eq!(instance.state, InstanceState::Dispatched);
}

#[test]
fn unreachable_members_are_unavailable() {
    let (m1, _m2, _server) = tcp_pair(&[("m3", closed_address())]);
    let facade = m1.member.application_facade();

    assert!(matches!(facade.get_cloud_names(&user(), &MemberId::new("m3")), Err(BrokerError::ProviderUnavailable(_))));
    assert!(matches!(facade.get_cloud_names(&user(), &MemberId::new("m4")), Err(BrokerError::ProviderUnavailable(_))));
}

#[test]
fn stopped_server_no_longer_answers() {
    let (m1, _m2, server) = tcp_pair(&[]);
    let facade = m1.member.application_facade();
    assert!(facade.get_cloud_names(&user(), &MemberId::new("m2")).is_ok());

    server.shutdown();
    assert!(matches!(facade.get_cloud_names(&user(), &MemberId::new("m2")), Err(BrokerError::ProviderUnavailable(_))));
}
