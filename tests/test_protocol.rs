mod common;

use std::collections::BTreeMap;
use std::fmt::Debug;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use common::*;
use federation_broker::domain::broker_system_model::instance::image::GenericRequest;
use federation_broker::domain::broker_system_model::instance::security_rule::{Direction, EtherType, Protocol, SecurityRule};
use federation_broker::domain::broker_system_model::intercomponent::codec::EnvelopeCodec;
use federation_broker::domain::broker_system_model::intercomponent::error_translation::{WireCondition, WireError};
use federation_broker::domain::broker_system_model::intercomponent::protocol::{Envelope, Payload, RemoteMethod, RpcRequest, RpcResponse};
use federation_broker::domain::broker_system_model::intercomponent::requests::*;
use federation_broker::domain::broker_system_model::order::order::{Order, OrderState, ResourceType};
use federation_broker::domain::broker_system_model::order::order_payload::{OrderPayload, PublicIpSpec};
use federation_broker::domain::broker_system_model::utils::id::{CloudName, MemberId, OrderId};
use federation_broker::error::BrokerError;

fn round_trip<R: RemoteRequest + PartialEq + Debug>(request: R) {
    let envelope = request.to_envelope(MemberId::new("m1")).unwrap();

    let mut codec = EnvelopeCodec::new();
    let mut buffer = BytesMut::new();
    codec.encode(envelope.clone(), &mut buffer).unwrap();
    let decoded = codec.decode(&mut buffer).unwrap().unwrap();

    assert_eq!(decoded, envelope);
    let Payload::Request(rpc) = &decoded.payload else { panic!("expected a request") };
    assert_eq!(rpc.method, R::METHOD);
    assert_eq!(R::from_envelope(&decoded).unwrap(), request);
}

fn provider() -> MemberId {
    MemberId::new("m2")
}

fn reference(resource_type: ResourceType) -> OrderReference {
    OrderReference { order_id: OrderId::new("o-1"), resource_type, system_user: user() }
}

fn rule() -> SecurityRule {
    SecurityRule {
        id: None,
        direction: Direction::Out,
        port_from: 80,
        port_to: 443,
        cidr: "2001:db8::/32".to_string(),
        ether_type: EtherType::IPv6,
        protocol: Protocol::Tcp,
    }
}

fn public_ip_order() -> Order {
    Order::new(
        MemberId::new("m1"),
        provider(),
        CloudName::new(CLOUD),
        user(),
        OrderPayload::PublicIp(PublicIpSpec { compute_order_id: OrderId::new("o-compute") }),
    )
}

#[test]
fn every_verb_survives_the_wire() {
    round_trip(RemoteCreateOrderRequest { provider: provider(), order: public_ip_order() });
    round_trip(RemoteGetOrderRequest { provider: provider(), reference: reference(ResourceType::Compute) });
    round_trip(RemoteDeleteOrderRequest { provider: provider(), reference: reference(ResourceType::Network) });
    round_trip(RemoteStopOrderRequest { provider: provider(), reference: reference(ResourceType::Compute) });
    round_trip(RemoteNotifyEventRequest { requester: MemberId::new("m1"), order: public_ip_order(), new_state: OrderState::Failed });
    round_trip(RemoteGetUserQuotaRequest { provider: provider(), cloud_name: CloudName::new(CLOUD), system_user: user(), resource_type: ResourceType::Volume });
    round_trip(RemoteGetAllImagesRequest { provider: provider(), cloud_name: CloudName::new(CLOUD), system_user: user() });
    round_trip(RemoteGetImageRequest { provider: provider(), cloud_name: CloudName::new(CLOUD), image_id: "img-1".to_string(), system_user: user() });
    round_trip(RemoteGetCloudNamesRequest { provider: provider(), system_user: user() });
    round_trip(RemoteCreateSecurityRuleRequest { provider: provider(), reference: reference(ResourceType::PublicIp), security_rule: rule() });
    round_trip(RemoteGetAllSecurityRulesRequest { provider: provider(), reference: reference(ResourceType::Network) });
    round_trip(RemoteDeleteSecurityRuleRequest {
        provider: provider(),
        cloud_name: CloudName::new(CLOUD),
        rule_id: "i-1/1".to_string(),
        system_user: user(),
    });
    round_trip(RemoteGenericRequest {
        provider: provider(),
        cloud_name: CloudName::new(CLOUD),
        system_user: user(),
        generic_request: GenericRequest {
            method: "GET".to_string(),
            url: "/servers".to_string(),
            headers: BTreeMap::from([("accept".to_string(), "application/json".to_string())]),
            body: String::new(),
        },
    });
}

#[test]
fn request_missing_a_field_is_invalid() {
    let mut rpc = RpcRequest::new(RemoteMethod::GetOrder);
    rpc.order_id = Some(OrderId::new("o-1"));
    let envelope = Envelope::request(MemberId::new("m1"), provider(), rpc);

    assert!(matches!(RemoteGetOrderRequest::from_envelope(&envelope), Err(BrokerError::InvalidParameter(_))));
    assert!(matches!(RemoteDeleteOrderRequest::from_envelope(&envelope), Err(BrokerError::Unexpected(_))));
}

#[test]
fn remote_failures_keep_their_kind() {
    let (_network, members) = federation(&["m1", "m2"]);
    let facade = members[0].member.application_facade();

    let err = facade.get_image(&user(), &provider(), &CloudName::new(CLOUD), "img-404").unwrap_err();
    assert!(matches!(err, BrokerError::NotFound(_)));

    let err = facade.get_user_quota(&user(), &provider(), &CloudName::new("nowhere"), ResourceType::Volume).unwrap_err();
    assert!(matches!(err, BrokerError::NotFound(_)));

    let client = &members[0].member.context().client;
    let err = RemoteGetOrderRequest { provider: provider(), reference: reference(ResourceType::Volume) }.send(client).unwrap_err();
    assert!(matches!(err, BrokerError::NotFound(_)));
}

#[test]
fn remote_queries_reach_the_provider_cloud() {
    let (_network, members) = federation(&["m1", "m2"]);
    let facade = members[0].member.application_facade();
    let cloud = CloudName::new(CLOUD);

    assert_eq!(facade.get_cloud_names(&user(), &provider()).unwrap(), vec![CLOUD.to_string()]);
    assert_eq!(facade.get_all_images(&user(), &provider(), &cloud).unwrap().get("img-1").map(String::as_str), Some("Debian"));
    assert_eq!(facade.get_image(&user(), &provider(), &cloud, "img-1").unwrap().name, "Debian");

    let quota = facade.get_user_quota(&user(), &provider(), &cloud, ResourceType::Volume).unwrap();
    assert_eq!(quota.resource_type(), ResourceType::Volume);
    assert_eq!(quota.available, quota.total);

    let request = GenericRequest { method: "GET".to_string(), url: "/flavors".to_string(), headers: BTreeMap::new(), body: String::new() };
    assert_eq!(facade.generic_request(&user(), &provider(), &cloud, &request).unwrap().content, "GET /flavors");
}

#[test]
fn router_rejects_misaddressed_and_unsolicited_envelopes() {
    let m1 = single_member();
    let router = m1.member.router();

    let misaddressed = RemoteGetCloudNamesRequest { provider: MemberId::new("m9"), system_user: user() }.to_envelope(MemberId::new("m2")).unwrap();
    let reply = router.dispatch(misaddressed.clone());
    assert_eq!(reply.correlation_id, misaddressed.correlation_id);
    let Payload::Response(response) = reply.payload else { panic!("expected a response") };
    assert_eq!(response.error.unwrap().condition, WireCondition::InternalServerError);

    let unsolicited = router.dispatch(reply_to_self(&m1.id()));
    let Payload::Response(response) = unsolicited.payload else { panic!("expected a response") };
    assert!(response.error.is_some());
}

fn reply_to_self(member: &MemberId) -> Envelope {
    let request = RemoteGetCloudNamesRequest { provider: MemberId::new("m2"), system_user: user() }.to_envelope(member.clone()).unwrap();
    request.reply(RpcResponse::failed(WireError::from(&BrokerError::Unexpected("late".to_string()))))
}
