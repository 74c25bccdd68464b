use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::broker_system_model::instance::image::{GenericRequest, GenericResponse, Image};
use crate::domain::broker_system_model::instance::instance::Instance;
use crate::domain::broker_system_model::instance::quota::Quota;
use crate::domain::broker_system_model::instance::security_rule::SecurityRule;
use crate::domain::broker_system_model::intercomponent::protocol::{Envelope, Payload, RemoteMethod, RpcRequest, RpcResponse, TypedBody, WirePayload};
use crate::domain::broker_system_model::intercomponent::transport::PacketSender;
use crate::domain::broker_system_model::order::order::{Order, OrderState, ResourceType, SystemUser};
use crate::domain::broker_system_model::utils::id::{CloudName, MemberId, OrderId};
use crate::error::{BrokerError, BrokerResult};

/// Sends requests on behalf of the local member and waits for their responses.
pub struct RpcClient {
    local_member: MemberId,
    sender: Arc<dyn PacketSender>,
    timeout: Duration,
}

impl RpcClient {
    pub fn new(local_member: MemberId, sender: Arc<dyn PacketSender>, timeout: Duration) -> Self {
        RpcClient { local_member, sender, timeout }
    }

    pub fn local_member(&self) -> &MemberId {
        &self.local_member
    }

    /// Sends the request and decodes the response.
    ///
    /// No response, or one with a foreign correlation id, is `ProviderUnavailable`.
    /// An error condition in the response is translated back into the matching `BrokerError`.
    pub fn call<R: RemoteRequest>(&self, request: &R) -> BrokerResult<R::Output> {
        let envelope = request.to_envelope(self.local_member.clone())?;
        let correlation_id = envelope.correlation_id.clone();
        let target = envelope.target_id.clone();

        log::debug!("Sending {} [{}] to member {}", R::METHOD, correlation_id, target);

        let response = self
            .sender
            .send_sync(envelope, self.timeout)
            .ok_or_else(|| BrokerError::ProviderUnavailable(format!("Member {} did not answer {} within {:?}", target, R::METHOD, self.timeout)))?;

        if response.correlation_id != correlation_id {
            log::warn!("Discarding response [{}] to request [{}] sent to {}", response.correlation_id, correlation_id, target);
            return Err(BrokerError::ProviderUnavailable(format!("Member {} answered {} with an uncorrelated response", target, R::METHOD)));
        }

        match response.payload {
            Payload::Response(RpcResponse { error: Some(error), .. }) => {
                log::debug!("Member {} rejected {}: {:?}", target, R::METHOD, error);
                Err(error.into())
            }
            Payload::Response(RpcResponse { body: Some(body), .. }) => body.decode(),
            Payload::Response(_) => Err(BrokerError::Unexpected(format!("Member {} sent an empty {} response", target, R::METHOD))),
            Payload::Request(_) => Err(BrokerError::Unexpected(format!("Member {} answered {} with a request", target, R::METHOD))),
        }
    }
}

/// One remote verb: builds its outbound envelope and names the type of the expected result.
///
/// `from_rpc` is the inverse of `to_rpc`; the receiving handlers use it to decode incoming requests.
pub trait RemoteRequest: Sized {
    type Output: WirePayload;

    const METHOD: RemoteMethod;

    /// Member the request is addressed to.
    fn target(&self) -> &MemberId;

    fn to_rpc(&self) -> BrokerResult<RpcRequest>;

    fn from_rpc(target: MemberId, rpc: &RpcRequest) -> BrokerResult<Self>;

    fn to_envelope(&self, sender: MemberId) -> BrokerResult<Envelope> {
        Ok(Envelope::request(sender, self.target().clone(), self.to_rpc()?))
    }

    fn from_envelope(envelope: &Envelope) -> BrokerResult<Self> {
        match &envelope.payload {
            Payload::Request(rpc) => {
                rpc.expect_method(Self::METHOD)?;
                Self::from_rpc(envelope.target_id.clone(), rpc)
            }
            Payload::Response(_) => Err(BrokerError::Unexpected(format!("Expected a {} request, got a response", Self::METHOD))),
        }
    }

    fn send(&self, client: &RpcClient) -> BrokerResult<Self::Output> {
        client.call(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCreateOrderRequest {
    pub provider: MemberId,
    pub order: Order,
}

impl RemoteRequest for RemoteCreateOrderRequest {
    type Output = ();
    const METHOD: RemoteMethod = RemoteMethod::CreateOrder;

    fn target(&self) -> &MemberId {
        &self.provider
    }

    fn to_rpc(&self) -> BrokerResult<RpcRequest> {
        let mut rpc = RpcRequest::new(Self::METHOD);
        rpc.order = Some(TypedBody::encode(&self.order)?);
        Ok(rpc)
    }

    fn from_rpc(target: MemberId, rpc: &RpcRequest) -> BrokerResult<Self> {
        Ok(RemoteCreateOrderRequest { provider: target, order: rpc.require_order()? })
    }
}

/// Addresses an order that already exists on the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderReference {
    pub order_id: OrderId,
    pub resource_type: ResourceType,
    pub system_user: SystemUser,
}

impl OrderReference {
    pub fn of(order: &Order) -> Self {
        OrderReference { order_id: order.id().clone(), resource_type: order.resource_type(), system_user: order.system_user().clone() }
    }

    fn write_to(&self, rpc: &mut RpcRequest) {
        rpc.order_id = Some(self.order_id.clone());
        rpc.resource_type = Some(self.resource_type);
        rpc.system_user = Some(self.system_user.clone());
    }

    fn read_from(rpc: &RpcRequest) -> BrokerResult<Self> {
        Ok(OrderReference { order_id: rpc.require_order_id()?, resource_type: rpc.require_resource_type()?, system_user: rpc.require_system_user()? })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteGetOrderRequest {
    pub provider: MemberId,
    pub reference: OrderReference,
}

impl RemoteRequest for RemoteGetOrderRequest {
    type Output = Instance;
    const METHOD: RemoteMethod = RemoteMethod::GetOrder;

    fn target(&self) -> &MemberId {
        &self.provider
    }

    fn to_rpc(&self) -> BrokerResult<RpcRequest> {
        let mut rpc = RpcRequest::new(Self::METHOD);
        self.reference.write_to(&mut rpc);
        Ok(rpc)
    }

    fn from_rpc(target: MemberId, rpc: &RpcRequest) -> BrokerResult<Self> {
        Ok(RemoteGetOrderRequest { provider: target, reference: OrderReference::read_from(rpc)? })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDeleteOrderRequest {
    pub provider: MemberId,
    pub reference: OrderReference,
}

impl RemoteRequest for RemoteDeleteOrderRequest {
    type Output = ();
    const METHOD: RemoteMethod = RemoteMethod::DeleteOrder;

    fn target(&self) -> &MemberId {
        &self.provider
    }

    fn to_rpc(&self) -> BrokerResult<RpcRequest> {
        let mut rpc = RpcRequest::new(Self::METHOD);
        self.reference.write_to(&mut rpc);
        Ok(rpc)
    }

    fn from_rpc(target: MemberId, rpc: &RpcRequest) -> BrokerResult<Self> {
        Ok(RemoteDeleteOrderRequest { provider: target, reference: OrderReference::read_from(rpc)? })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteStopOrderRequest {
    pub provider: MemberId,
    pub reference: OrderReference,
}

impl RemoteRequest for RemoteStopOrderRequest {
    type Output = ();
    const METHOD: RemoteMethod = RemoteMethod::StopOrder;

    fn target(&self) -> &MemberId {
        &self.provider
    }

    fn to_rpc(&self) -> BrokerResult<RpcRequest> {
        let mut rpc = RpcRequest::new(Self::METHOD);
        self.reference.write_to(&mut rpc);
        Ok(rpc)
    }

    fn from_rpc(target: MemberId, rpc: &RpcRequest) -> BrokerResult<Self> {
        Ok(RemoteStopOrderRequest { provider: target, reference: OrderReference::read_from(rpc)? })
    }
}

/// Sent by a provider to the requester when one of its orders reaches FULFILLED or FAILED.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteNotifyEventRequest {
    pub requester: MemberId,
    pub order: Order,
    pub new_state: OrderState,
}

impl RemoteRequest for RemoteNotifyEventRequest {
    type Output = ();
    const METHOD: RemoteMethod = RemoteMethod::NotifyEvent;

    fn target(&self) -> &MemberId {
        &self.requester
    }

    fn to_rpc(&self) -> BrokerResult<RpcRequest> {
        let mut rpc = RpcRequest::new(Self::METHOD);
        rpc.order = Some(TypedBody::encode(&self.order)?);
        rpc.new_state = Some(self.new_state);
        Ok(rpc)
    }

    fn from_rpc(target: MemberId, rpc: &RpcRequest) -> BrokerResult<Self> {
        Ok(RemoteNotifyEventRequest { requester: target, order: rpc.require_order()?, new_state: rpc.require_new_state()? })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteGetUserQuotaRequest {
    pub provider: MemberId,
    pub cloud_name: CloudName,
    pub system_user: SystemUser,
    pub resource_type: ResourceType,
}

impl RemoteRequest for RemoteGetUserQuotaRequest {
    type Output = Quota;
    const METHOD: RemoteMethod = RemoteMethod::GetUserQuota;

    fn target(&self) -> &MemberId {
        &self.provider
    }

    fn to_rpc(&self) -> BrokerResult<RpcRequest> {
        let mut rpc = RpcRequest::new(Self::METHOD);
        rpc.cloud_name = Some(self.cloud_name.clone());
        rpc.system_user = Some(self.system_user.clone());
        rpc.resource_type = Some(self.resource_type);
        Ok(rpc)
    }

    fn from_rpc(target: MemberId, rpc: &RpcRequest) -> BrokerResult<Self> {
        Ok(RemoteGetUserQuotaRequest {
            provider: target,
            cloud_name: rpc.require_cloud_name()?,
            system_user: rpc.require_system_user()?,
            resource_type: rpc.require_resource_type()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteGetAllImagesRequest {
    pub provider: MemberId,
    pub cloud_name: CloudName,
    pub system_user: SystemUser,
}

impl RemoteRequest for RemoteGetAllImagesRequest {
    type Output = BTreeMap<String, String>;
    const METHOD: RemoteMethod = RemoteMethod::GetAllImages;

    fn target(&self) -> &MemberId {
        &self.provider
    }

    fn to_rpc(&self) -> BrokerResult<RpcRequest> {
        let mut rpc = RpcRequest::new(Self::METHOD);
        rpc.cloud_name = Some(self.cloud_name.clone());
        rpc.system_user = Some(self.system_user.clone());
        Ok(rpc)
    }

    fn from_rpc(target: MemberId, rpc: &RpcRequest) -> BrokerResult<Self> {
        Ok(RemoteGetAllImagesRequest { provider: target, cloud_name: rpc.require_cloud_name()?, system_user: rpc.require_system_user()? })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteGetImageRequest {
    pub provider: MemberId,
    pub cloud_name: CloudName,
    pub image_id: String,
    pub system_user: SystemUser,
}

impl RemoteRequest for RemoteGetImageRequest {
    type Output = Image;
    const METHOD: RemoteMethod = RemoteMethod::GetImage;

    fn target(&self) -> &MemberId {
        &self.provider
    }

    fn to_rpc(&self) -> BrokerResult<RpcRequest> {
        let mut rpc = RpcRequest::new(Self::METHOD);
        rpc.cloud_name = Some(self.cloud_name.clone());
        rpc.image_id = Some(self.image_id.clone());
        rpc.system_user = Some(self.system_user.clone());
        Ok(rpc)
    }

    fn from_rpc(target: MemberId, rpc: &RpcRequest) -> BrokerResult<Self> {
        Ok(RemoteGetImageRequest {
            provider: target,
            cloud_name: rpc.require_cloud_name()?,
            image_id: rpc.require_image_id()?,
            system_user: rpc.require_system_user()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteGetCloudNamesRequest {
    pub provider: MemberId,
    pub system_user: SystemUser,
}

impl RemoteRequest for RemoteGetCloudNamesRequest {
    type Output = Vec<String>;
    const METHOD: RemoteMethod = RemoteMethod::GetCloudNames;

    fn target(&self) -> &MemberId {
        &self.provider
    }

    fn to_rpc(&self) -> BrokerResult<RpcRequest> {
        let mut rpc = RpcRequest::new(Self::METHOD);
        rpc.system_user = Some(self.system_user.clone());
        Ok(rpc)
    }

    fn from_rpc(target: MemberId, rpc: &RpcRequest) -> BrokerResult<Self> {
        Ok(RemoteGetCloudNamesRequest { provider: target, system_user: rpc.require_system_user()? })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCreateSecurityRuleRequest {
    pub provider: MemberId,
    pub reference: OrderReference,
    pub security_rule: SecurityRule,
}

impl RemoteRequest for RemoteCreateSecurityRuleRequest {
    type Output = String;
    const METHOD: RemoteMethod = RemoteMethod::CreateSecurityRule;

    fn target(&self) -> &MemberId {
        &self.provider
    }

    fn to_rpc(&self) -> BrokerResult<RpcRequest> {
        let mut rpc = RpcRequest::new(Self::METHOD);
        self.reference.write_to(&mut rpc);
        rpc.security_rule = Some(self.security_rule.clone());
        Ok(rpc)
    }

    fn from_rpc(target: MemberId, rpc: &RpcRequest) -> BrokerResult<Self> {
        Ok(RemoteCreateSecurityRuleRequest { provider: target, reference: OrderReference::read_from(rpc)?, security_rule: rpc.require_security_rule()? })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteGetAllSecurityRulesRequest {
    pub provider: MemberId,
    pub reference: OrderReference,
}

impl RemoteRequest for RemoteGetAllSecurityRulesRequest {
    type Output = Vec<SecurityRule>;
    const METHOD: RemoteMethod = RemoteMethod::GetAllSecurityRules;

    fn target(&self) -> &MemberId {
        &self.provider
    }

    fn to_rpc(&self) -> BrokerResult<RpcRequest> {
        let mut rpc = RpcRequest::new(Self::METHOD);
        self.reference.write_to(&mut rpc);
        Ok(rpc)
    }

    fn from_rpc(target: MemberId, rpc: &RpcRequest) -> BrokerResult<Self> {
        Ok(RemoteGetAllSecurityRulesRequest { provider: target, reference: OrderReference::read_from(rpc)? })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDeleteSecurityRuleRequest {
    pub provider: MemberId,
    pub cloud_name: CloudName,
    pub rule_id: String,
    pub system_user: SystemUser,
}

impl RemoteRequest for RemoteDeleteSecurityRuleRequest {
    type Output = ();
    const METHOD: RemoteMethod = RemoteMethod::DeleteSecurityRule;

    fn target(&self) -> &MemberId {
        &self.provider
    }

    fn to_rpc(&self) -> BrokerResult<RpcRequest> {
        let mut rpc = RpcRequest::new(Self::METHOD);
        rpc.cloud_name = Some(self.cloud_name.clone());
        rpc.rule_id = Some(self.rule_id.clone());
        rpc.system_user = Some(self.system_user.clone());
        Ok(rpc)
    }

    fn from_rpc(target: MemberId, rpc: &RpcRequest) -> BrokerResult<Self> {
        Ok(RemoteDeleteSecurityRuleRequest {
            provider: target,
            cloud_name: rpc.require_cloud_name()?,
            rule_id: rpc.require_rule_id()?,
            system_user: rpc.require_system_user()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteGenericRequest {
    pub provider: MemberId,
    pub cloud_name: CloudName,
    pub system_user: SystemUser,
    pub generic_request: GenericRequest,
}

impl RemoteRequest for RemoteGenericRequest {
    type Output = GenericResponse;
    const METHOD: RemoteMethod = RemoteMethod::GenericRequest;

    fn target(&self) -> &MemberId {
        &self.provider
    }

    fn to_rpc(&self) -> BrokerResult<RpcRequest> {
        let mut rpc = RpcRequest::new(Self::METHOD);
        rpc.cloud_name = Some(self.cloud_name.clone());
        rpc.system_user = Some(self.system_user.clone());
        rpc.generic_request = Some(self.generic_request.clone());
        Ok(rpc)
    }

    fn from_rpc(target: MemberId, rpc: &RpcRequest) -> BrokerResult<Self> {
        Ok(RemoteGenericRequest {
            provider: target,
            cloud_name: rpc.require_cloud_name()?,
            system_user: rpc.require_system_user()?,
            generic_request: rpc.require_generic_request()?,
        })
    }
}
