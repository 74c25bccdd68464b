use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::domain::broker_system_model::facade::remote_facade::RemoteFacade;
use crate::domain::broker_system_model::intercomponent::error_translation::WireError;
use crate::domain::broker_system_model::intercomponent::protocol::{Envelope, Payload, RemoteMethod, RpcResponse, TypedBody};
use crate::domain::broker_system_model::intercomponent::requests::*;
use crate::domain::broker_system_model::utils::id::MemberId;
use crate::error::{BrokerError, BrokerResult};

/// Receiving side of one remote verb: decodes the request and calls into the `RemoteFacade`.
pub trait RemoteHandler: Send + Sync {
    fn method(&self) -> RemoteMethod;

    fn handle(&self, envelope: &Envelope) -> BrokerResult<TypedBody>;
}

pub struct CreateOrderHandler {
    facade: Arc<RemoteFacade>,
}

impl RemoteHandler for CreateOrderHandler {
    fn method(&self) -> RemoteMethod {
        RemoteMethod::CreateOrder
    }

    fn handle(&self, envelope: &Envelope) -> BrokerResult<TypedBody> {
        let request = RemoteCreateOrderRequest::from_envelope(envelope)?;
        self.facade.activate_order(&envelope.sender_id, request.order)?;
        TypedBody::encode(&())
    }
}

pub struct GetOrderHandler {
    facade: Arc<RemoteFacade>,
}

impl RemoteHandler for GetOrderHandler {
    fn method(&self) -> RemoteMethod {
        RemoteMethod::GetOrder
    }

    fn handle(&self, envelope: &Envelope) -> BrokerResult<TypedBody> {
        let request = RemoteGetOrderRequest::from_envelope(envelope)?;
        let instance = self.facade.get_resource_instance(&envelope.sender_id, &request.reference)?;
        TypedBody::encode(&instance)
    }
}

pub struct DeleteOrderHandler {
    facade: Arc<RemoteFacade>,
}

impl RemoteHandler for DeleteOrderHandler {
    fn method(&self) -> RemoteMethod {
        RemoteMethod::DeleteOrder
    }

    fn handle(&self, envelope: &Envelope) -> BrokerResult<TypedBody> {
        let request = RemoteDeleteOrderRequest::from_envelope(envelope)?;
        self.facade.delete_order(&envelope.sender_id, &request.reference)?;
        TypedBody::encode(&())
    }
}

pub struct StopOrderHandler {
    facade: Arc<RemoteFacade>,
}

impl RemoteHandler for StopOrderHandler {
    fn method(&self) -> RemoteMethod {
        RemoteMethod::StopOrder
    }

    fn handle(&self, envelope: &Envelope) -> BrokerResult<TypedBody> {
        let request = RemoteStopOrderRequest::from_envelope(envelope)?;
        self.facade.stop_order(&envelope.sender_id, &request.reference)?;
        TypedBody::encode(&())
    }
}

pub struct NotifyEventHandler {
    facade: Arc<RemoteFacade>,
}

impl RemoteHandler for NotifyEventHandler {
    fn method(&self) -> RemoteMethod {
        RemoteMethod::NotifyEvent
    }

    fn handle(&self, envelope: &Envelope) -> BrokerResult<TypedBody> {
        let request = RemoteNotifyEventRequest::from_envelope(envelope)?;
        self.facade.handle_remote_event(&envelope.sender_id, request.order, request.new_state)?;
        TypedBody::encode(&())
    }
}

pub struct GetUserQuotaHandler {
    facade: Arc<RemoteFacade>,
}

impl RemoteHandler for GetUserQuotaHandler {
    fn method(&self) -> RemoteMethod {
        RemoteMethod::GetUserQuota
    }

    fn handle(&self, envelope: &Envelope) -> BrokerResult<TypedBody> {
        let request = RemoteGetUserQuotaRequest::from_envelope(envelope)?;
        let quota = self.facade.get_user_quota(&envelope.sender_id, &request.cloud_name, &request.system_user, request.resource_type)?;
        TypedBody::encode(&quota)
    }
}

pub struct GetAllImagesHandler {
    facade: Arc<RemoteFacade>,
}

impl RemoteHandler for GetAllImagesHandler {
    fn method(&self) -> RemoteMethod {
        RemoteMethod::GetAllImages
    }

    fn handle(&self, envelope: &Envelope) -> BrokerResult<TypedBody> {
        let request = RemoteGetAllImagesRequest::from_envelope(envelope)?;
        let images = self.facade.get_all_images(&envelope.sender_id, &request.cloud_name, &request.system_user)?;
        TypedBody::encode(&images)
    }
}

pub struct GetImageHandler {
    facade: Arc<RemoteFacade>,
}

impl RemoteHandler for GetImageHandler {
    fn method(&self) -> RemoteMethod {
        RemoteMethod::GetImage
    }

    fn handle(&self, envelope: &Envelope) -> BrokerResult<TypedBody> {
        let request = RemoteGetImageRequest::from_envelope(envelope)?;
        let image = self.facade.get_image(&envelope.sender_id, &request.cloud_name, &request.image_id, &request.system_user)?;
        TypedBody::encode(&image)
    }
}

pub struct GetCloudNamesHandler {
    facade: Arc<RemoteFacade>,
}

impl RemoteHandler for GetCloudNamesHandler {
    fn method(&self) -> RemoteMethod {
        RemoteMethod::GetCloudNames
    }

    fn handle(&self, envelope: &Envelope) -> BrokerResult<TypedBody> {
        let request = RemoteGetCloudNamesRequest::from_envelope(envelope)?;
        let names = self.facade.get_cloud_names(&envelope.sender_id, &request.system_user)?;
        TypedBody::encode(&names)
    }
}

pub struct CreateSecurityRuleHandler {
    facade: Arc<RemoteFacade>,
}

impl RemoteHandler for CreateSecurityRuleHandler {
    fn method(&self) -> RemoteMethod {
        RemoteMethod::CreateSecurityRule
    }

    fn handle(&self, envelope: &Envelope) -> BrokerResult<TypedBody> {
        let request = RemoteCreateSecurityRuleRequest::from_envelope(envelope)?;
        let rule_id = self.facade.create_security_rule(&envelope.sender_id, &request.reference, &request.security_rule)?;
        TypedBody::encode(&rule_id)
    }
}

pub struct GetAllSecurityRulesHandler {
    facade: Arc<RemoteFacade>,
}

impl RemoteHandler for GetAllSecurityRulesHandler {
    fn method(&self) -> RemoteMethod {
        RemoteMethod::GetAllSecurityRules
    }

    fn handle(&self, envelope: &Envelope) -> BrokerResult<TypedBody> {
        let request = RemoteGetAllSecurityRulesRequest::from_envelope(envelope)?;
        let rules = self.facade.get_all_security_rules(&envelope.sender_id, &request.reference)?;
        TypedBody::encode(&rules)
    }
}

pub struct DeleteSecurityRuleHandler {
    facade: Arc<RemoteFacade>,
}

impl RemoteHandler for DeleteSecurityRuleHandler {
    fn method(&self) -> RemoteMethod {
        RemoteMethod::DeleteSecurityRule
    }

    fn handle(&self, envelope: &Envelope) -> BrokerResult<TypedBody> {
        let request = RemoteDeleteSecurityRuleRequest::from_envelope(envelope)?;
        self.facade.delete_security_rule(&envelope.sender_id, &request.cloud_name, &request.rule_id, &request.system_user)?;
        TypedBody::encode(&())
    }
}

pub struct GenericRequestHandler {
    facade: Arc<RemoteFacade>,
}

impl RemoteHandler for GenericRequestHandler {
    fn method(&self) -> RemoteMethod {
        RemoteMethod::GenericRequest
    }

    fn handle(&self, envelope: &Envelope) -> BrokerResult<TypedBody> {
        let request = RemoteGenericRequest::from_envelope(envelope)?;
        let response = self.facade.generic_request(&envelope.sender_id, &request.cloud_name, &request.system_user, &request.generic_request)?;
        TypedBody::encode(&response)
    }
}

/// Dispatches inbound request envelopes to the handler of their method.
///
/// Every failure, including a panicking handler, is encoded into the response
/// as a wire error; nothing escapes to the transport.
pub struct RpcRouter {
    local_member: MemberId,
    handlers: HashMap<RemoteMethod, Box<dyn RemoteHandler>>,
}

impl RpcRouter {
    pub fn new(local_member: MemberId, facade: Arc<RemoteFacade>) -> Self {
        let handlers: Vec<Box<dyn RemoteHandler>> = vec![
            Box::new(CreateOrderHandler { facade: facade.clone() }),
            Box::new(GetOrderHandler { facade: facade.clone() }),
            Box::new(DeleteOrderHandler { facade: facade.clone() }),
            Box::new(StopOrderHandler { facade: facade.clone() }),
            Box::new(NotifyEventHandler { facade: facade.clone() }),
            Box::new(GetUserQuotaHandler { facade: facade.clone() }),
            Box::new(GetAllImagesHandler { facade: facade.clone() }),
            Box::new(GetImageHandler { facade: facade.clone() }),
            Box::new(GetCloudNamesHandler { facade: facade.clone() }),
            Box::new(CreateSecurityRuleHandler { facade: facade.clone() }),
            Box::new(GetAllSecurityRulesHandler { facade: facade.clone() }),
            Box::new(DeleteSecurityRuleHandler { facade: facade.clone() }),
            Box::new(GenericRequestHandler { facade }),
        ];

        RpcRouter { local_member, handlers: handlers.into_iter().map(|h| (h.method(), h)).collect() }
    }

    pub fn local_member(&self) -> &MemberId {
        &self.local_member
    }

    pub fn dispatch(&self, envelope: Envelope) -> Envelope {
        let result = self.route(&envelope);

        let response = match result {
            Ok(body) => RpcResponse::ok(body),
            Err(e) => {
                log::info!("Request [{}] from member {} failed: {}", envelope.correlation_id, envelope.sender_id, e);
                RpcResponse::failed(WireError::from(&e))
            }
        };

        envelope.reply(response)
    }

    fn route(&self, envelope: &Envelope) -> BrokerResult<TypedBody> {
        if envelope.target_id != self.local_member {
            return Err(BrokerError::Unexpected(format!("Envelope for member {} reached member {}", envelope.target_id, self.local_member)));
        }

        let Payload::Request(request) = &envelope.payload else {
            return Err(BrokerError::Unexpected(format!("Unsolicited response [{}]", envelope.correlation_id)));
        };

        let handler = self.handlers.get(&request.method).ok_or_else(|| BrokerError::Unexpected(format!("No handler for {}", request.method)))?;

        log::debug!("Handling {} [{}] from member {}", request.method, envelope.correlation_id, envelope.sender_id);

        catch_unwind(AssertUnwindSafe(|| handler.handle(envelope)))
            .unwrap_or_else(|_| Err(BrokerError::Unexpected(format!("Handler for {} panicked", request.method))))
    }
}
