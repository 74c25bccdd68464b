use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::broker_system_model::instance::image::{GenericRequest, GenericResponse, Image};
use crate::domain::broker_system_model::instance::instance::Instance;
use crate::domain::broker_system_model::instance::quota::Quota;
use crate::domain::broker_system_model::instance::security_rule::SecurityRule;
use crate::domain::broker_system_model::intercomponent::error_translation::WireError;
use crate::domain::broker_system_model::order::order::{Order, OrderState, ResourceType, SystemUser};
use crate::domain::broker_system_model::utils::id::{CloudName, MemberId, OrderId};
use crate::error::{BrokerError, BrokerResult};

/// Verb carried by a request envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteMethod {
    CreateOrder,
    GetOrder,
    DeleteOrder,
    StopOrder,
    NotifyEvent,
    GetUserQuota,
    GetAllImages,
    GetImage,
    GetCloudNames,
    CreateSecurityRule,
    GetAllSecurityRules,
    DeleteSecurityRule,
    GenericRequest,
}

impl RemoteMethod {
    pub const ALL: [RemoteMethod; 13] = [
        RemoteMethod::CreateOrder,
        RemoteMethod::GetOrder,
        RemoteMethod::DeleteOrder,
        RemoteMethod::StopOrder,
        RemoteMethod::NotifyEvent,
        RemoteMethod::GetUserQuota,
        RemoteMethod::GetAllImages,
        RemoteMethod::GetImage,
        RemoteMethod::GetCloudNames,
        RemoteMethod::CreateSecurityRule,
        RemoteMethod::GetAllSecurityRules,
        RemoteMethod::DeleteSecurityRule,
        RemoteMethod::GenericRequest,
    ];
}

impl fmt::Display for RemoteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteMethod::CreateOrder => "create-order",
            RemoteMethod::GetOrder => "get-order",
            RemoteMethod::DeleteOrder => "delete-order",
            RemoteMethod::StopOrder => "stop-order",
            RemoteMethod::NotifyEvent => "notify-event",
            RemoteMethod::GetUserQuota => "get-user-quota",
            RemoteMethod::GetAllImages => "get-all-images",
            RemoteMethod::GetImage => "get-image",
            RemoteMethod::GetCloudNames => "get-cloud-names",
            RemoteMethod::CreateSecurityRule => "create-security-rule",
            RemoteMethod::GetAllSecurityRules => "get-all-security-rules",
            RemoteMethod::DeleteSecurityRule => "delete-security-rule",
            RemoteMethod::GenericRequest => "generic-request",
        };
        write!(f, "{}", name)
    }
}

/// Closed registry of the concrete payload types that may travel inside a `TypedBody`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireVariant {
    ComputeOrder,
    NetworkOrder,
    VolumeOrder,
    AttachmentOrder,
    PublicIpOrder,
    ComputeInstance,
    NetworkInstance,
    VolumeInstance,
    AttachmentInstance,
    PublicIpInstance,
    ComputeQuota,
    NetworkQuota,
    VolumeQuota,
    AttachmentQuota,
    PublicIpQuota,
    ImageMap,
    Image,
    CloudNames,
    SecurityRuleId,
    SecurityRuleList,
    GenericResponse,
    Empty,
}

impl WireVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireVariant::ComputeOrder => "ComputeOrder",
            WireVariant::NetworkOrder => "NetworkOrder",
            WireVariant::VolumeOrder => "VolumeOrder",
            WireVariant::AttachmentOrder => "AttachmentOrder",
            WireVariant::PublicIpOrder => "PublicIpOrder",
            WireVariant::ComputeInstance => "ComputeInstance",
            WireVariant::NetworkInstance => "NetworkInstance",
            WireVariant::VolumeInstance => "VolumeInstance",
            WireVariant::AttachmentInstance => "AttachmentInstance",
            WireVariant::PublicIpInstance => "PublicIpInstance",
            WireVariant::ComputeQuota => "ComputeQuota",
            WireVariant::NetworkQuota => "NetworkQuota",
            WireVariant::VolumeQuota => "VolumeQuota",
            WireVariant::AttachmentQuota => "AttachmentQuota",
            WireVariant::PublicIpQuota => "PublicIpQuota",
            WireVariant::ImageMap => "ImageMap",
            WireVariant::Image => "Image",
            WireVariant::CloudNames => "CloudNames",
            WireVariant::SecurityRuleId => "SecurityRuleId",
            WireVariant::SecurityRuleList => "SecurityRuleList",
            WireVariant::GenericResponse => "GenericResponse",
            WireVariant::Empty => "Empty",
        }
    }

    fn order(resource_type: ResourceType) -> Self {
        match resource_type {
            ResourceType::Compute => WireVariant::ComputeOrder,
            ResourceType::Network => WireVariant::NetworkOrder,
            ResourceType::Volume => WireVariant::VolumeOrder,
            ResourceType::Attachment => WireVariant::AttachmentOrder,
            ResourceType::PublicIp => WireVariant::PublicIpOrder,
        }
    }

    fn instance(resource_type: ResourceType) -> Self {
        match resource_type {
            ResourceType::Compute => WireVariant::ComputeInstance,
            ResourceType::Network => WireVariant::NetworkInstance,
            ResourceType::Volume => WireVariant::VolumeInstance,
            ResourceType::Attachment => WireVariant::AttachmentInstance,
            ResourceType::PublicIp => WireVariant::PublicIpInstance,
        }
    }

    fn quota(resource_type: ResourceType) -> Self {
        match resource_type {
            ResourceType::Compute => WireVariant::ComputeQuota,
            ResourceType::Network => WireVariant::NetworkQuota,
            ResourceType::Volume => WireVariant::VolumeQuota,
            ResourceType::Attachment => WireVariant::AttachmentQuota,
            ResourceType::PublicIp => WireVariant::PublicIpQuota,
        }
    }
}

impl FromStr for WireVariant {
    type Err = BrokerError;

    fn from_str(variant: &str) -> Result<Self, Self::Err> {
        let known = [
            WireVariant::ComputeOrder,
            WireVariant::NetworkOrder,
            WireVariant::VolumeOrder,
            WireVariant::AttachmentOrder,
            WireVariant::PublicIpOrder,
            WireVariant::ComputeInstance,
            WireVariant::NetworkInstance,
            WireVariant::VolumeInstance,
            WireVariant::AttachmentInstance,
            WireVariant::PublicIpInstance,
            WireVariant::ComputeQuota,
            WireVariant::NetworkQuota,
            WireVariant::VolumeQuota,
            WireVariant::AttachmentQuota,
            WireVariant::PublicIpQuota,
            WireVariant::ImageMap,
            WireVariant::Image,
            WireVariant::CloudNames,
            WireVariant::SecurityRuleId,
            WireVariant::SecurityRuleList,
            WireVariant::GenericResponse,
            WireVariant::Empty,
        ];

        known.into_iter().find(|v| v.as_str() == variant).ok_or_else(|| BrokerError::Unexpected(format!("Unknown payload variant '{}'", variant)))
    }
}

/// A payload that may be carried as a `TypedBody`.
pub trait WirePayload: Serialize + DeserializeOwned {
    /// Discriminant describing this value.
    fn wire_variant(&self) -> WireVariant;

    /// Whether a body announced as `variant` may be decoded into this type.
    fn accepts(variant: WireVariant) -> bool;
}

impl WirePayload for Order {
    fn wire_variant(&self) -> WireVariant {
        WireVariant::order(self.resource_type())
    }

    fn accepts(variant: WireVariant) -> bool {
        matches!(
            variant,
            WireVariant::ComputeOrder | WireVariant::NetworkOrder | WireVariant::VolumeOrder | WireVariant::AttachmentOrder | WireVariant::PublicIpOrder
        )
    }
}

impl WirePayload for Instance {
    fn wire_variant(&self) -> WireVariant {
        WireVariant::instance(self.resource_type())
    }

    fn accepts(variant: WireVariant) -> bool {
        matches!(
            variant,
            WireVariant::ComputeInstance
                | WireVariant::NetworkInstance
                | WireVariant::VolumeInstance
                | WireVariant::AttachmentInstance
                | WireVariant::PublicIpInstance
        )
    }
}

impl WirePayload for Quota {
    fn wire_variant(&self) -> WireVariant {
        WireVariant::quota(self.resource_type())
    }

    fn accepts(variant: WireVariant) -> bool {
        matches!(
            variant,
            WireVariant::ComputeQuota | WireVariant::NetworkQuota | WireVariant::VolumeQuota | WireVariant::AttachmentQuota | WireVariant::PublicIpQuota
        )
    }
}

impl WirePayload for BTreeMap<String, String> {
    fn wire_variant(&self) -> WireVariant {
        WireVariant::ImageMap
    }

    fn accepts(variant: WireVariant) -> bool {
        variant == WireVariant::ImageMap
    }
}

impl WirePayload for Image {
    fn wire_variant(&self) -> WireVariant {
        WireVariant::Image
    }

    fn accepts(variant: WireVariant) -> bool {
        variant == WireVariant::Image
    }
}

impl WirePayload for Vec<String> {
    fn wire_variant(&self) -> WireVariant {
        WireVariant::CloudNames
    }

    fn accepts(variant: WireVariant) -> bool {
        variant == WireVariant::CloudNames
    }
}

impl WirePayload for String {
    fn wire_variant(&self) -> WireVariant {
        WireVariant::SecurityRuleId
    }

    fn accepts(variant: WireVariant) -> bool {
        variant == WireVariant::SecurityRuleId
    }
}

impl WirePayload for Vec<SecurityRule> {
    fn wire_variant(&self) -> WireVariant {
        WireVariant::SecurityRuleList
    }

    fn accepts(variant: WireVariant) -> bool {
        variant == WireVariant::SecurityRuleList
    }
}

impl WirePayload for GenericResponse {
    fn wire_variant(&self) -> WireVariant {
        WireVariant::GenericResponse
    }

    fn accepts(variant: WireVariant) -> bool {
        variant == WireVariant::GenericResponse
    }
}

impl WirePayload for () {
    fn wire_variant(&self) -> WireVariant {
        WireVariant::Empty
    }

    fn accepts(variant: WireVariant) -> bool {
        variant == WireVariant::Empty
    }
}

/// JSON body plus the name of its concrete variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedBody {
    pub variant: String,
    pub body: String,
}

impl TypedBody {
    pub fn encode<T: WirePayload>(value: &T) -> BrokerResult<TypedBody> {
        let body = serde_json::to_string(value).map_err(|e| BrokerError::Unexpected(format!("Could not encode payload: {}", e)))?;
        Ok(TypedBody { variant: value.wire_variant().as_str().to_string(), body })
    }

    /// Decodes the body after checking the announced variant against the allow-list of `T`.
    pub fn decode<T: WirePayload>(&self) -> BrokerResult<T> {
        let variant = WireVariant::from_str(&self.variant)?;
        if !T::accepts(variant) {
            return Err(BrokerError::Unexpected(format!("Payload variant '{}' is not allowed here", self.variant)));
        }

        let value: T = serde_json::from_str(&self.body).map_err(|e| BrokerError::Unexpected(format!("Could not decode {} payload: {}", self.variant, e)))?;
        if value.wire_variant() != variant {
            return Err(BrokerError::Unexpected(format!("Payload announced as '{}' decodes as '{}'", self.variant, value.wire_variant().as_str())));
        }

        Ok(value)
    }
}

/// Request fields. Which ones are present depends on the method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: RemoteMethod,
    pub order_id: Option<OrderId>,
    pub order: Option<TypedBody>,
    pub resource_type: Option<ResourceType>,
    pub system_user: Option<SystemUser>,
    pub cloud_name: Option<CloudName>,
    pub image_id: Option<String>,
    pub rule_id: Option<String>,
    pub security_rule: Option<SecurityRule>,
    pub generic_request: Option<GenericRequest>,
    pub new_state: Option<OrderState>,
}

fn missing(method: RemoteMethod, field: &str) -> BrokerError {
    BrokerError::InvalidParameter(format!("{} request without {}", method, field))
}

impl RpcRequest {
    pub fn new(method: RemoteMethod) -> Self {
        RpcRequest {
            method,
            order_id: None,
            order: None,
            resource_type: None,
            system_user: None,
            cloud_name: None,
            image_id: None,
            rule_id: None,
            security_rule: None,
            generic_request: None,
            new_state: None,
        }
    }

    pub fn expect_method(&self, method: RemoteMethod) -> BrokerResult<()> {
        if self.method != method {
            return Err(BrokerError::Unexpected(format!("Expected a {} request, got {}", method, self.method)));
        }
        Ok(())
    }

    pub fn require_order_id(&self) -> BrokerResult<OrderId> {
        self.order_id.clone().ok_or_else(|| missing(self.method, "orderId"))
    }

    pub fn require_order(&self) -> BrokerResult<Order> {
        self.order.as_ref().ok_or_else(|| missing(self.method, "order"))?.decode()
    }

    pub fn require_resource_type(&self) -> BrokerResult<ResourceType> {
        self.resource_type.ok_or_else(|| missing(self.method, "resourceType"))
    }

    pub fn require_system_user(&self) -> BrokerResult<SystemUser> {
        self.system_user.clone().ok_or_else(|| missing(self.method, "systemUser"))
    }

    pub fn require_cloud_name(&self) -> BrokerResult<CloudName> {
        self.cloud_name.clone().ok_or_else(|| missing(self.method, "cloudName"))
    }

    pub fn require_image_id(&self) -> BrokerResult<String> {
        self.image_id.clone().ok_or_else(|| missing(self.method, "imageId"))
    }

    pub fn require_rule_id(&self) -> BrokerResult<String> {
        self.rule_id.clone().ok_or_else(|| missing(self.method, "ruleId"))
    }

    pub fn require_security_rule(&self) -> BrokerResult<SecurityRule> {
        self.security_rule.clone().ok_or_else(|| missing(self.method, "securityRule"))
    }

    pub fn require_generic_request(&self) -> BrokerResult<GenericRequest> {
        self.generic_request.clone().ok_or_else(|| missing(self.method, "genericRequest"))
    }

    pub fn require_new_state(&self) -> BrokerResult<OrderState> {
        self.new_state.ok_or_else(|| missing(self.method, "newState"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub body: Option<TypedBody>,
    pub error: Option<WireError>,
}

impl RpcResponse {
    pub fn ok(body: TypedBody) -> Self {
        RpcResponse { body: Some(body), error: None }
    }

    pub fn failed(error: WireError) -> Self {
        RpcResponse { body: None, error: Some(error) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Request(RpcRequest),
    Response(RpcResponse),
}

/// Routing information that accompanies every message between members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub correlation_id: String,
    pub sender_id: MemberId,
    pub target_id: MemberId,
    pub payload: Payload,
}

impl Envelope {
    pub fn request(sender_id: MemberId, target_id: MemberId, request: RpcRequest) -> Self {
        Envelope { correlation_id: Uuid::new_v4().to_string(), sender_id, target_id, payload: Payload::Request(request) }
    }

    /// Response travelling back along the same route, with the same correlation id.
    pub fn reply(&self, response: RpcResponse) -> Self {
        Envelope {
            correlation_id: self.correlation_id.clone(),
            sender_id: self.target_id.clone(),
            target_id: self.sender_id.clone(),
            payload: Payload::Response(response),
        }
    }
}
