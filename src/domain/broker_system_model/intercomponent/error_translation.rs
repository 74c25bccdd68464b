use serde::{Deserialize, Serialize};

use crate::error::BrokerError;

/// Error conditions understood on the wire between members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireCondition {
    Forbidden,
    NotAuthorized,
    BadRequest,
    ItemNotFound,
    RemoteServerNotFound,
    InternalServerError,
    UndefinedCondition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    pub condition: WireCondition,
    pub message: String,
}

impl From<&BrokerError> for WireError {
    fn from(error: &BrokerError) -> Self {
        let condition = match error {
            BrokerError::Unauthorized(_) => WireCondition::Forbidden,
            BrokerError::InvalidParameter(_) => WireCondition::BadRequest,
            BrokerError::NotFound(_) => WireCondition::ItemNotFound,
            BrokerError::ProviderUnavailable(_) => WireCondition::RemoteServerNotFound,
            BrokerError::Unexpected(_) => WireCondition::InternalServerError,
        };
        WireError { condition, message: error.message().to_string() }
    }
}

impl From<WireError> for BrokerError {
    fn from(error: WireError) -> Self {
        match error.condition {
            WireCondition::Forbidden | WireCondition::NotAuthorized => BrokerError::Unauthorized(error.message),
            WireCondition::BadRequest => BrokerError::InvalidParameter(error.message),
            WireCondition::ItemNotFound => BrokerError::NotFound(error.message),
            WireCondition::RemoteServerNotFound => BrokerError::ProviderUnavailable(error.message),
            WireCondition::InternalServerError | WireCondition::UndefinedCondition => BrokerError::Unexpected(error.message),
        }
    }
}
