use thiserror::Error;

/// Failures surfaced by the broker core: facades, connectors, the transitioner and the remote protocol.
///
/// The five variants form the closed vocabulary that is also carried over the wire between members,
/// see `intercomponent::error_translation`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The referenced order, instance or rule does not exist on the provider.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller lacks permission for the requested operation.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed request (bad CIDR, bad resource type, wrong field count in an encoded id).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Remote member unreachable or did not answer within the transport timeout.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Any internal failure not otherwise classified.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl BrokerError {
    pub fn message(&self) -> &str {
        match self {
            BrokerError::NotFound(msg)
            | BrokerError::Unauthorized(msg)
            | BrokerError::InvalidParameter(msg)
            | BrokerError::ProviderUnavailable(msg)
            | BrokerError::Unexpected(msg) => msg,
        }
    }
}

pub type BrokerResult<T> = std::result::Result<T, BrokerError>;

/// Errors raised while converting DTOs into the internal configuration model.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Member id must not be empty")]
    EmptyMemberId,

    #[error("Peer '{0}' is configured more than once")]
    DuplicatePeer(String),

    #[error("Address '{1}' of member '{0}' is not a valid socket address")]
    InvalidAddress(String, String),

    #[error("Unknown cloud type: {0}")]
    UnknownCloudType(String),

    #[error("Default cloud '{0}' is not among the configured clouds")]
    UnknownDefaultCloud(String),

    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Order entry '{0}' is invalid: {1}")]
    InvalidOrder(String, String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to build broker configuration: {0}")]
    ConversionError(#[from] ConversionError),

    #[error("Broker operation failed: {0}")]
    BrokerError(#[from] BrokerError),
}

pub type Result<T> = std::result::Result<T, Error>;
