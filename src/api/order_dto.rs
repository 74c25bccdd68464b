use serde::{Deserialize, Serialize};

use crate::domain::broker_system_model::order::order_payload::OrderPayload;

/// Orders submitted from a file when the broker starts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmissionDto {
    pub orders: Vec<OrderDto>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub cloud_name: Option<String>,
    pub resource_type: String,
    pub spec: OrderPayload,
}
