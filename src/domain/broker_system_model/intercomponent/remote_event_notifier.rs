use std::sync::Arc;

use crate::domain::broker_system_model::intercomponent::requests::{RemoteNotifyEventRequest, RemoteRequest, RpcClient};
use crate::domain::broker_system_model::order::order::{Order, OrderState};
use crate::domain::broker_system_model::order::order_state_transitioner::EventNotifier;
use crate::error::BrokerResult;

/// Sends notify-event to the requester of an order.
pub struct RemoteEventNotifier {
    client: Arc<RpcClient>,
}

impl RemoteEventNotifier {
    pub fn new(client: Arc<RpcClient>) -> Self {
        RemoteEventNotifier { client }
    }
}

impl EventNotifier for RemoteEventNotifier {
    fn notify_event(&self, order: &Order, new_state: OrderState) -> BrokerResult<()> {
        RemoteNotifyEventRequest { requester: order.requester().clone(), order: order.clone(), new_state }.send(&self.client)
    }
}
