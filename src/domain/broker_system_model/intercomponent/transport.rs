use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, PoisonError, RwLock};
use std::thread;
use std::time::Duration;

use crate::domain::broker_system_model::intercomponent::handlers::RpcRouter;
use crate::domain::broker_system_model::intercomponent::protocol::Envelope;
use crate::domain::broker_system_model::utils::id::MemberId;

/// Synchronous request/response on top of the member-to-member transport.
pub trait PacketSender: Send + Sync {
    /// Sends `envelope` to its target and blocks for the correlated response.
    ///
    /// Returns `None` on timeout, unknown target or transport failure.
    fn send_sync(&self, envelope: Envelope, timeout: Duration) -> Option<Envelope>;
}

/// In-process transport connecting members that live in the same process.
///
/// Each request is dispatched on its own thread so the caller's timeout holds
/// exactly as it would over the network.
#[derive(Default)]
pub struct LoopbackNetwork {
    routes: RwLock<HashMap<MemberId, Arc<RpcRouter>>>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, member_id: MemberId, router: Arc<RpcRouter>) {
        log::debug!("Loopback route registered for member {}", member_id);
        self.routes.write().unwrap_or_else(PoisonError::into_inner).insert(member_id, router);
    }

    /// Removes the route; later requests to the member go unanswered.
    pub fn unregister(&self, member_id: &MemberId) {
        self.routes.write().unwrap_or_else(PoisonError::into_inner).remove(member_id);
    }

    fn route(&self, member_id: &MemberId) -> Option<Arc<RpcRouter>> {
        self.routes.read().unwrap_or_else(PoisonError::into_inner).get(member_id).cloned()
    }
}

impl PacketSender for LoopbackNetwork {
    fn send_sync(&self, envelope: Envelope, timeout: Duration) -> Option<Envelope> {
        let Some(router) = self.route(&envelope.target_id) else {
            log::warn!("No loopback route to member {}", envelope.target_id);
            return None;
        };

        let (reply_tx, reply_rx) = mpsc::channel();
        let spawned = thread::Builder::new().name("loopback-rpc".to_string()).spawn(move || {
            let response = router.dispatch(envelope);
            let _ = reply_tx.send(response);
        });

        if let Err(e) = spawned {
            log::error!("Could not spawn loopback dispatch thread: {}", e);
            return None;
        }

        match reply_rx.recv_timeout(timeout) {
            Ok(response) => Some(response),
            Err(_) => {
                log::warn!("Loopback request timed out after {:?}", timeout);
                None
            }
        }
    }
}
