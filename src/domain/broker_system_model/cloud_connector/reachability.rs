use crate::domain::broker_system_model::instance::instance::Instance;
use crate::domain::broker_system_model::order::order::Order;

/// Checks whether a compute instance answers on its management channel.
pub trait ReachabilityChecker: Send + Sync {
    fn is_reachable(&self, order: &Order, instance: &Instance) -> bool;
}

/// Treats every ready instance as reachable.
pub struct AssumeReachable;

impl ReachabilityChecker for AssumeReachable {
    fn is_reachable(&self, _order: &Order, instance: &Instance) -> bool {
        instance.state.is_ready()
    }
}
