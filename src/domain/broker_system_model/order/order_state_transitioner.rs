use std::sync::Arc;

use crate::domain::broker_system_model::order::order::{Order, OrderGuard, OrderState};
use crate::domain::broker_system_model::order::order_holders::OrderHolders;
use crate::domain::broker_system_model::utils::id::MemberId;
use crate::error::{BrokerError, BrokerResult};

pub const ORDER_TRANSITIONS_TARGET: &str = "order_transitions";

/// Pushes the outcome of a provider-side order back to the member that requested it.
pub trait EventNotifier: Send + Sync {
    fn notify_event(&self, order: &Order, new_state: OrderState) -> BrokerResult<()>;
}

/// The only component that moves orders between state lists.
///
/// Callers hand in an `OrderGuard`, so the per-order lock is held for the whole
/// remove/set/insert sequence and no other thread sees the order between lists.
/// The two lists are locked one after the other, never together.
pub struct OrderStateTransitioner {
    local_member: MemberId,
    holders: Arc<OrderHolders>,
    notifier: Arc<dyn EventNotifier>,
}

impl OrderStateTransitioner {
    pub fn new(local_member: MemberId, holders: Arc<OrderHolders>, notifier: Arc<dyn EventNotifier>) -> Self {
        OrderStateTransitioner { local_member, holders, notifier }
    }

    pub fn transition(&self, order: &mut OrderGuard<'_>, new_state: OrderState) -> BrokerResult<()> {
        let current = order.state();

        if current == new_state {
            return Err(BrokerError::Unexpected(format!("Order {} is already {}", order.id(), current)));
        }
        if !current.can_transition_to(new_state) {
            return Err(BrokerError::Unexpected(format!("Illegal transition of order {} from {} to {}", order.id(), current, new_state)));
        }

        let origin = self
            .holders
            .list_for(current)
            .ok_or_else(|| BrokerError::Unexpected(format!("No list holds orders in state {}", current)))?;

        if !origin.contains(order.id()) {
            log::error!("Order {} claims state {} but is not in that list", order.id(), current);
            return Err(BrokerError::Unexpected(format!("Order {} is not in the {} list", order.id(), current)));
        }

        if !origin.remove(order.id()) {
            log::error!("Order {} claims state {} but is not in that list", order.id(), current);
            return Err(BrokerError::Unexpected(format!("Order {} is not in the {} list", order.id(), current)));
        }

        order.set_state(new_state);

        if let Some(destination) = self.holders.list_for(new_state) {
            if let Err(e) = destination.add(order.handle().clone()) {
                order.set_state(current);
                if let Err(rollback) = origin.add(order.handle().clone()) {
                    log::error!("Order {} is in no list: moving it to {} failed ({}) and restoring {} failed ({})", order.id(), new_state, e, current, rollback);
                    return Err(BrokerError::Unexpected(format!("Order {} was lost between the {} and {} lists", order.id(), current, new_state)));
                }
                return Err(e);
            }
        }

        if matches!(new_state, OrderState::Fulfilled | OrderState::Failed) && order.is_requester_remote(&self.local_member) {
            self.notify_requester(order, new_state);
        }

        tracing::info!(
            target: ORDER_TRANSITIONS_TARGET,
            order_id = %order.id(),
            from = %current,
            to = %new_state,
            requester = %order.requester(),
            provider = %order.provider(),
            "order state changed"
        );

        Ok(())
    }

    fn notify_requester(&self, order: &OrderGuard<'_>, new_state: OrderState) {
        let remote_copy: Order = (**order).clone();

        match self.notifier.notify_event(&remote_copy, new_state) {
            Ok(()) => log::debug!("Notified member {} that order {} is {}", order.requester(), order.id(), new_state),
            Err(e) => log::warn!("Could not notify member {} about order {}: {}", order.requester(), order.id(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::broker_system_model::order::order::{OrderHandle, SystemUser};
    use crate::domain::broker_system_model::order::order_payload::{OrderPayload, VolumeSpec};
    use crate::domain::broker_system_model::utils::id::{CloudName, OrderId};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<(OrderId, OrderState)>>,
        fail: bool,
    }

    impl EventNotifier for RecordingNotifier {
        fn notify_event(&self, order: &Order, new_state: OrderState) -> BrokerResult<()> {
            self.events.lock().unwrap().push((order.id().clone(), new_state));
            if self.fail { Err(BrokerError::ProviderUnavailable("down".to_string())) } else { Ok(()) }
        }
    }

    fn setup(notifier: Arc<RecordingNotifier>) -> (Arc<OrderHolders>, OrderStateTransitioner) {
        let holders = Arc::new(OrderHolders::new());
        let transitioner = OrderStateTransitioner::new(MemberId::new("local"), holders.clone(), notifier);
        (holders, transitioner)
    }

    fn open_order(holders: &OrderHolders, requester: &str) -> OrderHandle {
        let order = Order::new(
            MemberId::new(requester),
            MemberId::new("local"),
            CloudName::new("c"),
            SystemUser::new("u", "u", "idp"),
            OrderPayload::Volume(VolumeSpec { name: "v".to_string(), size_gb: 1 }),
        );
        let handle = OrderHandle::new(order);
        holders.list_for(OrderState::Open).unwrap().add(handle.clone()).unwrap();
        handle
    }

    fn assert_membership(holders: &OrderHolders, handle: &OrderHandle) {
        let state = handle.state();
        for list in holders.lists() {
            assert_eq!(list.contains(handle.id()), list.state() == state, "order in {:?} found in list {:?}", state, list.state());
        }
    }

    #[test]
    fn test_membership_follows_state() {
        let (holders, transitioner) = setup(Arc::new(RecordingNotifier::default()));
        let handle = open_order(&holders, "local");

        for next in [OrderState::Spawning, OrderState::Fulfilled, OrderState::Failed] {
            transitioner.transition(&mut handle.lock(), next).unwrap();
            assert_eq!(handle.state(), next);
            assert_membership(&holders, &handle);
        }

        transitioner.transition(&mut handle.lock(), OrderState::Closed).unwrap();
        assert!(holders.lists().iter().all(|list| !list.contains(handle.id())));
    }

    #[test]
    fn test_closed_is_terminal() {
        let (holders, transitioner) = setup(Arc::new(RecordingNotifier::default()));
        let handle = open_order(&holders, "local");
        transitioner.transition(&mut handle.lock(), OrderState::Closed).unwrap();

        for target in OrderState::LISTED {
            assert!(transitioner.transition(&mut handle.lock(), target).is_err());
            assert_eq!(handle.state(), OrderState::Closed);
        }
    }

    #[test]
    fn test_same_state_and_skips_are_rejected() {
        let (holders, transitioner) = setup(Arc::new(RecordingNotifier::default()));
        let handle = open_order(&holders, "local");

        assert!(transitioner.transition(&mut handle.lock(), OrderState::Open).is_err());
        assert!(transitioner.transition(&mut handle.lock(), OrderState::Fulfilled).is_err());
        assert_eq!(handle.state(), OrderState::Open);
        assert_membership(&holders, &handle);
    }

    #[test]
    fn test_missing_from_origin_list_leaves_state_unchanged() {
        let (holders, transitioner) = setup(Arc::new(RecordingNotifier::default()));
        let handle = open_order(&holders, "local");
        holders.list_for(OrderState::Open).unwrap().remove(handle.id());

        let result = transitioner.transition(&mut handle.lock(), OrderState::Spawning);
        assert!(matches!(result, Err(BrokerError::Unexpected(_))));
        assert_eq!(handle.state(), OrderState::Open);
        assert!(!holders.list_for(OrderState::Spawning).unwrap().contains(handle.id()));
    }

    #[test]
    fn test_remote_requester_is_notified_on_outcome() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (holders, transitioner) = setup(notifier.clone());
        let handle = open_order(&holders, "remote");

        transitioner.transition(&mut handle.lock(), OrderState::Spawning).unwrap();
        assert!(notifier.events.lock().unwrap().is_empty());

        transitioner.transition(&mut handle.lock(), OrderState::Fulfilled).unwrap();
        let events = notifier.events.lock().unwrap();
        assert_eq!(events.as_slice(), &[(handle.id().clone(), OrderState::Fulfilled)]);
    }

    #[test]
    fn test_local_requester_is_not_notified() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (holders, transitioner) = setup(notifier.clone());
        let handle = open_order(&holders, "local");

        transitioner.transition(&mut handle.lock(), OrderState::Failed).unwrap();
        assert!(notifier.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_notify_failure_does_not_block_transition() {
        let notifier = Arc::new(RecordingNotifier { fail: true, ..Default::default() });
        let (holders, transitioner) = setup(notifier.clone());
        let handle = open_order(&holders, "remote");

        transitioner.transition(&mut handle.lock(), OrderState::Failed).unwrap();
        assert_eq!(handle.state(), OrderState::Failed);
        assert_eq!(notifier.events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_move_sends_no_notification() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (holders, transitioner) = setup(notifier.clone());
        let handle = open_order(&holders, "remote");
        transitioner.transition(&mut handle.lock(), OrderState::Spawning).unwrap();
        holders.list_for(OrderState::Fulfilled).unwrap().add(handle.clone()).unwrap();

        let result = transitioner.transition(&mut handle.lock(), OrderState::Fulfilled);
        assert!(matches!(result, Err(BrokerError::Unexpected(_))));
        assert_eq!(handle.state(), OrderState::Spawning);
        assert!(holders.list_for(OrderState::Spawning).unwrap().contains(handle.id()));
        assert!(notifier.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_notification_carries_the_new_state() {
        struct StateCheck(Mutex<Option<OrderState>>);

        impl EventNotifier for StateCheck {
            fn notify_event(&self, order: &Order, _new_state: OrderState) -> BrokerResult<()> {
                *self.0.lock().unwrap() = Some(order.state());
                Ok(())
            }
        }

        let notifier = Arc::new(StateCheck(Mutex::new(None)));
        let holders = Arc::new(OrderHolders::new());
        let transitioner = OrderStateTransitioner::new(MemberId::new("local"), holders.clone(), notifier.clone());
        let handle = open_order(&holders, "remote");

        transitioner.transition(&mut handle.lock(), OrderState::Failed).unwrap();
        assert_eq!(*notifier.0.lock().unwrap(), Some(OrderState::Failed));
        assert!(holders.list_for(OrderState::Failed).unwrap().contains(handle.id()));
    }
}
