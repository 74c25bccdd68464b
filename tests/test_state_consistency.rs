mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Barrier};
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use common::*;
use federation_broker::domain::broker_system_model::broker_context::BrokerContext;
use federation_broker::domain::broker_system_model::instance::instance::InstanceState;
use federation_broker::domain::broker_system_model::order::order::OrderState;
use federation_broker::domain::broker_system_model::processors::order_processor::OrderProcessor;
use federation_broker::domain::broker_system_model::utils::id::OrderId;

/// Every active order sits in exactly the list of its state; closed orders sit nowhere.
fn assert_consistent(context: &BrokerContext, known: &[OrderId]) {
    for order_id in known {
        let holding: Vec<OrderState> = context.holders.lists().iter().filter(|list| list.contains(order_id)).map(|list| list.state()).collect();

        match context.holders.active_orders().get(order_id) {
            Some(handle) => assert_eq!(holding, vec![handle.state()], "order {} misplaced", order_id),
            None => assert!(holding.is_empty(), "closed order {} still listed in {:?}", order_id, holding),
        }
    }
}

#[test]
fn concurrent_passes_apply_one_transition() {
    for _ in 0..20 {
        let m1 = Arc::new(single_member());
        let order_id = m1.member.application_facade().create_order(&user(), volume_request(None)).unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let racers: Vec<_> = (0..2)
            .map(|_| {
                let (m1, barrier, order_id) = (m1.clone(), barrier.clone(), order_id.clone());
                thread::spawn(move || {
                    let handle = m1.handle(&order_id);
                    barrier.wait();
                    m1.member.context().open_processor.process(&handle).unwrap();
                })
            })
            .collect();
        for racer in racers {
            racer.join().unwrap();
        }

        assert_eq!(m1.cloud.requests.load(Ordering::SeqCst), 1);
        assert_eq!(m1.handle(&order_id).state(), OrderState::Spawning);
        assert_consistent(m1.member.context(), &[order_id]);
    }
}

#[test]
fn delete_racing_a_processor_leaves_no_trace() {
    let m1 = Arc::new(single_member());
    let order_id = m1.member.application_facade().create_order(&user(), volume_request(None)).unwrap();
    let handle = m1.handle(&order_id);
    let barrier = Arc::new(Barrier::new(2));

    let processor = {
        let (m1, barrier, handle) = (m1.clone(), barrier.clone(), handle.clone());
        thread::spawn(move || {
            barrier.wait();
            m1.member.context().open_processor.process(&handle).unwrap();
        })
    };
    barrier.wait();
    m1.member.application_facade().delete_order(&user(), &order_id).unwrap();
    processor.join().unwrap();

    assert_eq!(handle.state(), OrderState::Closed);
    assert_consistent(m1.member.context(), &[order_id]);
}

#[test]
fn random_operations_keep_lists_and_states_aligned() {
    let m1 = single_member();
    let context = m1.member.context();
    let facade = m1.member.application_facade();
    let mut rng = StdRng::seed_from_u64(7);
    let mut known = Vec::new();

    for _ in 0..300 {
        match rng.random_range(0..7) {
            0 | 1 => {
                let request = if rng.random_bool(0.5) { volume_request(None) } else { compute_request(None) };
                known.push(facade.create_order(&user(), request).unwrap());
            }
            2 => {
                let state = if rng.random_bool(0.7) { InstanceState::Creating } else { InstanceState::Ready };
                m1.cloud.set_initial_state(state);
                if let Some(handle) = context.holders.list_for(OrderState::Open).unwrap().next() {
                    context.open_processor.process(&handle).unwrap();
                }
            }
            3 => {
                for handle in context.holders.list_for(OrderState::Spawning).unwrap().snapshot() {
                    if let Some(instance_id) = handle.snapshot().instance_id() {
                        let state = [InstanceState::Creating, InstanceState::Ready, InstanceState::Failed][rng.random_range(0..3)];
                        m1.cloud.set_state(instance_id, state);
                    }
                    context.spawning_processor.process(&handle).unwrap();
                }
            }
            4 => {
                m1.reachability.set(rng.random_bool(0.8));
                for handle in context.holders.list_for(OrderState::Fulfilled).unwrap().snapshot() {
                    context.fulfilled_processor.process(&handle).unwrap();
                }
            }
            5 if !known.is_empty() => {
                let order_id = known[rng.random_range(0..known.len())].clone();
                let _ = facade.delete_order(&user(), &order_id);
            }
            _ => {}
        }

        assert_consistent(context, &known);
    }
}
