pub mod order;
pub mod order_holders;
pub mod order_payload;
pub mod order_state_list;
pub mod order_state_transitioner;
pub mod order_store;
