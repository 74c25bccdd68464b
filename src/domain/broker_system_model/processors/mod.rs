pub mod fulfilled_processor;
pub mod open_processor;
pub mod order_processor;
pub mod processors_thread_controller;
pub mod spawning_processor;
