pub mod application_facade;
pub mod order_controller;
pub mod remote_facade;
