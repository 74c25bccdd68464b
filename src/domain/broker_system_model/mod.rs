pub mod broker_config;
pub mod broker_context;
pub mod cloud_connector;
pub mod facade;
pub mod instance;
pub mod intercomponent;
pub mod member;
pub mod order;
pub mod processors;
pub mod utils;
