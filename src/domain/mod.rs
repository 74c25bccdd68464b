pub mod broker_system_model;
