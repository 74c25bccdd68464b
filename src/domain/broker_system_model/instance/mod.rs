pub mod image;
pub mod instance;
pub mod quota;
pub mod security_rule;
