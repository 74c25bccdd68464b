pub mod cidr;
pub mod id;
