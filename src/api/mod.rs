pub mod member_config_dto;
pub mod order_dto;
