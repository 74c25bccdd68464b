use crate::api::member_config_dto::MemberConfigDto;
use crate::api::order_dto::OrderSubmissionDto;
use crate::domain::broker_system_model::broker_config::BrokerConfig;
use crate::domain::broker_system_model::facade::application_facade::OrderRequest;
use crate::error::Result;
use crate::loader::parser::parse_json_file;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

pub fn load_member_config(file_path: &str) -> Result<BrokerConfig> {
    let dto: MemberConfigDto = parse_json_file::<MemberConfigDto>(file_path)?;
    log::info!("Member configuration {} parsed successfully.", file_path);

    let config = BrokerConfig::try_from(dto)?;
    log::info!("Configuration of member {} built ({} clouds, {} peers).", config.member_id, config.clouds.len(), config.peers.len());

    Ok(config)
}

pub fn load_orders(file_path: &str) -> Result<Vec<OrderRequest>> {
    let dto: OrderSubmissionDto = parse_json_file::<OrderSubmissionDto>(file_path)?;
    let orders = dto.orders.into_iter().map(OrderRequest::try_from).collect::<std::result::Result<Vec<_>, _>>()?;
    log::info!("Loaded {} orders from {}.", orders.len(), file_path);
    Ok(orders)
}
