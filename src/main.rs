use anyhow::Context;
use clap::Parser;

use federation_broker::domain::broker_system_model::member::Member;
use federation_broker::domain::broker_system_model::order::order::SystemUser;
use federation_broker::{load_member_config, load_orders, logger};

/// Federated cloud-resource broker member.
#[derive(Debug, Parser)]
#[command(name = "federation-broker", version, about)]
struct Args {
    /// Member configuration (JSON).
    #[arg(long)]
    config: String,

    /// Orders to submit once the member is running (JSON).
    #[arg(long)]
    orders: Option<String>,

    /// User the submitted orders run for.
    #[arg(long, default_value = "admin")]
    user: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init();
    log::info!("Logger initialized. Starting federation member.");

    let config = load_member_config(&args.config).with_context(|| format!("loading {}", args.config))?;
    let member = Member::from_config(config).context("building member")?;
    member.start().context("starting member")?;

    if let Some(path) = &args.orders {
        let system_user = SystemUser::new(args.user.clone(), args.user.clone(), member.id().to_string());
        let facade = member.application_facade();
        for request in load_orders(path).with_context(|| format!("loading {}", path))? {
            match facade.create_order(&system_user, request) {
                Ok(order_id) => log::info!("Submitted order {}", order_id),
                Err(e) => log::error!("Order rejected: {}", e),
            }
        }
    }

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    log::info!("Ctrl-C received, shutting down.");
    member.shutdown();

    Ok(())
}
