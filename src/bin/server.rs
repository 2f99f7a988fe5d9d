use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use hostwatch::{
    actors::{executor::ExecutorHandle, hub::HubHandle},
    api::{ApiConfig, ApiState, spawn_api_server},
    config::{Config, read_config_file},
    probe::{MetricsProbe, SysinfoProbe},
};
use tracing::{debug, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_targets(vec![
        ("hostwatch", LevelFilter::TRACE),
        ("hostwatch_server", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };

    let probe: Arc<dyn MetricsProbe> = Arc::new(SysinfoProbe::new());
    let hub = HubHandle::spawn(probe.clone(), &config.hub);
    let executor = ExecutorHandle::spawn(config.actions.clone());

    let state = ApiState::new(hub.clone(), executor.clone(), probe);
    let api_config = ApiConfig {
        bind_addr: config.api.bind_addr,
        enable_cors: true,
    };
    spawn_api_server(api_config, state).await?;

    hub.start(Duration::from_millis(config.hub.interval_ms))
        .await?;
    debug!(
        "broadcasting every {}ms for up to {} subscribers",
        config.hub.interval_ms, config.hub.max_subscribers
    );

    tokio::signal::ctrl_c().await?;
    debug!("shutting down");

    hub.stop().await?;
    hub.shutdown().await;
    executor.shutdown().await;

    Ok(())
}
