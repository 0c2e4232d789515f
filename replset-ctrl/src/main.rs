use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use replset_core::ext::{env_filter, init_logger_with_filter};
use replset_core::retry::TokioSleeper;
use replset_core::{wait_until_available, Controller, Settings};
use replset_mongo::MongoAdmin;
use replset_swarm::SwarmMembership;

/// Keeps a MongoDB replica set in step with the running tasks of a swarm service.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// TOML file layered between the built-in defaults and the environment.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Log filter directives, e.g. `replset_core=debug`.
    #[arg(short, long)]
    log: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger_with_filter(env_filter(args.log.as_deref()).context("invalid log filter")?);
    let settings = Settings::load(args.config.as_deref()).context("cannot load settings")?;
    info!(
        "managing replica set {} for service {} on network {}",
        settings.replicaset_name, settings.mongo_service_name, settings.overlay_network_name
    );

    let source = Arc::new(SwarmMembership::new(
        &settings.docker_host,
        settings.mongo_service_name.as_str(),
        settings.overlay_network_name.as_str(),
        settings.mongo_port,
        settings.connect_timeout(),
    )?);
    let admin = Arc::new(MongoAdmin::new(settings.mongo_port, settings.connect_timeout()));
    let sleeper = Arc::new(TokioSleeper);

    info!("waiting for service {} and its tasks to start", settings.mongo_service_name);
    if let Err(e) = wait_until_available(source.as_ref(), settings.startup_policy(), sleeper.as_ref()).await {
        error!("{}, was the stack deployed with both services?", e);
        return Err(e.into());
    }

    let controller = Controller::new(&settings, source, admin, sleeper);
    tokio::select! {
        _ = controller.run() => {}
        signal = shutdown_signal() => {
            signal?;
            info!("shutting down");
        }
    }
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
