use anyhow::Result;
use clap::Parser;

use connrate_core::config::MonitorConfig;
use connrate_daemon::cli::DaemonCli;
use connrate_daemon::logging;
use connrate_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // 로깅 초기화 전이므로 에러는 anyhow가 stderr로 출력 (exit code 1)
    let config = MonitorConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load {}: {}", cli.config.display(), e))?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    let log_format = cli.log_format.as_deref().unwrap_or(&config.log_format);
    logging::init_tracing(&config, log_format)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        broker = %config.mqtt_broker,
        mqtt_port = config.mqtt_port,
        syslog_port = config.syslog_port,
        topic = %config.notify_topic,
        "connrate-daemon starting"
    );

    let orchestrator = match Orchestrator::build_from_config(config).await {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            return Err(e);
        }
    };

    orchestrator.run().await?;

    tracing::info!("connrate-daemon shut down");
    Ok(())
}
