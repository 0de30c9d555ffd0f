//! Assembly, task wiring, and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `connrate-daemon`.
//! It connects the notifier, creates the record channel, binds the
//! syslog collector, and runs the collector and driver tasks until a
//! shutdown signal arrives.
//!
//! # Startup Order
//!
//! 1. Notifier (broker connection must be acknowledged, otherwise startup fails)
//! 2. Pipeline driver (record channel consumer)
//! 3. Syslog collector (record channel producer)
//!
//! # Shutdown Order
//!
//! 1. Syslog collector (cancelled, drops its channel sender)
//! 2. Pipeline driver (drains queued records, bounded by [`DRAIN_TIMEOUT`])
//! 3. Notifier (MQTT DISCONNECT)

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use connrate_core::config::MonitorConfig;
use connrate_core::pipeline::Notifier;
use connrate_log_pipeline::{
    DriverStats, PipelineConfig, PipelineDriver, PipelineDriverBuilder, SyslogUdpCollector,
    SyslogUdpConfig,
};
use connrate_mqtt_notifier::{MqttConfig, MqttNotifier};

use crate::metrics_server;

/// Upper bound on how long the driver may keep draining after the collector stops.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// The main daemon orchestrator.
pub struct Orchestrator<N: Notifier> {
    /// Loaded and validated configuration.
    config: MonitorConfig,
    /// Shared notifier handle (also held by the driver).
    notifier: Arc<N>,
    /// Bound syslog collector, not yet running.
    collector: SyslogUdpCollector,
    /// Pipeline driver, not yet running.
    driver: PipelineDriver<N>,
    /// Stops the collector.
    cancel_token: CancellationToken,
    /// How long the driver may drain after the collector stops.
    drain_timeout: Duration,
}

impl Orchestrator<MqttNotifier> {
    /// Build from an already-loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The metrics endpoint cannot be installed
    /// - The broker connection is not acknowledged
    /// - The syslog port cannot be bound
    pub async fn build_from_config(config: MonitorConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if let Some(port) = config.metrics_port {
            metrics_server::install_metrics_recorder(&config.metrics_bind_addr, port)?;
        }

        let notifier = MqttNotifier::connect(MqttConfig::from_core(&config))
            .await
            .map_err(|e| anyhow::anyhow!("failed to connect to MQTT broker: {}", e))?;

        Self::assemble(config, Arc::new(notifier)).await
    }

    /// Run until SIGTERM or SIGINT, then shut down and disconnect from the broker.
    pub async fn run(self) -> Result<DriverStats> {
        let notifier = Arc::clone(&self.notifier);
        let result = self.run_until(wait_for_shutdown_signal()).await;
        notifier.disconnect().await;
        result
    }
}

impl<N: Notifier> Orchestrator<N> {
    /// Wire the pipeline around an already-connected notifier.
    ///
    /// The configuration is not validated here.
    pub async fn assemble(config: MonitorConfig, notifier: Arc<N>) -> Result<Self> {
        tracing::debug!("creating record channel");
        let pipeline_config = PipelineConfig::from_core(&config);

        let (driver, record_tx) = PipelineDriverBuilder::new(Arc::clone(&notifier))
            .config(pipeline_config.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build pipeline driver: {}", e))?;

        let cancel_token = CancellationToken::new();
        let collector = SyslogUdpCollector::bind(
            SyslogUdpConfig::from(&pipeline_config),
            record_tx,
            cancel_token.clone(),
        )
        .await
        .map_err(|e| anyhow::anyhow!("failed to start syslog collector: {}", e))?;

        let syslog_addr = collector
            .local_addr()
            .map_err(|e| anyhow::anyhow!("failed to read syslog address: {}", e))?;
        tracing::info!(
            syslog = %syslog_addr,
            notifier = notifier.name(),
            topic = %config.notify_topic,
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            notifier,
            collector,
            driver,
            cancel_token,
            drain_timeout: DRAIN_TIMEOUT,
        })
    }

    /// Override the drain timeout (default [`DRAIN_TIMEOUT`]).
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Address the syslog collector is bound to.
    pub fn syslog_addr(&self) -> Result<SocketAddr> {
        self.collector
            .local_addr()
            .map_err(|e| anyhow::anyhow!("failed to read syslog address: {}", e))
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Start both tasks and run until `shutdown` resolves or the collector exits.
    ///
    /// `shutdown` resolves to the name of the trigger, used for logging.
    pub async fn run_until<F>(self, shutdown: F) -> Result<DriverStats>
    where
        F: Future<Output = Result<&'static str>>,
    {
        let Self {
            mut collector,
            driver,
            cancel_token,
            drain_timeout,
            ..
        } = self;

        let driver_stop = driver.stop_token();
        let mut driver_task = driver.spawn();
        let mut collector_task = tokio::spawn(async move { collector.run().await });

        tracing::info!("entering main event loop");
        let collector_result = tokio::select! {
            signal = shutdown => {
                match signal {
                    Ok(signal) => tracing::info!(signal = signal, "shutdown signal received"),
                    Err(e) => tracing::error!(error = %e, "shutdown trigger failed, stopping"),
                }
                cancel_token.cancel();
                collector_task.await
            }
            result = &mut collector_task => {
                tracing::error!("syslog collector stopped unexpectedly");
                result
            }
        };

        let collector_error = match collector_result {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(anyhow::anyhow!("syslog collector failed: {}", e)),
            Err(e) => Some(anyhow::anyhow!("syslog collector task panicked: {}", e)),
        };

        // The collector has dropped its sender, so the driver drains and exits.
        let joined = match tokio::time::timeout(drain_timeout, &mut driver_task).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = u64::try_from(drain_timeout.as_millis()).unwrap_or(u64::MAX),
                    "pipeline driver did not drain in time, abandoning queued records"
                );
                driver_stop.cancel();
                driver_task.await
            }
        };
        let stats =
            joined.map_err(|e| anyhow::anyhow!("pipeline driver task failed: {}", e))?;

        if let Some(e) = collector_error {
            return Err(e);
        }

        tracing::info!(
            received = stats.received,
            matched = stats.matched,
            published = stats.published,
            failed = stats.failed,
            "shutdown complete"
        );
        Ok(stats)
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}
