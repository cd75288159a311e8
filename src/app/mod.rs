//! The `logsync-client` binary: newline-delimited records from stdin are
//! buffered by a [`LogCollector`] and shipped to HTTP collector endpoints.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigError, LogFormat, LogLevel};
pub use logging::{LoggingError, setup_logging};

use crate::collector::{LogCollector, spawn_timeout_sweeper};
use crate::storage::MemoryLogStorage;
use crate::transport::{EndpointRotation, HttpLogEndpoint, SignalTransport, SyncDriver};
use anyhow::Context;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct App {
    config: Config,
    collector: Arc<LogCollector>,
    signal: SignalTransport,
    driver: Arc<SyncDriver<HttpLogEndpoint>>,
    shutdown: CancellationToken,
}

impl App {
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let rotation = Arc::new(
            EndpointRotation::parse(&config.endpoints).context("invalid endpoint list")?,
        );
        let endpoint = HttpLogEndpoint::new(config.http_config(), Arc::clone(&rotation))
            .context("failed to build HTTP client")?;

        let mut storage = MemoryLogStorage::new().with_failure_policy(config.failure_policy);
        if let Some(limit) = config.max_record_size {
            storage = storage.with_max_record_size(limit);
        }

        let signal = SignalTransport::new();
        let collector = LogCollector::builder(Arc::new(signal.clone()))
            .config(config.upload_config())
            .storage(Box::new(storage))
            .failover_config(config.failover_config())
            .channel_manager(rotation)
            .build();

        Ok(Self {
            config,
            collector: Arc::new(collector),
            signal,
            driver: Arc::new(SyncDriver::new(endpoint)),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn collector(&self) -> &Arc<LogCollector> {
        &self.collector
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Feeds stdin into the collector until EOF or Ctrl+C.
    pub async fn run(self) -> anyhow::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        self.run_with_input(stdin).await
    }

    pub async fn run_with_input<R>(self, input: R) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let driver_task = {
            let driver = Arc::clone(&self.driver);
            let collector = Arc::clone(&self.collector);
            let signal = self.signal.clone();
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move { driver.run(collector, signal, shutdown).await })
        };

        let sweeper_task = spawn_timeout_sweeper(
            Arc::clone(&self.collector),
            self.config.sweep_interval(),
            self.shutdown.clone(),
        );

        info!(
            endpoints = ?self.config.endpoints,
            batch_volume = self.config.batch_volume,
            volume_threshold = self.config.volume_threshold,
            "logsync-client is running"
        );

        let mut lines = input.lines();
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down");
                    break;
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        if let Err(e) = self.collector.add_record(line) {
                            warn!(error = %e, "Dropping input line");
                        }
                    }
                    Ok(None) => {
                        info!("Input closed, shutting down");
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to read input");
                        break;
                    }
                }
            }
        }

        self.driver.flush(&self.collector).await;
        self.shutdown.cancel();

        driver_task.await.context("sync driver task panicked")?;
        sweeper_task.await.context("timeout sweeper task panicked")?;

        let snapshot = self.collector.stats().snapshot();
        info!(
            stats = %serde_json::to_string(&snapshot)?,
            endpoint = ?self.driver.endpoint().stats().snapshot(),
            delivery_rate = snapshot.delivery_rate(),
            "logsync-client stopped"
        );

        Ok(())
    }
}

pub async fn main() -> anyhow::Result<()> {
    let config = Config::load(std::env::args_os())?;

    if let Err(e) = setup_logging(config.log_level, config.log_format) {
        eprintln!("Logging setup failed: {e}");
    }

    info!("Starting logsync-client v{}", crate::VERSION);

    let app = App::from_config(config)?;
    app.run().await
}
