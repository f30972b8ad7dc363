//! Polling and command serialisation on top of a shared client.
//!
//! The projector accepts one connection at a time and cannot queue requests,
//! so every access goes through a single `tokio::sync::Mutex`.

use crate::config::AppConfig;
use crate::error::Result;
use crate::jvc::{JvcClient, Power, ProjectorInfo};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, info, warn};

/// A single user-initiated write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    PowerOn,
    PowerOff,
    /// One-based lens memory slot.
    LensMemory(u8),
}

/// Published by [`ProjectorMonitor::run`] after every poll.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    Status(ProjectorInfo),
    Error(String),
}

/// Periodic poller that also serialises user actions.
pub struct ProjectorMonitor {
    client: Arc<Mutex<JvcClient>>,
    timeout: Duration,
    slow_timeout: Duration,
    active_interval: Duration,
    idle_interval: Duration,
}

impl ProjectorMonitor {
    /// Create a monitor from loaded configuration.
    pub fn new(config: &AppConfig) -> Self {
        let options = config.projector.client_options();
        let timeout = options.timeout;
        let client = JvcClient::with_options(&config.projector.host, options);
        Self::with_client(
            client,
            timeout,
            config.projector.slow_timeout(),
            config.monitor.active_interval(),
            config.monitor.idle_interval(),
        )
    }

    pub fn with_client(
        client: JvcClient,
        timeout: Duration,
        slow_timeout: Duration,
        active_interval: Duration,
        idle_interval: Duration,
    ) -> Self {
        Self {
            client: Arc::new(Mutex::new(client)),
            timeout,
            slow_timeout,
            active_interval,
            idle_interval,
        }
    }

    /// Shared handle to the underlying client. Lock it for any direct use.
    pub fn client(&self) -> Arc<Mutex<JvcClient>> {
        Arc::clone(&self.client)
    }

    /// Connect, read every property, disconnect.
    pub async fn poll_once(&self) -> Result<ProjectorInfo> {
        let mut client = self.client.lock().await;
        let result = client.read_info().await;
        client.disconnect().await;
        result
    }

    /// Perform one action with the slow timeout, always disconnecting afterwards.
    pub async fn execute(&self, action: Action) -> Result<()> {
        let mut client = self.client.lock().await;
        info!("Executing {action:?}");

        client.set_timeout(self.slow_timeout);
        let result = match action {
            Action::PowerOn => client.set_power(true).await,
            Action::PowerOff => client.set_power(false).await,
            Action::LensMemory(slot) => client.set_lens_memory(slot).await,
        };
        client.disconnect().await;
        client.set_timeout(self.timeout);

        result
    }

    /// Poll interval following a poll that reported `power`.
    ///
    /// Unknown state (failed poll) polls at the active rate.
    pub fn next_interval(&self, power: Option<Power>) -> Duration {
        match power {
            Some(Power::Off) => self.idle_interval,
            _ => self.active_interval,
        }
    }

    /// Poll until `shutdown` flips or the receiver goes away.
    ///
    /// Poll failures are published as [`MonitorEvent::Error`] and do not stop the loop.
    pub async fn run(&self, events: mpsc::Sender<MonitorEvent>, mut shutdown: watch::Receiver<bool>) {
        loop {
            let (event, power) = match self.poll_once().await {
                Ok(info) => {
                    debug!("Polled {}: power {}", info.host, info.power);
                    let power = info.power;
                    (MonitorEvent::Status(info), Some(power))
                }
                Err(e) => {
                    warn!("Poll failed: {e}");
                    (MonitorEvent::Error(e.to_string()), None)
                }
            };

            if events.send(event).await.is_err() {
                debug!("Monitor receiver dropped, stopping");
                break;
            }

            let interval = self.next_interval(power);
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProjectorError;
    use crate::jvc::{ClientOptions, RetryPolicy};
    use tokio::net::TcpListener;

    async fn unreachable_monitor() -> ProjectorMonitor {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = JvcClient::with_options(
            "127.0.0.1",
            ClientOptions {
                port,
                timeout: Duration::from_millis(200),
                retry: RetryPolicy {
                    attempts: 1,
                    step: Duration::from_millis(1),
                },
            },
        );
        ProjectorMonitor::with_client(
            client,
            Duration::from_millis(200),
            Duration::from_secs(60),
            Duration::from_millis(50),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_next_interval() {
        let monitor = unreachable_monitor().await;
        assert_eq!(monitor.next_interval(Some(Power::Off)), Duration::from_secs(60));
        assert_eq!(monitor.next_interval(Some(Power::On)), Duration::from_millis(50));
        assert_eq!(monitor.next_interval(Some(Power::Cooling)), Duration::from_millis(50));
        assert_eq!(monitor.next_interval(None), Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_execute_rejects_bad_slot_and_restores_timeout() {
        let monitor = unreachable_monitor().await;

        let err = monitor.execute(Action::LensMemory(11)).await.unwrap_err();
        assert!(matches!(err, ProjectorError::InvalidArgument(_)));

        let client = monitor.client();
        let client = client.lock().await;
        assert_eq!(client.timeout(), Duration::from_millis(200));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_execute_failure_still_cleans_up() {
        let monitor = unreachable_monitor().await;

        let err = monitor.execute(Action::PowerOn).await.unwrap_err();
        assert!(matches!(err, ProjectorError::DidNotConnect { .. }), "{err:?}");

        let client = monitor.client();
        let client = client.lock().await;
        assert_eq!(client.timeout(), Duration::from_millis(200));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_run_reports_errors_and_stops() {
        let monitor = Arc::new(unreachable_monitor().await);
        let (tx, mut rx) = mpsc::channel(4);
        let (stop_tx, stop_rx) = watch::channel(false);

        let runner = {
            let monitor = Arc::clone(&monitor);
            tokio::spawn(async move { monitor.run(tx, stop_rx).await })
        };

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, MonitorEvent::Error(_)));

        stop_tx.send(true).unwrap();
        runner.await.unwrap();
    }
}
