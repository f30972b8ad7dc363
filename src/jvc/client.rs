//! JvcClient struct and public API.

use super::command::{self, Command};
use super::connection::Connection;
use super::retry::{RetryPolicy, retry};
use super::trace::{NoopTrace, TraceSink};
use super::types::{ConnectionState, DEFAULT_PORT, Power, Value};
use crate::error::{ProjectorError, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Tunables for a [`JvcClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub port: u16,
    /// Read timeout applied to command exchanges.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout: Duration::from_secs(2),
            retry: RetryPolicy::default(),
        }
    }
}

/// Client for one JVC D-ILA projector.
///
/// Holds at most one socket. Not internally synchronised: callers that issue
/// commands from several tasks must wrap the client in a mutex (see
/// [`crate::monitor::ProjectorMonitor`]).
pub struct JvcClient {
    host: String,
    options: ClientOptions,
    connection: Option<Connection>,
    state: Arc<watch::Sender<ConnectionState>>,
    trace: Arc<dyn TraceSink>,
}

impl JvcClient {
    /// Create a client with default port, timeout and retry policy.
    pub fn new(host: &str) -> Self {
        Self::with_options(host, ClientOptions::default())
    }

    pub fn with_options(host: &str, options: ClientOptions) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            host: host.to_string(),
            options,
            connection: None,
            state: Arc::new(state),
            trace: Arc::new(NoopTrace),
        }
    }

    /// Attach a diagnostic sink for raw byte exchanges.
    pub fn with_trace(mut self, trace: Arc<dyn TraceSink>) -> Self {
        self.trace = trace;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.options.port)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Read timeout for subsequent command exchanges, including on an open socket.
    pub fn set_timeout(&mut self, timeout: Duration) {
        debug!("Command timeout set to {timeout:?}");
        self.options.timeout = timeout;
    }

    pub fn timeout(&self) -> Duration {
        self.options.timeout
    }

    /// Open and handshake a socket, retrying with linear backoff.
    ///
    /// No-op when already connected.
    pub async fn connect(&mut self) -> Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }

        let addr = self.address();
        info!("Connecting to projector at {addr}");

        let trace = Arc::clone(&self.trace);
        let state = Arc::clone(&self.state);
        let result = retry(&self.options.retry, |attempt| {
            let addr = addr.clone();
            let trace = Arc::clone(&trace);
            let state = Arc::clone(&state);
            async move {
                trace.trace(&format!("connect attempt {attempt} to {addr}"));
                Connection::establish(&addr, trace.as_ref(), &state).await
            }
        })
        .await;

        match result {
            Ok(connection) => {
                self.connection = Some(connection);
                self.state.send_replace(ConnectionState::Ready);
                info!("Connected to projector at {addr}");
                Ok(())
            }
            Err(e) => {
                self.state.send_replace(ConnectionState::Failed);
                error!("Could not connect to {addr}: {e}");
                Err(e)
            }
        }
    }

    /// Close the socket. Safe to call when never connected or already closed.
    pub async fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            info!("Disconnecting from projector at {}", self.address());
            connection.close().await;
        }
        self.state.send_replace(ConnectionState::Disconnected);
    }

    /// Drop the socket after a failed exchange.
    async fn fail(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close().await;
        }
        self.state.send_replace(ConnectionState::Failed);
    }

    /// Exchange one command on the open connection.
    ///
    /// Errors propagate to the caller; the socket is torn down on any of them.
    pub async fn execute(&mut self, command: &Command) -> Result<Option<Value>> {
        let timeout = self.options.timeout;
        let connection = self.connection.as_mut().ok_or(ProjectorError::NotConnected)?;

        debug!("Executing {} ({:?})", command.name, command.direction());
        let result = connection.execute(command, timeout, self.trace.as_ref()).await;
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                self.fail().await;
                Err(e)
            }
        }
    }

    /// Connect if needed, then execute.
    async fn request(&mut self, command: &Command) -> Result<Option<Value>> {
        self.connect().await?;
        self.execute(command).await
    }

    /// Best-effort send: connects if needed and never returns an error.
    ///
    /// Failures are logged, the socket is closed, and `None` is returned.
    /// Operations that succeed also return `None`; use [`execute`](Self::execute)
    /// when the distinction matters.
    pub async fn send(&mut self, command: &Command) -> Option<Value> {
        match self.request(command).await {
            Ok(value) => value,
            Err(e) => {
                error!("Sending {} to {} failed: {e}", command.name, self.address());
                self.disconnect().await;
                None
            }
        }
    }

    async fn reference(&mut self, command: &Command) -> Result<Value> {
        self.request(command)
            .await?
            .ok_or_else(|| ProjectorError::decode(format!("{} returned no value", command.name)))
    }

    async fn text(&mut self, command: &Command) -> Result<String> {
        match self.reference(command).await? {
            Value::Text(text) => Ok(text),
            other => Err(ProjectorError::decode(format!("{}: unexpected value {other:?}", command.name))),
        }
    }

    pub async fn get_power(&mut self) -> Result<Power> {
        match self.reference(&command::POWER).await? {
            Value::Power(power) => Ok(power),
            other => Err(ProjectorError::decode(format!("power: unexpected value {other:?}"))),
        }
    }

    /// Switch the lamp on or off. Slow on the device side; raise the timeout first.
    pub async fn set_power(&mut self, on: bool) -> Result<()> {
        let command = if on { &command::POWER_ON } else { &command::POWER_OFF };
        self.request(command).await.map(|_| ())
    }

    /// Currently selected lens memory slot (1-10).
    pub async fn get_lens_memory(&mut self) -> Result<u8> {
        match self.reference(&command::LENS_MEMORY).await? {
            Value::LensMemory(slot) => Ok(slot),
            other => Err(ProjectorError::decode(format!("lens memory: unexpected value {other:?}"))),
        }
    }

    /// Recall lens memory `slot` (1-10). Out-of-range slots fail before any I/O.
    pub async fn set_lens_memory(&mut self, slot: u8) -> Result<()> {
        let command = command::lens_memory_slot(slot)?;
        self.request(command).await.map(|_| ())
    }

    /// Short model code such as `XH4`, or `None` if the device reports an unknown format.
    pub async fn get_model(&mut self) -> Result<Option<String>> {
        let raw = self.text(&command::MODEL).await?;
        Ok(command::model_code(&raw))
    }

    /// MAC address as 12 hex digits without separators.
    pub async fn get_mac_address(&mut self) -> Result<String> {
        self.text(&command::MAC_ADDRESS).await
    }

    /// Firmware version as `MAJOR.MINOR`, or the raw string if unrecognised.
    pub async fn get_software_version(&mut self) -> Result<String> {
        let raw = self.text(&command::SOFTWARE_VERSION).await?;
        Ok(command::software_version(&raw))
    }

    /// Read every property over the current (or a new) connection.
    pub async fn read_info(&mut self) -> Result<ProjectorInfo> {
        let power = self.get_power().await?;
        let lens_memory = self.get_lens_memory().await?;
        let model = self.get_model().await?;
        let mac_address = self.get_mac_address().await?;
        let software_version = self.get_software_version().await?;

        Ok(ProjectorInfo {
            host: self.host.clone(),
            power,
            lens_memory,
            model,
            mac_address,
            software_version,
            polled_at: Local::now(),
        })
    }

    /// Connect, time the handshake, disconnect.
    pub async fn ping(&mut self) -> Result<Duration> {
        self.disconnect().await;
        let start = Instant::now();
        let result = self.connect().await;
        let elapsed = start.elapsed();
        self.disconnect().await;
        result.map(|_| elapsed)
    }
}

/// Snapshot of every readable property.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectorInfo {
    pub host: String,
    pub power: Power,
    pub lens_memory: u8,
    pub model: Option<String>,
    pub mac_address: String,
    pub software_version: String,
    pub polled_at: DateTime<Local>,
}

impl std::fmt::Display for ProjectorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Projector {} ===", self.host)?;
        writeln!(f, "Power: {}", self.power)?;
        writeln!(f, "Lens memory: {}", self.lens_memory)?;
        writeln!(f, "Model: {}", self.model.as_deref().unwrap_or("unknown"))?;
        writeln!(f, "MAC address: {}", command::format_mac(&self.mac_address))?;
        writeln!(f, "Software version: {}", self.software_version)?;
        Ok(())
    }
}
