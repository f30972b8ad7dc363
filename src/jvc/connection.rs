//! A single handshaked socket to one projector.

use super::command::{self, Command};
use super::io::{read_frame, write_frame};
use super::protocol::{build_request, escape, extract_payload, response_len, verify_ack};
use super::trace::TraceSink;
use super::types::{ACK_LEN, ConnectionState, PJ_OK, PJACK, PJREQ, Value};
use crate::error::{ProjectorError, Result};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::debug;

/// Read timeout used for every handshake step.
pub(crate) const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

/// Live socket that has completed the handshake.
///
/// Only one request may be in flight at a time; `&mut self` on
/// [`execute`](Connection::execute) enforces that.
pub(crate) struct Connection {
    stream: TcpStream,
}

impl Connection {
    /// Open a TCP socket and run the full handshake.
    ///
    /// `state` is moved to `Handshaking` once the socket is open. It is left
    /// there on failure; the caller decides what comes next.
    pub(crate) async fn establish(
        addr: &str,
        trace: &dyn TraceSink,
        state: &watch::Sender<ConnectionState>,
    ) -> Result<Self> {
        debug!("TCP connecting to {addr}");
        state.send_replace(ConnectionState::Connecting);

        let stream = timeout(HANDSHAKE_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| ProjectorError::connection(format!("Connection timeout to {addr}")))?
            .map_err(|e| ProjectorError::connection(format!("Failed to connect to {addr}: {e}")))?;

        state.send_replace(ConnectionState::Handshaking);
        let mut connection = Self { stream };
        connection.handshake(trace).await?;
        Ok(connection)
    }

    /// PJ_OK -> PJREQ -> PJACK, then a null command to prove the device answers.
    async fn handshake(&mut self, trace: &dyn TraceSink) -> Result<()> {
        let greeting = read_frame(&mut self.stream, PJ_OK.len(), HANDSHAKE_TIMEOUT, trace)
            .await
            .map_err(|e| ProjectorError::handshake(format!("waiting for PJ_OK: {e}")))?;
        if greeting != PJ_OK {
            return Err(ProjectorError::handshake(format!(
                "expected PJ_OK, got {}",
                escape(&greeting)
            )));
        }

        write_frame(&mut self.stream, PJREQ, HANDSHAKE_TIMEOUT, trace)
            .await
            .map_err(|e| ProjectorError::handshake(format!("sending PJREQ: {e}")))?;

        let accept = read_frame(&mut self.stream, PJACK.len(), HANDSHAKE_TIMEOUT, trace)
            .await
            .map_err(|e| ProjectorError::handshake(format!("waiting for PJACK: {e}")))?;
        if accept != PJACK {
            return Err(ProjectorError::handshake(format!(
                "expected PJACK, got {}",
                escape(&accept)
            )));
        }

        self.execute(&command::NULL, HANDSHAKE_TIMEOUT, trace)
            .await
            .map_err(|e| ProjectorError::handshake(format!("null command: {e}")))?;

        Ok(())
    }

    /// Write one request, verify its ack and, for references, read and decode the response.
    ///
    /// Errors are returned as-is; the socket should be dropped after any of them.
    pub(crate) async fn execute(
        &mut self,
        command: &Command,
        read_timeout: Duration,
        trace: &dyn TraceSink,
    ) -> Result<Option<Value>> {
        let request = build_request(command);
        write_frame(&mut self.stream, &request, read_timeout, trace).await?;

        let ack = read_frame(&mut self.stream, ACK_LEN, read_timeout, trace).await?;
        verify_ack(command, &ack)?;

        let Some(len) = response_len(command) else {
            return Ok(None);
        };

        let frame = read_frame(&mut self.stream, len, read_timeout, trace).await?;
        let payload = extract_payload(command, &frame)?;
        command.decode(&payload).map(Some)
    }

    /// Close the socket now rather than on drop.
    pub(crate) async fn close(mut self) {
        // Device may already be gone
        let _ = self.stream.shutdown().await;
    }
}
