//! Low-level socket I/O operations with timeout handling.

use super::protocol::escape;
use super::trace::TraceSink;
use crate::error::{ProjectorError, Result};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::error;

/// Write a whole frame with timeout.
pub(crate) async fn write_frame(
    stream: &mut TcpStream,
    frame: &[u8],
    timeout_duration: Duration,
    trace: &dyn TraceSink,
) -> Result<()> {
    trace.trace(&format!("TX ({} bytes): {}", frame.len(), escape(frame)));
    timeout(timeout_duration, stream.write_all(frame))
        .await
        .map_err(|_| ProjectorError::Timeout(format!("write not finished within {timeout_duration:?}")))?
        .map_err(|e| {
            error!("Write failed: {e}");
            ProjectorError::connection(format!("Write failed: {e}"))
        })?;
    Ok(())
}

/// Read exactly `len` bytes with timeout.
///
/// A short read (peer closed early) and a timeout are both errors; the
/// caller must treat the stream as unusable afterwards.
pub(crate) async fn read_frame(
    stream: &mut TcpStream,
    len: usize,
    timeout_duration: Duration,
    trace: &dyn TraceSink,
) -> Result<Vec<u8>> {
    let mut frame = vec![0u8; len];
    match timeout(timeout_duration, stream.read_exact(&mut frame)).await {
        Err(_) => {
            trace.trace(&format!("RX timeout after {timeout_duration:?} waiting for {len} bytes"));
            Err(ProjectorError::Timeout(format!(
                "read of {len} bytes not finished within {timeout_duration:?}"
            )))
        }
        Ok(Err(e)) if e.kind() == ErrorKind::UnexpectedEof => {
            trace.trace(&format!("RX closed before {len} bytes arrived"));
            Err(ProjectorError::connection(format!(
                "connection closed before {len} bytes arrived"
            )))
        }
        Ok(Err(e)) => {
            error!("Read failed: {e}");
            Err(ProjectorError::connection(format!("Read failed: {e}")))
        }
        Ok(Ok(_)) => {
            trace.trace(&format!("RX ({len} bytes): {}", escape(&frame)));
            Ok(frame)
        }
    }
}
