//! JVC D-ILA remote-control protocol client.
//!
//! Implements the line-framed ASCII protocol on TCP port 20554: the
//! PJ_OK/PJREQ/PJACK handshake, operation and reference frames, ack
//! verification and payload decoding.
//!
//! # Example
//!
//! ```no_run
//! use dila_remote::jvc::JvcClient;
//!
//! # async fn example() -> dila_remote::Result<()> {
//! let mut client = JvcClient::new("192.168.1.50");
//! let power = client.get_power().await?;
//! println!("power: {power}");
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod command;
mod connection;
mod io;
mod protocol;
mod retry;
mod trace;
mod types;


// Re-export public API
pub use client::{ClientOptions, JvcClient, ProjectorInfo};
pub use command::{Command, Decoder, Reply};
pub use retry::{RetryPolicy, retry};
pub use trace::{FnTrace, LogTrace, NoopTrace, TraceSink};
pub use types::{ConnectionState, DEFAULT_PORT, Direction, Power, Value};
