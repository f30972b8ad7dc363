pub mod config;
pub mod error;
pub mod jvc;
pub mod monitor;

pub use error::{ProjectorError, Result};
