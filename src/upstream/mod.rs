//! Upstream MediBill API access.
//!
//! `envelope` is the only place that knows the response shapes upstream has
//! used over time. `client` performs the HTTP calls and hands everything else
//! normalized models.

pub mod client;
pub mod envelope;

pub use client::UpstreamClient;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// DNS, connect, or other transport failure.
    #[error("{0}")]
    Unreachable(String),

    /// Upstream answered with a non-2xx status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// Body was not JSON or not a recognized envelope.
    #[error("{0}")]
    Malformed(String),

    /// An endpoint URL could not be built from the configured template.
    #[error("Server configuration error: {0}")]
    Config(String),
}

impl UpstreamError {
    /// Upstream status for `Status` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
