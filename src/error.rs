//! Crate-level error type.
//!
//! Every network-facing operation returns [`MeshError`]; the chat app decides
//! per call site whether a failure becomes a system message or a devtools log
//! line. Nothing here is fatal once the client is running.

use thiserror::Error;

/// Errors produced by the transport, the typed gateway client, config
/// loading and the devtools buffer.
#[derive(Debug, Error)]
pub enum MeshError {
    /// A TCP-level connection could not be established or the request
    /// never produced a response.
    #[error("connection failed to {url}: {detail}")]
    Connect { url: String, detail: String },

    /// The gateway replied with a non-2xx HTTP status code.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Response body could not be parsed as the expected JSON structure.
    #[error("JSON parse error on {endpoint}: {detail}")]
    Json { endpoint: String, detail: String },

    /// Config file or CLI override rejected.
    #[error("invalid config: {0}")]
    Config(String),

    /// The devtools log buffer lock was poisoned by a panicking writer.
    #[error("devtools log buffer unavailable")]
    LogBuffer,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MeshError {
    /// `true` for failures that never reached the gateway.
    pub fn is_network(&self) -> bool {
        matches!(self, MeshError::Connect { .. })
    }
}

pub type Result<T> = std::result::Result<T, MeshError>;
