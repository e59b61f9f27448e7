//! Error types for depth-stream processing.
//!
//! All errors implement the `std::error::Error` trait and carry structured
//! context for debugging.
//!
//! ## Error Categories
//!
//! - **Bind Errors**: the multicast endpoint could not be bound at stream
//!   construction. Fatal for that streamer instance.
//! - **Socket Errors**: I/O failures on an established receive socket.
//! - **Decode Errors**: malformed datagrams on the wire.
//! - **Config Errors**: invalid construction parameters.
//!
//! "No new frame" and "previous frame not yet released" are *not* errors —
//! [`DepthFrameStreamer::acquire_latest_frame`] signals them by returning
//! `None`.
//!
//! [`DepthFrameStreamer::acquire_latest_frame`]: crate::DepthFrameStreamer::acquire_latest_frame

use std::net::SocketAddr;
use thiserror::Error;

/// Result type alias for stream operations.
pub type Result<T, E = StreamError> = std::result::Result<T, E>;

/// Main error type for depth-stream operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StreamError {
    #[error("Failed to bind multicast endpoint {endpoint}")]
    Bind {
        endpoint: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Socket error during {context}")]
    Socket {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Decode error in {context}: {details}")]
    Decode { context: String, details: String },

    #[error("Invalid stream configuration: {reason}")]
    Config { reason: String },

    #[error("A depth streamer is already open for this client")]
    AlreadyOpen,
}

impl StreamError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Socket { .. } => true,
            StreamError::Decode { .. } => true,
            StreamError::Bind { .. } => false,
            StreamError::Config { .. } => false,
            StreamError::AlreadyOpen => false,
        }
    }

    /// Helper constructor for endpoint bind failures.
    pub fn bind_failed(endpoint: SocketAddr, source: std::io::Error) -> Self {
        StreamError::Bind { endpoint, source }
    }

    /// Helper constructor for socket I/O errors with operation context.
    pub fn socket_error(context: impl Into<String>, source: std::io::Error) -> Self {
        StreamError::Socket { context: context.into(), source }
    }

    /// Helper constructor for datagram decode errors.
    pub fn decode_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        StreamError::Decode { context: context.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        StreamError::Config { reason: reason.into() }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::Socket { context: "socket operation".to_string(), source: err }
    }
}
