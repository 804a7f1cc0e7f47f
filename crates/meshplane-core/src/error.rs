//! Error types for discovery operations.
//!
//! This module provides [`PlaneError`], the error type used across the
//! control plane, with conversion to [`tonic::Status`] for gRPC responses.

/// Error type for control-plane operations.
///
/// Designed to:
/// - Cover all failure modes without panics
/// - Convert to [`tonic::Status`] with the appropriate code per failure class
/// - Keep transport failures, protocol violations, and recoverable client
///   rejections distinguishable at the call site
#[derive(Debug, thiserror::Error)]
pub enum PlaneError {
    /// The client asked for a type URL the plane does not serve.
    #[error("unknown resource type URL: {type_url}")]
    UnknownTypeUrl {
        /// The unrecognized type URL.
        type_url: String,
    },

    /// The request violated the protocol; the stream must close.
    #[error("protocol violation: {reason}")]
    ProtocolViolation {
        /// What the client got wrong.
        reason: String,
    },

    /// A resource failed to encode into its wire representation.
    #[error("encoding error for {type_url}: {message}")]
    Encoding {
        /// Type URL being encoded.
        type_url: String,
        /// Error message.
        message: String,
    },

    /// Snapshot store operation failed.
    #[error("store error: {message}")]
    Store {
        /// Description of the failure.
        message: String,
    },

    /// gRPC transport error; fatal to the stream.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Optional underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Client stream closed.
    #[error("stream closed: {reason}")]
    StreamClosed {
        /// Reason for closure.
        reason: String,
    },

    /// Client rejected a pushed snapshot (NACK).
    #[error("NACK from {node_id} for {type_url}: {error_message}")]
    NackReceived {
        /// The node that rejected the snapshot.
        node_id: String,
        /// The rejected type URL.
        type_url: String,
        /// Nonce of the rejected response.
        nonce: String,
        /// Error message from the client.
        error_message: String,
    },

    /// Invalid server or builder configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl PlaneError {
    /// Create a transport error from any error type.
    pub fn transport<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a protocol-violation error.
    pub fn violation(reason: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            reason: reason.into(),
        }
    }

    /// Whether this error must tear down the stream it occurred on.
    ///
    /// Encoding errors abort a single push attempt only; unknown type URLs
    /// and NACKs are handled in place. Everything else is stream-fatal.
    #[must_use]
    pub fn is_stream_fatal(&self) -> bool {
        !matches!(
            self,
            Self::UnknownTypeUrl { .. } | Self::Encoding { .. } | Self::NackReceived { .. }
        )
    }
}

/// Map each failure class to the matching gRPC status code.
impl From<PlaneError> for tonic::Status {
    fn from(err: PlaneError) -> Self {
        match &err {
            PlaneError::UnknownTypeUrl { .. } | PlaneError::ProtocolViolation { .. } => {
                tonic::Status::invalid_argument(err.to_string())
            }
            PlaneError::Encoding { .. } | PlaneError::Store { .. } => {
                tonic::Status::internal(err.to_string())
            }
            PlaneError::Transport { .. } | PlaneError::StreamClosed { .. } => {
                tonic::Status::unavailable(err.to_string())
            }
            // A NACK is protocol-level information, not a server failure
            PlaneError::NackReceived { .. } => tonic::Status::ok(err.to_string()),
            PlaneError::Configuration(_) => tonic::Status::invalid_argument(err.to_string()),
        }
    }
}
