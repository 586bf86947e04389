//! Error types for remote calls.

use thiserror::Error;

use crate::envelope::ErrorCode;

/// Primary error type for client operations.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The server executed the call and reported a failure.
    #[error("remote call failed")]
    Application {
        /// Method that was called.
        method: String,
        /// Server-defined error code.
        code: i64,
        /// Server-provided description.
        message: String,
    },
    /// No usable HTTP response was received.
    #[error("transport failure")]
    Transport {
        /// Method that was called.
        method: String,
        /// Status-derived description (`HTTP: <status> <reason>`).
        message: String,
        /// Underlying client error, absent for non-success statuses.
        #[source]
        source: Option<reqwest::Error>,
    },
    /// The response body was not a JSON-RPC envelope of the expected shape.
    #[error("response could not be decoded")]
    Decode {
        /// Method that was called.
        method: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
    /// No discovered method lives in the namespace.
    #[error("unknown namespace")]
    UnknownNamespace {
        /// Requested namespace.
        namespace: String,
    },
    /// The namespace does not export the method.
    #[error("unknown method")]
    UnknownMethod {
        /// Requested fully qualified method name.
        method: String,
    },
    /// The HTTP transport could not be built from the configuration.
    #[error("invalid client configuration")]
    InvalidConfig {
        /// Underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl RpcError {
    /// Error code carried by the failure envelope, if this error produced one.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Application { code, .. } => Some(ErrorCode::from_i64(*code)),
            Self::Transport { .. } | Self::Decode { .. } => Some(ErrorCode::Transport),
            Self::UnknownNamespace { .. } | Self::UnknownMethod { .. } | Self::InvalidConfig { .. } => {
                None
            }
        }
    }

    /// Description suitable for the failure envelope and for users.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Application { message, .. } | Self::Transport { message, .. } => message.clone(),
            Self::Decode { source, .. } => format!("JSON: {source}"),
            Self::UnknownNamespace { namespace } => format!("no such namespace: {namespace}"),
            Self::UnknownMethod { method } => format!("no such method: {method}"),
            Self::InvalidConfig { source } => source.to_string(),
        }
    }
}

/// Convenience alias for client results.
pub type RpcResult<T> = Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_errors_keep_the_server_code() {
        let err = RpcError::Application {
            method: "core.get_config".into(),
            code: 1,
            message: "Not authenticated".into(),
        };
        assert_eq!(err.code(), Some(ErrorCode::NotAuthenticated));
        assert_eq!(err.detail(), "Not authenticated");
        assert_eq!(err.to_string(), "remote call failed");
    }

    #[test]
    fn transport_and_decode_errors_use_the_sentinel() {
        let transport = RpcError::Transport {
            method: "core.get_config".into(),
            message: "HTTP: 502 Bad Gateway".into(),
            source: None,
        };
        assert_eq!(transport.code(), Some(ErrorCode::Transport));

        let decode = RpcError::Decode {
            method: "core.get_config".into(),
            source: serde_json::from_str::<serde_json::Value>("{").expect_err("invalid"),
        };
        assert_eq!(decode.code(), Some(ErrorCode::Transport));
        assert!(decode.detail().starts_with("JSON: "));
    }

    #[test]
    fn lookup_errors_have_no_code() {
        let err = RpcError::UnknownNamespace {
            namespace: "label".into(),
        };
        assert_eq!(err.code(), None);
        assert_eq!(err.detail(), "no such namespace: label");
    }
}
