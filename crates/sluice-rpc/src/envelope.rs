//! Wire shapes of JSON-RPC requests and responses.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body posted to the endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Fully qualified `namespace.method` name.
    pub method: String,
    /// Positional arguments.
    pub params: Vec<Value>,
    /// Client-assigned request id; carried for protocol fidelity only.
    pub id: u64,
}

/// Response envelope returned by the server or synthesised for failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Call result; `null` when the call failed.
    #[serde(default)]
    pub result: Value,
    /// Error description; `None` on success.
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
    /// Echo of the request id.
    #[serde(default)]
    pub id: Option<u64>,
}

impl RpcResponse {
    /// Failure envelope for a call that never produced a server response.
    #[must_use]
    pub fn failure(id: u64, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            result: Value::Null,
            error: Some(RpcErrorObject {
                message: message.into(),
                code: code.as_i64(),
            }),
            id: Some(id),
        }
    }
}

/// Error member of a response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    /// Human readable description.
    #[serde(alias = "msg")]
    pub message: String,
    /// Numeric error code, see [`ErrorCode`].
    pub code: i64,
}

impl RpcErrorObject {
    /// Classified error code.
    #[must_use]
    pub const fn kind(&self) -> ErrorCode {
        ErrorCode::from_i64(self.code)
    }
}

/// Error codes used by the daemon's web endpoint, plus the transport sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The session is not logged in (or has expired).
    NotAuthenticated,
    /// No method with the requested name is exported.
    UnknownMethod,
    /// The method raised while executing.
    MethodFailed,
    /// The daemon behind the web endpoint reported a failure.
    RemoteCallFailed,
    /// The request body was not a valid JSON-RPC request.
    BadRequest,
    /// No usable response: HTTP failure or an undecodable body.
    Transport,
    /// Any other server-defined code.
    Other(i64),
}

impl ErrorCode {
    /// Sentinel code for failures synthesised by the client.
    pub const TRANSPORT: i64 = 255;

    /// Classify a raw code.
    #[must_use]
    pub const fn from_i64(code: i64) -> Self {
        match code {
            1 => Self::NotAuthenticated,
            2 => Self::UnknownMethod,
            3 => Self::MethodFailed,
            4 => Self::RemoteCallFailed,
            5 => Self::BadRequest,
            Self::TRANSPORT => Self::Transport,
            other => Self::Other(other),
        }
    }

    /// Raw numeric code.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::NotAuthenticated => 1,
            Self::UnknownMethod => 2,
            Self::MethodFailed => 3,
            Self::RemoteCallFailed => 4,
            Self::BadRequest => 5,
            Self::Transport => Self::TRANSPORT,
            Self::Other(code) => code,
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotAuthenticated => "not authenticated",
            Self::UnknownMethod => "unknown method",
            Self::MethodFailed => "method failed",
            Self::RemoteCallFailed => "remote call failed",
            Self::BadRequest => "bad request",
            Self::Transport => "transport",
            Self::Other(code) => return write!(formatter, "code {code}"),
        };
        formatter.write_str(label)
    }
}
