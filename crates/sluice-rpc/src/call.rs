//! Callback calling convention and in-flight call handles.

use std::fmt::{self, Debug, Formatter};

use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use crate::envelope::{ErrorCode, RpcResponse};
use crate::error::RpcError;

/// Keys that mark a trailing argument as call options rather than a parameter.
const OPTION_KEYS: [&str; 3] = ["scope", "success", "failure"];

type SuccessHandler = Box<dyn FnOnce(Value, &RpcResponse) + Send>;
type FailureHandler = Box<dyn FnOnce(RpcFailure) + Send>;

/// Handlers invoked when a call completes. Exactly one of them runs, once.
#[derive(Default)]
pub struct CallOptions {
    success: Option<SuccessHandler>,
    failure: Option<FailureHandler>,
}

impl CallOptions {
    /// Options with no handlers; the outcome is only broadcast on failure.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `handler` with the call's result and the full envelope.
    #[must_use]
    pub fn on_success(mut self, handler: impl FnOnce(Value, &RpcResponse) + Send + 'static) -> Self {
        self.success = Some(Box::new(handler));
        self
    }

    /// Run `handler` when the call fails for any reason.
    #[must_use]
    pub fn on_failure(mut self, handler: impl FnOnce(RpcFailure) + Send + 'static) -> Self {
        self.failure = Some(Box::new(handler));
        self
    }

    pub(crate) fn complete(self, outcome: Result<RpcResponse, RpcFailure>) {
        match outcome {
            Ok(envelope) => {
                if let Some(success) = self.success {
                    success(envelope.result.clone(), &envelope);
                }
            }
            Err(failure) => {
                if let Some(handler) = self.failure {
                    handler(failure);
                }
            }
        }
    }
}

impl Debug for CallOptions {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CallOptions")
            .field("success", &self.success.is_some())
            .field("failure", &self.failure.is_some())
            .finish()
    }
}

/// A failed call: the envelope broadcast to subscribers and the typed error.
#[derive(Debug)]
pub struct RpcFailure {
    /// Failure envelope, either from the server or synthesised.
    pub envelope: RpcResponse,
    /// Classified error.
    pub error: RpcError,
}

impl RpcFailure {
    pub(crate) fn new(id: u64, error: RpcError) -> Self {
        let code = error.code().unwrap_or(ErrorCode::Transport);
        Self {
            envelope: RpcResponse::failure(id, code, error.detail()),
            error,
        }
    }

    pub(crate) fn from_envelope(method: &str, envelope: RpcResponse) -> Self {
        let (code, message) = envelope
            .error
            .as_ref()
            .map_or((ErrorCode::TRANSPORT, String::new()), |error| {
                (error.code, error.message.clone())
            });
        Self {
            error: RpcError::Application {
                method: method.to_string(),
                code,
                message,
            },
            envelope,
        }
    }

    /// Raw error code from the envelope.
    #[must_use]
    pub fn code(&self) -> i64 {
        self.envelope
            .error
            .as_ref()
            .map_or(ErrorCode::TRANSPORT, |error| error.code)
    }

    /// Error description from the envelope.
    #[must_use]
    pub fn message(&self) -> &str {
        self.envelope
            .error
            .as_ref()
            .map_or("", |error| error.message.as_str())
    }
}

/// Handle to a call running on the tokio runtime.
#[derive(Debug)]
pub struct PendingCall {
    method: String,
    handle: JoinHandle<()>,
}

impl PendingCall {
    pub(crate) const fn new(method: String, handle: JoinHandle<()>) -> Self {
        Self { method, handle }
    }

    /// Method this call targets.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Abort the call. Handlers that have not started never run.
    pub fn cancel(&self) {
        tracing::debug!(method = %self.method, "cancelling rpc call");
        self.handle.abort();
    }

    /// Whether the call has finished (completed or cancelled).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the call. Returns `false` if it was cancelled or a handler
    /// panicked.
    pub async fn wait(self) -> bool {
        match self.handle.await {
            Ok(()) => true,
            Err(err) if err.is_cancelled() => false,
            Err(err) => {
                tracing::warn!(method = %self.method, error = %err, "rpc callback panicked");
                false
            }
        }
    }
}

/// Split a trailing call-options object off a JSON argument list.
///
/// The last argument is treated as options when it is an object holding any
/// of `scope`, `success` or `failure`; all other arguments stay positional.
#[must_use]
pub fn split_call_options(mut args: Vec<Value>) -> (Vec<Value>, Option<Map<String, Value>>) {
    let is_options = matches!(
        args.last(),
        Some(Value::Object(map)) if OPTION_KEYS.iter().any(|key| map.contains_key(*key))
    );
    if !is_options {
        return (args, None);
    }
    match args.pop() {
        Some(Value::Object(options)) => (args, Some(options)),
        Some(other) => {
            args.push(other);
            (args, None)
        }
        None => (args, None),
    }
}
