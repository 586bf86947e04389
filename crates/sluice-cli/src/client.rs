//! Connection setup, session handling, and error types for the CLI.

use std::fmt::{self, Display, Formatter};

use anyhow::anyhow;
use serde_json::{Value, json};
use sluice_options::OptionsError;
use sluice_rpc::{ClientEvent, ErrorCode, RpcClient, RpcClientConfig, RpcError, RpcResponse};
use tokio::sync::broadcast::error::RecvError;
use url::Url;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<RpcError> for CliError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::UnknownNamespace { .. } | RpcError::UnknownMethod { .. } => {
                Self::Validation(err.detail())
            }
            RpcError::Application {
                method,
                code,
                message,
            } => Self::Failure(anyhow!(
                "{method} failed: {message} ({}, code {code})",
                ErrorCode::from_i64(code)
            )),
            RpcError::Transport { ref method, .. } | RpcError::Decode { ref method, .. } => {
                let context = format!("{method} failed: {}", err.detail());
                Self::Failure(anyhow::Error::new(err).context(context))
            }
            RpcError::InvalidConfig { .. } => Self::Failure(anyhow::Error::new(err)),
        }
    }
}

impl From<OptionsError> for CliError {
    fn from(err: OptionsError) -> Self {
        match err {
            OptionsError::UnknownOption { option } => {
                Self::Validation(format!("unknown option '{option}'"))
            }
            OptionsError::Coercion {
                option,
                expected,
                source,
            } => Self::Validation(format!(
                "option '{option}' expects a {expected} value: {source}"
            )),
            OptionsError::UnknownField { .. } => Self::Failure(anyhow::Error::new(err)),
        }
    }
}

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) client: RpcClient,
}

impl AppContext {
    /// Discover the daemon's methods and log in when a password is given.
    pub(crate) async fn connect(config: RpcClientConfig, password: Option<&str>) -> CliResult<Self> {
        let client = RpcClient::new(config)?;
        watch_session(&client);

        let methods = client.reload_methods().await?;
        tracing::debug!(endpoint = %client.endpoint(), methods = methods.len(), "connected");

        if let Some(password) = password {
            login(&client, password).await?;
        }
        Ok(Self { client })
    }
}

async fn login(client: &RpcClient, password: &str) -> CliResult<()> {
    let accepted = client.execute("auth.login", vec![json!(password)]).await?;
    if accepted == Value::Bool(true) {
        tracing::debug!("session authenticated");
        Ok(())
    } else {
        Err(CliError::validation("login rejected: wrong password"))
    }
}

/// Whether a failure envelope reports a missing or expired session.
pub(crate) fn is_session_expired(envelope: &RpcResponse) -> bool {
    envelope
        .error
        .as_ref()
        .is_some_and(|error| error.kind() == ErrorCode::NotAuthenticated)
}

fn watch_session(client: &RpcClient) {
    let mut events = client.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ClientEvent::Error(envelope)) if is_session_expired(&envelope) => {
                    tracing::warn!(
                        "daemon session is not authenticated; pass --password or set SLUICE_PASSWORD"
                    );
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "session watcher fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Parse the endpoint URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}
