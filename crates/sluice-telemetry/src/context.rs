//! Span helpers for command execution.

use tracing::Span;

use crate::init::build_sha;

/// Span wrapping one CLI command; carries the command name, the endpoint it
/// talks to and the build SHA.
#[must_use]
pub fn command_span(command: &str, endpoint: &str) -> Span {
    tracing::info_span!("command", command, endpoint, build_sha = %build_sha())
}
