#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    clippy::all,
    clippy::pedantic
)]

//! Logging primitives shared by the sluice binaries.
//!
//! Installs a `tracing` subscriber writing to stderr in JSON, pretty or compact
//! form, with `RUST_LOG` taking precedence over the configured level.

pub mod context;
pub mod error;
pub mod init;

pub use context::command_span;
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
