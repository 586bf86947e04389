//! Argument parsing and command dispatch.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use sluice_options::OptionValue;
use sluice_rpc::RpcClientConfig;
use sluice_rpc::config::DEFAULT_ENDPOINT;
use sluice_telemetry::{LogFormat, LoggingConfig, command_span, init_logging};
use tracing::Instrument;
use url::Url;

use crate::client::{AppContext, CliError, CliResult, parse_url};
use crate::commands::methods::{handle_call, handle_methods};
use crate::commands::prefs::{handle_prefs_get, handle_prefs_set};
use crate::commands::torrents::handle_torrent_options;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Parses CLI arguments, executes the requested command, and reports
/// failures on stderr. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    if let Err(err) = install_logging(&cli) {
        eprintln!("error: {}", err.display_message());
        return err.exit_code();
    }

    let span = command_span(cli.command.label(), cli.url.as_str());
    match dispatch(cli).instrument(span).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

fn install_logging(cli: &Cli) -> CliResult<()> {
    let config = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format,
        build_sha: option_env!("SLUICE_BUILD_SHA").unwrap_or("dev"),
    };
    init_logging(&config).map_err(CliError::failure)
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    let config = RpcClientConfig::new(cli.url).with_timeout(Duration::from_secs(cli.timeout));
    let ctx = AppContext::connect(config, cli.password.as_deref()).await?;

    match cli.command {
        Command::Methods(args) => handle_methods(&ctx, args, cli.output),
        Command::Call(args) => handle_call(&ctx, args, cli.output).await,
        Command::Prefs(prefs) => match prefs {
            PrefsCommand::Get(args) => handle_prefs_get(&ctx, args, cli.output).await,
            PrefsCommand::Set(args) => handle_prefs_set(&ctx, args, cli.output).await,
        },
        Command::Torrent(torrent) => match torrent {
            TorrentCommand::Options(args) => handle_torrent_options(&ctx, args, cli.output).await,
        },
    }
}

#[derive(Parser)]
#[command(
    name = "sluice",
    about = "Inspect and edit a torrent daemon through its JSON-RPC web endpoint"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "SLUICE_URL",
        value_parser = parse_url,
        default_value = DEFAULT_ENDPOINT
    )]
    url: Url,
    #[arg(long, global = true, env = "SLUICE_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    #[arg(
        long,
        global = true,
        env = "SLUICE_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    timeout: u64,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[arg(
        long,
        global = true,
        env = "SLUICE_LOG_FORMAT",
        value_parser = parse_log_format,
        default_value = "compact"
    )]
    log_format: LogFormat,
    #[arg(
        long,
        global = true,
        env = "SLUICE_LOG_LEVEL",
        default_value = sluice_telemetry::DEFAULT_LOG_LEVEL,
        help = "Log filter used when RUST_LOG is not set"
    )]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// List the methods the daemon advertises.
    Methods(MethodsArgs),
    /// Call a method with JSON arguments and print its result.
    Call(CallArgs),
    /// Show or change daemon preferences.
    #[command(subcommand)]
    Prefs(PrefsCommand),
    /// Per-torrent operations.
    #[command(subcommand)]
    Torrent(TorrentCommand),
}

impl Command {
    const fn label(&self) -> &'static str {
        match self {
            Self::Methods(_) => "methods",
            Self::Call(_) => "call",
            Self::Prefs(PrefsCommand::Get(_)) => "prefs get",
            Self::Prefs(PrefsCommand::Set(_)) => "prefs set",
            Self::Torrent(TorrentCommand::Options(_)) => "torrent options",
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum PrefsCommand {
    /// Print preferences, optionally only the named keys.
    Get(PrefsGetArgs),
    /// Apply `key=value` edits and send the changed keys to the daemon.
    Set(PrefsSetArgs),
}

#[derive(Subcommand)]
pub(crate) enum TorrentCommand {
    /// Show per-torrent options and optionally change them.
    Options(TorrentOptionsArgs),
}

#[derive(Args, Default)]
pub(crate) struct MethodsArgs {
    /// Only list methods of this namespace.
    #[arg(long)]
    pub(crate) namespace: Option<String>,
}

#[derive(Args)]
pub(crate) struct CallArgs {
    /// Fully qualified method name, e.g. `core.get_session_state`.
    pub(crate) method: String,
    /// Positional arguments; each is parsed as JSON and falls back to a string.
    pub(crate) params: Vec<String>,
}

#[derive(Args, Default)]
pub(crate) struct PrefsGetArgs {
    /// Preference keys to print; all keys when omitted.
    pub(crate) keys: Vec<String>,
}

#[derive(Args)]
pub(crate) struct PrefsSetArgs {
    /// Edits as `key=value`.
    #[arg(required = true, value_parser = parse_assignment)]
    pub(crate) assignments: Vec<Assignment>,
}

#[derive(Args)]
pub(crate) struct TorrentOptionsArgs {
    /// Torrent ids (info hashes).
    #[arg(required = true)]
    pub(crate) ids: Vec<String>,
    /// Option edit applied to every listed torrent, as `key=value`.
    #[arg(long = "set", value_parser = parse_assignment)]
    pub(crate) set: Vec<Assignment>,
}

/// A `key=value` edit. The value is coerced to the option's type later.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Assignment {
    pub(crate) key: String,
    pub(crate) value: OptionValue,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub(crate) fn parse_assignment(input: &str) -> Result<Assignment, String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{input}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing option name in '{input}'"));
    }
    Ok(Assignment {
        key: key.to_string(),
        value: OptionValue::Text(value.to_string()),
    })
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input
        .parse::<LogFormat>()
        .map_err(|_| format!("unknown log format '{input}' (expected json, pretty or compact)"))
}
