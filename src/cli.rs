//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, init, validate, health), and their associated
//! argument structs. Every `run` flag has an environment variable
//! equivalent for container deployments.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::model::RedirectOptions;
use crate::config::sources::env::DEFAULT_PREFIX;

#[derive(Parser)]
#[command(
    name = "redirector",
    version,
    about = "Host-based HTTP redirector with round-robin targets",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        DOMAIN_MAPPING_1='example.com->http://a.local,http://b.local' redirector run\n  \
        redirector init                      Create a starter mappings file\n  \
        redirector run -c redirector.yaml    Start with a mappings file"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the redirect server
    Run(Box<RunArgs>),

    /// Generate a starter mappings file
    Init(InitArgs),

    /// Validate a mappings file (or the environment) without starting
    Validate(ValidateArgs),

    /// Check health of a running instance via its admin port
    Health(HealthArgs),
}

/// Interpret a switch value. Only the literal `true` turns a switch on.
fn parse_switch(value: &str) -> Result<bool, std::convert::Infallible> {
    Ok(value == "true")
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        redirector run                                   Mappings from DOMAIN_MAPPING_* env vars\n  \
        redirector run -c redirector.yaml                Mappings from a file\n  \
        redirector run -p 8080 --preserve-path --pretty  Local dev mode\n  \
        redirector run --admin-port 9090                 Expose GET /health on :9090")]
pub struct RunArgs {
    /// Mappings file path (.yaml, .json, .toml); env mappings are the fallback
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Listen port, also accepted as a `:port` suffix on the Host header
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Environment variable prefix for `domain->t1,t2` mappings
    #[arg(long, env = "MAPPING_PREFIX", default_value = DEFAULT_PREFIX)]
    pub mapping_prefix: String,

    // -- Redirect behaviour --
    /// Replace the target path with the request path
    #[arg(
        long,
        env = "PRESERVE_PATH",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_switch,
        help_heading = "Redirect"
    )]
    pub preserve_path: bool,

    /// Add a `_t` cache-busting timestamp query parameter
    #[arg(
        long,
        env = "ENABLE_TIMESTAMP",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_switch,
        help_heading = "Redirect"
    )]
    pub enable_timestamp: bool,

    /// Add a `ref` query parameter holding the request Host header
    #[arg(
        long,
        env = "INCLUDE_REFERRAL",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_switch,
        help_heading = "Redirect"
    )]
    pub include_referral: bool,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Operations --
    /// Port for the admin listener serving GET /health (disabled when unset)
    #[arg(long, env = "ADMIN_PORT", help_heading = "Operations")]
    pub admin_port: Option<u16>,

    /// Config refresh interval in seconds (0 disables reloading)
    #[arg(
        long,
        env = "POLL_INTERVAL_SECS",
        default_value_t = 30,
        help_heading = "Operations"
    )]
    pub poll_interval: u64,
}

impl RunArgs {
    #[must_use]
    pub const fn redirect_options(&self) -> RedirectOptions {
        RedirectOptions {
            preserve_path: self.preserve_path,
            add_timestamp: self.enable_timestamp,
            add_referral: self.include_referral,
        }
    }
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        redirector init                          Starter mappings file (yaml)\n  \
        redirector init -f toml -o mappings.toml TOML format, custom path")]
pub struct InitArgs {
    /// Output format
    #[arg(short, long, default_value = "yaml")]
    pub format: ConfigFormat,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Mappings file to validate; validates env mappings when omitted
    pub config: Option<PathBuf>,

    /// Environment variable prefix used when no file is given
    #[arg(long, env = "MAPPING_PREFIX", default_value = DEFAULT_PREFIX)]
    pub mapping_prefix: String,

    /// Treat warnings (bad targets, empty or shadowed mappings) as errors
    #[arg(long)]
    pub strict: bool,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Args)]
pub struct HealthArgs {
    /// Admin URL of the running instance
    #[arg(default_value = "http://localhost:9090")]
    pub url: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(argv: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Some(Commands::Run(args)) => *args,
            _ => panic!("expected run subcommand"),
        }
    }

    #[test]
    fn switches_default_off() {
        let args = run_args(&["redirector", "run"]);
        assert_eq!(args.redirect_options(), RedirectOptions::default());
    }

    #[test]
    fn bare_switch_turns_on() {
        let args = run_args(&["redirector", "run", "--preserve-path", "--include-referral"]);
        let options = args.redirect_options();
        assert!(options.preserve_path);
        assert!(options.add_referral);
        assert!(!options.add_timestamp);
    }

    #[test]
    fn only_literal_true_enables() {
        let args = run_args(&["redirector", "run", "--enable-timestamp", "TRUE"]);
        assert!(!args.enable_timestamp);
        let args = run_args(&["redirector", "run", "--enable-timestamp=true"]);
        assert!(args.enable_timestamp);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
