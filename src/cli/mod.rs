//! Command-line interface definitions.

pub mod check;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::ExecutionMode;

/// Arbflow - cross-venue arbitrage transaction orchestration.
#[derive(Parser, Debug)]
#[command(name = "arbflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process newline-delimited JSON opportunities from stdin
    Run(RunArgs),

    /// Validate a configuration file
    Check(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Modes reachable from the command line. Live trading needs an injected
/// gateway and is library-only.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CliMode {
    Local,
    Sandbox,
}

impl From<CliMode> for ExecutionMode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Local => Self::Local,
            CliMode::Sandbox => Self::Sandbox,
        }
    }
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to configuration file; defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Execution mode
    #[arg(long, value_enum, default_value = "local")]
    pub mode: CliMode,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,

    /// Terminate in-flight operations immediately on shutdown
    #[arg(long)]
    pub force_stop: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults_to_local() {
        let cli = Cli::parse_from(["arbflow", "run"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.mode, CliMode::Local);
        assert!(args.config.is_none());
    }

    #[test]
    fn real_mode_is_not_accepted() {
        assert!(Cli::try_parse_from(["arbflow", "run", "--mode", "real"]).is_err());
    }

    #[test]
    fn check_takes_config_path() {
        let cli = Cli::parse_from(["arbflow", "check", "--config", "a.toml"]);
        let Commands::Check(arg) = cli.command else {
            panic!("expected check");
        };
        assert_eq!(arg.config, PathBuf::from("a.toml"));
    }
}
