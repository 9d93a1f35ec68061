//! Handler for the `check` command.

use crate::cli::ConfigPathArg;
use crate::config::Config;
use crate::error::Result;

/// Load and validate the configuration, printing a one-line verdict.
pub fn execute(args: &ConfigPathArg) -> Result<()> {
    let config = Config::load(&args.config)?;
    println!(
        "{}: ok (max_concurrent_operations={}, investment={:?} {})",
        args.config.display(),
        config.run.max_concurrent_operations,
        config.run.investment.mode,
        config.run.investment.amount,
    );
    Ok(())
}
