//! Leg executors, one per execution mode.

mod gateway;
mod simulated;

use std::sync::Arc;

use tracing::info;

pub use gateway::GatewayExecutor;
pub use simulated::SimulatedExecutor;

use crate::adapter::sandbox::SandboxClient;
use crate::config::{RunConfig, SandboxConfig};
use crate::domain::ExecutionMode;
use crate::error::{ConfigError, Result};
use crate::port::{ExchangeGateway, LegExecutor};

/// Build the executor for `mode`. Called once per run.
///
/// # Errors
///
/// `REAL` requires a live gateway; `SANDBOX` fails if the HTTP client
/// cannot be built.
pub fn build_executor(
    mode: ExecutionMode,
    config: &RunConfig,
    live_gateway: Option<&Arc<dyn ExchangeGateway>>,
    sandbox: &SandboxConfig,
) -> Result<Arc<dyn LegExecutor>> {
    let treasury = config.treasury_venue.clone();
    let executor: Arc<dyn LegExecutor> = match mode {
        ExecutionMode::Local => Arc::new(SimulatedExecutor::from_config(config)),
        ExecutionMode::Sandbox => {
            let client: Arc<dyn ExchangeGateway> = Arc::new(SandboxClient::from_config(sandbox)?);
            Arc::new(GatewayExecutor::new(client, mode, treasury))
        }
        ExecutionMode::Real => {
            let gateway = live_gateway.ok_or(ConfigError::MissingField {
                field: "live gateway",
            })?;
            Arc::new(GatewayExecutor::new(Arc::clone(gateway), mode, treasury))
        }
    };
    info!(mode = %mode, "Leg executor ready");
    Ok(executor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_mode_needs_a_gateway() {
        let result = build_executor(
            ExecutionMode::Real,
            &RunConfig::default(),
            None,
            &SandboxConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn local_mode_builds_simulation() {
        let executor = build_executor(
            ExecutionMode::Local,
            &RunConfig::default(),
            None,
            &SandboxConfig::default(),
        )
        .unwrap();
        assert_eq!(executor.mode(), ExecutionMode::Local);
    }

    #[test]
    fn sandbox_mode_builds_client() {
        let executor = build_executor(
            ExecutionMode::Sandbox,
            &RunConfig::default(),
            None,
            &SandboxConfig::default(),
        )
        .unwrap();
        assert_eq!(executor.mode(), ExecutionMode::Sandbox);
    }
}
