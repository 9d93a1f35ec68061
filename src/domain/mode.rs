use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where legs are executed. Chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    /// In-process simulation with synthetic prices and fills.
    Local,
    /// Remote paper-trading endpoint.
    Sandbox,
    /// Live exchange gateway.
    Real,
}

impl ExecutionMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
            Self::Sandbox => "SANDBOX",
            Self::Real => "REAL",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "sandbox" => Ok(Self::Sandbox),
            "real" => Ok(Self::Real),
            other => Err(format!("unknown execution mode '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Sandbox".parse::<ExecutionMode>(), Ok(ExecutionMode::Sandbox));
        assert!("paper".parse::<ExecutionMode>().is_err());
    }
}
