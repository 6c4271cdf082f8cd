pub mod act;
pub mod config;
pub mod init;
pub mod insights;
pub mod scan;
pub mod serve;
pub mod spacecraft;

use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};
use vyuha_core::agent::Agent;
use vyuha_core::types::RiskAssessment;

/// Source label on assessments synthesized by `--simulate-danger`.
pub const SIMULATED_SOURCE_LABEL: &str = "SIMULATED_DANGER";

/// Where a command gets its risk assessment from.
#[derive(Args, Debug, Clone)]
pub struct RiskArgs {
    /// JSON file holding a RiskAssessment
    #[arg(long, value_name = "PATH", conflicts_with = "simulate_danger")]
    pub risk_file: Option<PathBuf>,

    /// Use a forced CRITICAL synthetic assessment (p 0.95, 0.5 km)
    #[arg(long)]
    pub simulate_danger: bool,
}

impl RiskArgs {
    pub fn load(&self) -> anyhow::Result<RiskAssessment> {
        if self.simulate_danger {
            return Ok(RiskAssessment::synthetic_threat(SIMULATED_SOURCE_LABEL));
        }
        let Some(path) = &self.risk_file else {
            anyhow::bail!("a risk assessment is required: pass --risk-file or --simulate-danger");
        };
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let risk: RiskAssessment = serde_json::from_str(&data)
            .with_context(|| format!("{} is not a valid risk assessment", path.display()))?;
        Ok(risk)
    }
}

pub fn open_agent(root: &Path) -> anyhow::Result<Agent> {
    Agent::open(root).with_context(|| format!("failed to open agent at {}", root.display()))
}
