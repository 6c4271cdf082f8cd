//! Wires configuration into the concrete components and exposes the
//! operations the HTTP surface and the CLI share.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::commander::{HttpProposer, Proposer, RuleProposer};
use crate::config::{Config, WarnLevel};
use crate::error::{Result, VyuhaError};
use crate::events::{Event, EventStore, ScanRecord};
use crate::gate::{PolicyOracle, ValidationGate};
use crate::insights::{compute_insights, Insights};
use crate::ledger::{RestoreOutcome, SpacecraftState, StateLedger};
use crate::orchestrator::{CycleOptions, RetryOrchestrator};
use crate::shield::HttpPolicyOracle;
use crate::types::{ActionCycle, RiskAssessment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposerMode {
    Http,
    Rules,
}

/// Which oracle integrations were configured at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readiness {
    pub proposer: ProposerMode,
    pub policy_oracle: bool,
}

pub struct Agent {
    root: PathBuf,
    config: Config,
    readiness: Readiness,
    orchestrator: RetryOrchestrator,
    ledger: Arc<StateLedger>,
    events: Arc<EventStore>,
}

impl Agent {
    /// Load `.vyuha/config.yaml` under `root` and build HTTP oracle clients
    /// for whichever credentials are present in the environment.
    ///
    /// Builds blocking HTTP clients; call from a blocking context.
    pub fn open(root: &Path) -> Result<Self> {
        let config = Config::load(root)?;

        let (proposer, mode) = match config.proposer.api_key() {
            Some(key) => (
                Arc::new(HttpProposer::new(&config.proposer, key)?) as Arc<dyn Proposer>,
                ProposerMode::Http,
            ),
            None => {
                tracing::info!(
                    env = %config.proposer.api_key_env,
                    "no proposer key; using rule-based proposer"
                );
                (Arc::new(RuleProposer) as Arc<dyn Proposer>, ProposerMode::Rules)
            }
        };

        let oracle: Option<Arc<dyn PolicyOracle>> = match config.policy.credentials() {
            Some(creds) => {
                let oracle: Arc<dyn PolicyOracle> =
                    Arc::new(HttpPolicyOracle::new(&config.policy, creds)?);
                Some(oracle)
            }
            None => {
                tracing::info!("policy oracle not configured; fallback pass decides");
                None
            }
        };

        Self::with_oracles(root, config, proposer, mode, oracle)
    }

    /// Build with caller-supplied oracles. Used by tests and embedders.
    pub fn with_oracles(
        root: &Path,
        config: Config,
        proposer: Arc<dyn Proposer>,
        mode: ProposerMode,
        oracle: Option<Arc<dyn PolicyOracle>>,
    ) -> Result<Self> {
        check_config(&config)?;
        let ledger = Arc::new(StateLedger::open(root)?);
        let events = Arc::new(EventStore::open(root));
        let readiness = Readiness {
            proposer: mode,
            policy_oracle: oracle.is_some(),
        };
        let gate = ValidationGate::new(oracle, config.policy.fallback)
            .with_extra_tokens(&config.validation.extra_deny_tokens);
        let orchestrator = RetryOrchestrator::new(
            proposer,
            gate,
            ledger.clone(),
            events.clone(),
            config.retry.max_retries,
        );
        Ok(Self {
            root: root.to_path_buf(),
            config,
            readiness,
            orchestrator,
            ledger,
            events,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    /// Record a scan performed by the risk source. `latency_ms` defaults to
    /// the time spent validating and recording when the caller did not
    /// measure it.
    pub fn record_scan(
        &self,
        satellite_id: &str,
        risk: RiskAssessment,
        latency_ms: Option<f64>,
    ) -> Result<ScanRecord> {
        let start = Instant::now();
        risk.validate()?;
        let satellite_id = if satellite_id.trim().is_empty() {
            self.config.spacecraft.name.clone()
        } else {
            satellite_id.trim().to_string()
        };
        let record = ScanRecord {
            satellite_id,
            risk,
            latency_ms: latency_ms.unwrap_or_else(|| start.elapsed().as_secs_f64() * 1000.0),
        };
        self.events.append(&Event::scan(record.clone()))?;
        tracing::info!(
            satellite_id = %record.satellite_id,
            status = %record.risk.status,
            probability = record.risk.collision_probability,
            "scan recorded"
        );
        Ok(record)
    }

    pub fn act(&self, risk: RiskAssessment, options: CycleOptions) -> Result<ActionCycle> {
        self.orchestrator.run_action_cycle(risk, options)
    }

    pub fn state(&self) -> Result<SpacecraftState> {
        self.ledger.current()
    }

    pub fn restore(&self) -> Result<RestoreOutcome> {
        self.ledger.restore()
    }

    pub fn insights(&self) -> Result<Insights> {
        let events = self.events.read_all()?;
        Ok(compute_insights(&events, &self.config.insights))
    }
}

/// Log every config warning; refuse to start on error-level ones.
fn check_config(config: &Config) -> Result<()> {
    let warnings = config.validate();
    for w in &warnings {
        match w.level {
            WarnLevel::Warning => tracing::warn!(detail = %w.message, "config warning"),
            WarnLevel::Error => tracing::error!(detail = %w.message, "config error"),
        }
    }
    if Config::has_errors(&warnings) {
        let errors: Vec<&str> = warnings
            .iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message.as_str())
            .collect();
        return Err(VyuhaError::InvalidConfig(errors.join("; ")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CycleStatus, ScenarioMode};
    use tempfile::TempDir;

    fn offline_agent(dir: &TempDir) -> Agent {
        Agent::with_oracles(
            dir.path(),
            Config::default(),
            Arc::new(RuleProposer),
            ProposerMode::Rules,
            None,
        )
        .unwrap()
    }

    #[test]
    fn readiness_reflects_injected_oracles() {
        let dir = TempDir::new().unwrap();
        let agent = offline_agent(&dir);
        assert_eq!(
            agent.readiness(),
            Readiness {
                proposer: ProposerMode::Rules,
                policy_oracle: false
            }
        );
    }

    #[test]
    fn scan_then_act_then_insights() {
        let dir = TempDir::new().unwrap();
        let agent = offline_agent(&dir);

        let record = agent
            .record_scan("", RiskAssessment::synthetic_threat("drill"), Some(42.0))
            .unwrap();
        assert_eq!(record.satellite_id, "ISS");
        assert_eq!(record.risk.scenario_mode, ScenarioMode::Synthetic);

        let cycle = agent
            .act(record.risk.clone(), CycleOptions::default())
            .unwrap();
        assert_eq!(cycle.final_status, CycleStatus::Executed);
        assert!(!agent.state().unwrap().on_baseline());

        let insights = agent.insights().unwrap();
        assert_eq!(insights.scan_events, 1);
        assert_eq!(insights.act_events, 1);
        assert_eq!(insights.avg_scan_latency_ms, 42.0);

        assert!(agent.restore().unwrap().changed);
        assert!(!agent.restore().unwrap().changed);
    }

    #[test]
    fn zero_retries_is_refused_at_startup() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.retry.max_retries = 0;
        let err = Agent::with_oracles(
            dir.path(),
            config,
            Arc::new(RuleProposer),
            ProposerMode::Rules,
            None,
        )
        .err()
        .unwrap();
        assert!(matches!(err, VyuhaError::InvalidConfig(_)));
        assert!(err.to_string().contains("retry.max_retries"));
    }

    #[test]
    fn open_rejects_invalid_config_file() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".vyuha")).unwrap();
        std::fs::write(
            crate::paths::config_path(dir.path()),
            "retry:\n  max_retries: 0\nproposer:\n  api_key_env: VYUHA_TEST_UNSET_PROPOSER_KEY\n\
             policy:\n  api_key_env: VYUHA_TEST_UNSET_POLICY_KEY\n",
        )
        .unwrap();
        assert!(matches!(
            Agent::open(dir.path()),
            Err(VyuhaError::InvalidConfig(_))
        ));
    }

    #[test]
    fn warnings_alone_do_not_block_startup() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.policy.fallback = crate::config::FallbackMode::Deny;
        assert!(Agent::with_oracles(
            dir.path(),
            config,
            Arc::new(RuleProposer),
            ProposerMode::Rules,
            None,
        )
        .is_ok());
    }

    #[test]
    fn extra_deny_tokens_reach_the_gate() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.validation.extra_deny_tokens = vec!["prograde".to_string()];
        let agent = Agent::with_oracles(
            dir.path(),
            config,
            Arc::new(RuleProposer),
            ProposerMode::Rules,
            None,
        )
        .unwrap();
        // The rule proposer fires prograde for critical risk, then holds on feedback.
        let cycle = agent
            .act(RiskAssessment::synthetic_threat("drill"), CycleOptions::default())
            .unwrap();
        assert_eq!(cycle.attempts.len(), 2);
        assert_eq!(cycle.attempts[0].validation.violation_tags, vec!["PROGRADE"]);
    }
}
