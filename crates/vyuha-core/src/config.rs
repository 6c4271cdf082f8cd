use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// SpacecraftConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpacecraftConfig {
    #[serde(default = "default_spacecraft_name")]
    pub name: String,
}

fn default_spacecraft_name() -> String {
    "ISS".to_string()
}

impl Default for SpacecraftConfig {
    fn default() -> Self {
        Self {
            name: default_spacecraft_name(),
        }
    }
}

// ---------------------------------------------------------------------------
// RetryConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per action cycle, including the first.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    3
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProposerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposerConfig {
    #[serde(default = "default_proposer_base_url")]
    pub base_url: String,
    #[serde(default = "default_proposer_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_proposer_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_proposer_timeout")]
    pub timeout_seconds: u64,
}

fn default_proposer_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_proposer_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_proposer_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_proposer_timeout() -> u64 {
    30
}

impl Default for ProposerConfig {
    fn default() -> Self {
        Self {
            base_url: default_proposer_base_url(),
            model: default_proposer_model(),
            api_key_env: default_proposer_key_env(),
            timeout_seconds: default_proposer_timeout(),
        }
    }
}

impl ProposerConfig {
    /// API key from the environment, if set and non-blank.
    pub fn api_key(&self) -> Option<String> {
        non_blank_env(&self.api_key_env)
    }
}

// ---------------------------------------------------------------------------
// PolicyConfig
// ---------------------------------------------------------------------------

/// What the fallback pass decides when the policy oracle gives no verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    #[default]
    Allow,
    Deny,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_policy_base_url")]
    pub base_url: String,
    #[serde(default = "default_policy_version")]
    pub api_version: String,
    #[serde(default = "default_policy_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_deployment_env")]
    pub deployment_id_env: String,
    /// Literal deployment id; takes precedence over `deployment_id_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
    #[serde(default = "default_policy_timeout")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub fallback: FallbackMode,
}

fn default_policy_base_url() -> String {
    "https://us.whitecircle.ai".to_string()
}

fn default_policy_version() -> String {
    "2025-12-01".to_string()
}

fn default_policy_key_env() -> String {
    "WHITE_CIRCLE_API_KEY".to_string()
}

fn default_deployment_env() -> String {
    "WHITE_CIRCLE_DEPLOYMENT_ID".to_string()
}

fn default_policy_timeout() -> u64 {
    20
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            base_url: default_policy_base_url(),
            api_version: default_policy_version(),
            api_key_env: default_policy_key_env(),
            deployment_id_env: default_deployment_env(),
            deployment_id: None,
            timeout_seconds: default_policy_timeout(),
            fallback: FallbackMode::Allow,
        }
    }
}

/// Resolved credentials for the policy oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyCredentials {
    pub api_key: String,
    pub deployment_id: String,
}

impl PolicyConfig {
    /// Both the key and a deployment id are required; either missing means
    /// the oracle is unconfigured.
    pub fn credentials(&self) -> Option<PolicyCredentials> {
        let api_key = non_blank_env(&self.api_key_env)?;
        let deployment_id = self
            .deployment_id
            .clone()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| non_blank_env(&self.deployment_id_env))?;
        Some(PolicyCredentials {
            api_key,
            deployment_id,
        })
    }
}

// ---------------------------------------------------------------------------
// ValidationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Forbidden tokens added to the built-in deny list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_deny_tokens: Vec<String>,
}

// ---------------------------------------------------------------------------
// InsightsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsConfig {
    #[serde(default = "default_act_ceiling")]
    pub act_latency_ceiling_ms: f64,
    #[serde(default = "default_scan_ceiling")]
    pub scan_latency_ceiling_ms: f64,
    #[serde(default = "default_recent_events")]
    pub recent_events: usize,
}

fn default_act_ceiling() -> f64 {
    3500.0
}

fn default_scan_ceiling() -> f64 {
    1800.0
}

fn default_recent_events() -> usize {
    80
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            act_latency_ceiling_ms: default_act_ceiling(),
            scan_latency_ceiling_ms: default_scan_ceiling(),
            recent_events: default_recent_events(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub spacecraft: SpacecraftConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub proposer: ProposerConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub insights: InsightsConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            spacecraft: SpacecraftConfig::default(),
            retry: RetryConfig::default(),
            proposer: ProposerConfig::default(),
            policy: PolicyConfig::default(),
            validation: ValidationConfig::default(),
            insights: InsightsConfig::default(),
        }
    }
}

impl Config {
    pub fn new(spacecraft_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            spacecraft: SpacecraftConfig {
                name: spacecraft_name.into(),
            },
            ..Self::default()
        }
    }

    /// Load `.vyuha/config.yaml`, or defaults if the file does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.retry.max_retries == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "retry.max_retries must be at least 1".to_string(),
            });
        } else if self.retry.max_retries > 10 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "retry.max_retries={} (>10 is unusual and multiplies oracle latency)",
                    self.retry.max_retries
                ),
            });
        }

        if self.proposer.timeout_seconds == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "proposer.timeout_seconds must be greater than zero".to_string(),
            });
        }
        if self.policy.timeout_seconds == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "policy.timeout_seconds must be greater than zero".to_string(),
            });
        }

        if self.policy.fallback == FallbackMode::Deny {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "policy.fallback is 'deny': every command is rejected while the \
                          policy oracle is unreachable"
                    .to_string(),
            });
        }

        for token in &self.validation.extra_deny_tokens {
            if token.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: "validation.extra_deny_tokens contains an empty token".to_string(),
                });
            }
        }

        warnings
    }

    pub fn has_errors(warnings: &[ConfigWarning]) -> bool {
        warnings.iter().any(|w| w.level == WarnLevel::Error)
    }
}

fn non_blank_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::new("hubble");
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.spacecraft.name, "hubble");
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.retry.max_retries, 3);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "retry:\n  max_retries: 5\npolicy:\n  fallback: deny\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.retry.max_retries, 5);
        assert_eq!(cfg.policy.fallback, FallbackMode::Deny);
        assert_eq!(cfg.policy.timeout_seconds, 20);
        assert_eq!(cfg.proposer.model, "gemini-1.5-flash");
        assert_eq!(cfg.insights.act_latency_ceiling_ms, 3500.0);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.retry.max_retries, 3);
        assert_eq!(cfg.spacecraft.name, "ISS");
    }

    #[test]
    fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("tiangong");
        cfg.retry.max_retries = 4;
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.spacecraft.name, "tiangong");
        assert_eq!(loaded.retry.max_retries, 4);
    }

    #[test]
    fn zero_retries_is_an_error() {
        let mut cfg = Config::default();
        cfg.retry.max_retries = 0;
        let warnings = cfg.validate();
        assert!(Config::has_errors(&warnings));
    }

    #[test]
    fn default_config_is_clean() {
        let cfg = Config::new("iss");
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn deny_fallback_warns() {
        let mut cfg = Config::default();
        cfg.policy.fallback = FallbackMode::Deny;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
    }

    #[test]
    fn credentials_need_both_key_and_deployment() {
        let cfg = PolicyConfig {
            api_key_env: "VYUHA_TEST_UNSET_POLICY_KEY".to_string(),
            deployment_id: Some("dep-1".to_string()),
            ..PolicyConfig::default()
        };
        assert!(cfg.credentials().is_none());
    }
}
