//! Validation gate: the ordered pass chain every proposed command must clear
//! before the ledger may apply it.
//!
//! Passes run in strict order and the first definitive verdict wins:
//!
//! 1. deny list (local, always runs, cannot fail)
//! 2. policy oracle (only when configured; errors are inconclusive)
//! 3. fallback (only when pass 2 was skipped or inconclusive)
//!
//! "Oracle errored" and "oracle said no" stay distinguishable: the first is
//! reported with `source = FALLBACK` and a `fallback_reason`, the second with
//! `source = POLICY_ORACLE`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::FallbackMode;
use crate::error::Result;
use crate::types::{FallbackReason, ProposedCommand, ValidationResult, ValidationSource};

/// Tokens that reject a command outright when found anywhere in its
/// serialized form (case-insensitive).
pub const BLOCKED_TOKENS: &[&str] = &[
    "SELF_DESTRUCT",
    "DE-ORBIT",
    "DE_ORBIT",
    "DEORBIT",
    "DESTRUCT",
    "WEAPONIZE",
    "ATTACK",
    "DISABLE_SHIELD",
    "TOWARD_DEBRIS",
];

/// Tag attached when a `deny` fallback rejects for lack of an oracle verdict.
pub const ORACLE_UNAVAILABLE_TAG: &str = "POLICY_ORACLE_UNAVAILABLE";

/// Label the policy oracle sees as the author of the checked content.
pub const PROPOSER_MODEL_LABEL: &str = "vyuha-commander";

// ---------------------------------------------------------------------------
// Policy oracle seam
// ---------------------------------------------------------------------------

/// Tag used when the oracle flags content without naming a policy.
pub const UNKNOWN_VIOLATION_TAG: &str = "UNKNOWN";

/// The oracle sends `null` for absent lists and flags; read it as the default.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Per-policy outcome reported by the policy oracle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyFlag {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub flagged: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub flagged_source: Vec<String>,
}

/// Verdict returned by a policy oracle check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyVerdict {
    #[serde(default, deserialize_with = "null_as_default")]
    pub flagged: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub policies: BTreeMap<String, PolicyFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_session_id: Option<String>,
}

impl PolicyVerdict {
    /// One tag per flagged policy: `name`, or `name:src1,src2` when the
    /// oracle says which parts of the content tripped it.
    pub fn violation_tags(&self) -> Vec<String> {
        self.policies
            .iter()
            .filter(|(_, p)| p.flagged)
            .map(|(id, p)| {
                let name = p.name.as_deref().unwrap_or(id);
                if p.flagged_source.is_empty() {
                    name.to_string()
                } else {
                    format!("{name}:{}", p.flagged_source.join(","))
                }
            })
            .collect()
    }
}

/// External capability that flags content violating safety policy.
///
/// Implementations must treat transport failures, timeouts and non-2xx
/// responses as `Err`; the gate turns those into a fallback verdict.
pub trait PolicyOracle: Send + Sync {
    fn check(
        &self,
        content: &str,
        session_id: &str,
        metadata: &serde_json::Value,
    ) -> Result<PolicyVerdict>;
}

// ---------------------------------------------------------------------------
// Pass verdicts
// ---------------------------------------------------------------------------

/// Outcome of a single pass.
#[derive(Debug, Clone, PartialEq)]
pub enum PassVerdict {
    Approve,
    Reject(Vec<String>),
    Inconclusive(FallbackReason),
}

// ---------------------------------------------------------------------------
// ValidationGate
// ---------------------------------------------------------------------------

/// Stateless across calls; oracle readiness is fixed at construction.
pub struct ValidationGate {
    deny_tokens: Vec<String>,
    oracle: Option<Arc<dyn PolicyOracle>>,
    fallback: FallbackMode,
}

impl ValidationGate {
    pub fn new(oracle: Option<Arc<dyn PolicyOracle>>, fallback: FallbackMode) -> Self {
        Self {
            deny_tokens: BLOCKED_TOKENS.iter().map(|t| t.to_string()).collect(),
            oracle,
            fallback,
        }
    }

    /// Extend the built-in deny list. Tokens are matched upper-cased.
    pub fn with_extra_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for token in tokens {
            let token = token.as_ref().trim().to_ascii_uppercase();
            if !token.is_empty() && !self.deny_tokens.contains(&token) {
                self.deny_tokens.push(token);
            }
        }
        self
    }

    pub fn oracle_configured(&self) -> bool {
        self.oracle.is_some()
    }

    pub fn validate(&self, command: &ProposedCommand, session_id: &str) -> ValidationResult {
        let text = command.serialized();

        if let PassVerdict::Reject(tags) = self.deny_list_pass(&text) {
            return ValidationResult {
                approved: false,
                source: ValidationSource::DenyList,
                violation_tags: tags,
                fallback_reason: None,
            };
        }

        let reason = match self.policy_oracle_pass(&text, session_id) {
            PassVerdict::Approve => {
                return ValidationResult {
                    approved: true,
                    source: ValidationSource::PolicyOracle,
                    violation_tags: Vec::new(),
                    fallback_reason: None,
                }
            }
            PassVerdict::Reject(tags) => {
                return ValidationResult {
                    approved: false,
                    source: ValidationSource::PolicyOracle,
                    violation_tags: tags,
                    fallback_reason: None,
                }
            }
            PassVerdict::Inconclusive(reason) => reason,
        };

        self.fallback_pass(reason)
    }

    /// Pure local match; sorted so identical commands yield identical tags.
    pub fn deny_list_pass(&self, text: &str) -> PassVerdict {
        let upper = text.to_ascii_uppercase();
        let mut matched: Vec<String> = self
            .deny_tokens
            .iter()
            .filter(|t| upper.contains(t.as_str()))
            .cloned()
            .collect();
        if matched.is_empty() {
            PassVerdict::Approve
        } else {
            matched.sort();
            PassVerdict::Reject(matched)
        }
    }

    fn policy_oracle_pass(&self, text: &str, session_id: &str) -> PassVerdict {
        let Some(oracle) = &self.oracle else {
            return PassVerdict::Inconclusive(FallbackReason::Unconfigured);
        };
        let metadata = serde_json::json!({
            "assistant": { "model_name": PROPOSER_MODEL_LABEL },
            "message": { "timestamp": chrono::Utc::now().to_rfc3339() },
            "environment": { "name": "vyuha-ai" },
        });
        match oracle.check(text, session_id, &metadata) {
            Ok(verdict) if verdict.flagged => {
                let mut tags = verdict.violation_tags();
                if tags.is_empty() {
                    tags.push(UNKNOWN_VIOLATION_TAG.to_string());
                }
                PassVerdict::Reject(tags)
            }
            Ok(_) => PassVerdict::Approve,
            Err(e) => {
                tracing::warn!(
                    session_id,
                    error = %e,
                    "policy oracle unavailable; falling through to fallback pass"
                );
                PassVerdict::Inconclusive(FallbackReason::OracleError)
            }
        }
    }

    fn fallback_pass(&self, reason: FallbackReason) -> ValidationResult {
        match self.fallback {
            FallbackMode::Allow => ValidationResult {
                approved: true,
                source: ValidationSource::Fallback,
                violation_tags: Vec::new(),
                fallback_reason: Some(reason),
            },
            FallbackMode::Deny => ValidationResult {
                approved: false,
                source: ValidationSource::Fallback,
                violation_tags: vec![ORACLE_UNAVAILABLE_TAG.to_string()],
                fallback_reason: Some(reason),
            },
        }
    }
}

/// Feedback handed back to the proposer after a rejection.
pub fn format_rejection_message(violation_tags: &[String]) -> String {
    let tags = if violation_tags.is_empty() {
        UNKNOWN_VIOLATION_TAG.to_string()
    } else {
        violation_tags.join(", ")
    };
    format!("SECURITY ALERT: Command blocked due to [{tags}]. Generate a SAFE alternative.")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
