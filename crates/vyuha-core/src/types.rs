use crate::error::{Result, VyuhaError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::ledger::AppliedManeuver;

// ---------------------------------------------------------------------------
// RiskStatus / ScenarioMode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskStatus {
    Safe,
    Critical,
}

impl RiskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskStatus::Safe => "SAFE",
            RiskStatus::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioMode {
    Live,
    Synthetic,
}

impl ScenarioMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioMode::Live => "LIVE",
            ScenarioMode::Synthetic => "SYNTHETIC",
        }
    }
}

impl fmt::Display for ScenarioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RiskAssessment
// ---------------------------------------------------------------------------

/// Conjunction-risk report produced by the telemetry collaborator.
///
/// Immutable once built; one assessment drives one action cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub status: RiskStatus,
    pub collision_probability: f64,
    pub distance_km: f64,
    pub source_label: String,
    pub scenario_mode: ScenarioMode,
    /// Optional position fix reported alongside the risk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_km: Option<f64>,
}

impl RiskAssessment {
    /// Forced-critical assessment used for debris-injection drills: the threat
    /// is synthetic, everything downstream is real.
    pub fn synthetic_threat(source_label: impl Into<String>) -> Self {
        Self {
            status: RiskStatus::Critical,
            collision_probability: 0.95,
            distance_km: 0.5,
            source_label: source_label.into(),
            scenario_mode: ScenarioMode::Synthetic,
            latitude: None,
            longitude: None,
            altitude_km: None,
        }
    }

    /// Reject assessments that could not have come from a sane telemetry source.
    pub fn validate(&self) -> Result<()> {
        let p = self.collision_probability;
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(VyuhaError::InvalidRisk(format!(
                "collision_probability must be within [0, 1], got {p}"
            )));
        }
        if !self.distance_km.is_finite() || self.distance_km < 0.0 {
            return Err(VyuhaError::InvalidRisk(format!(
                "distance_km must be a non-negative number, got {}",
                self.distance_km
            )));
        }
        if self.source_label.trim().is_empty() {
            return Err(VyuhaError::InvalidRisk(
                "source_label must not be empty".to_string(),
            ));
        }
        if let Some(lat) = self.latitude {
            if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
                return Err(VyuhaError::InvalidRisk(format!(
                    "latitude must be within [-90, 90], got {lat}"
                )));
            }
        }
        if let Some(lon) = self.longitude {
            if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
                return Err(VyuhaError::InvalidRisk(format!(
                    "longitude must be within [-180, 180], got {lon}"
                )));
            }
        }
        if let Some(alt) = self.altitude_km {
            if !alt.is_finite() || alt < 0.0 {
                return Err(VyuhaError::InvalidRisk(format!(
                    "altitude_km must be a non-negative number, got {alt}"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ManeuverAction / ThrustDirection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ManeuverAction {
    FireThrusters,
    HoldPosition,
}

impl ManeuverAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ManeuverAction::FireThrusters => "FIRE_THRUSTERS",
            ManeuverAction::HoldPosition => "HOLD_POSITION",
        }
    }
}

impl fmt::Display for ManeuverAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ManeuverAction {
    type Err = VyuhaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FIRE_THRUSTERS" => Ok(ManeuverAction::FireThrusters),
            "HOLD_POSITION" => Ok(ManeuverAction::HoldPosition),
            other => Err(VyuhaError::MalformedResponse(format!(
                "unknown action '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThrustDirection {
    Prograde,
    Retrograde,
    RadialOut,
    RadialIn,
    TowardDebris,
}

impl ThrustDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            ThrustDirection::Prograde => "PROGRADE",
            ThrustDirection::Retrograde => "RETROGRADE",
            ThrustDirection::RadialOut => "RADIAL_OUT",
            ThrustDirection::RadialIn => "RADIAL_IN",
            ThrustDirection::TowardDebris => "TOWARD_DEBRIS",
        }
    }

    /// Parse an oracle-supplied direction. `NONE` and the empty string mean
    /// "no direction".
    pub fn parse_optional(s: &str) -> Result<Option<Self>> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "NONE" => Ok(None),
            "PROGRADE" => Ok(Some(ThrustDirection::Prograde)),
            "RETROGRADE" => Ok(Some(ThrustDirection::Retrograde)),
            "RADIAL_OUT" => Ok(Some(ThrustDirection::RadialOut)),
            "RADIAL_IN" => Ok(Some(ThrustDirection::RadialIn)),
            "TOWARD_DEBRIS" => Ok(Some(ThrustDirection::TowardDebris)),
            other => Err(VyuhaError::MalformedResponse(format!(
                "unknown thrust direction '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ThrustDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ProposedCommand
// ---------------------------------------------------------------------------

/// Rationale carried by the safe default command.
pub const PROPOSER_FALLBACK_RATIONALE: &str = "PROPOSER_FALLBACK";

/// A candidate action from the proposer. Never trusted: it must pass the
/// validation gate before the ledger sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedCommand {
    pub action: ManeuverAction,
    pub thrust_direction: Option<ThrustDirection>,
    pub rationale: String,
    pub confidence: f64,
}

impl ProposedCommand {
    /// Deterministic command substituted for a failed or malformed proposal.
    pub fn safe_default() -> Self {
        Self {
            action: ManeuverAction::HoldPosition,
            thrust_direction: None,
            rationale: PROPOSER_FALLBACK_RATIONALE.to_string(),
            confidence: 0.0,
        }
    }

    /// Adversarial first attempt used to exercise the rejection path.
    pub fn synthetic_threat() -> Self {
        Self {
            action: ManeuverAction::FireThrusters,
            thrust_direction: Some(ThrustDirection::TowardDebris),
            rationale: "Steer into the debris cloud to clear the conjunction.".to_string(),
            confidence: 0.99,
        }
    }

    /// The text the validation passes inspect.
    pub fn serialized(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationSource {
    DenyList,
    PolicyOracle,
    Fallback,
}

impl ValidationSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationSource::DenyList => "DENY_LIST",
            ValidationSource::PolicyOracle => "POLICY_ORACLE",
            ValidationSource::Fallback => "FALLBACK",
        }
    }
}

impl fmt::Display for ValidationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the fallback pass produced the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FallbackReason {
    Unconfigured,
    OracleError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub approved: bool,
    pub source: ValidationSource,
    pub violation_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
}

// ---------------------------------------------------------------------------
// Attempt / ActionCycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// 1-indexed position within the cycle.
    pub sequence_number: u32,
    pub command: ProposedCommand,
    pub validation: ValidationResult,
    /// Wall-clock time spent obtaining the proposal.
    pub latency_ms: f64,
    #[serde(default)]
    pub validation_latency_ms: f64,
    /// Set only when the caller injected this attempt in place of a proposal.
    #[serde(default)]
    pub injected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleStatus {
    Executed,
    ManualOverrideRequired,
}

impl CycleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CycleStatus::Executed => "EXECUTED",
            CycleStatus::ManualOverrideRequired => "MANUAL_OVERRIDE_REQUIRED",
        }
    }
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A terminal decide-validate-retry sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCycle {
    pub cycle_id: Uuid,
    pub session_id: String,
    pub risk: RiskAssessment,
    pub attempts: Vec<Attempt>,
    pub final_status: CycleStatus,
    pub total_latency_ms: f64,
    /// Present exactly when `final_status` is `EXECUTED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maneuver: Option<AppliedManeuver>,
    pub completed_at: DateTime<Utc>,
}

impl ActionCycle {
    pub fn last_attempt(&self) -> Option<&Attempt> {
        self.attempts.last()
    }

    pub fn blocked_attempts(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| !a.validation.approved)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
