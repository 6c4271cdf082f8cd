//! Proposer oracles: turn a risk assessment (plus optional rejection
//! feedback) into a candidate maneuver command.
//!
//! Output from a proposer is untrusted. The orchestrator substitutes the safe
//! default for any error, and the validation gate inspects whatever remains.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::config::ProposerConfig;
use crate::error::{Result, VyuhaError};
use crate::types::{ManeuverAction, ProposedCommand, RiskAssessment, ThrustDirection};

/// Collision probability above which the decision rules call for a burn.
pub const FIRE_THRESHOLD: f64 = 0.7;

const SYSTEM_PROMPT: &str = "\
You are Vyuha, an autonomous satellite defense commander.
Your top priority is collision avoidance.

RULES:
1. If collision_probability > 0.7 you MUST recommend action \"FIRE_THRUSTERS\".
2. If collision_probability <= 0.7 you MUST recommend action \"HOLD_POSITION\".
3. Explain your reasoning clearly in exactly one sentence.

OUTPUT FORMAT:
Respond with strictly valid JSON, with no Markdown fences, comments or text
before or after the object.

JSON SCHEMA:
{
  \"action\": \"FIRE_THRUSTERS\" | \"HOLD_POSITION\",
  \"reasoning\": \"<one-sentence explanation>\",
  \"confidence_score\": <float between 0.0 and 1.0>,
  \"recommended_thrust_direction\": \"PROGRADE\" | \"RETROGRADE\" | \"RADIAL_OUT\" | \"RADIAL_IN\" | \"NONE\"
}
";

const REQUIRED_KEYS: [&str; 4] = [
    "action",
    "reasoning",
    "confidence_score",
    "recommended_thrust_direction",
];

pub trait Proposer: Send + Sync {
    /// `rejection_reason` is the feedback from the previous attempt's
    /// rejection, absent on the first attempt of a cycle.
    fn propose(
        &self,
        risk: &RiskAssessment,
        rejection_reason: Option<&str>,
    ) -> Result<ProposedCommand>;
}

// ---------------------------------------------------------------------------
// HttpProposer
// ---------------------------------------------------------------------------

pub struct HttpProposer {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
}

impl HttpProposer {
    pub fn new(config: &ProposerConfig, api_key: String) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key,
        })
    }
}

impl Proposer for HttpProposer {
    fn propose(
        &self,
        risk: &RiskAssessment,
        rejection_reason: Option<&str>,
    ) -> Result<ProposedCommand> {
        let body = serde_json::json!({
            "system_instruction": { "parts": [{ "text": SYSTEM_PROMPT }] },
            "contents": [{
                "role": "user",
                "parts": [{ "text": user_prompt(risk, rejection_reason) }],
            }],
            "generationConfig": { "responseMimeType": "application/json" },
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            let snippet: String = text.chars().take(500).collect();
            return Err(VyuhaError::Proposer(format!(
                "generateContent failed ({status}): {snippet}"
            )));
        }

        let raw: serde_json::Value = resp.json()?;
        let text = raw
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                VyuhaError::MalformedResponse("response carries no candidate text".to_string())
            })?;
        parse_decision(text)
    }
}

fn user_prompt(risk: &RiskAssessment, rejection_reason: Option<&str>) -> String {
    let altitude = risk
        .altitude_km
        .map(|a| format!("{a:.1} km"))
        .unwrap_or_else(|| "N/A".to_string());
    let mut prompt = format!(
        "Satellite telemetry update:\n\
         \x20 - Altitude:              {altitude}\n\
         \x20 - Collision Probability: {}\n\
         \x20 - Miss Distance:         {} km\n\
         \x20 - Current Status:        {}\n\
         \x20 - Scenario:              {}\n\n\
         Analyze this data and provide your decision as JSON.",
        risk.collision_probability, risk.distance_km, risk.status, risk.scenario_mode
    );
    if let Some(reason) = rejection_reason {
        prompt.push_str("\n\nFEEDBACK FROM SAFETY SHIELD:\n");
        prompt.push_str(reason);
        prompt.push_str("\nYour previous plan was rejected. Propose a different, safe plan.");
    }
    prompt
}

#[derive(Deserialize)]
struct RawDecision {
    action: String,
    reasoning: String,
    confidence_score: f64,
    recommended_thrust_direction: Option<String>,
}

static FENCE_OPEN: OnceLock<Regex> = OnceLock::new();
static FENCE_CLOSE: OnceLock<Regex> = OnceLock::new();

fn strip_fences(text: &str) -> String {
    let open = FENCE_OPEN.get_or_init(|| Regex::new(r"^```(?:json)?\s*").unwrap());
    let close = FENCE_CLOSE.get_or_init(|| Regex::new(r"\s*```$").unwrap());
    let trimmed = text.trim();
    let without_open = open.replace(trimmed, "");
    close.replace(&without_open, "").trim().to_string()
}

/// Parse and validate the proposer's JSON decision.
pub fn parse_decision(text: &str) -> Result<ProposedCommand> {
    let cleaned = strip_fences(text);
    let value: serde_json::Value = serde_json::from_str(&cleaned)
        .map_err(|e| VyuhaError::MalformedResponse(format!("decision is not JSON: {e}")))?;

    let Some(obj) = value.as_object() else {
        return Err(VyuhaError::MalformedResponse(
            "decision is not a JSON object".to_string(),
        ));
    };
    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|k| !obj.contains_key(*k))
        .collect();
    if !missing.is_empty() {
        return Err(VyuhaError::MalformedResponse(format!(
            "decision missing keys: {}",
            missing.join(", ")
        )));
    }

    let raw: RawDecision = serde_json::from_value(value)
        .map_err(|e| VyuhaError::MalformedResponse(format!("decision has bad field types: {e}")))?;

    let confidence = raw.confidence_score;
    if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
        return Err(VyuhaError::MalformedResponse(format!(
            "confidence_score must be within [0, 1], got {confidence}"
        )));
    }

    let thrust_direction = match raw.recommended_thrust_direction.as_deref() {
        Some(d) => ThrustDirection::parse_optional(d)?,
        None => None,
    };

    Ok(ProposedCommand {
        action: raw.action.parse()?,
        thrust_direction,
        rationale: raw.reasoning.trim().to_string(),
        confidence,
    })
}

// ---------------------------------------------------------------------------
// RuleProposer
// ---------------------------------------------------------------------------

/// Offline proposer applying the decision rules directly. Used when no
/// proposer credential is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleProposer;

impl Proposer for RuleProposer {
    fn propose(
        &self,
        risk: &RiskAssessment,
        rejection_reason: Option<&str>,
    ) -> Result<ProposedCommand> {
        let p = risk.collision_probability;

        if rejection_reason.is_some() {
            return Ok(ProposedCommand {
                action: ManeuverAction::HoldPosition,
                thrust_direction: None,
                rationale: "Previous plan was rejected by the safety shield, so holding position pending review.".to_string(),
                confidence: 0.5,
            });
        }

        if p > FIRE_THRESHOLD {
            Ok(ProposedCommand {
                action: ManeuverAction::FireThrusters,
                thrust_direction: Some(ThrustDirection::Prograde),
                rationale: format!(
                    "Collision probability {p:.2} exceeds {FIRE_THRESHOLD}, so a prograde burn raises the orbit clear of the conjunction."
                ),
                confidence: p,
            })
        } else {
            Ok(ProposedCommand {
                action: ManeuverAction::HoldPosition,
                thrust_direction: None,
                rationale: format!(
                    "Collision probability {p:.2} is within tolerance, so no maneuver is needed."
                ),
                confidence: 1.0 - p,
            })
        }
    }
}
