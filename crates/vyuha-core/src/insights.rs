//! Read-side aggregation over the event log.
//!
//! `compute_insights` is pure: it never touches the event store or the state
//! ledger, and the same events always produce the same report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::InsightsConfig;
use crate::events::Event;
use crate::types::{CycleStatus, FallbackReason, ScenarioMode, ValidationSource};

pub const NO_DATA_RECOMMENDATION: &str =
    "No runtime data yet. Run scans and maneuvers to build insights.";
pub const TIGHTEN_PROMPT_RECOMMENDATION: &str =
    "Proposer prompts should explicitly avoid deny-listed commands when proposing emergency maneuvers.";
pub const ORACLE_AVAILABILITY_RECOMMENDATION: &str =
    "Security validation frequently uses fallback mode. Investigate policy-oracle availability to strengthen policy enforcement.";
pub const ACT_LATENCY_RECOMMENDATION: &str =
    "Decision-loop latency is elevated. Reduce decision-loop latency by caching proposer context and trimming the response budget.";
pub const SCAN_LATENCY_RECOMMENDATION: &str =
    "Scan latency is elevated. Consider caching telemetry for short intervals during bursts.";
pub const STABLE_RECOMMENDATION: &str =
    "System health is stable. Continue collecting traces and expand edge-case simulations.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    /// Fraction of ACT events that executed, in [0, 1]. Zero with no ACT events.
    pub success_rate: f64,
    pub avg_scan_latency_ms: f64,
    pub avg_act_latency_ms: f64,
    /// One count per attempt, keyed by the pass that decided it.
    pub counts_by_validation_source: BTreeMap<ValidationSource, u64>,
    pub recommendations: Vec<String>,
    pub total_events: usize,
    pub scan_events: usize,
    pub act_events: usize,
    pub blocked_attempts: u64,
    pub manual_overrides: u64,
    pub policy_oracle_errors: u64,
    pub violation_tag_counts: BTreeMap<String, u64>,
    pub scenario_distribution: BTreeMap<ScenarioMode, u64>,
    pub recent_events: Vec<Event>,
}

impl Insights {
    pub fn source_count(&self, source: ValidationSource) -> u64 {
        self.counts_by_validation_source
            .get(&source)
            .copied()
            .unwrap_or(0)
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        round2(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn compute_insights(events: &[Event], config: &InsightsConfig) -> Insights {
    if events.is_empty() {
        return Insights {
            recommendations: vec![NO_DATA_RECOMMENDATION.to_string()],
            ..Insights::default()
        };
    }

    let mut report = Insights {
        total_events: events.len(),
        ..Insights::default()
    };
    let mut scan_latencies = Vec::new();
    let mut act_latencies = Vec::new();
    let mut executed = 0u64;

    for event in events {
        if let Some(scan) = event.as_scan() {
            report.scan_events += 1;
            scan_latencies.push(scan.latency_ms);
            *report
                .scenario_distribution
                .entry(scan.risk.scenario_mode)
                .or_insert(0) += 1;
        }

        if let Some(cycle) = event.as_cycle() {
            report.act_events += 1;
            act_latencies.push(cycle.total_latency_ms);
            *report
                .scenario_distribution
                .entry(cycle.risk.scenario_mode)
                .or_insert(0) += 1;
            match cycle.final_status {
                CycleStatus::Executed => executed += 1,
                CycleStatus::ManualOverrideRequired => report.manual_overrides += 1,
            }

            for attempt in &cycle.attempts {
                let v = &attempt.validation;
                *report
                    .counts_by_validation_source
                    .entry(v.source)
                    .or_insert(0) += 1;
                if v.fallback_reason == Some(FallbackReason::OracleError) {
                    report.policy_oracle_errors += 1;
                }
                if !v.approved {
                    report.blocked_attempts += 1;
                    if v.violation_tags.is_empty() {
                        *report
                            .violation_tag_counts
                            .entry("UNKNOWN".to_string())
                            .or_insert(0) += 1;
                    }
                    for tag in &v.violation_tags {
                        *report.violation_tag_counts.entry(tag.clone()).or_insert(0) += 1;
                    }
                }
            }
        }
    }

    report.avg_scan_latency_ms = mean(&scan_latencies);
    report.avg_act_latency_ms = mean(&act_latencies);
    report.success_rate = if report.act_events == 0 {
        0.0
    } else {
        executed as f64 / report.act_events as f64
    };
    report.recommendations = build_recommendations(&report, config);

    let skip = events.len().saturating_sub(config.recent_events);
    report.recent_events = events[skip..].to_vec();
    report
}

fn build_recommendations(report: &Insights, config: &InsightsConfig) -> Vec<String> {
    let mut recs = Vec::new();
    if report.blocked_attempts > 0 {
        recs.push(TIGHTEN_PROMPT_RECOMMENDATION.to_string());
    }
    if report.source_count(ValidationSource::Fallback)
        > report.source_count(ValidationSource::PolicyOracle)
    {
        recs.push(ORACLE_AVAILABILITY_RECOMMENDATION.to_string());
    }
    if report.avg_act_latency_ms > config.act_latency_ceiling_ms {
        recs.push(ACT_LATENCY_RECOMMENDATION.to_string());
    }
    if report.avg_scan_latency_ms > config.scan_latency_ceiling_ms {
        recs.push(SCAN_LATENCY_RECOMMENDATION.to_string());
    }
    if recs.is_empty() {
        recs.push(STABLE_RECOMMENDATION.to_string());
    }
    recs
}
