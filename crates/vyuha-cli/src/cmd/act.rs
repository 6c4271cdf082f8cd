use super::{open_agent, RiskArgs};
use crate::output::{num, print_json, print_table};
use std::path::Path;
use vyuha_core::orchestrator::CycleOptions;
use vyuha_core::types::CycleStatus;

pub fn run(
    root: &Path,
    risk: &RiskArgs,
    inject_threat: bool,
    session: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let risk = risk.load()?;
    let agent = open_agent(root)?;
    let cycle = agent.act(
        risk,
        CycleOptions {
            session_id: session,
            inject_threat,
        },
    )?;

    if json {
        return print_json(&cycle);
    }

    let rows = cycle
        .attempts
        .iter()
        .map(|a| {
            let direction = a
                .command
                .thrust_direction
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string());
            let verdict = if a.validation.approved {
                "approved"
            } else {
                "blocked"
            };
            let tags = if a.validation.violation_tags.is_empty() {
                "-".to_string()
            } else {
                a.validation.violation_tags.join(",")
            };
            vec![
                format!("{}{}", a.sequence_number, if a.injected { "*" } else { "" }),
                a.command.action.to_string(),
                direction,
                verdict.to_string(),
                a.validation.source.to_string(),
                tags,
                num(a.latency_ms),
            ]
        })
        .collect();
    print_table(
        &["#", "ACTION", "DIRECTION", "VERDICT", "SOURCE", "TAGS", "LATENCY_MS"],
        rows,
    );

    println!();
    println!("session: {}", cycle.session_id);
    println!("status:  {}", cycle.final_status);
    if let Some(m) = &cycle.maneuver {
        println!("applied: {} (delta-v {} m/s)", m.action, num(m.delta_v_ms));
    }
    if cycle.final_status == CycleStatus::ManualOverrideRequired {
        println!(
            "No safe plan after {} attempts. Human intervention required.",
            cycle.attempts.len()
        );
    }
    Ok(())
}
