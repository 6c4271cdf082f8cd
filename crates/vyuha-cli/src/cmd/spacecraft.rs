use super::open_agent;
use crate::output::{num, print_json, print_table};
use std::path::Path;
use vyuha_core::ledger::SpacecraftState;

fn print_state(state: &SpacecraftState) {
    let p = &state.position;
    let v = &state.velocity;
    println!(
        "position:  lat {}  lon {}  alt {} km",
        num(p.lat),
        num(p.lon),
        num(p.alt_km)
    );
    println!("velocity:  x {}  y {}  z {} m/s", num(v.x), num(v.y), num(v.z));
    println!("baseline:  {}", if state.on_baseline() { "yes" } else { "no" });
    println!("maneuvers: {}", state.maneuver_history.len());
}

// ---------------------------------------------------------------------------
// state
// ---------------------------------------------------------------------------

pub fn state(root: &Path, json: bool) -> anyhow::Result<()> {
    let state = open_agent(root)?.state()?;
    if json {
        let mut value = serde_json::to_value(&state)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("on_baseline".into(), state.on_baseline().into());
            obj.insert("maneuver_count".into(), state.maneuver_history.len().into());
        }
        return print_json(&value);
    }
    print_state(&state);
    Ok(())
}

// ---------------------------------------------------------------------------
// restore
// ---------------------------------------------------------------------------

pub fn restore(root: &Path, json: bool) -> anyhow::Result<()> {
    let outcome = open_agent(root)?.restore()?;
    let status = if outcome.changed {
        "RESTORED"
    } else {
        "ALREADY_ON_BASELINE"
    };
    if json {
        return print_json(&serde_json::json!({
            "status": status,
            "state": outcome.state,
        }));
    }
    println!("{status}");
    print_state(&outcome.state);
    Ok(())
}

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

pub fn history(root: &Path, json: bool) -> anyhow::Result<()> {
    let state = open_agent(root)?.state()?;
    if json {
        return print_json(&serde_json::json!({
            "total_maneuvers": state.maneuver_history.len(),
            "baseline_trajectory": state.baseline_trajectory,
            "maneuver_history": state.maneuver_history,
        }));
    }
    if state.maneuver_history.is_empty() {
        println!("No maneuvers recorded.");
        return Ok(());
    }
    let rows = state
        .maneuver_history
        .iter()
        .map(|m| {
            vec![
                m.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                m.action.to_string(),
                m.thrust_direction
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                num(m.delta_v_ms),
                num(m.confidence),
            ]
        })
        .collect();
    print_table(
        &["TIMESTAMP", "ACTION", "DIRECTION", "DELTA_V", "CONFIDENCE"],
        rows,
    );
    Ok(())
}
