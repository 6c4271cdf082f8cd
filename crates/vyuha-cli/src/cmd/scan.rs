use super::{open_agent, RiskArgs};
use crate::output::{num, print_json};
use std::path::Path;

pub fn run(
    root: &Path,
    satellite: Option<&str>,
    risk: &RiskArgs,
    latency_ms: Option<f64>,
    json: bool,
) -> anyhow::Result<()> {
    let risk = risk.load()?;
    let agent = open_agent(root)?;
    let record = agent.record_scan(satellite.unwrap_or_default(), risk, latency_ms)?;

    if json {
        return print_json(&record);
    }
    let r = &record.risk;
    println!("satellite:   {}", record.satellite_id);
    println!("status:      {}", r.status);
    println!("probability: {}", num(r.collision_probability));
    println!("distance:    {} km", num(r.distance_km));
    println!("source:      {} ({})", r.source_label, r.scenario_mode);
    Ok(())
}
