use super::open_agent;
use crate::output::{num, print_json};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let insights = open_agent(root)?.insights()?;
    if json {
        return print_json(&insights);
    }

    println!(
        "events:        {} ({} scan, {} act)",
        insights.total_events, insights.scan_events, insights.act_events
    );
    println!("success rate:  {}%", num(insights.success_rate * 100.0));
    println!("avg scan:      {} ms", num(insights.avg_scan_latency_ms));
    println!("avg act:       {} ms", num(insights.avg_act_latency_ms));
    println!("blocked:       {}", insights.blocked_attempts);
    println!("overrides:     {}", insights.manual_overrides);
    if !insights.counts_by_validation_source.is_empty() {
        let sources: Vec<String> = insights
            .counts_by_validation_source
            .iter()
            .map(|(s, n)| format!("{s}={n}"))
            .collect();
        println!("sources:       {}", sources.join("  "));
    }
    println!();
    println!("Recommendations:");
    for rec in &insights.recommendations {
        println!("  - {rec}");
    }
    Ok(())
}
