//! Prints one organization's KPIs, band distribution and pipeline stages.

use rust_lead_cockpit::band::Band;
use rust_lead_cockpit::config::Config;
use rust_lead_cockpit::filter::LeadFilter;
use rust_lead_cockpit::loader::fetch_snapshot;
use rust_lead_cockpit::models::OrgId;
use rust_lead_cockpit::pipeline::PipelineStager;
use rust_lead_cockpit::radar::RadarCanvas;
use rust_lead_cockpit::store::RecordStore;
use rust_lead_cockpit::views::{lead_scoring_view, pipeline_view};
use std::env;

/// Main entry point for the report utility.
///
/// Loads the snapshot from the configured store once, without the server's
/// load coordination, and prints a plain-text summary.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_lead_cockpit=warn".into()),
        )
        .init();

    let mut args = env::args().skip(1);
    let org = args
        .next()
        .and_then(|raw| OrgId::parse(&raw))
        .ok_or_else(|| anyhow::anyhow!("usage: lead-report <org-id> [band]"))?;
    let band = args
        .next()
        .map(|raw| raw.parse::<Band>())
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;

    let config = Config::from_env()?;
    let store = RecordStore::connect(&config).await?;
    let snapshot = fetch_snapshot(&store, org, 1)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let predicates = LeadFilter {
        band,
        ..LeadFilter::default()
    };
    let scoring = lead_scoring_view(&snapshot, &predicates, RadarCanvas::default());
    let pipeline = pipeline_view(&snapshot, &predicates, &PipelineStager::default());

    println!("Organization {}  (digest {})", org, &snapshot.digest.as_str()[..12]);
    println!();
    println!("Score records: {}", scoring.kpis.total);
    println!("  health score:     {}", scoring.kpis.health_score);
    println!("  conversion proxy: {:.1}%", scoring.kpis.conversion_rate_proxy);
    for b in Band::ALL {
        let count = scoring.kpis.distribution.get(b);
        let bar = "#".repeat((scoring.kpis.distribution.share_of_max(b) * 30.0).round() as usize);
        println!("  {} {:<8} {:>5}  {}", b.icon(), b.label(), count, bar);
    }

    println!();
    println!(
        "Leads: {} loaded, {} shown{}",
        pipeline.total_loaded,
        pipeline.filtered_count,
        band.map(|b| format!(" (band {})", b)).unwrap_or_default()
    );
    for stage in &pipeline.stages {
        println!("  {:<12} {:>5}", stage.display_name, stage.leads.len());
    }

    if !scoring.records.is_empty() {
        println!();
        println!("Latest records:");
        for row in scoring.records.iter().take(10) {
            let name = row
                .record
                .lead_summary
                .as_ref()
                .and_then(|s| s.name.clone().or_else(|| s.company.clone()))
                .unwrap_or_else(|| row.record.lead_id.clone());
            println!(
                "  {:>3}  {} {:<8} {}",
                row.record.score, row.classification.icon, row.classification.label, name
            );
        }
    }

    Ok(())
}
