#![deny(warnings)]

//! Headless CLI: load the catalogs, run the validation gate and print the
//! projection for one scenario, optionally exporting purchase suggestions.

use anyhow::{anyhow, Result};
use catalog::Catalog;
use data_pipeline::{build_final_report, export_purchases_xlsx, format_thousands, Granularity};
use forecast_econ::{compare_series, format_kpis, month_labels};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    scenario: Option<String>,
    item: Option<String>,
    granularity: Option<String>,
    export: Option<PathBuf>,
    assets: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => args.scenario = it.next(),
            "--item" => args.item = it.next(),
            "--granularity" => args.granularity = it.next(),
            "--export" => args.export = it.next().map(PathBuf::from),
            "--assets" => args.assets = it.next().map(PathBuf::from),
            _ => {}
        }
    }
    args
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(?args, "starting CLI");

    let catalog = match &args.assets {
        Some(dir) => Catalog::from_dir(dir)?,
        None => Catalog::embedded()?,
    };
    let store = catalog.seed_store(&catalog.forecaster())?;
    store.validate_all()?;
    forecast_core::validate_presets(&catalog.editor_presets()?)?;

    let view = match &args.scenario {
        Some(id) => store.set_active(id)?,
        None => store.active(),
    };
    let entry = &view.entry;
    let kpis = format_kpis(&entry.result.kpis);
    println!("Gate OK | scenarios: {}", store.summaries().len());
    println!(
        "Scenario {} ({}) | product: {}",
        entry.name, entry.id, entry.product_id
    );
    println!(
        "KPI | sales: {} | revenue: {} | cost: {} | margin: {}",
        kpis.projected_sales, kpis.total_revenue, kpis.estimated_cost, kpis.gross_margin
    );
    for alert in &entry.result.alerts {
        println!("Alert [{}] {}", alert.severity.label_es(), alert.message);
    }

    let sim = &catalog.simulation;
    let chart = compare_series(
        &entry.name,
        &entry.result.series,
        &sim.plan,
        &sim.historical,
        month_labels(sim.year)?,
    )?;
    print!("{:<10}", "Month");
    for ds in &chart.datasets {
        print!(" | {:>28}", ds.label);
    }
    println!();
    for (m, label) in chart.labels.iter().enumerate() {
        print!("{label:<10}");
        for ds in &chart.datasets {
            print!(" | {:>28.0}", ds.data[m]);
        }
        println!();
    }

    let granularity = match args.granularity.as_deref() {
        Some(raw) => raw.parse::<Granularity>().map_err(|e| anyhow!(e))?,
        None => Granularity::default(),
    };
    let item_id = args
        .item
        .unwrap_or_else(|| catalog.historical.default_item.clone());
    let history = catalog.historical.item_history(&item_id, granularity)?;
    let total: f64 = history.chart_data.iter().map(|p| p.y1).sum();
    println!(
        "Item {} ({}) | {} points | {} units charted",
        history.name,
        granularity,
        history.chart_data.len(),
        format_thousands(total.round() as u64)
    );
    for metric in &history.metrics {
        println!("  {}: {}", metric.label, metric.value);
    }

    if let Some(path) = args.export {
        let report = build_final_report(
            &entry.name,
            &entry.result.kpis,
            catalog.purchases.rationale.clone(),
            &catalog.purchases.rows,
        );
        let bytes = export_purchases_xlsx(&report.purchase_report)?;
        std::fs::write(&path, bytes)?;
        println!(
            "Recommendation | {} | {}",
            report.recommendation.scenario, report.recommendation.impact
        );
        info!(path = %path.display(), rows = report.purchase_report.len(), "purchase export written");
    }

    Ok(())
}
