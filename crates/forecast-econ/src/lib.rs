#![deny(warnings)]

//! Projection and comparison helpers for the forecast wizard.
//!
//! This module provides:
//! - The `Forecaster` seam and its table-backed implementation
//! - Chart series comparing the active scenario, the original plan and history
//! - Compact KPI formatting used by the pages and the CLI
//! - Weekly to monthly aggregation

use chrono::NaiveDate;
use forecast_core::{
    Kpis, MonthlySeries, Scenario, ScenarioId, SimulationResult, HORIZON_MONTHS,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Weeks per month used when aggregating weekly figures.
pub const WEEKS_PER_MONTH: f64 = 4.33;

/// Errors produced by projection and formatting helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// No projection is known for this scenario.
    #[error("no projection for scenario {0}")]
    UnknownScenario(String),
    /// The chart axis must have one label per month of the horizon.
    #[error("expected {expected} axis labels, got {actual}")]
    AxisLength { expected: usize, actual: usize },
    #[error("invalid calendar year: {0}")]
    InvalidYear(i32),
}

/// Projects a scenario onto a simulation result.
///
/// Implementations must be deterministic and always return a 12-month series.
pub trait Forecaster {
    fn project(
        &self,
        scenario: &Scenario,
        baseline: &MonthlySeries,
    ) -> Result<SimulationResult, EconError>;
}

/// Forecaster backed by a static per-scenario table.
#[derive(Debug, Clone, Default)]
pub struct TableForecaster {
    table: HashMap<ScenarioId, SimulationResult>,
}

impl TableForecaster {
    /// Register the projection served for `id`, replacing any previous one.
    pub fn insert(&mut self, id: ScenarioId, result: SimulationResult) {
        self.table.insert(id, result);
    }
}

impl Forecaster for TableForecaster {
    fn project(
        &self,
        scenario: &Scenario,
        _baseline: &MonthlySeries,
    ) -> Result<SimulationResult, EconError> {
        debug!(scenario = %scenario.id, "table projection");
        self.table
            .get(&scenario.id)
            .cloned()
            .ok_or_else(|| EconError::UnknownScenario(scenario.id.0.clone()))
    }
}

/// Line rendering style of a chart dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    Solid,
    Dashed,
    /// Dotted line with visible point markers.
    Marker,
}

/// One line of the comparison chart. Colour and style are plain data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<f64>,
    pub border_color: String,
    pub style: LineStyle,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub border_dash: Vec<u32>,
    pub point_radius: u32,
    pub fill: bool,
}

impl ChartDataset {
    fn new(label: String, series: &MonthlySeries, color: &str, style: LineStyle) -> Self {
        let (border_dash, point_radius) = match style {
            LineStyle::Solid => (Vec::new(), 0),
            LineStyle::Dashed => (vec![5, 5], 0),
            LineStyle::Marker => (vec![2, 2], 2),
        };
        Self {
            label,
            data: series.values().to_vec(),
            border_color: color.to_string(),
            style,
            border_dash,
            point_radius,
            fill: false,
        }
    }
}

/// Three aligned datasets over a shared monthly axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

const ACTIVE_COLOR: &str = "rgb(25, 118, 210)";
const PLAN_COLOR: &str = "rgb(255, 159, 64)";
const HISTORICAL_COLOR: &str = "rgb(128, 128, 128)";

/// Build the comparison chart: active scenario (solid), original plan
/// (dashed) and historical sales (marker), all on the same month axis.
pub fn compare_series(
    active_name: &str,
    active: &MonthlySeries,
    plan: &MonthlySeries,
    historical: &MonthlySeries,
    labels: Vec<String>,
) -> Result<ChartSeries, EconError> {
    if labels.len() != HORIZON_MONTHS {
        return Err(EconError::AxisLength {
            expected: HORIZON_MONTHS,
            actual: labels.len(),
        });
    }
    let datasets = vec![
        ChartDataset::new(
            format!("Selected Scenario ({active_name})"),
            active,
            ACTIVE_COLOR,
            LineStyle::Solid,
        ),
        ChartDataset::new(
            "Original Plan (2024)".to_string(),
            plan,
            PLAN_COLOR,
            LineStyle::Dashed,
        ),
        ChartDataset::new(
            "Ventas Históricas".to_string(),
            historical,
            HISTORICAL_COLOR,
            LineStyle::Marker,
        ),
    ];
    Ok(ChartSeries { labels, datasets })
}

/// Month labels "Jan 2026" .. "Dec 2026".
pub fn month_labels(year: i32) -> Result<Vec<String>, EconError> {
    (1..=HORIZON_MONTHS as u32)
        .map(|m| {
            NaiveDate::from_ymd_opt(year, m, 1)
                .map(|d| d.format("%b %Y").to_string())
                .ok_or(EconError::InvalidYear(year))
        })
        .collect()
}

/// Gross margin in percent, `(revenue - cost) / revenue * 100`.
/// Returns None when revenue is zero.
pub fn gross_margin_pct(revenue: Decimal, cost: Decimal) -> Option<f64> {
    if revenue.is_zero() {
        return None;
    }
    ((revenue - cost) / revenue * Decimal::ONE_HUNDRED).to_f64()
}

fn compact(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.0}K", value / 1_000.0)
    } else {
        format!("{value:.0}")
    }
}

/// Unit counts as "2.5M", "650K" or "420".
pub fn format_units_compact(units: u64) -> String {
    compact(units as f64)
}

/// Money as "$3.1M", "$600K" or "$420".
pub fn format_money_compact(amount: Decimal) -> String {
    let v = amount.to_f64().unwrap_or_default();
    if v < 0.0 {
        format!("-${}", compact(-v))
    } else {
        format!("${}", compact(v))
    }
}

/// Percentage with one decimal, "80.6%".
pub fn format_pct(pct: f64) -> String {
    format!("{pct:.1}%")
}

/// KPI block with display strings, produced at the edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiDisplay {
    pub projected_sales: String,
    pub total_revenue: String,
    pub estimated_cost: String,
    pub gross_margin: String,
}

pub fn format_kpis(kpis: &Kpis) -> KpiDisplay {
    KpiDisplay {
        projected_sales: format_units_compact(kpis.projected_sales_units),
        total_revenue: format_money_compact(kpis.total_revenue),
        estimated_cost: format_money_compact(kpis.estimated_cost),
        gross_margin: gross_margin_pct(kpis.total_revenue, kpis.estimated_cost)
            .map(format_pct)
            .unwrap_or_else(|| "N/A".to_string()),
    }
}

/// Monthly figure from an average weekly figure: `round(avg_weekly * 4.33)`.
pub fn monthly_from_weekly(avg_weekly: f64) -> u64 {
    if !avg_weekly.is_finite() || avg_weekly <= 0.0 {
        return 0;
    }
    (avg_weekly * WEEKS_PER_MONTH).round() as u64
}
