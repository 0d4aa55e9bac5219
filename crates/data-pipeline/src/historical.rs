//! Historical sales per item, as loaded after a CSV upload.

use crate::format_thousands;
use crate::ingest::IngestError;
use forecast_econ::monthly_from_weekly;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Weekly,
    Monthly,
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Granularity::Weekly),
            "monthly" => Ok(Granularity::Monthly),
            other => Err(format!("unknown granularity: {other}")),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Weekly => f.write_str("weekly"),
            Granularity::Monthly => f.write_str("monthly"),
        }
    }
}

/// One chart point: actual sales (`y1`) and forecast (`y2`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPoint {
    pub x: String,
    pub y1: f64,
    pub y2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalItem {
    pub id: String,
    pub name: String,
    pub total_units: u64,
    pub avg_weekly_sales: f64,
    pub peak_season: String,
    #[serde(default)]
    pub peak_tooltip: Option<String>,
    #[serde(default)]
    pub highlight: bool,
    pub weeks: Vec<WeeklyPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub label: String,
    pub value: String,
    #[serde(default)]
    pub highlight: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageHeader {
    pub title: String,
    pub user_name: String,
    pub user_role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStatus {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastSettings {
    pub forecast_horizon: String,
    pub apply_trend_seasonality: bool,
}

/// Item history as served to the review page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemHistory {
    pub item_id: String,
    pub name: String,
    pub granularity: Granularity,
    pub chart_data: Vec<WeeklyPoint>,
    pub metrics: Vec<Metric>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemOption {
    pub id: String,
    pub name: String,
    pub selected: bool,
}

/// In-memory historical sales table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalDb {
    pub header: PageHeader,
    pub file_status: FileStatus,
    pub default_item: String,
    pub scenario_config: ForecastSettings,
    pub items: Vec<HistoricalItem>,
}

impl HistoricalDb {
    pub fn item(&self, id: &str) -> Result<&HistoricalItem, IngestError> {
        self.items
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(|| IngestError::UnknownItem(id.to_string()))
    }

    /// Item picker entries with `selected` marked.
    pub fn item_options(&self, selected: &str) -> Vec<ItemOption> {
        self.items
            .iter()
            .map(|i| ItemOption {
                id: i.id.clone(),
                name: i.name.clone(),
                selected: i.id == selected,
            })
            .collect()
    }

    /// Chart points and metrics for an item. Monthly granularity reports the
    /// average monthly sales derived from the weekly average.
    pub fn item_history(
        &self,
        id: &str,
        granularity: Granularity,
    ) -> Result<ItemHistory, IngestError> {
        let item = self.item(id)?;
        let average = match granularity {
            Granularity::Weekly => Metric {
                label: "Average Weekly Sales".to_string(),
                value: format_thousands(item.avg_weekly_sales.round() as u64),
                highlight: item.highlight,
                tooltip: None,
            },
            Granularity::Monthly => Metric {
                label: "Average Monthly Sales".to_string(),
                value: format_thousands(monthly_from_weekly(item.avg_weekly_sales)),
                highlight: item.highlight,
                tooltip: None,
            },
        };
        let metrics = vec![
            Metric {
                label: "Total Units Sold (2023)".to_string(),
                value: format_thousands(item.total_units),
                highlight: item.highlight,
                tooltip: None,
            },
            average,
            Metric {
                label: "Peak Season".to_string(),
                value: item.peak_season.clone(),
                highlight: false,
                tooltip: item.peak_tooltip.clone(),
            },
        ];
        Ok(ItemHistory {
            item_id: item.id.clone(),
            name: item.name.clone(),
            granularity,
            chart_data: item.weeks.clone(),
            metrics,
        })
    }
}
