#![deny(warnings)]

//! Embedded YAML catalogs: scenario presets, mock projections, historical
//! sales and purchase suggestions. A directory may override any file.

use data_pipeline::historical::HistoricalDb;
use data_pipeline::{PurchaseRow, Rationale};
use forecast_core::{
    validate_presets, Alert, Kpis, MonthlySeries, Scenario, ScenarioId, SimulationResult,
    ValidationError, VariableValues,
};
use forecast_econ::{EconError, Forecaster, TableForecaster};
use scenario_store::{ScenarioStore, StoreError, StoredScenario};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Embedded catalog text by stable name.
pub fn get_yaml(name: &str) -> Option<&'static str> {
    match name {
        "presets" => Some(include_str!("../../../assets/scenarios/presets.yaml")),
        "simulation" => Some(include_str!("../../../assets/data/simulation.yaml")),
        "historical" => Some(include_str!("../../../assets/data/historical.yaml")),
        "purchases" => Some(include_str!("../../../assets/data/purchases.yaml")),
        _ => None,
    }
}

/// Path of a named catalog relative to an assets directory.
fn relative_path(name: &str) -> Option<&'static str> {
    match name {
        "presets" => Some("scenarios/presets.yaml"),
        "simulation" => Some("data/simulation.yaml"),
        "historical" => Some("data/historical.yaml"),
        "purchases" => Some("data/purchases.yaml"),
        _ => None,
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown catalog: {0}")]
    Unknown(String),
    #[error("invalid yaml in {name}: {source}")]
    Yaml {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("inconsistent catalog: {0}")]
    Invalid(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Econ(#[from] EconError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetDef {
    pub id: ScenarioId,
    pub label: String,
    #[serde(default)]
    pub default: bool,
    pub values: VariableValues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetric {
    pub label: String,
    pub value: String,
}

/// Static copy of the scenario editor page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorPage {
    pub title: String,
    pub user_name: String,
    pub user_role: String,
    pub selected_item: String,
    pub context: String,
    #[serde(default)]
    pub summary_metrics: Vec<SummaryMetric>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PresetCatalog {
    pub presets: Vec<PresetDef>,
    pub editor: EditorPage,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDef {
    pub scenario_id: ScenarioId,
    pub name: String,
    pub preset: ScenarioId,
    pub kpis: Kpis,
    pub alerts: Vec<Alert>,
    pub series: MonthlySeries,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationCatalog {
    pub year: i32,
    pub product_id: String,
    pub active_scenario: ScenarioId,
    pub plan: MonthlySeries,
    pub historical: MonthlySeries,
    pub runs: Vec<RunDef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PurchaseCatalog {
    pub rationale: Rationale,
    pub rows: Vec<PurchaseRow>,
}

/// All catalogs, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub presets: PresetCatalog,
    pub simulation: SimulationCatalog,
    pub historical: HistoricalDb,
    pub purchases: PurchaseCatalog,
}

fn parse<T: DeserializeOwned>(name: &str, text: &str) -> Result<T, CatalogError> {
    serde_yaml::from_str(text).map_err(|source| CatalogError::Yaml {
        name: name.to_string(),
        source,
    })
}

fn embedded<T: DeserializeOwned>(name: &str) -> Result<T, CatalogError> {
    let text = get_yaml(name).ok_or_else(|| CatalogError::Unknown(name.to_string()))?;
    parse(name, text)
}

fn from_dir_or_embedded<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T, CatalogError> {
    let rel = relative_path(name).ok_or_else(|| CatalogError::Unknown(name.to_string()))?;
    let path = dir.join(rel);
    if !path.exists() {
        debug!(catalog = name, "no override, using embedded copy");
        return embedded(name);
    }
    let text = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
        path: path.clone(),
        source,
    })?;
    info!(catalog = name, path = %path.display(), "loaded catalog override");
    parse(name, &text)
}

impl Catalog {
    pub fn embedded() -> Result<Self, CatalogError> {
        let catalog = Self {
            presets: embedded("presets")?,
            simulation: embedded("simulation")?,
            historical: embedded("historical")?,
            purchases: embedded("purchases")?,
        };
        catalog.check()?;
        Ok(catalog)
    }

    /// Load from `dir`; files missing there fall back to the embedded copy.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let dir = dir.as_ref();
        let catalog = Self {
            presets: from_dir_or_embedded(dir, "presets")?,
            simulation: from_dir_or_embedded(dir, "simulation")?,
            historical: from_dir_or_embedded(dir, "historical")?,
            purchases: from_dir_or_embedded(dir, "purchases")?,
        };
        catalog.check()?;
        Ok(catalog)
    }

    fn check(&self) -> Result<(), CatalogError> {
        validate_presets(&self.editor_presets()?)?;
        for run in &self.simulation.runs {
            if !self.presets.presets.iter().any(|p| p.id == run.preset) {
                return Err(CatalogError::Invalid(format!(
                    "run {} references unknown preset {}",
                    run.scenario_id, run.preset
                )));
            }
        }
        let default_item = &self.historical.default_item;
        if self.historical.item(default_item).is_err() {
            return Err(CatalogError::Invalid(format!(
                "default item {default_item} not in historical table"
            )));
        }
        Ok(())
    }

    fn default_values(&self) -> Result<VariableValues, CatalogError> {
        self.presets
            .presets
            .iter()
            .find(|p| p.default)
            .map(|p| p.values)
            .ok_or(CatalogError::Validation(ValidationError::DefaultCount(0)))
    }

    fn build_scenario(&self, def: &PresetDef) -> Result<Scenario, CatalogError> {
        let reference = self.default_values()?;
        Ok(Scenario::from_values(
            def.id.clone(),
            def.label.clone(),
            def.default,
            &def.values,
            &reference,
        ))
    }

    /// Preset scenarios for a fresh editor session.
    pub fn editor_presets(&self) -> Result<Vec<Scenario>, CatalogError> {
        self.presets
            .presets
            .iter()
            .map(|p| self.build_scenario(p))
            .collect()
    }

    /// Editor page copy with the baseline price and cost prepended.
    pub fn editor_page(&self) -> Result<EditorPage, CatalogError> {
        let base = self.default_values()?;
        let mut page = self.presets.editor.clone();
        let mut metrics = vec![
            SummaryMetric {
                label: "Precio de Venta Base:".to_string(),
                value: format!("${:.2}", base.sales_price),
            },
            SummaryMetric {
                label: "Costo por Ítem Base:".to_string(),
                value: format!("${:.2}", base.cost_per_item),
            },
        ];
        metrics.append(&mut page.summary_metrics);
        page.summary_metrics = metrics;
        Ok(page)
    }

    /// Projection table keyed by preset id.
    pub fn forecaster(&self) -> TableForecaster {
        let mut forecaster = TableForecaster::default();
        for run in &self.simulation.runs {
            forecaster.insert(
                run.preset.clone(),
                SimulationResult {
                    kpis: run.kpis.clone(),
                    alerts: run.alerts.clone(),
                    series: run.series,
                },
            );
        }
        forecaster
    }

    /// Seed the server store: one entry per run, configured from its preset
    /// and projected through `forecaster`.
    pub fn seed_store(&self, forecaster: &dyn Forecaster) -> Result<ScenarioStore, CatalogError> {
        let mut entries = Vec::with_capacity(self.simulation.runs.len());
        for run in &self.simulation.runs {
            let def = self
                .presets
                .presets
                .iter()
                .find(|p| p.id == run.preset)
                .ok_or_else(|| CatalogError::Invalid(format!("unknown preset {}", run.preset)))?;
            let config = self.build_scenario(def)?;
            let result = forecaster.project(&config, &self.simulation.historical)?;
            entries.push(StoredScenario {
                id: run.scenario_id.clone(),
                name: run.name.clone(),
                product_id: self.simulation.product_id.clone(),
                preset: run.preset.clone(),
                config,
                result,
            });
        }
        Ok(ScenarioStore::new(entries, &self.simulation.active_scenario)?)
    }
}
