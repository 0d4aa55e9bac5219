#![deny(warnings)]

//! Server-side scenario store: configs plus simulation outputs behind one mutex.

use forecast_core::{
    validate_scenarios, ActivityStatus, Scenario, ScenarioId, SimulationResult, ValidationError,
    VariableId,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::{debug, info};

/// Confirmation text returned by a successful finalize.
pub const FINALIZE_MESSAGE: &str = "Plan de simulación finalizado y proceso de reporte iniciado.";

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("Escenario {0} no encontrado.")]
    NotFound(String),
    /// Finalize was requested for a scenario that is not the active one.
    #[error("El escenario a finalizar no coincide con el escenario activo actualmente.")]
    Conflict { requested: String, active: String },
    #[error("invalid seed: {0}")]
    InvalidSeed(String),
}

/// One stored scenario: editable config and its precomputed projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredScenario {
    pub id: ScenarioId,
    pub name: String,
    pub product_id: String,
    /// Editor preset this entry was configured from.
    pub preset: ScenarioId,
    pub config: Scenario,
    pub result: SimulationResult,
}

impl StoredScenario {
    fn answers_to(&self, id: &str) -> bool {
        self.id.as_str() == id || self.preset.as_str() == id
    }
}

/// Snapshot of an entry together with its activity state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioView {
    #[serde(flatten)]
    pub entry: StoredScenario,
    pub status: ActivityStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummary {
    pub scenario_id: ScenarioId,
    pub name: String,
    pub status: ActivityStatus,
}

/// Result of merging a partial config.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateOutcome {
    pub updated: Vec<VariableId>,
    /// Keys that did not name an existing variable, or carried no finite value.
    pub ignored: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub scenario_id: ScenarioId,
    pub message: String,
}

struct Inner {
    entries: Vec<StoredScenario>,
    active: usize,
}

impl Inner {
    fn position(&self, id: &str) -> Result<usize, StoreError> {
        self.entries
            .iter()
            .position(|e| e.answers_to(id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn view(&self, idx: usize) -> ScenarioView {
        ScenarioView {
            entry: self.entries[idx].clone(),
            status: if idx == self.active {
                ActivityStatus::Active
            } else {
                ActivityStatus::Inactive
            },
        }
    }
}

/// Single source of truth for server-side scenarios.
///
/// Every operation takes the same lock, so the active slot is never observed
/// mid-switch. Exactly one entry is active at all times.
pub struct ScenarioStore {
    inner: Mutex<Inner>,
}

impl ScenarioStore {
    /// Build a store from seed entries. `active` must name one of them.
    pub fn new(entries: Vec<StoredScenario>, active: &ScenarioId) -> Result<Self, StoreError> {
        if entries.is_empty() {
            return Err(StoreError::InvalidSeed("no scenarios".into()));
        }
        let mut seen = HashSet::new();
        for e in &entries {
            if !seen.insert(e.id.clone()) {
                return Err(StoreError::InvalidSeed(format!("duplicate id {}", e.id)));
            }
        }
        let active = entries
            .iter()
            .position(|e| &e.id == active)
            .ok_or_else(|| StoreError::InvalidSeed(format!("unknown active id {active}")))?;
        info!(count = entries.len(), active = %entries[active].id, "scenario store seeded");
        Ok(Self {
            inner: Mutex::new(Inner { entries, active }),
        })
    }

    pub fn get(&self, id: &str) -> Result<ScenarioView, StoreError> {
        let inner = self.inner.lock();
        let idx = inner.position(id)?;
        Ok(inner.view(idx))
    }

    /// Merge `partial` into the stored config. Only existing variables change.
    pub fn update(
        &self,
        id: &str,
        partial: &BTreeMap<String, f64>,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut inner = self.inner.lock();
        let idx = inner.position(id)?;
        let config = &mut inner.entries[idx].config;
        let mut outcome = UpdateOutcome::default();
        for (key, &value) in partial {
            let applied = match key.parse::<VariableId>() {
                Ok(var) if value.is_finite() => config.set_value(var, value).then_some(var),
                _ => None,
            };
            match applied {
                Some(var) => outcome.updated.push(var),
                None => outcome.ignored.push(key.clone()),
            }
        }
        debug!(scenario = id, updated = outcome.updated.len(), ignored = ?outcome.ignored, "config merged");
        Ok(outcome)
    }

    /// Make `id` the single active scenario and return its snapshot.
    pub fn set_active(&self, id: &str) -> Result<ScenarioView, StoreError> {
        let mut inner = self.inner.lock();
        let idx = inner.position(id)?;
        inner.active = idx;
        info!(scenario = %inner.entries[idx].id, "active scenario switched");
        Ok(inner.view(idx))
    }

    /// Confirm the active scenario. Read-only. Only the store id is accepted,
    /// never the preset id.
    pub fn finalize(&self, id: &str) -> Result<Confirmation, StoreError> {
        let inner = self.inner.lock();
        let active = &inner.entries[inner.active];
        if active.id.as_str() != id {
            return Err(StoreError::Conflict {
                requested: id.to_string(),
                active: active.id.0.clone(),
            });
        }
        info!(scenario = %active.id, "simulation finalized, report pipeline triggered");
        Ok(Confirmation {
            scenario_id: active.id.clone(),
            message: FINALIZE_MESSAGE.to_string(),
        })
    }

    pub fn active(&self) -> ScenarioView {
        let inner = self.inner.lock();
        inner.view(inner.active)
    }

    pub fn summaries(&self) -> Vec<ScenarioSummary> {
        let inner = self.inner.lock();
        (0..inner.entries.len())
            .map(|i| {
                let v = inner.view(i);
                ScenarioSummary {
                    scenario_id: v.entry.id,
                    name: v.entry.name,
                    status: v.status,
                }
            })
            .collect()
    }

    /// Stored configs in seed order.
    pub fn configs(&self) -> Vec<Scenario> {
        self.inner
            .lock()
            .entries
            .iter()
            .map(|e| e.config.clone())
            .collect()
    }

    /// Run the validation gate over every stored config.
    pub fn validate_all(&self) -> Result<(), ValidationError> {
        let inner = self.inner.lock();
        validate_scenarios(inner.entries.iter().map(|e| &e.config))
    }
}
