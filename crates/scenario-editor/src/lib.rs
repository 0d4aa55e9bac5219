#![deny(warnings)]

//! Per-session scenario editor.
//!
//! Holds the tab strip, the active scenario and the per-field error flags of
//! one user's editing session. It is driven by typed events (`TabTarget`,
//! `VariableChange`) and answers with renderable `Panel`s.

use forecast_core::{
    validate_presets, validate_scenarios, Scenario, ScenarioId, ValidationError, VariableId,
    VariableKind,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq)]
pub enum EditorError {
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),
    /// Only `custom<N>` scenarios may be deleted.
    #[error("solo se pueden eliminar escenarios personalizados: {0}")]
    NotCustom(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Business area a variable affects, shown as a hint under the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Impact {
    Ingresos,
    Costos,
    Inventario,
}

impl Impact {
    pub fn of(variable: VariableId) -> Self {
        match variable {
            VariableId::SalesPrice | VariableId::Promotions => Impact::Ingresos,
            VariableId::CostPerItem => Impact::Costos,
            VariableId::GrowthRate | VariableId::InitialStock => Impact::Inventario,
        }
    }

    pub fn hint(self) -> String {
        format!("Afecta directamente los {self:?}.")
    }
}

/// One labeled numeric input of a panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputField {
    pub variable_id: VariableId,
    pub label: String,
    pub unit: String,
    #[serde(rename = "type")]
    pub kind: VariableKind,
    pub placeholder: String,
    pub value: f64,
    pub impact: Impact,
    pub hint: String,
    pub has_error: bool,
}

/// Rendered form for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    pub scenario_id: ScenarioId,
    pub title: String,
    pub fields: Vec<InputField>,
}

/// Target of a click on the tab strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TabTarget {
    Scenario {
        #[serde(rename = "scenarioId")]
        scenario_id: ScenarioId,
    },
    /// The fixed "+ Nuevo Escenario" control, always last.
    AddScenario,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tab {
    pub target: TabTarget,
    pub label: String,
    pub active: bool,
}

/// A raw edit of one input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableChange {
    pub scenario_id: ScenarioId,
    pub variable_id: VariableId,
    pub raw_input: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeOutcome {
    Accepted(f64),
    /// Input was not a finite number; the field is flagged and nothing changed.
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Declined,
    /// Carries the fallback panel when the deleted scenario was active.
    Deleted { fallback: Option<Panel> },
}

/// Asks the user to confirm a destructive action.
pub trait ConfirmationGate {
    fn confirm(&self, scenario: &Scenario) -> bool;
}

/// A confirmation already collected by the caller.
impl ConfirmationGate for bool {
    fn confirm(&self, _scenario: &Scenario) -> bool {
        *self
    }
}

/// Complete editor view: tab strip plus the active panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorView {
    pub tabs: Vec<Tab>,
    pub active_scenario_id: ScenarioId,
    pub panel: Panel,
}

#[derive(Debug, Clone)]
pub struct ScenarioEditor {
    scenarios: Vec<Scenario>,
    active: ScenarioId,
    default_id: ScenarioId,
    next_custom: u32,
    field_errors: HashSet<(ScenarioId, VariableId)>,
}

impl ScenarioEditor {
    /// Start an editing session from the preset scenarios.
    pub fn new(presets: Vec<Scenario>) -> Result<Self, EditorError> {
        validate_presets(&presets)?;
        let default_id = presets
            .iter()
            .find(|s| s.is_default)
            .map(|s| s.id.clone())
            .ok_or(ValidationError::DefaultCount(0))?;
        let next_custom = presets.len() as u32 + 1;
        Ok(Self {
            scenarios: presets,
            active: default_id.clone(),
            default_id,
            next_custom,
            field_errors: HashSet::new(),
        })
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn active_id(&self) -> &ScenarioId {
        &self.active
    }

    pub fn scenario(&self, id: &ScenarioId) -> Result<&Scenario, EditorError> {
        self.scenarios
            .iter()
            .find(|s| &s.id == id)
            .ok_or_else(|| EditorError::UnknownScenario(id.0.clone()))
    }

    fn scenario_mut(&mut self, id: &ScenarioId) -> Result<&mut Scenario, EditorError> {
        self.scenarios
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| EditorError::UnknownScenario(id.0.clone()))
    }

    /// Scenario tabs in creation order, then the add control.
    pub fn tabs(&self) -> Vec<Tab> {
        let mut tabs: Vec<Tab> = self
            .scenarios
            .iter()
            .map(|s| Tab {
                target: TabTarget::Scenario {
                    scenario_id: s.id.clone(),
                },
                label: s.label.clone(),
                active: s.id == self.active,
            })
            .collect();
        tabs.push(Tab {
            target: TabTarget::AddScenario,
            label: "+ Nuevo Escenario".to_string(),
            active: false,
        });
        tabs
    }

    /// Panel for `id`, filled from that scenario's own stored values.
    pub fn render(&self, id: &ScenarioId) -> Result<Panel, EditorError> {
        let scenario = self.scenario(id)?;
        let fields = scenario
            .variables
            .iter()
            .map(|v| {
                let impact = Impact::of(v.id);
                InputField {
                    variable_id: v.id,
                    label: v.label.clone(),
                    unit: v.unit.clone(),
                    kind: v.kind,
                    placeholder: v.placeholder.clone(),
                    value: v.current_value,
                    impact,
                    hint: impact.hint(),
                    has_error: self.field_errors.contains(&(id.clone(), v.id)),
                }
            })
            .collect();
        Ok(Panel {
            scenario_id: scenario.id.clone(),
            title: scenario.label.clone(),
            fields,
        })
    }

    pub fn view(&self) -> Result<EditorView, EditorError> {
        Ok(EditorView {
            tabs: self.tabs(),
            active_scenario_id: self.active.clone(),
            panel: self.render(&self.active)?,
        })
    }

    /// Apply a raw edit. Non-numeric input flags the field and is discarded.
    pub fn on_variable_change(
        &mut self,
        change: &VariableChange,
    ) -> Result<ChangeOutcome, EditorError> {
        let key = (change.scenario_id.clone(), change.variable_id);
        let parsed = change
            .raw_input
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite());
        let scenario = self.scenario_mut(&change.scenario_id)?;
        match parsed {
            Some(value) if scenario.set_value(change.variable_id, value) => {
                self.field_errors.remove(&key);
                debug!(scenario = %change.scenario_id, variable = %change.variable_id, value, "variable updated");
                Ok(ChangeOutcome::Accepted(value))
            }
            _ => {
                debug!(scenario = %change.scenario_id, variable = %change.variable_id, raw = %change.raw_input, "non-numeric input rejected");
                self.field_errors.insert(key);
                Ok(ChangeOutcome::Rejected)
            }
        }
    }

    /// Deep-copy the active scenario into `custom<N>` and append its tab.
    pub fn duplicate_active(&mut self) -> Result<ScenarioId, EditorError> {
        let n = self.next_custom;
        let id = ScenarioId::custom(n);
        let copy = self
            .scenario(&self.active)?
            .duplicate(id.clone(), format!("Escenario Custom {n}"));
        self.next_custom += 1;
        info!(source = %self.active, scenario = %id, "scenario duplicated");
        self.scenarios.push(copy);
        Ok(id)
    }

    /// Handle a tab click. Returns the panel to show, `None` if nothing changed.
    pub fn on_tab_click(&mut self, target: &TabTarget) -> Result<Option<Panel>, EditorError> {
        match target {
            TabTarget::AddScenario => {
                let id = self.duplicate_active()?;
                self.switch_to(&id)
            }
            TabTarget::Scenario { scenario_id } => self.switch_to(scenario_id),
        }
    }

    /// Activate `id` and render it; no-op when it is already active.
    pub fn switch_to(&mut self, id: &ScenarioId) -> Result<Option<Panel>, EditorError> {
        if &self.active == id {
            return Ok(None);
        }
        let panel = self.render(id)?;
        self.active = id.clone();
        Ok(Some(panel))
    }

    /// Delete a custom scenario after confirmation. If it was active, the
    /// default scenario becomes active and its panel is returned.
    pub fn delete_custom(
        &mut self,
        id: &ScenarioId,
        gate: &dyn ConfirmationGate,
    ) -> Result<DeleteOutcome, EditorError> {
        if !id.is_custom() {
            return Err(EditorError::NotCustom(id.0.clone()));
        }
        let pos = self
            .scenarios
            .iter()
            .position(|s| &s.id == id)
            .ok_or_else(|| EditorError::UnknownScenario(id.0.clone()))?;
        if !gate.confirm(&self.scenarios[pos]) {
            return Ok(DeleteOutcome::Declined);
        }
        self.scenarios.remove(pos);
        self.field_errors.retain(|(sid, _)| sid != id);
        info!(scenario = %id, "custom scenario deleted");
        if &self.active != id {
            return Ok(DeleteOutcome::Deleted { fallback: None });
        }
        self.active = self.default_id.clone();
        Ok(DeleteOutcome::Deleted {
            fallback: Some(self.render(&self.default_id)?),
        })
    }

    /// Validation gate over every scenario of this session.
    pub fn generate_projections(&self) -> Result<(), EditorError> {
        validate_scenarios(&self.scenarios)?;
        info!(count = self.scenarios.len(), "projections requested");
        Ok(())
    }
}
