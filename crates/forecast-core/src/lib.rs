#![deny(warnings)]

//! Core domain models and invariants for the forecast wizard.
//!
//! This crate defines the serializable scenario/variable schema shared by the
//! server-side store and the per-session editor, the simulation output types,
//! and the validation gate that guards progression to simulation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Number of monthly points in every projection and comparison series.
pub const HORIZON_MONTHS: usize = 12;

/// Prefix shared by all user-created scenario ids (`custom4`, `custom5`, ...).
pub const CUSTOM_PREFIX: &str = "custom";

/// Unique scenario identifier, e.g. "realista", "B_Optimista", "custom4".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(pub String);

impl ScenarioId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id of the `n`-th custom scenario.
    pub fn custom(n: u32) -> Self {
        Self(format!("{CUSTOM_PREFIX}{n}"))
    }

    /// Counter value of a custom id, `None` for presets or malformed ids.
    pub fn custom_index(&self) -> Option<u32> {
        let digits = self.0.strip_prefix(CUSTOM_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    pub fn is_custom(&self) -> bool {
        self.custom_index().is_some()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScenarioId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a tunable variable. Every scenario carries all of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariableId {
    /// Unit sales price.
    SalesPrice,
    /// Demand growth vs. previous year, in percent.
    GrowthRate,
    /// Average promotional discount, in percent (negative = discount).
    Promotions,
    /// Variable cost per item.
    CostPerItem,
    /// Stock on hand at the start of the horizon.
    InitialStock,
}

impl VariableId {
    /// Schema order used for rendering and for the variable list of every scenario.
    pub const ALL: [VariableId; 5] = [
        VariableId::SalesPrice,
        VariableId::GrowthRate,
        VariableId::Promotions,
        VariableId::CostPerItem,
        VariableId::InitialStock,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VariableId::SalesPrice => "salesPrice",
            VariableId::GrowthRate => "growthRate",
            VariableId::Promotions => "promotions",
            VariableId::CostPerItem => "costPerItem",
            VariableId::InitialStock => "initialStock",
        }
    }

    /// Display label, unit, input kind and delta flag for this variable.
    pub fn spec(self) -> (&'static str, &'static str, VariableKind, bool) {
        match self {
            VariableId::SalesPrice => ("Precio de Venta", "$", VariableKind::Currency, false),
            VariableId::GrowthRate => (
                "Demanda / Tasa de Crecimiento",
                "%",
                VariableKind::Percentage,
                true,
            ),
            VariableId::Promotions => (
                "Promociones (Descuento Promedio)",
                "%",
                VariableKind::Percentage,
                true,
            ),
            VariableId::CostPerItem => (
                "Costo por Ítem (Variable)",
                "$",
                VariableKind::Currency,
                false,
            ),
            VariableId::InitialStock => (
                "Inventario / Stock Inicial",
                "Unidades",
                VariableKind::UnitCount,
                false,
            ),
        }
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariableId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VariableId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownVariable(s.to_string()))
    }
}

/// Input affordance of a variable. Storage is always `f64`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariableKind {
    Currency,
    Percentage,
    UnitCount,
}

/// One tunable variable of a scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub id: VariableId,
    pub label: String,
    pub unit: String,
    #[serde(rename = "type")]
    pub kind: VariableKind,
    /// Hint shown in the empty input.
    pub placeholder: String,
    pub current_value: f64,
    /// True when the value is a percentage change rather than an absolute figure.
    pub is_delta: bool,
}

impl Variable {
    /// Build a variable from the shared schema. `reference` supplies the
    /// baseline figures quoted in placeholders.
    pub fn from_schema(id: VariableId, current_value: f64, reference: &VariableValues) -> Self {
        let (label, unit, kind, is_delta) = id.spec();
        let placeholder = match id {
            VariableId::SalesPrice => {
                format!("Precio base actual: ${:.2}", reference.sales_price)
            }
            VariableId::GrowthRate => "Ej: +2.5% vs. año anterior".to_string(),
            VariableId::Promotions => "Ej: -3% de descuento promedio".to_string(),
            VariableId::CostPerItem => format!("Costo actual: ${:.2}", reference.cost_per_item),
            VariableId::InitialStock => "Ej: 2,500 unidades".to_string(),
        };
        Self {
            id,
            label: label.to_string(),
            unit: unit.to_string(),
            kind,
            placeholder,
            current_value,
            is_delta,
        }
    }
}

/// Flat variable values of a scenario, as written in preset catalogs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableValues {
    pub sales_price: f64,
    pub growth_rate: f64,
    pub promotions: f64,
    pub cost_per_item: f64,
    pub initial_stock: f64,
}

impl VariableValues {
    pub fn get(&self, id: VariableId) -> f64 {
        match id {
            VariableId::SalesPrice => self.sales_price,
            VariableId::GrowthRate => self.growth_rate,
            VariableId::Promotions => self.promotions,
            VariableId::CostPerItem => self.cost_per_item,
            VariableId::InitialStock => self.initial_stock,
        }
    }
}

/// A named what-if scenario with its full variable set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: ScenarioId,
    pub label: String,
    pub is_default: bool,
    /// Variables in [`VariableId::ALL`] order.
    pub variables: Vec<Variable>,
}

impl Scenario {
    /// Build a scenario over the shared variable schema.
    pub fn from_values(
        id: ScenarioId,
        label: impl Into<String>,
        is_default: bool,
        values: &VariableValues,
        reference: &VariableValues,
    ) -> Self {
        let variables = VariableId::ALL
            .into_iter()
            .map(|v| Variable::from_schema(v, values.get(v), reference))
            .collect();
        Self {
            id,
            label: label.into(),
            is_default,
            variables,
        }
    }

    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        self.variables.iter().find(|v| v.id == id)
    }

    pub fn value(&self, id: VariableId) -> Option<f64> {
        self.variable(id).map(|v| v.current_value)
    }

    /// Overwrite an existing variable. Returns false if the scenario has no
    /// such variable; variables are never created here.
    pub fn set_value(&mut self, id: VariableId, value: f64) -> bool {
        match self.variables.iter_mut().find(|v| v.id == id) {
            Some(var) => {
                var.current_value = value;
                true
            }
            None => false,
        }
    }

    pub fn variable_ids(&self) -> BTreeSet<VariableId> {
        self.variables.iter().map(|v| v.id).collect()
    }

    /// Independent copy under a new identity. Never the default.
    pub fn duplicate(&self, id: ScenarioId, label: impl Into<String>) -> Scenario {
        let mut copy = self.clone();
        copy.id = id;
        copy.label = label.into();
        copy.is_default = false;
        copy
    }
}

/// Severity of a simulation alert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    /// Spanish label used in the alert detail view.
    pub fn label_es(self) -> &'static str {
        match self {
            Severity::Low => "Baja",
            Severity::Medium => "Media",
            Severity::High => "Alta",
        }
    }
}

impl FromStr for Severity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(ValidationError::UnknownSeverity(s.to_string())),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A risk or opportunity flagged by a projection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub severity: Severity,
}

/// Exactly [`HORIZON_MONTHS`] monthly values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthlySeries(pub [f64; HORIZON_MONTHS]);

impl MonthlySeries {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }
}

impl TryFrom<Vec<f64>> for MonthlySeries {
    type Error = ValidationError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        let actual = values.len();
        let arr: [f64; HORIZON_MONTHS] =
            values
                .try_into()
                .map_err(|_| ValidationError::SeriesLength {
                    expected: HORIZON_MONTHS,
                    actual,
                })?;
        Ok(MonthlySeries(arr))
    }
}

/// Headline KPIs of a projection, stored numerically and formatted at the edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub projected_sales_units: u64,
    pub total_revenue: Decimal,
    pub estimated_cost: Decimal,
}

/// Output of projecting one scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub kpis: Kpis,
    pub alerts: Vec<Alert>,
    pub series: MonthlySeries,
}

/// Activity state of a stored scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityStatus {
    Active,
    Inactive,
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Gate failure: a scenario sells at or below cost.
    #[error(
        "Margen bruto negativo o cero en el escenario {scenario}: el precio de venta ({price}) debe ser mayor que el costo por ítem ({cost})"
    )]
    NonPositiveMargin {
        scenario: String,
        price: f64,
        cost: f64,
    },
    #[error("scenario {scenario} is missing variable {variable}")]
    MissingVariable {
        scenario: String,
        variable: VariableId,
    },
    #[error("scenario {scenario}: variable {variable} is not a finite number")]
    NonFinite {
        scenario: String,
        variable: VariableId,
    },
    #[error("scenario {0} does not match the shared variable schema")]
    SchemaMismatch(String),
    #[error("duplicate scenario id: {0}")]
    DuplicateScenario(String),
    #[error("expected exactly one default scenario, found {0}")]
    DefaultCount(usize),
    #[error("unknown variable: {0}")]
    UnknownVariable(String),
    #[error("unknown severity: {0}")]
    UnknownSeverity(String),
    #[error("monthly series must have {expected} points, got {actual}")]
    SeriesLength { expected: usize, actual: usize },
}

/// Validate that a scenario follows the shared schema and has finite values.
pub fn validate_schema(scenario: &Scenario) -> Result<(), ValidationError> {
    let ids: Vec<VariableId> = scenario.variables.iter().map(|v| v.id).collect();
    if ids != VariableId::ALL {
        return Err(ValidationError::SchemaMismatch(scenario.id.0.clone()));
    }
    for var in &scenario.variables {
        if !var.current_value.is_finite() {
            return Err(ValidationError::NonFinite {
                scenario: scenario.id.0.clone(),
                variable: var.id,
            });
        }
    }
    Ok(())
}

/// Validate a single scenario: schema plus `costPerItem < salesPrice`.
pub fn validate_scenario(scenario: &Scenario) -> Result<(), ValidationError> {
    validate_schema(scenario)?;
    let lookup = |variable: VariableId| {
        scenario
            .value(variable)
            .ok_or_else(|| ValidationError::MissingVariable {
                scenario: scenario.id.0.clone(),
                variable,
            })
    };
    let price = lookup(VariableId::SalesPrice)?;
    let cost = lookup(VariableId::CostPerItem)?;
    if cost >= price {
        return Err(ValidationError::NonPositiveMargin {
            scenario: scenario.id.0.clone(),
            price,
            cost,
        });
    }
    Ok(())
}

/// Gate before simulation: every scenario must pass, the first failure aborts.
pub fn validate_scenarios<'a, I>(scenarios: I) -> Result<(), ValidationError>
where
    I: IntoIterator<Item = &'a Scenario>,
{
    for scenario in scenarios {
        if let Err(e) = validate_scenario(scenario) {
            debug!(scenario = %scenario.id, error = %e, "validation gate blocked");
            return Err(e);
        }
    }
    Ok(())
}

/// Validate a preset collection: unique ids, exactly one default, valid schema.
pub fn validate_presets(scenarios: &[Scenario]) -> Result<(), ValidationError> {
    let mut seen: BTreeSet<&ScenarioId> = BTreeSet::new();
    for s in scenarios {
        validate_schema(s)?;
        if !seen.insert(&s.id) {
            return Err(ValidationError::DuplicateScenario(s.id.0.clone()));
        }
    }
    let defaults = scenarios.iter().filter(|s| s.is_default).count();
    if defaults != 1 {
        return Err(ValidationError::DefaultCount(defaults));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn values(price: f64, cost: f64) -> VariableValues {
        VariableValues {
            sales_price: price,
            growth_rate: 3.0,
            promotions: -3.0,
            cost_per_item: cost,
            initial_stock: 2500.0,
        }
    }

    fn scenario(id: &str, price: f64, cost: f64) -> Scenario {
        let base = values(80.0, 55.0);
        Scenario::from_values(ScenarioId::new(id), id, false, &values(price, cost), &base)
    }

    #[test]
    fn schema_order_and_metadata() {
        let s = scenario("realista", 80.0, 55.0);
        let ids: Vec<_> = s.variables.iter().map(|v| v.id).collect();
        assert_eq!(ids, VariableId::ALL);
        let price = s.variable(VariableId::SalesPrice).unwrap();
        assert_eq!(price.unit, "$");
        assert_eq!(price.placeholder, "Precio base actual: $80.00");
        let growth = s.variable(VariableId::GrowthRate).unwrap();
        assert!(growth.is_delta);
        assert_eq!(growth.kind, VariableKind::Percentage);
    }

    #[test]
    fn variable_json_uses_wire_names() {
        let s = scenario("realista", 80.0, 55.0);
        let js = serde_json::to_value(&s).unwrap();
        assert_eq!(js["isDefault"], false);
        assert_eq!(js["variables"][0]["id"], "salesPrice");
        assert_eq!(js["variables"][4]["type"], "unit-count");
        assert_eq!(js["variables"][3]["currentValue"], 55.0);
    }

    #[test]
    fn set_value_never_creates_variables() {
        let mut s = scenario("realista", 80.0, 55.0);
        s.variables.retain(|v| v.id != VariableId::InitialStock);
        assert!(!s.set_value(VariableId::InitialStock, 10.0));
        assert_eq!(s.variables.len(), 4);
        assert!(s.set_value(VariableId::CostPerItem, 60.0));
        assert_eq!(s.value(VariableId::CostPerItem), Some(60.0));
    }

    #[test]
    fn custom_ids() {
        assert_eq!(ScenarioId::custom(4).as_str(), "custom4");
        assert_eq!(ScenarioId::new("custom12").custom_index(), Some(12));
        assert!(!ScenarioId::new("realista").is_custom());
        assert!(!ScenarioId::new("custom").is_custom());
        assert!(!ScenarioId::new("customX").is_custom());
    }

    #[test]
    fn severity_is_case_insensitive() {
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!(" Medium ".parse::<Severity>().unwrap(), Severity::Medium);
        assert!("critical".parse::<Severity>().is_err());
        let a: Alert =
            serde_json::from_str(r#"{"type":"x","message":"m","severity":"High"}"#).unwrap();
        assert_eq!(a.severity, Severity::High);
        assert_eq!(serde_json::to_value(a).unwrap()["severity"], "high");
    }

    #[test]
    fn monthly_series_requires_twelve_points() {
        assert!(MonthlySeries::try_from(vec![1.0; 12]).is_ok());
        assert_eq!(
            MonthlySeries::try_from(vec![1.0; 11]).unwrap_err(),
            ValidationError::SeriesLength {
                expected: 12,
                actual: 11
            }
        );
        assert!(serde_json::from_str::<MonthlySeries>("[1,2,3]").is_err());
    }

    #[test]
    fn gate_blocks_globally_on_one_invalid_scenario() {
        let ok = scenario("realista", 80.0, 55.0);
        let bad = scenario("conservador", 58.0, 58.0);
        let err = validate_scenarios([&ok, &bad]).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::NonPositiveMargin { ref scenario, .. } if scenario == "conservador"
        ));
        assert!(validate_scenarios([&ok]).is_ok());
    }

    #[test]
    fn presets_need_exactly_one_default() {
        let mut a = scenario("a", 80.0, 55.0);
        let b = scenario("b", 80.0, 55.0);
        assert_eq!(
            validate_presets(&[a.clone(), b.clone()]),
            Err(ValidationError::DefaultCount(0))
        );
        a.is_default = true;
        assert!(validate_presets(&[a.clone(), b]).is_ok());
        assert_eq!(
            validate_presets(&[a.clone(), a]),
            Err(ValidationError::DuplicateScenario("a".into()))
        );
    }

    proptest! {
        #[test]
        fn duplicate_is_deep_copy(cost in 1.0f64..100.0, edit in 1.0f64..100.0) {
            let source = scenario("realista", 150.0, cost);
            let mut copy = source.duplicate(ScenarioId::custom(4), "Escenario Custom 4");
            prop_assert_eq!(copy.variable_ids(), source.variable_ids());
            copy.set_value(VariableId::CostPerItem, edit);
            prop_assert_eq!(source.value(VariableId::CostPerItem), Some(cost));
            prop_assert_eq!(copy.value(VariableId::CostPerItem), Some(edit));
            prop_assert!(!copy.is_default);
        }

        #[test]
        fn gate_matches_margin_sign(price in 0.0f64..500.0, cost in 0.0f64..500.0) {
            let s = scenario("x", price, cost);
            prop_assert_eq!(validate_scenarios([&s]).is_ok(), cost < price);
        }
    }
}
