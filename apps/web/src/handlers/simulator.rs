//! Simulation results: scenario switching, the comparison chart and the
//! finalize step.

use crate::auth::CurrentUser;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::views::page_context;
use axum::{
    extract::{Path, State},
    response::Html,
    Extension, Json,
};
use forecast_core::{ActivityStatus, Alert, MonthlySeries, ScenarioId};
use forecast_econ::{compare_series, format_kpis, month_labels, ChartSeries, KpiDisplay};
use scenario_store::{Confirmation, ScenarioView, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertView {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub severity: &'static str,
    pub severity_label: &'static str,
}

impl From<&Alert> for AlertView {
    fn from(alert: &Alert) -> Self {
        Self {
            kind: alert.kind.clone(),
            message: alert.message.clone(),
            severity: alert.severity.as_str(),
            severity_label: alert.severity.label_es(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveScenario {
    pub scenario_id: ScenarioId,
    pub name: String,
    pub status: ActivityStatus,
    pub product_id: String,
    pub simulation_data: KpiDisplay,
    pub alerts: Vec<AlertView>,
    pub time_series_data: MonthlySeries,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResponse {
    pub active_scenario: ActiveScenario,
    pub chart_data: ChartSeries,
}

fn scenario_response(state: &AppState, view: ScenarioView) -> AppResult<ScenarioResponse> {
    let sim = &state.catalog.simulation;
    let entry = view.entry;
    let chart_data = compare_series(
        &entry.name,
        &entry.result.series,
        &sim.plan,
        &sim.historical,
        month_labels(sim.year)?,
    )?;
    Ok(ScenarioResponse {
        active_scenario: ActiveScenario {
            scenario_id: entry.id,
            name: entry.name,
            status: view.status,
            product_id: entry.product_id,
            simulation_data: format_kpis(&entry.result.kpis),
            alerts: entry.result.alerts.iter().map(AlertView::from).collect(),
            time_series_data: entry.result.series,
        },
        chart_data,
    })
}

pub async fn simulador_page(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Html<String>> {
    let current = scenario_response(&state, state.store.active())?;
    let mut ctx = page_context(&user, 4);
    ctx.insert("scenarios", &state.store.summaries());
    ctx.insert("current", &current);
    state.views.render("simulador.html", &ctx)
}

pub async fn select_scenario(
    State(state): State<Arc<AppState>>,
    Path(scenario_id): Path<String>,
) -> AppResult<Json<ScenarioResponse>> {
    let view = state.store.set_active(&scenario_id).map_err(|e| match e {
        StoreError::NotFound(_) => AppError::NotFound("Escenario no encontrado.".to_string()),
        other => AppError::from(other),
    })?;
    info!(scenario = %view.entry.id, "active scenario switched");
    Ok(Json(scenario_response(&state, view)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub scenario_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub success: bool,
    pub message: String,
}

pub async fn finalize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FinalizeRequest>,
) -> AppResult<Json<FinalizeResponse>> {
    let Some(scenario_id) = req.scenario_id.filter(|s| !s.is_empty()) else {
        return Err(AppError::BadRequest(
            "Falta el parámetro scenarioId en el cuerpo de la petición.".to_string(),
        ));
    };
    let Confirmation {
        scenario_id,
        message,
    } = state.store.finalize(&scenario_id)?;
    info!(scenario = %scenario_id, "simulation plan finalized");
    Ok(Json(FinalizeResponse {
        success: true,
        message,
    }))
}
