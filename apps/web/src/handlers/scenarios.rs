//! Read and save server-side scenario configs.

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use forecast_core::{Scenario, ScenarioId};
use scenario_store::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioConfigResponse {
    pub scenario_id: ScenarioId,
    pub name: String,
    pub config: Scenario,
}

pub async fn get_config(
    State(state): State<Arc<AppState>>,
    Path(scenario_id): Path<String>,
) -> AppResult<Json<ScenarioConfigResponse>> {
    let view = state.store.get(&scenario_id)?;
    Ok(Json(ScenarioConfigResponse {
        scenario_id: view.entry.id,
        name: view.entry.name,
        config: view.entry.config,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveConfigRequest {
    pub scenario_id: Option<String>,
    pub config: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
pub struct SaveConfigResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored: Vec<String>,
}

pub async fn save_config(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveConfigRequest>,
) -> AppResult<Json<SaveConfigResponse>> {
    let (Some(scenario_id), Some(config)) = (
        req.scenario_id.filter(|s| !s.is_empty()),
        req.config,
    ) else {
        return Err(AppError::BadRequest(
            "Faltan parámetros: scenarioId y config.".to_string(),
        ));
    };
    let mut numeric = BTreeMap::new();
    let mut ignored = Vec::new();
    for (key, value) in config {
        match value.as_f64() {
            Some(v) => {
                numeric.insert(key, v);
            }
            None => ignored.push(key),
        }
    }
    let outcome = state.store.update(&scenario_id, &numeric).map_err(|e| match e {
        StoreError::NotFound(_) => AppError::UnknownTarget(e.to_string()),
        other => AppError::from(other),
    })?;
    ignored.extend(outcome.ignored);
    Ok(Json(SaveConfigResponse {
        success: true,
        message: format!("Configuración de {scenario_id} guardada."),
        ignored,
    }))
}
