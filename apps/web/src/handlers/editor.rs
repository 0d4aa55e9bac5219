//! Scenario editor page and its JSON event endpoints. Every call acts on the
//! editor owned by the caller's session.

use crate::auth::CurrentUser;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::views::page_context;
use axum::{extract::State, response::Html, Extension, Json};
use forecast_core::ScenarioId;
use scenario_editor::{
    ChangeOutcome, DeleteOutcome, EditorError, EditorView, Panel, ScenarioEditor, TabTarget,
    VariableChange,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

fn with_editor<R>(
    state: &AppState,
    user: &CurrentUser,
    f: impl FnOnce(&mut ScenarioEditor) -> Result<R, EditorError>,
) -> AppResult<R> {
    state
        .auth
        .with_editor(user.session_id, f)
        .ok_or(AppError::Unauthorized)?
        .map_err(AppError::from)
}

pub async fn editor_page(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Html<String>> {
    let view = with_editor(&state, &user, |ed| ed.view())?;
    let page = state
        .catalog
        .editor_page()
        .map_err(|e| AppError::Page(e.to_string()))?;
    let mut ctx = page_context(&user, 3);
    ctx.insert("page", &page);
    ctx.insert("view", &view);
    state.views.render("configurescenarios.html", &ctx)
}

pub async fn editor_view(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<EditorView>> {
    Ok(Json(with_editor(&state, &user, |ed| ed.view())?))
}

#[derive(Debug, Deserialize)]
pub struct TabRequest {
    pub target: TabTarget,
}

#[derive(Debug, Serialize)]
pub struct TabResponse {
    pub changed: bool,
    pub view: EditorView,
}

pub async fn tab_click(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<TabRequest>,
) -> AppResult<Json<TabResponse>> {
    let (changed, view) = with_editor(&state, &user, |ed| {
        let changed = ed.on_tab_click(&req.target)?.is_some();
        Ok((changed, ed.view()?))
    })?;
    Ok(Json(TabResponse { changed, view }))
}

#[derive(Debug, Serialize)]
pub struct VariableResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn variable_change(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(change): Json<VariableChange>,
) -> AppResult<Json<VariableResponse>> {
    let outcome = with_editor(&state, &user, |ed| ed.on_variable_change(&change))?;
    let response = match outcome {
        ChangeOutcome::Accepted(value) => VariableResponse {
            accepted: true,
            value: Some(value),
            error: None,
        },
        ChangeOutcome::Rejected => VariableResponse {
            accepted: false,
            value: None,
            error: Some(format!("Valor no numérico para {}.", change.variable_id)),
        },
    };
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub scenario_id: ScenarioId,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Panel>,
    pub view: EditorView,
}

pub async fn delete_scenario(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<DeleteRequest>,
) -> AppResult<Json<DeleteResponse>> {
    let response = with_editor(&state, &user, |ed| {
        let outcome = ed.delete_custom(&req.scenario_id, &req.confirmed)?;
        let view = ed.view()?;
        Ok(match outcome {
            DeleteOutcome::Declined => DeleteResponse {
                deleted: false,
                fallback: None,
                view,
            },
            DeleteOutcome::Deleted { fallback } => DeleteResponse {
                deleted: true,
                fallback,
                view,
            },
        })
    })?;
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub redirect: &'static str,
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<GenerateResponse>> {
    with_editor(&state, &user, |ed| ed.generate_projections())?;
    // Configs saved through /api/escenarios/config are gated too.
    state.store.validate_all()?;
    info!(user = %user.username, "projections generated");
    Ok(Json(GenerateResponse {
        success: true,
        redirect: "/simulador",
    }))
}
