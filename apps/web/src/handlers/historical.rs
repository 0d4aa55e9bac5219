use crate::auth::CurrentUser;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::views::page_context;
use axum::{
    extract::{Path, Query, State},
    response::Html,
    Extension, Json,
};
use data_pipeline::{Granularity, ItemHistory};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub granularity: Option<String>,
}

/// Historical review page for the default item.
pub async fn escenarios_page(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Html<String>> {
    let db = &state.catalog.historical;
    let history = db.item_history(&db.default_item, Granularity::Weekly)?;
    let mut ctx = page_context(&user, 2);
    ctx.insert("header", &db.header);
    ctx.insert("file_status", &db.file_status);
    ctx.insert("items", &db.item_options(&db.default_item));
    ctx.insert("history", &history);
    ctx.insert("settings", &db.scenario_config);
    state.views.render("escenarios.html", &ctx)
}

pub async fn item_history(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<ItemHistory>> {
    let granularity = match query.granularity.as_deref() {
        None | Some("") => Granularity::default(),
        Some(raw) => raw.parse::<Granularity>().map_err(AppError::BadRequest)?,
    };
    let history = state.catalog.historical.item_history(&item_id, granularity)?;
    Ok(Json(history))
}
