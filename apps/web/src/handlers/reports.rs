use crate::auth::CurrentUser;
use crate::error::AppResult;
use crate::state::AppState;
use crate::views::page_context;
use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse},
    Extension,
};
use data_pipeline::report::{export_filename, XLSX_CONTENT_TYPE};
use data_pipeline::{build_final_report, export_purchases_xlsx, FinalReport};
use std::sync::Arc;
use tracing::info;

fn final_report(state: &AppState) -> FinalReport {
    let active = state.store.active();
    let purchases = &state.catalog.purchases;
    build_final_report(
        &active.entry.name,
        &active.entry.result.kpis,
        purchases.rationale.clone(),
        &purchases.rows,
    )
}

/// Executive summary for the active scenario.
pub async fn final_report_page(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Html<String>> {
    let mut ctx = page_context(&user, 5);
    ctx.insert("report", &final_report(&state));
    state.views.render("final_report.html", &ctx)
}

pub async fn export_purchases(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    let report = final_report(&state);
    let bytes = export_purchases_xlsx(&report.purchase_report)?;
    let filename = export_filename(chrono::Utc::now().timestamp_millis());
    info!(file = %filename, rows = report.purchase_report.len(), "purchase export generated");
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    ))
}
