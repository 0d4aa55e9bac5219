use crate::auth::require_auth;
use crate::handlers::{self, editor, historical, pages, reports, scenarios, simulator, upload};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.upload.max_bytes + MULTIPART_OVERHEAD;

    let protected = Router::new()
        // Landing pages
        .route("/dashboard", get(pages::dashboard))
        .route("/admin", get(pages::admin))
        // Step 1: upload
        .route("/cargar-datos", get(pages::upload_page))
        .route(
            "/upload-csv",
            post(upload::upload_csv).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Step 2: historical review
        .route("/escenarios", get(historical::escenarios_page))
        .route("/api/historical/:item_id", get(historical::item_history))
        // Step 3: scenario editor
        .route("/configurescenarios", get(editor::editor_page))
        .route("/api/editor", get(editor::editor_view))
        .route("/api/editor/tabs", post(editor::tab_click))
        .route("/api/editor/variable", post(editor::variable_change))
        .route("/api/editor/delete", post(editor::delete_scenario))
        .route("/api/editor/generate", post(editor::generate))
        .route("/api/escenarios/config", post(scenarios::save_config))
        .route("/api/escenarios/:scenario_id", get(scenarios::get_config))
        // Step 4: simulation
        .route("/simulador", get(simulator::simulador_page))
        .route(
            "/api/simulador/scenario/:scenario_id",
            get(simulator::select_scenario),
        )
        .route("/api/simulador/finalize", post(simulator::finalize))
        // Step 5: reports
        .route("/reports/final", get(reports::final_report_page))
        .route("/reports/export/purchases", get(reports::export_purchases))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/login", get(pages::login_page).post(pages::login))
        .route("/logout", get(pages::logout))
        .route("/", get(pages::root))
        .route("/previsualizacion", get(pages::preview))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
