use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::path::PathBuf;
use tower::ServiceExt;

use forecast_web::{build_app, Config};

fn scratch_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("forecast-web-{}-{name}", std::process::id()))
}

fn create_test_app(name: &str) -> Router {
    let mut config = Config::default();
    config.upload.dir = scratch_dir(name);
    config.upload.processing_delay_ms = 0;
    build_app(config).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(body.to_vec()).unwrap()
}

fn location(response: &axum::response::Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

fn login_request(form: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

/// Log in and return the `sid=...` cookie pair.
async fn login(app: &Router, username: &str, password: &str) -> String {
    let response = send(
        app,
        login_request(&format!("username={username}&password={password}")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn get(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, cookie: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart(cookie: &str, file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let boundary = "forecastboundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"csvFile\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    Request::builder()
        .method("POST")
        .uri("/upload-csv")
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app("health");
    let response = send(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "forecast-web");
}

#[tokio::test]
async fn test_unauthenticated_requests() {
    let app = create_test_app("anon");
    let response = send(&app, get("/simulador", "")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let response = send(&app, get("/api/escenarios/A_Realista", "")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "No autenticado");
}

#[tokio::test]
async fn test_root_redirects_to_upload() {
    let app = create_test_app("root");
    let response = send(&app, get("/", "")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/cargar-datos");
}

#[tokio::test]
async fn test_login_failures() {
    let app = create_test_app("login-fail");
    let response = send(&app, login_request("username=admin&password=nope")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(response)
        .await
        .contains("Usuario o contraseña incorrectos"));

    let response = send(&app, login_request("username=admin")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response)
        .await
        .contains("Por favor completa usuario y contraseña"));
}

#[tokio::test]
async fn test_login_redirects_by_role() {
    let app = create_test_app("login-role");
    let response = send(&app, login_request("username=admin&password=admin")).await;
    assert_eq!(location(&response), "/admin");

    let response = send(
        &app,
        login_request("username=DavidPadilla&password=david123"),
    )
    .await;
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn test_admin_page_is_forbidden_for_users() {
    let app = create_test_app("forbidden");
    let cookie = login(&app, "DavidPadilla", "david123").await;
    let response = send(&app, get("/admin", &cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = login(&app, "admin", "admin").await;
    let response = send(&app, get("/admin", &admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = create_test_app("logout");
    let cookie = login(&app, "admin", "admin").await;
    let response = send(&app, get("/logout", &cookie)).await;
    assert_eq!(location(&response), "/login");
    let response = send(&app, get("/api/editor", &cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_pages_render() {
    let app = create_test_app("pages");
    let cookie = login(&app, "DavidPadilla", "david123").await;
    for uri in [
        "/dashboard",
        "/cargar-datos",
        "/escenarios",
        "/configurescenarios",
        "/simulador",
        "/reports/final",
    ] {
        let response = send(&app, get(uri, &cookie)).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn test_pages_report_request_failures() {
    let app = create_test_app("pages-errors");
    let cookie = login(&app, "admin", "admin").await;

    let html = body_text(send(&app, get("/simulador", &cookie)).await).await;
    assert!(html.contains("data.message || data.error"));
    assert!(html.contains("res.json().catch("));

    let html = body_text(send(&app, get("/cargar-datos", &cookie)).await).await;
    assert!(html.contains("data.error || 'Error de carga ('"));
}

#[tokio::test]
async fn test_unknown_scenario_config() {
    let app = create_test_app("missing");
    let cookie = login(&app, "admin", "admin").await;
    let response = send(&app, get("/api/escenarios/Z_Nada", &cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["message"],
        "Escenario Z_Nada no encontrado."
    );
}

#[tokio::test]
async fn test_save_config() {
    let app = create_test_app("config");
    let cookie = login(&app, "admin", "admin").await;

    let response = send(
        &app,
        post_json("/api/escenarios/config", &cookie, json!({ "scenarioId": "A_Realista" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Faltan parámetros: scenarioId y config."
    );

    let response = send(
        &app,
        post_json(
            "/api/escenarios/config",
            &cookie,
            json!({ "scenarioId": "Z_Nada", "config": { "salesPrice": 90 } }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_json(response).await["error"].is_string());

    let response = send(
        &app,
        post_json(
            "/api/escenarios/config",
            &cookie,
            json!({ "scenarioId": "A_Realista", "config": { "salesPrice": 90 } }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Configuración de A_Realista guardada.");
}

#[tokio::test]
async fn test_finalize_requires_active_scenario() {
    let app = create_test_app("finalize");
    let cookie = login(&app, "admin", "admin").await;

    let response = send(&app, get("/api/simulador/scenario/B_Optimista", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["activeScenario"]["scenarioId"], "B_Optimista");
    assert_eq!(json["chartData"]["datasets"].as_array().unwrap().len(), 3);
    assert_eq!(json["chartData"]["labels"].as_array().unwrap().len(), 12);

    let response = send(
        &app,
        post_json("/api/simulador/finalize", &cookie, json!({ "scenarioId": "A_Realista" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "El escenario a finalizar no coincide con el escenario activo actualmente."
    );

    let response = send(
        &app,
        post_json("/api/simulador/finalize", &cookie, json!({ "scenarioId": "B_Optimista" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(
        json["message"],
        "Plan de simulación finalizado y proceso de reporte iniciado."
    );

    let response = send(&app, post_json("/api/simulador/finalize", &cookie, json!({}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_finalize_rejects_preset_alias() {
    let app = create_test_app("finalize-alias");
    let cookie = login(&app, "admin", "admin").await;
    let response = send(&app, get("/api/simulador/scenario/B_Optimista", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        post_json("/api/simulador/finalize", &cookie, json!({ "scenarioId": "optimista" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "El escenario a finalizar no coincide con el escenario activo actualmente."
    );
}

#[tokio::test]
async fn test_unknown_simulation_scenario() {
    let app = create_test_app("sim-missing");
    let cookie = login(&app, "admin", "admin").await;
    let response = send(&app, get("/api/simulador/scenario/Z_Nada", &cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "Escenario no encontrado.");
}

#[tokio::test]
async fn test_item_history() {
    let app = create_test_app("history");
    let cookie = login(&app, "admin", "admin").await;
    let response = send(&app, get("/api/historical/item2?granularity=monthly", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["itemId"], "item2");

    let response = send(&app, get("/api/historical/item2?granularity=daily", &cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, get("/api/historical/item99", &cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_rejects_non_csv() {
    let app = create_test_app("upload-pdf");
    let cookie = login(&app, "admin", "admin").await;
    let response = send(&app, multipart(&cookie, "plan.pdf", "application/pdf", b"%PDF-1.4")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Solo se permiten archivos CSV");

    let dir = scratch_dir("upload-pdf");
    let written = std::fs::read_dir(&dir).map(|d| d.count()).unwrap_or(0);
    assert_eq!(written, 0);
}

#[tokio::test]
async fn test_upload_counts_rows() {
    let app = create_test_app("upload-csv");
    let cookie = login(&app, "admin", "admin").await;
    let response = send(
        &app,
        multipart(&cookie, "ventas.csv", "text/csv", b"sku,units\nA,10\nB,20\nC,30\n"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["rows"], 3);
    let _ = std::fs::remove_dir_all(scratch_dir("upload-csv"));
}

#[tokio::test]
async fn test_upload_counts_latin1_rows() {
    let app = create_test_app("upload-latin1");
    let cookie = login(&app, "admin", "admin").await;
    let response = send(
        &app,
        multipart(
            &cookie,
            "inventario.csv",
            "text/csv",
            b"item,unidades\nBater\xeda,10\nFiltro,3\n",
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["rows"], 2);
    let _ = std::fs::remove_dir_all(scratch_dir("upload-latin1"));
}

fn upload_dir_is_empty(name: &str) -> bool {
    std::fs::read_dir(scratch_dir(name))
        .map(|mut d| d.next().is_none())
        .unwrap_or(true)
}

#[tokio::test]
async fn test_upload_just_over_size_cap() {
    let app = create_test_app("upload-cap");
    let cookie = login(&app, "admin", "admin").await;
    let data = vec![b'a'; Config::default().upload.max_bytes + 1];
    let response = send(&app, multipart(&cookie, "big.csv", "text/csv", &data)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Error de carga: File too large"
    );
    assert!(upload_dir_is_empty("upload-cap"));
}

#[tokio::test]
async fn test_upload_over_body_limit() {
    let app = create_test_app("upload-limit");
    let cookie = login(&app, "admin", "admin").await;
    let data = vec![b'a'; 11 * 1024 * 1024];
    let response = send(&app, multipart(&cookie, "huge.csv", "text/csv", &data)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Error de carga: File too large"
    );
    assert!(upload_dir_is_empty("upload-limit"));
}

#[tokio::test]
async fn test_editor_add_and_delete_custom_scenario() {
    let app = create_test_app("editor");
    let cookie = login(&app, "admin", "admin").await;

    let response = send(
        &app,
        post_json("/api/editor/tabs", &cookie, json!({ "target": { "kind": "addScenario" } })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["changed"], true);
    assert_eq!(json["view"]["activeScenarioId"], "custom4");

    let response = send(
        &app,
        post_json(
            "/api/editor/variable",
            &cookie,
            json!({ "scenarioId": "custom4", "variableId": "costPerItem", "rawInput": "abc" }),
        ),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["accepted"], false);
    assert!(json["error"].is_string());

    let response = send(
        &app,
        post_json("/api/editor/delete", &cookie, json!({ "scenarioId": "custom4" })),
    )
    .await;
    assert_eq!(body_json(response).await["deleted"], false);

    let response = send(
        &app,
        post_json(
            "/api/editor/delete",
            &cookie,
            json!({ "scenarioId": "custom4", "confirmed": true }),
        ),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["deleted"], true);
    assert_eq!(json["fallback"]["scenarioId"], "realista");
    assert_eq!(json["view"]["activeScenarioId"], "realista");

    let response = send(
        &app,
        post_json(
            "/api/editor/delete",
            &cookie,
            json!({ "scenarioId": "realista", "confirmed": true }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_runs_validation_gate() {
    let app = create_test_app("generate");
    let cookie = login(&app, "admin", "admin").await;

    let response = send(&app, post_json("/api/editor/generate", &cookie, json!({}))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["redirect"], "/simulador");

    let response = send(
        &app,
        post_json(
            "/api/editor/variable",
            &cookie,
            json!({ "scenarioId": "realista", "variableId": "costPerItem", "rawInput": "95" }),
        ),
    )
    .await;
    assert_eq!(body_json(response).await["accepted"], true);

    let response = send(&app, post_json("/api/editor/generate", &cookie, json!({}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("Margen bruto negativo o cero"));
}

#[tokio::test]
async fn test_generate_blocks_on_saved_store_config() {
    let app = create_test_app("generate-store");
    let cookie = login(&app, "admin", "admin").await;

    let response = send(
        &app,
        post_json(
            "/api/escenarios/config",
            &cookie,
            json!({ "scenarioId": "A_Realista", "config": { "costPerItem": 90 } }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, post_json("/api/editor/generate", &cookie, json!({}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("Margen bruto negativo o cero"));
}

#[tokio::test]
async fn test_editors_are_isolated_between_sessions() {
    let app = create_test_app("isolation");
    let a = login(&app, "admin", "admin").await;
    let b = login(&app, "DavidPadilla", "david123").await;
    send(
        &app,
        post_json("/api/editor/tabs", &a, json!({ "target": { "kind": "addScenario" } })),
    )
    .await;
    let view = body_json(send(&app, get("/api/editor", &b)).await).await;
    assert_eq!(view["activeScenarioId"], "realista");
    assert_eq!(view["tabs"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_purchase_export() {
    let app = create_test_app("export");
    let cookie = login(&app, "admin", "admin").await;
    let response = send(&app, get("/reports/export/purchases", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"Sugerencia_Compras_"));
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..2], b"PK");
}
