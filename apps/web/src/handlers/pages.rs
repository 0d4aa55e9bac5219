//! Login, logout and the landing pages.

use crate::auth::{removal_cookie, session_cookie, session_id, CurrentUser, Role};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::views::page_context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use tera::Context;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
    pub remember: Option<String>,
}

fn login_error(state: &AppState, status: StatusCode, message: &str) -> AppResult<Response> {
    let mut ctx = Context::new();
    ctx.insert("error", message);
    let page: Html<String> = state.views.render("login.html", &ctx)?;
    Ok((status, page).into_response())
}

pub async fn login_page(State(state): State<Arc<AppState>>, jar: CookieJar) -> AppResult<Response> {
    if session_id(&jar)
        .and_then(|id| state.auth.session(id))
        .is_some()
    {
        return Ok(Redirect::to("/dashboard").into_response());
    }
    Ok(state.views.render("login.html", &Context::new())?.into_response())
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let username = form
        .username
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    let password = form.password.filter(|p| !p.is_empty());
    let (Some(username), Some(password)) = (username, password) else {
        return login_error(
            &state,
            StatusCode::BAD_REQUEST,
            "Por favor completa usuario y contraseña",
        );
    };
    let remember = form
        .remember
        .is_some_and(|v| !v.is_empty() && v != "false");
    let editor = state.new_editor()?;
    let worker = Arc::clone(&state);
    let outcome = tokio::task::spawn_blocking(move || {
        worker.auth.login(&username, &password, remember, editor)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?;
    match outcome {
        None => login_error(
            &state,
            StatusCode::UNAUTHORIZED,
            "Usuario o contraseña incorrectos",
        ),
        Some((id, ttl, user)) => {
            let target = match user.role {
                Role::Admin => "/admin",
                Role::User => "/dashboard",
            };
            Ok((jar.add(session_cookie(id, ttl)), Redirect::to(target)).into_response())
        }
    }
}

pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    if let Some(id) = session_id(&jar) {
        state.auth.logout(id);
    }
    (jar.remove(removal_cookie()), Redirect::to("/login"))
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Html<String>> {
    state.views.render("dashboard.html", &page_context(&user, 0))
}

pub async fn admin(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Html<String>> {
    if user.role != Role::Admin {
        return Err(AppError::Forbidden);
    }
    let mut ctx = page_context(&user, 0);
    ctx.insert("sessions", &state.auth.session_count());
    ctx.insert("scenarios", &state.store.summaries());
    state.views.render("admin.html", &ctx)
}

pub async fn root() -> Redirect {
    Redirect::to("/cargar-datos")
}

pub async fn preview() -> Redirect {
    Redirect::to("/escenarios")
}

pub async fn upload_page(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Html<String>> {
    let mut ctx = page_context(&user, 1);
    ctx.insert("max_mb", &(state.config.upload.max_bytes / (1024 * 1024)));
    state.views.render("upload.html", &ctx)
}
