//! Built-in users, server-side sessions and the auth middleware.

use crate::error::AppError;
use crate::state::AppState;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use dashmap::DashMap;
use scenario_editor::ScenarioEditor;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "sid";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hash(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone)]
struct User {
    username: String,
    display_name: String,
    role: Role,
    password_hash: String,
}

/// Identity attached to authenticated requests.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    #[serde(skip)]
    pub session_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub role: Role,
}

struct Session {
    user: CurrentUser,
    expires_at: Instant,
    editor: ScenarioEditor,
}

/// Users plus live sessions. Each session owns its own scenario editor.
pub struct AuthService {
    users: Vec<User>,
    sessions: DashMap<Uuid, Session>,
    ttl: Duration,
    remember_ttl: Duration,
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

impl AuthService {
    /// Seed the two built-in accounts, hashing their passwords.
    pub fn with_builtin_users(ttl: Duration, remember_ttl: Duration) -> Result<Self, AuthError> {
        let seed = [
            ("DavidPadilla", "David Padilla", "david123", Role::User),
            ("admin", "Administrador", "admin", Role::Admin),
        ];
        let mut users = Vec::with_capacity(seed.len());
        for (username, display_name, password, role) in seed {
            users.push(User {
                username: username.to_string(),
                display_name: display_name.to_string(),
                role,
                password_hash: hash_password(password)?,
            });
        }
        info!(users = users.len(), "auth users ready");
        Ok(Self {
            users,
            sessions: DashMap::new(),
            ttl,
            remember_ttl,
        })
    }

    fn verify(&self, username: &str, password: &str) -> Option<&User> {
        let user = self.users.iter().find(|u| u.username == username)?;
        let parsed = PasswordHash::new(&user.password_hash).ok()?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .ok()
            .map(|_| user)
    }

    /// Check credentials and open a session. Returns the session id, its
    /// lifetime and the user, or `None` for bad credentials.
    pub fn login(
        &self,
        username: &str,
        password: &str,
        remember: bool,
        editor: ScenarioEditor,
    ) -> Option<(Uuid, Duration, CurrentUser)> {
        let Some(user) = self.verify(username, password) else {
            warn!(username, "login rejected");
            return None;
        };
        let id = Uuid::new_v4();
        let ttl = if remember { self.remember_ttl } else { self.ttl };
        let current = CurrentUser {
            session_id: id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
        };
        let now = Instant::now();
        self.sweep_expired(now);
        self.sessions.insert(
            id,
            Session {
                user: current.clone(),
                expires_at: now + ttl,
                editor,
            },
        );
        info!(username, remember, "session opened");
        Some((id, ttl, current))
    }

    /// Drop every session past its expiry, including ones never revisited.
    fn sweep_expired(&self, now: Instant) {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.expires_at > now);
        let swept = before.saturating_sub(self.sessions.len());
        if swept > 0 {
            debug!(swept, "expired sessions removed");
        }
    }

    /// Live session for `id`; expired sessions are dropped on access.
    pub fn session(&self, id: Uuid) -> Option<CurrentUser> {
        {
            let session = self.sessions.get(&id)?;
            if session.expires_at > Instant::now() {
                return Some(session.user.clone());
            }
        }
        debug!(%id, "session expired");
        self.sessions.remove(&id);
        None
    }

    /// Run `f` against the session's editor.
    pub fn with_editor<R>(&self, id: Uuid, f: impl FnOnce(&mut ScenarioEditor) -> R) -> Option<R> {
        let mut session = self.sessions.get_mut(&id)?;
        Some(f(&mut session.editor))
    }

    pub fn logout(&self, id: Uuid) {
        if self.sessions.remove(&id).is_some() {
            info!(%id, "session closed");
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Session id carried by the request cookie, if well formed.
pub fn session_id(jar: &CookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
}

pub fn session_cookie(id: Uuid, ttl: Duration) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(ttl.as_secs() as i64))
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

/// Reject requests without a live session: API paths get 401 JSON, pages
/// are redirected to the login form.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    match session_id(&jar).and_then(|id| state.auth.session(id)) {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None if req.uri().path().starts_with("/api/") => AppError::Unauthorized.into_response(),
        None => Redirect::to("/login").into_response(),
    }
}
