//! Authentication handlers (login, refresh, logout, me)

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use keygate_auth_core::{hash_password, verify_password, AuthError};
use keygate_axum::CurrentPrincipal;
use keygate_types::{Principal, TokenKind};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// OAuth2 password form
#[derive(Deserialize)]
pub struct LoginForm {
    /// Email address
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_superuser: bool,
}

impl From<&Principal> for MeResponse {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id.to_string(),
            email: principal.email.clone(),
            is_active: principal.is_active,
            is_verified: principal.is_verified,
            is_superuser: principal.is_superuser,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Exchange email and password for an access token and a refresh cookie
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> ApiResult<Response> {
    let principal = authenticate(&state, form).await?;

    if !principal.is_active {
        return Err(ApiError::LoginBadCredentials);
    }
    if state.config.require_verification && !principal.is_verified {
        return Err(ApiError::LoginUserNotVerified);
    }

    let pair = state.strategy.login(&principal, false)?;
    tracing::info!(principal_id = %principal.id, "Principal logged in");

    Ok(state
        .transport
        .login_response(&pair.access, pair.refresh.as_ref()))
}

/// Issue a new access token for the principal behind a refresh token
pub async fn refresh(
    State(state): State<AppState>,
    auth: CurrentPrincipal,
) -> ApiResult<Response> {
    let access = state.strategy.refresh(&auth.principal)?;
    tracing::debug!(principal_id = %auth.principal.id, "Access token refreshed");

    Ok(state.transport.login_response(&access, None))
}

/// Revoke the access token and, when present and valid, the refresh cookie
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    auth: CurrentPrincipal,
) -> ApiResult<Response> {
    let refresh = match state.transport.read_refresh(&headers) {
        Some(token) => {
            state
                .strategy
                .read_token(&token, TokenKind::RefreshToken)
                .await?
        }
        None => None,
    };

    state
        .strategy
        .logout(auth.principal.id, &auth, refresh.as_ref())
        .await?;

    match state.transport.logout_response() {
        Ok(response) => Ok(response),
        Err(AuthError::TransportUnsupported) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(err) => Err(err.into()),
    }
}

/// The authenticated principal's public fields
pub async fn me(auth: CurrentPrincipal) -> Json<MeResponse> {
    Json(MeResponse::from(&auth.principal))
}

// ============================================================================
// Helpers
// ============================================================================

/// Check the password against the stored hash.
///
/// Unknown emails still pay for one hash so response times do not reveal
/// which accounts exist.
async fn authenticate(state: &AppState, form: LoginForm) -> ApiResult<Principal> {
    let row = state.principals().find_by_email(&form.username).await?;

    let Some(row) = row else {
        let password = form.password;
        run_blocking(move || {
            let _ = hash_password(&password);
        })
        .await?;
        return Err(ApiError::LoginBadCredentials);
    };

    let password = form.password;
    let hash = row.hashed_password.clone();
    let valid = run_blocking(move || verify_password(&password, &hash)).await?;
    if !valid {
        tracing::debug!(principal_id = %row.id, "Login with wrong password");
        return Err(ApiError::LoginBadCredentials);
    }

    Ok(row.into())
}

/// Password hashing is CPU-bound; keep it off the async workers
async fn run_blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("password task failed: {}", e)))
}
