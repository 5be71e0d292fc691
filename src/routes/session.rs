//! Idena sign-in session endpoints.
//!
//! Guarded no-ops (sign-in already started, signature already recorded,
//! unknown session on start/authenticate) answer `204 No Content`.

use super::extract::{ApiJson, ApiQuery};
use super::{validate_address, validate_opaque, AppState};
use crate::error::AppError;
use crate::idena::{AuthOutcome, StartOutcome};
use crate::models::{
    AuthenticateRequest, AuthenticateResponse, IdentityAge, IdentityStake, IdentityState,
    InitSessionResponse, StartSessionRequest, StartSessionResponse, TokenQuery,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// POST /session/init: Create a sign-in session
pub async fn init_session(
    State(state): State<AppState>,
) -> Result<Json<InitSessionResponse>, AppError> {
    let token = state.signin.init_session().await?;
    Ok(Json(InitSessionResponse { token }))
}

/// POST /session/start: Bind an address and issue the nonce
pub async fn start_session(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<StartSessionRequest>,
) -> Result<Response, AppError> {
    validate_opaque(&req.token, "token")?;
    validate_address(&req.address)?;

    match state.signin.start_session(&req.token, &req.address).await? {
        StartOutcome::Started(nonce) => Ok(Json(StartSessionResponse { nonce }).into_response()),
        outcome => {
            tracing::debug!(?outcome, "Sign-in start ignored");
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}

/// POST /session/authenticate: Submit the signed nonce
pub async fn authenticate(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AuthenticateRequest>,
) -> Result<Response, AppError> {
    validate_opaque(&req.token, "token")?;
    validate_opaque(&req.signature, "signature")?;

    match state.signin.authenticate(&req.token, &req.signature).await? {
        AuthOutcome::Authenticated => Ok(Json(AuthenticateResponse { ok: true }).into_response()),
        AuthOutcome::Rejected => Ok(Json(AuthenticateResponse { ok: false }).into_response()),
        outcome => {
            tracing::debug!(?outcome, "Authentication ignored");
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}

/// GET /session/identity: Identity state of the authenticated address
pub async fn identity_state(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> Result<Json<IdentityState>, AppError> {
    validate_opaque(&query.token, "token")?;
    Ok(Json(state.signin.identity_state(&query.token).await?))
}

/// GET /session/age: Identity age of the authenticated address
pub async fn identity_age(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> Result<Json<IdentityAge>, AppError> {
    validate_opaque(&query.token, "token")?;
    Ok(Json(state.signin.identity_age(&query.token).await?))
}

/// GET /session/stake: Stake of the authenticated address
pub async fn identity_stake(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> Result<Json<IdentityStake>, AppError> {
    validate_opaque(&query.token, "token")?;
    Ok(Json(state.signin.identity_stake(&query.token).await?))
}
