use super::extract::ApiJson;
use super::{validate_address, AppState};
use crate::error::AppError;
use crate::models::{RequestPayload, VerifiedPayload};
use axum::{extract::State, Json};

/// POST /verify: Run the provider named by `type` against `address`
pub async fn verify(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RequestPayload>,
) -> Result<Json<VerifiedPayload>, AppError> {
    validate_address(&payload.address)?;
    Ok(Json(state.providers.verify(&payload).await?))
}
