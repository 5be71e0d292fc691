//! Extractors that report bad input as [`AppError::BadRequest`].

use crate::error::AppError;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

/// JSON body extractor with `{ "error": .. }` rejections.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|err| match err {
                JsonRejection::MissingJsonContentType(_) => AppError::BadRequest(
                    "Missing Content-Type: application/json header".to_string(),
                ),
                _ => AppError::BadRequest(format!("Invalid JSON payload: {}", err.body_text())),
            })?;
        Ok(Self(payload))
    }
}

/// Query string extractor with `{ "error": .. }` rejections.
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|err: QueryRejection| {
                AppError::BadRequest(format!("Invalid query string: {}", err.body_text()))
            })?;
        Ok(Self(query))
    }
}
