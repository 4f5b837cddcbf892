//! `Json` and `Path` wrappers whose rejections use the [`ApiError`] envelope
//! instead of axum's plain-text bodies.

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{request::Parts, Extensions},
    Json,
};
use serde::de::DeserializeOwned;

use crate::middleware::RequestId;

use super::ApiError;

fn request_id_of(extensions: &Extensions) -> String {
    extensions
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default()
}

pub(super) struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let req_id = request_id_of(req.extensions());
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::validation(req_id, rejection.body_text())),
        }
    }
}

pub(super) struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::validation(
                request_id_of(&parts.extensions),
                rejection.body_text(),
            )),
        }
    }
}
