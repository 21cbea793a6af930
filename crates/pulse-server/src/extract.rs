//! Extractors that turn axum rejections into [`AppError`] envelopes and
//! resolve the calling user.

use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use pulse_core::user::User;
use serde::de::DeserializeOwned;
use std::convert::Infallible;

/// `Json<T>` whose rejections become 400 `{"error", "details"}` bodies.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(AppError::bad_request(rejection.body_text())),
        }
    }
}

pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(AppError::bad_request(rejection.body_text())),
        }
    }
}

pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => Err(AppError::bad_request(rejection.body_text())),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Verified external subject id, if the request carries one.
pub struct Subject(pub Option<String>);

impl FromRequestParts<AppState> for Subject {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Subject(state.identity.subject(&parts.headers)))
    }
}

/// The resolved calling user. 401 without identity, 404 when the subject
/// has never signed in.
pub struct Caller(pub User);

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let subject = state.identity.subject(&parts.headers);
        let store = state.store.clone();
        let resolver = state.resolver.clone();
        let user = tokio::task::spawn_blocking(move || resolver.resolve(store.as_ref(), subject.as_deref()))
            .await
            .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
        Ok(Caller(user))
    }
}
