//! Query-string extractor with automatic validation using the validator crate.

use crate::errors::AppError;
use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// Query extractor with automatic validation.
///
/// Malformed query strings and failed validation both answer `400` with the
/// standard `{error, message}` body instead of axum's plain-text rejection.
///
/// # Example
/// ```ignore
/// #[derive(Deserialize, Validate)]
/// struct Paging {
///     #[validate(range(min = 1, max = 1000))]
///     limit: Option<i64>,
/// }
///
/// async fn list(ValidatedQuery(paging): ValidatedQuery<Paging>) -> String {
///     format!("{:?}", paging.limit)
/// }
/// ```
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(data) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

        data.validate()?;

        Ok(ValidatedQuery(data))
    }
}
