//! Identity extraction. Authentication itself happens upstream (a gateway
//! or sidecar terminates credentials); this service trusts the identity
//! headers it is handed and only performs ownership checks.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::response::ApiError;
use crate::share::Principal;

const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
const PRINCIPAL_ADMIN_HEADER: &str = "x-principal-admin";

#[axum::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, ApiError> {
        let id = parts
            .headers
            .get(PRINCIPAL_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Missing caller identity"))?
            .to_string();

        let is_admin = parts
            .headers
            .get(PRINCIPAL_ADMIN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Principal { id, is_admin })
    }
}
