//! Caller identity.
//!
//! Authentication happens upstream. The server only asks an
//! [`IdentityProvider`] which user a request belongs to.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use floorplan_core::UserId;

/// Resolves the user a request acts for.
pub trait IdentityProvider: Send + Sync {
    fn identify(&self, headers: &HeaderMap) -> Option<UserId>;
}

/// Trusts a header set by an authenticating gateway.
#[derive(Debug, Clone)]
pub struct HeaderIdentity {
    header: String,
}

impl HeaderIdentity {
    pub fn new(header: impl Into<String>) -> Self {
        Self { header: header.into() }
    }
}

impl IdentityProvider for HeaderIdentity {
    fn identify(&self, headers: &HeaderMap) -> Option<UserId> {
        let value = headers.get(self.header.as_str())?.to_str().ok()?.trim();
        (!value.is_empty()).then(|| UserId::from(value))
    }
}

/// The authenticated caller. Rejects with 401 when there is none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        state
            .identity
            .identify(&parts.headers)
            .map(CurrentUser)
            .ok_or_else(|| ApiError::Unauthorized("No identity, authorization denied".to_string()))
    }
}
