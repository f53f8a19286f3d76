//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use policyai_common::AppError;
use policyai_core::Identity;
use policyai_db::entities::user;

/// Authenticated user extractor.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by auth middleware
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthorized("Access token required".to_string()))
    }
}

/// Optional authenticated user extractor.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<user::Model>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<user::Model>().cloned()))
    }
}

impl MaybeAuthUser {
    /// Pick the requester: the token user wins over a device ID.
    pub fn identity(self, device_id: Option<String>) -> Result<Identity, AppError> {
        self.optional_identity(device_id).ok_or_else(|| {
            AppError::BadRequest("device_id or access token required".to_string())
        })
    }

    /// Like [`Self::identity`], but an anonymous caller is allowed.
    #[must_use]
    pub fn optional_identity(self, device_id: Option<String>) -> Option<Identity> {
        match (self.0, device_id) {
            (Some(user), _) => Some(Identity::User(user)),
            (None, Some(device_id)) => Some(Identity::Device(device_id)),
            (None, None) => None,
        }
    }
}
