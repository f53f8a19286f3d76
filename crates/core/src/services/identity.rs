//! Identity resolution: client keys to durable users.

use chrono::Utc;
use policyai_common::{AppError, AppResult};
use policyai_db::entities::user::{self, AuthProvider};
use policyai_db::repositories::UserRepository;
use sea_orm::Set;

/// Minimum accepted device ID length.
pub const MIN_DEVICE_ID_LEN: usize = 10;

/// Characters of the device ID used in the default display name.
const DEVICE_NAME_PREFIX_LEN: usize = 8;

/// Who is making a request.
#[derive(Debug, Clone)]
pub enum Identity {
    /// Holder of a valid access token.
    User(user::Model),
    /// Anonymous client identified by its device ID.
    Device(String),
}

/// An email address proven by OTP or Google sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub provider: AuthProvider,
}

/// Reject device IDs too short to be unique.
pub fn validate_device_id(device_id: &str) -> AppResult<()> {
    if device_id.chars().count() < MIN_DEVICE_ID_LEN {
        return Err(AppError::Validation(format!(
            "device_id must be at least {MIN_DEVICE_ID_LEN} characters"
        )));
    }
    Ok(())
}

/// Default display name for a device user.
#[must_use]
pub fn default_device_name(device_id: &str) -> String {
    let prefix: String = device_id.chars().take(DEVICE_NAME_PREFIX_LEN).collect();
    format!("User_{prefix}")
}

/// Maps client keys to users, creating them on first sight.
#[derive(Clone)]
pub struct IdentityService {
    user_repo: UserRepository,
}

impl IdentityService {
    /// Create a new identity service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self { user_repo }
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, user_id: i32) -> AppResult<user::Model> {
        self.user_repo.get_by_id(user_id).await
    }

    /// Resolve an identity, creating a device user if needed.
    pub async fn resolve(&self, identity: &Identity) -> AppResult<user::Model> {
        match identity {
            Identity::User(user) => Ok(user.clone()),
            Identity::Device(device_id) => self.resolve_device(device_id).await,
        }
    }

    /// Resolve an identity without creating anything.
    pub async fn find(&self, identity: &Identity) -> AppResult<Option<user::Model>> {
        match identity {
            Identity::User(user) => Ok(Some(user.clone())),
            Identity::Device(device_id) => self.find_device(device_id).await,
        }
    }

    /// Find the user for a device ID.
    pub async fn find_device(&self, device_id: &str) -> AppResult<Option<user::Model>> {
        validate_device_id(device_id)?;
        self.user_repo.find_by_device_id(device_id).await
    }

    /// Find or create the user for a device ID.
    ///
    /// Concurrent first calls race on the unique index; the loser re-reads
    /// the winner's row.
    pub async fn resolve_device(&self, device_id: &str) -> AppResult<user::Model> {
        if let Some(user) = self.find_device(device_id).await? {
            return Ok(user);
        }

        let now = Utc::now();
        let model = user::ActiveModel {
            device_id: Set(Some(device_id.to_string())),
            email: Set(None),
            name: Set(default_device_name(device_id)),
            avatar_url: Set(None),
            auth_provider: Set(AuthProvider::Device),
            is_verified: Set(false),
            push_token: Set(None),
            created_at: Set(now.into()),
            last_login_at: Set(Some(now.into())),
            updated_at: Set(None),
            ..Default::default()
        };

        match self.user_repo.create(model).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, "Created device user");
                Ok(user)
            }
            Err(AppError::Conflict(_)) => self
                .user_repo
                .find_by_device_id(device_id)
                .await?
                .ok_or_else(|| {
                    AppError::Internal(format!("Device user vanished after conflict: {device_id}"))
                }),
            Err(e) => Err(e),
        }
    }

    /// Find or create the user for a verified email and record the login.
    pub async fn resolve_verified_email(
        &self,
        identity: &VerifiedIdentity,
    ) -> AppResult<user::Model> {
        if let Some(existing) = self.user_repo.find_by_email(&identity.email).await? {
            return self.record_login(existing, identity).await;
        }

        let now = Utc::now();
        let name = identity
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email_local_part(&identity.email));
        let model = user::ActiveModel {
            device_id: Set(None),
            email: Set(Some(identity.email.clone())),
            name: Set(name),
            avatar_url: Set(identity.avatar_url.clone()),
            auth_provider: Set(identity.provider),
            is_verified: Set(true),
            push_token: Set(None),
            created_at: Set(now.into()),
            last_login_at: Set(Some(now.into())),
            updated_at: Set(None),
            ..Default::default()
        };

        match self.user_repo.create(model).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, provider = ?identity.provider, "Created verified user");
                Ok(user)
            }
            Err(AppError::Conflict(_)) => {
                let existing = self
                    .user_repo
                    .find_by_email(&identity.email)
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal("Email user vanished after conflict".to_string())
                    })?;
                self.record_login(existing, identity).await
            }
            Err(e) => Err(e),
        }
    }

    async fn record_login(
        &self,
        existing: user::Model,
        identity: &VerifiedIdentity,
    ) -> AppResult<user::Model> {
        let now = Utc::now();
        let mut model: user::ActiveModel = existing.into();
        model.is_verified = Set(true);
        model.last_login_at = Set(Some(now.into()));
        model.updated_at = Set(Some(now.into()));
        if let Some(name) = identity.name.as_ref().filter(|n| !n.trim().is_empty()) {
            model.name = Set(name.clone());
        }
        if let Some(avatar_url) = &identity.avatar_url {
            model.avatar_url = Set(Some(avatar_url.clone()));
        }
        self.user_repo.update(model).await
    }
}

fn email_local_part(email: &str) -> String {
    email
        .split('@')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(email)
        .to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn device_user(id: i32, device_id: &str) -> user::Model {
        user::Model {
            id,
            device_id: Some(device_id.to_string()),
            email: None,
            name: default_device_name(device_id),
            avatar_url: None,
            auth_provider: AuthProvider::Device,
            is_verified: false,
            push_token: None,
            created_at: Utc::now().into(),
            last_login_at: None,
            updated_at: None,
        }
    }

    fn email_user(id: i32, email: &str) -> user::Model {
        user::Model {
            id,
            device_id: None,
            email: Some(email.to_string()),
            name: "alice".to_string(),
            avatar_url: None,
            auth_provider: AuthProvider::Email,
            is_verified: true,
            push_token: None,
            created_at: Utc::now().into(),
            last_login_at: Some(Utc::now().into()),
            updated_at: None,
        }
    }

    #[test]
    fn test_default_device_name_uses_first_eight_chars() {
        assert_eq!(default_device_name("abcdefghijkl"), "User_abcdefgh");
    }

    #[test]
    fn test_short_device_id_is_rejected() {
        assert!(matches!(
            validate_device_id("short"),
            Err(AppError::Validation(_))
        ));
        assert!(validate_device_id("0123456789").is_ok());
    }

    #[test]
    fn test_email_local_part() {
        assert_eq!(email_local_part("alice@example.com"), "alice");
        assert_eq!(email_local_part("@example.com"), "@example.com");
    }

    #[tokio::test]
    async fn test_resolve_device_returns_existing() {
        let existing = device_user(3, "device-1234567890");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing.clone()]])
                .into_connection(),
        );

        let service = IdentityService::new(UserRepository::new(db));
        let user = service.resolve_device("device-1234567890").await.unwrap();

        assert_eq!(user, existing);
    }

    #[tokio::test]
    async fn test_resolve_device_creates_on_first_sight() {
        let created = device_user(4, "device-abcdefghij");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([[created.clone()]])
                .into_connection(),
        );

        let service = IdentityService::new(UserRepository::new(db));
        let user = service.resolve_device("device-abcdefghij").await.unwrap();

        assert_eq!(user.id, 4);
        assert_eq!(user.name, "User_device-a");
    }

    #[tokio::test]
    async fn test_find_device_does_not_create() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let service = IdentityService::new(UserRepository::new(db));
        let user = service.find_device("device-unknown-01").await.unwrap();

        assert!(user.is_none());
    }

    #[tokio::test]
    async fn test_resolve_device_validates_before_querying() {
        // No results queued: a query would fail with a database error.
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = IdentityService::new(UserRepository::new(db));
        let result = service.resolve_device("tiny").await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_resolve_verified_email_updates_existing() {
        let existing = email_user(9, "alice@example.com");
        let mut updated = existing.clone();
        updated.name = "Alice".to_string();

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .append_query_results([[updated.clone()]])
                .into_connection(),
        );

        let service = IdentityService::new(UserRepository::new(db));
        let user = service
            .resolve_verified_email(&VerifiedIdentity {
                email: "alice@example.com".to_string(),
                name: Some("Alice".to_string()),
                avatar_url: None,
                provider: AuthProvider::Google,
            })
            .await
            .unwrap();

        assert_eq!(user.id, 9);
        assert_eq!(user.name, "Alice");
    }

    #[tokio::test]
    async fn test_resolve_verified_email_creates_user() {
        let created = email_user(10, "bob@example.com");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([[created.clone()]])
                .into_connection(),
        );

        let service = IdentityService::new(UserRepository::new(db));
        let user = service
            .resolve_verified_email(&VerifiedIdentity {
                email: "bob@example.com".to_string(),
                name: None,
                avatar_url: None,
                provider: AuthProvider::Email,
            })
            .await
            .unwrap();

        assert_eq!(user.id, 10);
        assert!(user.is_verified);
    }
}
