//! Sign-in flows and access tokens.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use policyai_common::config::AuthConfig;
use policyai_common::{AppError, AppResult};
use policyai_db::entities::user::{self, AuthProvider};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::email::EmailService;
use super::identity::{IdentityService, VerifiedIdentity};
use super::otp::{OtpStore, generate_code};

const GOOGLE_TOKENINFO_ENDPOINT: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Access token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: String,
    pub email: Option<String>,
    /// Expiry as a unix timestamp.
    pub exp: usize,
}

impl Claims {
    /// The user ID carried in `sub`.
    pub fn user_id(&self) -> AppResult<i32> {
        self.sub
            .parse()
            .map_err(|_| AppError::Unauthorized("Invalid access token subject".to_string()))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendOtpInput {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyOtpInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 16))]
    pub otp: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GoogleSignInInput {
    #[validate(length(min = 1))]
    pub google_token: String,
    #[validate(length(max = 100))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(url)]
    pub avatar_url: Option<String>,
}

/// Result of requesting a login code.
#[derive(Debug, Clone, Serialize)]
pub struct OtpDispatch {
    pub message: String,
    pub expires_in_secs: u64,
    /// Only present when codes are exposed for development.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

/// Public fields of a signed-in user.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i32,
    pub email: Option<String>,
    pub name: String,
    pub avatar_url: Option<String>,
    pub auth_provider: AuthProvider,
}

impl From<&user::Model> for UserSummary {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
            auth_provider: user.auth_provider,
        }
    }
}

/// A successful sign-in.
#[derive(Debug, Clone, Serialize)]
pub struct AuthToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: UserSummary,
}

/// Identity claims extracted from a Google ID token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoogleProfile {
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Checks Google ID tokens.
#[async_trait]
pub trait GoogleVerifier: Send + Sync {
    /// Verify `id_token` and return the profile it asserts.
    async fn verify(&self, id_token: &str) -> AppResult<GoogleProfile>;
}

/// Verifies ID tokens with Google's tokeninfo endpoint.
pub struct GoogleTokenInfoVerifier {
    client_id: String,
    endpoint: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

impl GoogleTokenInfoVerifier {
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(client_id: String, timeout: Duration) -> Self {
        Self {
            client_id,
            endpoint: GOOGLE_TOKENINFO_ENDPOINT.to_string(),
            http_client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

#[async_trait]
impl GoogleVerifier for GoogleTokenInfoVerifier {
    async fn verify(&self, id_token: &str) -> AppResult<GoogleProfile> {
        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Google tokeninfo failed: {e}")))?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "Google rejected ID token");
            return Err(AppError::Unauthorized("Invalid Google token".to_string()));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid tokeninfo response: {e}")))?;

        check_token_info(info, &self.client_id)
    }
}

fn check_token_info(info: TokenInfo, client_id: &str) -> AppResult<GoogleProfile> {
    if info.aud != client_id {
        return Err(AppError::Unauthorized(
            "Google token was issued for another client".to_string(),
        ));
    }
    if info.email_verified.as_deref() == Some("false") {
        return Err(AppError::Unauthorized(
            "Google account email is not verified".to_string(),
        ));
    }
    let email = info
        .email
        .ok_or_else(|| AppError::Unauthorized("Google token carries no email".to_string()))?;

    Ok(GoogleProfile {
        email,
        name: info.name,
        picture: info.picture,
    })
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    identity: IdentityService,
    otp_store: Arc<dyn OtpStore>,
    email: EmailService,
    google: Option<Arc<dyn GoogleVerifier>>,
    config: AuthConfig,
}

impl AuthService {
    /// Create a new auth service.
    ///
    /// Without a Google verifier, sign-in trusts the submitted profile only
    /// when `allow_unverified_google` is set.
    #[must_use]
    pub fn new(
        identity: IdentityService,
        otp_store: Arc<dyn OtpStore>,
        email: EmailService,
        google: Option<Arc<dyn GoogleVerifier>>,
        config: AuthConfig,
    ) -> Self {
        Self {
            identity,
            otp_store,
            email,
            google,
            config,
        }
    }

    fn otp_ttl(&self) -> Duration {
        Duration::from_secs(self.config.otp_ttl_secs)
    }

    /// Issue an access token for a user.
    pub fn issue_token(&self, user: &user::Model) -> AppResult<String> {
        let expires_at = Utc::now() + chrono::Duration::minutes(self.config.token_ttl_minutes);
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            exp: usize::try_from(expires_at.timestamp()).unwrap_or(0),
        };

        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Decode and validate an access token.
    pub fn decode_token(&self, token: &str) -> AppResult<Claims> {
        let data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?;
        Ok(data.claims)
    }

    /// Load the user an access token was issued to.
    pub async fn authenticate(&self, token: &str) -> AppResult<user::Model> {
        let claims = self.decode_token(token)?;
        match self.identity.get_by_id(claims.user_id()?).await {
            Err(AppError::UserNotFound(_)) => Err(AppError::Unauthorized(
                "Access token user no longer exists".to_string(),
            )),
            other => other,
        }
    }

    /// Generate, store and deliver a login code.
    pub async fn send_otp(&self, input: SendOtpInput) -> AppResult<OtpDispatch> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let email = normalize_email(&input.email);

        let code = generate_code();
        let ttl = self.otp_ttl();
        self.otp_store.store(&email, &code, ttl).await?;

        if let Err(e) = self.email.send_otp(&email, &code, ttl).await {
            self.otp_store.expire(&email).await?;
            return Err(e);
        }

        Ok(OtpDispatch {
            message: format!("OTP sent to {email}"),
            expires_in_secs: ttl.as_secs(),
            otp: self.config.expose_otp.then_some(code),
        })
    }

    /// Verify a login code and sign the user in.
    pub async fn verify_otp(&self, input: VerifyOtpInput) -> AppResult<AuthToken> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let email = normalize_email(&input.email);

        if !self.otp_store.verify(&email, input.otp.trim()).await? {
            return Err(AppError::Unauthorized("Invalid or expired OTP".to_string()));
        }

        let user = self
            .identity
            .resolve_verified_email(&VerifiedIdentity {
                email,
                name: None,
                avatar_url: None,
                provider: AuthProvider::Email,
            })
            .await?;

        tracing::info!(user_id = user.id, "Signed in with email OTP");
        self.token_response(&user)
    }

    /// Sign in with a Google ID token.
    pub async fn google_signin(&self, input: GoogleSignInInput) -> AppResult<AuthToken> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let profile = match &self.google {
            Some(verifier) => verifier.verify(&input.google_token).await?,
            None if self.config.allow_unverified_google => {
                let email = input.email.clone().ok_or_else(|| {
                    AppError::BadRequest("Email required".to_string())
                })?;
                tracing::warn!(email = %email, "Trusting unverified Google sign-in");
                GoogleProfile {
                    email,
                    name: None,
                    picture: None,
                }
            }
            None => {
                return Err(AppError::Unauthorized(
                    "Google sign-in is not configured".to_string(),
                ));
            }
        };

        let user = self
            .identity
            .resolve_verified_email(&VerifiedIdentity {
                email: normalize_email(&profile.email),
                name: input.name.or(profile.name),
                avatar_url: input.avatar_url.or(profile.picture),
                provider: AuthProvider::Google,
            })
            .await?;

        tracing::info!(user_id = user.id, "Signed in with Google");
        self.token_response(&user)
    }

    fn token_response(&self, user: &user::Model) -> AppResult<AuthToken> {
        Ok(AuthToken {
            access_token: self.issue_token(user)?,
            token_type: "bearer",
            user: UserSummary::from(user),
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::otp::MemoryOtpStore;
    use policyai_common::config::EmailConfig;
    use policyai_db::repositories::UserRepository;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};

    fn auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_minutes: 60,
            otp_ttl_secs: 300,
            google_client_id: None,
            allow_unverified_google: false,
            expose_otp: true,
        }
    }

    fn service_with(
        db: DatabaseConnection,
        store: Arc<dyn OtpStore>,
        google: Option<Arc<dyn GoogleVerifier>>,
        config: AuthConfig,
    ) -> AuthService {
        AuthService::new(
            IdentityService::new(UserRepository::new(Arc::new(db))),
            store,
            EmailService::new(&EmailConfig::default()),
            google,
            config,
        )
    }

    fn email_user(id: i32, email: &str, provider: AuthProvider) -> user::Model {
        user::Model {
            id,
            device_id: None,
            email: Some(email.to_string()),
            name: "asha".to_string(),
            avatar_url: None,
            auth_provider: provider,
            is_verified: true,
            push_token: None,
            created_at: Utc::now().into(),
            last_login_at: Some(Utc::now().into()),
            updated_at: None,
        }
    }

    struct StaticGoogle(GoogleProfile);

    #[async_trait]
    impl GoogleVerifier for StaticGoogle {
        async fn verify(&self, _id_token: &str) -> AppResult<GoogleProfile> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_token_round_trip_carries_user_id() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let service = service_with(db, Arc::new(MemoryOtpStore::new()), None, auth_config());
        let user = email_user(42, "asha@example.com", AuthProvider::Email);

        let token = service.issue_token(&user).unwrap();
        let claims = service.decode_token(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.email.as_deref(), Some("asha@example.com"));
    }

    #[test]
    fn test_token_signed_with_other_secret_is_unauthorized() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let service = service_with(db, Arc::new(MemoryOtpStore::new()), None, auth_config());
        let mut other_config = auth_config();
        other_config.jwt_secret = "another-secret".to_string();
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let other = service_with(db, Arc::new(MemoryOtpStore::new()), None, other_config);

        let token = other
            .issue_token(&email_user(1, "a@example.com", AuthProvider::Email))
            .unwrap();

        assert!(matches!(
            service.decode_token(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_send_then_verify_otp_signs_in() {
        let store: Arc<dyn OtpStore> = Arc::new(MemoryOtpStore::new());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([[email_user(3, "asha@example.com", AuthProvider::Email)]])
            .into_connection();
        let service = service_with(db, store, None, auth_config());

        let dispatch = service
            .send_otp(SendOtpInput {
                email: "Asha@Example.com".to_string(),
            })
            .await
            .unwrap();
        let code = dispatch.otp.unwrap();
        assert_eq!(code.len(), 6);
        assert_eq!(dispatch.expires_in_secs, 300);

        let token = service
            .verify_otp(VerifyOtpInput {
                email: "asha@example.com".to_string(),
                otp: code,
            })
            .await
            .unwrap();

        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.user.id, 3);
    }

    #[tokio::test]
    async fn test_otp_is_hidden_unless_exposed() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let mut config = auth_config();
        config.expose_otp = false;
        let service = service_with(db, Arc::new(MemoryOtpStore::new()), None, config);

        let dispatch = service
            .send_otp(SendOtpInput {
                email: "asha@example.com".to_string(),
            })
            .await
            .unwrap();

        assert!(dispatch.otp.is_none());
    }

    #[tokio::test]
    async fn test_wrong_otp_is_unauthorized() {
        let store = Arc::new(MemoryOtpStore::new());
        store
            .store("asha@example.com", "123456", Duration::from_secs(60))
            .await
            .unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let service = service_with(db, store, None, auth_config());

        let result = service
            .verify_otp(VerifyOtpInput {
                email: "asha@example.com".to_string(),
                otp: "654321".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_google_without_verifier_is_unauthorized_by_default() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let service = service_with(db, Arc::new(MemoryOtpStore::new()), None, auth_config());

        let result = service
            .google_signin(GoogleSignInInput {
                google_token: "token".to_string(),
                name: None,
                email: Some("asha@example.com".to_string()),
                avatar_url: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_google_unverified_mode_trusts_email() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([[email_user(8, "asha@example.com", AuthProvider::Google)]])
            .into_connection();
        let mut config = auth_config();
        config.allow_unverified_google = true;
        let service = service_with(db, Arc::new(MemoryOtpStore::new()), None, config);

        let token = service
            .google_signin(GoogleSignInInput {
                google_token: "token".to_string(),
                name: Some("Asha".to_string()),
                email: Some("asha@example.com".to_string()),
                avatar_url: None,
            })
            .await
            .unwrap();

        assert_eq!(token.user.auth_provider, AuthProvider::Google);
    }

    #[tokio::test]
    async fn test_google_verifier_profile_is_used() {
        let verifier: Arc<dyn GoogleVerifier> = Arc::new(StaticGoogle(GoogleProfile {
            email: "ravi@example.com".to_string(),
            name: Some("Ravi".to_string()),
            picture: None,
        }));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([[email_user(12, "ravi@example.com", AuthProvider::Google)]])
            .into_connection();
        let service = service_with(
            db,
            Arc::new(MemoryOtpStore::new()),
            Some(verifier),
            auth_config(),
        );

        let token = service
            .google_signin(GoogleSignInInput {
                google_token: "id-token".to_string(),
                name: None,
                email: None,
                avatar_url: None,
            })
            .await
            .unwrap();

        assert_eq!(token.user.id, 12);
    }

    #[test]
    fn test_token_info_audience_mismatch() {
        let info = TokenInfo {
            aud: "other-client".to_string(),
            email: Some("a@example.com".to_string()),
            email_verified: Some("true".to_string()),
            name: None,
            picture: None,
        };
        assert!(matches!(
            check_token_info(info, "my-client"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
