//! PolicyAI server entry point.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    middleware,
};
use fred::interfaces::ClientLike;
use policyai_api::{AppState, auth_middleware, router as api_router};
use policyai_common::{
    Config,
    config::{RedisConfig, ServerConfig},
};
use policyai_core::{
    AiService, AuthService, CommentService, EmailService, GoogleTokenInfoVerifier,
    GoogleVerifier, IdentityService, MemoryOtpStore, OtpStore, PolicyService, PushService,
    RedisOtpStore, ResultsService, UserService, VoteService, seed_sample_policies,
};
use policyai_db::repositories::{
    CommentRepository, PolicyRepository, UserRepository, VoteRepository,
};
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MAX_BODY_BYTES: usize = 64 * 1024;
const GOOGLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing(config: &Config) {
    let json = config.server.log_format.eq_ignore_ascii_case("json");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "policyai=debug,tower_http=debug".into()),
        )
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .init();
}

async fn otp_store(redis: Option<&RedisConfig>) -> anyhow::Result<Arc<dyn OtpStore>> {
    let Some(redis) = redis else {
        tracing::warn!("Redis not configured, OTP codes are kept in memory");
        return Ok(Arc::new(MemoryOtpStore::new()));
    };

    let fred_config = fred::types::config::Config::from_url(&redis.url)?;
    let client = fred::clients::Client::new(fred_config, None, None, None);
    client.connect();
    client.wait_for_connect().await?;
    info!("Connected to Redis for OTP storage");

    Ok(Arc::new(RedisOtpStore::new(
        Arc::new(client),
        redis.prefix.clone(),
    )))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// The API router with authentication and the HTTP middleware stack.
fn app(state: AppState, server: &ServerConfig) -> Router {
    api_router()
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(server.request_timeout_secs),
        ))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&server.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    init_tracing(&config);

    info!("Starting PolicyAI server...");

    let db = policyai_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    policyai_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);

    // Initialize repositories
    let user_repo = UserRepository::new(Arc::clone(&db));
    let policy_repo = PolicyRepository::new(Arc::clone(&db));
    let vote_repo = VoteRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));

    if config.database.seed {
        seed_sample_policies(&policy_repo).await?;
    }

    // Collaborators
    let ai_service = AiService::from_config(&config.ai);
    let push_service = PushService::from_config(&config.push, user_repo.clone());
    let email_service = EmailService::new(&config.email);
    let google_verifier = config.auth.google_client_id.clone().map(|client_id| {
        Arc::new(GoogleTokenInfoVerifier::new(client_id, GOOGLE_TIMEOUT)) as Arc<dyn GoogleVerifier>
    });
    let otp_store = otp_store(config.redis.as_ref()).await?;

    info!(
        ai = ai_service.is_enabled(),
        push = push_service.is_enabled(),
        email = email_service.is_enabled(),
        google = google_verifier.is_some(),
        "Collaborators configured"
    );

    // Initialize services
    let identity_service = IdentityService::new(user_repo.clone());
    let policy_service = PolicyService::new(policy_repo.clone(), ai_service, push_service);
    let vote_service = VoteService::new(
        vote_repo.clone(),
        policy_repo.clone(),
        identity_service.clone(),
    );
    let results_service = ResultsService::new(policy_repo.clone(), vote_repo.clone());
    let comment_service =
        CommentService::new(comment_repo, policy_repo, identity_service.clone());
    let user_service = UserService::new(user_repo, vote_repo, identity_service.clone());
    let auth_service = AuthService::new(
        identity_service,
        otp_store,
        email_service,
        google_verifier,
        config.auth.clone(),
    );

    let state = AppState {
        policy_service,
        vote_service,
        results_service,
        comment_service,
        user_service,
        auth_service,
    };

    let app = app(state, &config.server);

    // Start server with graceful shutdown
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, header};
    use policyai_common::config::{AuthConfig, EmailConfig};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use tower::ServiceExt;

    fn server_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            log_format: "pretty".to_string(),
            request_timeout_secs: 30,
            cors_allowed_origins: vec!["https://policyai.example".to_string()],
        }
    }

    fn test_app() -> Router {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let user_repo = UserRepository::new(Arc::clone(&db));
        let policy_repo = PolicyRepository::new(Arc::clone(&db));
        let vote_repo = VoteRepository::new(Arc::clone(&db));
        let comment_repo = CommentRepository::new(Arc::clone(&db));
        let identity = IdentityService::new(user_repo.clone());

        let state = AppState {
            policy_service: PolicyService::new(
                policy_repo.clone(),
                AiService::disabled(),
                PushService::new(None, user_repo.clone()),
            ),
            vote_service: VoteService::new(vote_repo.clone(), policy_repo.clone(), identity.clone()),
            results_service: ResultsService::new(policy_repo.clone(), vote_repo.clone()),
            comment_service: CommentService::new(comment_repo, policy_repo, identity.clone()),
            user_service: UserService::new(user_repo, vote_repo, identity.clone()),
            auth_service: AuthService::new(
                identity,
                Arc::new(MemoryOtpStore::new()),
                EmailService::new(&EmailConfig::default()),
                None,
                AuthConfig {
                    jwt_secret: "server-test-secret".to_string(),
                    token_ttl_minutes: 60,
                    otp_ttl_secs: 300,
                    google_client_id: None,
                    allow_unverified_google: false,
                    expose_otp: false,
                },
            ),
        };

        app(state, &server_config())
    }

    #[tokio::test]
    async fn test_layered_app_serves_health() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ACCEPT_ENCODING, "gzip")
                    .header(header::ORIGIN, "https://policyai.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://policyai.example"
        );
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let text = "x".repeat(MAX_BODY_BYTES + 1);
        let body = format!(r#"{{"title":"t","description":"{text}","category":"c"}}"#);

        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/policies")
                    .method("POST")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
