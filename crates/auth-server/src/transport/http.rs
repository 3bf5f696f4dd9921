//! HTTP transport for the auth service

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use auth_core::{AuthError, AuthService, ErrorKind, SecretString};

/// Errors returned to HTTP clients. Messages are fixed; details go to the log.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid credentials")]
    Unauthorized,

    #[error("username and password required")]
    MissingFields,

    #[error("User already exists")]
    Conflict,

    #[error("Forbidden")]
    Forbidden,

    #[error("Failed to save user")]
    SaveFailed,

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::MissingFields => StatusCode::BAD_REQUEST,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::SaveFailed | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err.kind() {
            ErrorKind::Unauthorized => ApiError::Unauthorized,
            ErrorKind::Conflict => ApiError::Conflict,
            ErrorKind::Forbidden => ApiError::Forbidden,
            _ => {
                error!("Request failed: {}", err);
                ApiError::Internal
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: "error",
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct CredentialsRequest {
    username: Option<String>,
    password: Option<SecretString>,
}

impl CredentialsRequest {
    /// Both fields, when present and non-empty
    fn fields(&self) -> Option<(&str, &str)> {
        let username = self.username.as_deref().filter(|u| !u.is_empty())?;
        let password = self.password.as_ref().map(|p| p.expose()).filter(|p| !p.is_empty())?;
        Some((username, password))
    }
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    status: &'static str,
    access_token: String,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    status: &'static str,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct IdentityResponse {
    username: String,
}

#[derive(Debug, Serialize)]
struct UsersResponse {
    users: Vec<String>,
}

/// Build the service router
pub fn router(service: Arc<AuthService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/me", get(me))
        .route("/users", get(list_users))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(service)
}

/// HTTP transport for the auth service
pub struct HttpTransport {
    service: Arc<AuthService>,
    port: u16,
}

impl HttpTransport {
    pub fn new(service: Arc<AuthService>, port: u16) -> Self {
        Self { service, port }
    }

    /// Serve until the shutdown future resolves
    pub async fn run<F>(&self, shutdown: F) -> std::io::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let app = router(self.service.clone());

        let addr = format!("0.0.0.0:{}", self.port);
        info!("Starting auth HTTP server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    }
}

/// Health check endpoint
async fn health() -> &'static str {
    "OK"
}

async fn login(
    State(service): State<Arc<AuthService>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Ok(Json(request)) = payload else {
        return Err(ApiError::Unauthorized);
    };
    let (username, password) = request.fields().ok_or(ApiError::Unauthorized)?;

    let token = service.login(username, password).await?;
    Ok(Json(LoginResponse {
        status: "success",
        access_token: token.token,
    }))
}

async fn register(
    State(service): State<Arc<AuthService>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let Ok(Json(request)) = payload else {
        return Err(ApiError::MissingFields);
    };
    let (username, password) = request.fields().ok_or(ApiError::MissingFields)?;

    service.register(username, password).await.map_err(|e| match e.kind() {
        ErrorKind::Conflict => ApiError::Conflict,
        _ => {
            error!("Failed to save user {}: {}", username, e);
            ApiError::SaveFailed
        }
    })?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            status: "success",
            message: "User created",
        }),
    ))
}

async fn me(
    State(service): State<Arc<AuthService>>,
    headers: HeaderMap,
) -> Result<Json<IdentityResponse>, ApiError> {
    let username = authenticate(&service, &headers)?;
    Ok(Json(IdentityResponse { username }))
}

async fn list_users(
    State(service): State<Arc<AuthService>>,
    headers: HeaderMap,
) -> Result<Json<UsersResponse>, ApiError> {
    let caller = authenticate(&service, &headers)?;
    let users = service.list_usernames(&caller).await?;
    Ok(Json(UsersResponse { users }))
}

/// Resolve the bearer token in the Authorization header
fn authenticate(service: &AuthService, headers: &HeaderMap) -> Result<String, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    service.identify(token).map_err(|e| {
        debug!("Rejected token: {}", e);
        ApiError::Unauthorized
    })
}
