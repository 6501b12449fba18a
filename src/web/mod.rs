use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::services::auth_service;
use crate::web::{
    models::{AuthenticatedUser, ChangePasswordRequest, LoginRequest, RegisterRequest},
    routes::{item_routes, list_routes, user_routes},
};

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<ServerConfig>,
}

async fn register_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let login_response =
        auth_service::register_user(&app_state.db, payload, &app_state.config.jwt_secret).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "User created successfully",
            "token": login_response.token,
            "user": login_response.user,
        })),
    ))
}

async fn login_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let login_response =
        auth_service::login_user(&app_state.db, payload, &app_state.config.jwt_secret).await?;

    let auth_cookie = Cookie::build(("token", login_response.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(true)
        .build();

    let mut response = Json(serde_json::json!({
        "message": "Login successful",
        "token": login_response.token,
        "user": login_response.user,
    }))
    .into_response();
    response.headers_mut().insert(
        axum::http::header::SET_COOKIE,
        auth_cookie
            .to_string()
            .parse()
            .map_err(|e| AppError::InternalServerError(format!("Invalid cookie header: {e}")))?,
    );

    Ok(response)
}

async fn verify_handler(
    axum::extract::Extension(auth_user): axum::extract::Extension<AuthenticatedUser>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "valid": true,
        "user": {
            "id": auth_user.id,
            "name": auth_user.name,
            "email": auth_user.email,
        },
    }))
}

async fn change_password_handler(
    axum::extract::Extension(auth_user): axum::extract::Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth_service::change_password(&app_state.db, &auth_user, payload).await?;
    Ok(Json(
        serde_json::json!({ "message": "Password changed successfully" }),
    ))
}

async fn health_check_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub fn create_router(db: DatabaseConnection, config: Arc<ServerConfig>) -> Router {
    let app_state = Arc::new(AppState { db, config });

    let protected = Router::new()
        .route("/auth/verify", get(verify_handler))
        .route("/auth/change-password", put(change_password_handler))
        .nest("/users", user_routes::create_user_router())
        .nest("/lists", list_routes::create_list_router())
        .nest("/items", item_routes::create_item_router())
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            middleware::auth::auth,
        ));

    let api = Router::new()
        .route("/health", get(health_check_handler))
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .merge(protected);

    let cors = tower_http::cors::CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .with_state(app_state)
}
