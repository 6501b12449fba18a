use axum::{
    Json, Router,
    extract::{Extension, State},
    routing::{delete, get},
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use crate::db::services::{item_service, list_service, user_service};
use crate::web::models::AuthenticatedUser;
use crate::web::{AppError, AppState};

pub fn create_user_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/profile",
            get(get_profile_handler).put(update_profile_handler),
        )
        .route("/account", delete(delete_account_handler))
        .route("/export", get(export_data_handler))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    name: Option<String>,
    email: Option<String>,
    avatar: Option<String>,
}

#[derive(Deserialize)]
pub struct DeleteAccountRequest {
    password: String,
}

async fn get_profile_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = user_service::find_by_id(&app_state.db, auth_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let stats = user_service::get_stats(&app_state.db, auth_user.id).await?;

    Ok(Json(serde_json::json!({ "user": user, "stats": stats })))
}

async fn update_profile_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Some(name) = &payload.name
        && name.trim().chars().count() < 2
    {
        return Err(AppError::InvalidInput(
            "Name must be at least 2 characters".to_string(),
        ));
    }
    if let Some(email) = &payload.email
        && !email.contains('@')
    {
        return Err(AppError::InvalidInput("Invalid email".to_string()));
    }

    let user = user_service::update_profile(
        &app_state.db,
        auth_user.id,
        payload.name.as_deref().map(str::trim),
        payload.email.as_deref().map(str::trim),
        payload.avatar.as_deref(),
    )
    .await?;

    Ok(Json(serde_json::json!({
        "message": "Profile updated successfully",
        "user": user,
    })))
}

/// Deletes the account after a password re-check. Owned lists, their items
/// and share rows cascade away with it.
async fn delete_account_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<DeleteAccountRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if payload.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Password is required to delete the account".to_string(),
        ));
    }

    let user = user_service::find_by_email(&app_state.db, &auth_user.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !user_service::validate_password(&user, &payload.password)? {
        return Err(AppError::InvalidCredentials);
    }

    user_service::delete_user(&app_state.db, auth_user.id).await?;

    Ok(Json(
        serde_json::json!({ "message": "Account deleted successfully" }),
    ))
}

/// Full dump of the caller's lists and items, for client-side backup.
async fn export_data_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let lists = list_service::find_by_user(&app_state.db, auth_user.id).await?;

    let mut exported_lists = Vec::with_capacity(lists.len());
    for list in lists {
        let items = item_service::find_by_list(&app_state.db, list.id, auth_user.id).await?;
        exported_lists.push(serde_json::json!({ "list": list, "items": items }));
    }

    Ok(Json(serde_json::json!({
        "message": "Data exported successfully",
        "data": {
            "user": {
                "id": auth_user.id,
                "name": auth_user.name,
                "email": auth_user.email,
            },
            "lists": exported_lists,
        },
        "exportedAt": Utc::now().to_rfc3339(),
    })))
}
