use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, patch},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::enums::Permission;
use crate::db::services::{item_service, permission_service};
use crate::web::models::AuthenticatedUser;
use crate::web::{AppError, AppState};

pub fn create_item_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/list/{list_id}",
            get(get_list_items_handler).post(create_item_handler),
        )
        .route("/list/{list_id}/stats", get(get_list_stats_handler))
        .route(
            "/{id}",
            get(get_item_handler)
                .put(update_item_handler)
                .delete(delete_item_handler),
        )
        .route("/{id}/toggle", patch(toggle_completed_handler))
}

#[derive(Deserialize)]
pub struct CreateItemRequest {
    name: String,
    description: Option<String>,
    image: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    name: String,
    description: Option<String>,
    image: Option<String>,
    completed: bool,
}

async fn create_item_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(list_id): Path<i32>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::InvalidInput("Item name is required".to_string()));
    }

    let item = item_service::create_item(
        &app_state.db,
        list_id,
        auth_user.id,
        payload.name.trim(),
        payload.description.as_deref(),
        payload.image.as_deref(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Item created successfully",
            "item": item,
        })),
    ))
}

async fn get_list_items_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(list_id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    let items = item_service::find_by_list(&app_state.db, list_id, auth_user.id).await?;
    Ok(Json(serde_json::json!({ "items": items })))
}

async fn get_list_stats_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(list_id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    let stats = item_service::get_list_stats(&app_state.db, list_id, auth_user.id).await?;
    Ok(Json(serde_json::json!({ "stats": stats })))
}

/// The existence check runs before the permission check, so a missing item
/// is a 404 even for a caller with no relation to any list.
async fn get_item_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(item_id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    let item = item_service::find_by_id(&app_state.db, item_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".to_string()))?;

    if !permission_service::check_permission(
        &app_state.db,
        item.list_id,
        auth_user.id,
        Permission::Read,
    )
    .await?
    {
        return Err(AppError::Forbidden(
            "No permission to access this item".to_string(),
        ));
    }

    Ok(Json(serde_json::json!({ "item": item })))
}

async fn update_item_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(item_id): Path<i32>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Item name cannot be empty".to_string(),
        ));
    }

    let item = item_service::update_item(
        &app_state.db,
        item_id,
        auth_user.id,
        payload.name.trim(),
        payload.description.as_deref(),
        payload.image.as_deref(),
        payload.completed,
    )
    .await?;

    Ok(Json(serde_json::json!({
        "message": "Item updated successfully",
        "item": item,
    })))
}

async fn toggle_completed_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(item_id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    let item = item_service::toggle_completed(&app_state.db, item_id, auth_user.id).await?;
    Ok(Json(serde_json::json!({
        "message": "Item status changed successfully",
        "item": item,
    })))
}

async fn delete_item_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(item_id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    item_service::delete_item(&app_state.db, item_id, auth_user.id).await?;
    Ok(Json(
        serde_json::json!({ "message": "Item deleted successfully" }),
    ))
}
