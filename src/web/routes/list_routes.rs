use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::enums::Permission;
use crate::db::services::{
    item_service::{self, ListStats},
    list_service::{self, ListWithAccess, ListWithCreator},
    permission_service, share_service,
};
use crate::web::models::AuthenticatedUser;
use crate::web::{AppError, AppState};

pub fn create_list_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_list_handler).get(get_user_lists_handler))
        .route(
            "/{id}",
            get(get_list_handler)
                .put(update_list_handler)
                .delete(delete_list_handler),
        )
        .route("/{id}/share", post(share_list_handler))
        .route("/{id}/share/{user_id}", delete(remove_share_handler))
        .route("/{id}/shared-users", get(get_shared_users_handler))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListRequest {
    name: String,
    description: Option<String>,
    is_individual: bool,
}

#[derive(Deserialize)]
pub struct UpdateListRequest {
    name: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
pub struct ShareListRequest {
    email: String,
    permission: String,
}

#[derive(Serialize)]
struct ListOverview {
    #[serde(flatten)]
    list: ListWithAccess,
    stats: ListStats,
}

#[derive(Serialize)]
struct ListDetail {
    #[serde(flatten)]
    list: ListWithCreator,
    stats: ListStats,
    items: Vec<crate::db::entities::list_item::Model>,
}

async fn create_list_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateListRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::InvalidInput("List name is required".to_string()));
    }

    let created = list_service::create_list(
        &app_state.db,
        auth_user.id,
        payload.name.trim(),
        payload.description.as_deref(),
        payload.is_individual,
    )
    .await?;

    let list = list_service::find_by_id(&app_state.db, created.id)
        .await?
        .ok_or_else(|| AppError::NotFound("List not found".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "List created successfully",
            "list": list,
        })),
    ))
}

async fn get_user_lists_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let lists = list_service::find_by_user(&app_state.db, auth_user.id).await?;

    let mut lists_with_stats = Vec::with_capacity(lists.len());
    for list in lists {
        let stats = item_service::get_list_stats(&app_state.db, list.id, auth_user.id).await?;
        lists_with_stats.push(ListOverview { list, stats });
    }

    Ok(Json(serde_json::json!({ "lists": lists_with_stats })))
}

async fn get_list_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(list_id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !permission_service::check_permission(&app_state.db, list_id, auth_user.id, Permission::Read)
        .await?
    {
        return Err(AppError::Forbidden(
            "No permission to access this list".to_string(),
        ));
    }

    let list = list_service::find_by_id(&app_state.db, list_id)
        .await?
        .ok_or_else(|| AppError::NotFound("List not found".to_string()))?;

    let items = item_service::find_by_list(&app_state.db, list_id, auth_user.id).await?;
    let stats = item_service::get_list_stats(&app_state.db, list_id, auth_user.id).await?;

    Ok(Json(
        serde_json::json!({ "list": ListDetail { list, stats, items } }),
    ))
}

async fn update_list_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(list_id): Path<i32>,
    Json(payload): Json<UpdateListRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Some(name) = &payload.name
        && name.trim().is_empty()
    {
        return Err(AppError::InvalidInput(
            "List name cannot be empty".to_string(),
        ));
    }

    list_service::update_list(
        &app_state.db,
        list_id,
        auth_user.id,
        payload.name.as_deref().map(str::trim),
        payload.description.as_deref(),
    )
    .await?;

    let list = list_service::find_by_id(&app_state.db, list_id)
        .await?
        .ok_or_else(|| AppError::NotFound("List not found".to_string()))?;

    Ok(Json(serde_json::json!({
        "message": "List updated successfully",
        "list": list,
    })))
}

async fn delete_list_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(list_id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    list_service::delete_list(&app_state.db, list_id, auth_user.id).await?;
    Ok(Json(
        serde_json::json!({ "message": "List deleted successfully" }),
    ))
}

async fn share_list_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(list_id): Path<i32>,
    Json(payload): Json<ShareListRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let email = payload.email.trim();
    if !email.contains('@') {
        return Err(AppError::InvalidInput("Invalid email".to_string()));
    }
    let permission: Permission = payload
        .permission
        .parse()
        .map_err(AppError::InvalidInput)?;

    share_service::share_list(&app_state.db, list_id, email, permission, auth_user.id).await?;

    Ok(Json(
        serde_json::json!({ "message": "List shared successfully" }),
    ))
}

async fn remove_share_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path((list_id, target_user_id)): Path<(i32, i32)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let removed =
        share_service::remove_share(&app_state.db, list_id, target_user_id, auth_user.id).await?;
    if !removed {
        return Err(AppError::NotFound("Share not found".to_string()));
    }
    Ok(Json(
        serde_json::json!({ "message": "Share removed successfully" }),
    ))
}

async fn get_shared_users_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(list_id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    let shared_users =
        share_service::get_shared_users(&app_state.db, list_id, auth_user.id).await?;
    Ok(Json(serde_json::json!({ "sharedUsers": shared_users })))
}
