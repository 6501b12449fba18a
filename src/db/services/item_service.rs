use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;

use crate::db::entities::{list, list_item};
use crate::db::enums::Permission;
use crate::db::services::permission_service;
use crate::web::error::AppError;

/// Completion counters for one list. `percentage` is rounded to the nearest
/// integer and zero for an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListStats {
    pub total: u64,
    pub completed: u64,
    pub pending: u64,
    pub percentage: u64,
}

/// Bumps the parent list's `updated_at` so that `find_by_user` ranks the
/// most recently active list first. Always runs in the same transaction as
/// the item write it accompanies.
async fn touch_list<C: ConnectionTrait>(
    db: &C,
    list_id: i32,
    now: DateTime<Utc>,
) -> Result<(), DbErr> {
    list::Entity::update_many()
        .col_expr(list::Column::UpdatedAt, Expr::value(now))
        .filter(list::Column::Id.eq(list_id))
        .exec(db)
        .await?;
    Ok(())
}

pub async fn create_item(
    db: &DatabaseConnection,
    list_id: i32,
    user_id: i32,
    name: &str,
    description: Option<&str>,
    image: Option<&str>,
) -> Result<list_item::Model, AppError> {
    if !permission_service::check_permission(db, list_id, user_id, Permission::Write).await? {
        return Err(AppError::Forbidden(
            "No permission to add items to this list".to_string(),
        ));
    }

    let txn = db.begin().await?;
    let now = Utc::now();
    let item = list_item::ActiveModel {
        list_id: Set(list_id),
        name: Set(name.to_string()),
        description: Set(description.map(|d| d.to_string())),
        image: Set(image.map(|i| i.to_string())),
        completed: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    touch_list(&txn, list_id, now).await?;
    txn.commit().await?;

    Ok(item)
}

/// Bare lookup with no permission check; callers that expose the result do
/// their own gating, so "not found" stays distinguishable from "forbidden".
pub async fn find_by_id(
    db: &impl ConnectionTrait,
    item_id: i32,
) -> Result<Option<list_item::Model>, AppError> {
    Ok(list_item::Entity::find_by_id(item_id).one(db).await?)
}

/// Items of a list, incomplete first, each group newest first.
pub async fn find_by_list(
    db: &impl ConnectionTrait,
    list_id: i32,
    user_id: i32,
) -> Result<Vec<list_item::Model>, AppError> {
    if !permission_service::check_permission(db, list_id, user_id, Permission::Read).await? {
        return Err(AppError::Forbidden(
            "No permission to view the items of this list".to_string(),
        ));
    }

    let items = list_item::Entity::find()
        .filter(list_item::Column::ListId.eq(list_id))
        .order_by_asc(list_item::Column::Completed)
        .order_by_desc(list_item::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(items)
}

/// Full field replace of name/description/image/completed.
pub async fn update_item(
    db: &DatabaseConnection,
    item_id: i32,
    user_id: i32,
    name: &str,
    description: Option<&str>,
    image: Option<&str>,
    completed: bool,
) -> Result<list_item::Model, AppError> {
    let existing = list_item::Entity::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".to_string()))?;

    let list_id = existing.list_id;
    if !permission_service::check_permission(db, list_id, user_id, Permission::Write).await? {
        return Err(AppError::Forbidden(
            "No permission to edit items in this list".to_string(),
        ));
    }

    let txn = db.begin().await?;
    let now = Utc::now();
    let mut active: list_item::ActiveModel = existing.into();
    active.name = Set(name.to_string());
    active.description = Set(description.map(|d| d.to_string()));
    active.image = Set(image.map(|i| i.to_string()));
    active.completed = Set(completed);
    active.updated_at = Set(now);
    let item = active.update(&txn).await?;
    touch_list(&txn, list_id, now).await?;
    txn.commit().await?;

    Ok(item)
}

/// Flips the completed flag relative to its last stored value. The read and
/// the write share one transaction with the list timestamp bump.
pub async fn toggle_completed(
    db: &DatabaseConnection,
    item_id: i32,
    user_id: i32,
) -> Result<list_item::Model, AppError> {
    let existing = list_item::Entity::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".to_string()))?;

    let list_id = existing.list_id;
    if !permission_service::check_permission(db, list_id, user_id, Permission::Write).await? {
        return Err(AppError::Forbidden(
            "No permission to modify items in this list".to_string(),
        ));
    }

    let txn = db.begin().await?;
    let now = Utc::now();
    let new_status = !existing.completed;
    let mut active: list_item::ActiveModel = existing.into();
    active.completed = Set(new_status);
    active.updated_at = Set(now);
    let item = active.update(&txn).await?;
    touch_list(&txn, list_id, now).await?;
    txn.commit().await?;

    Ok(item)
}

pub async fn delete_item(
    db: &DatabaseConnection,
    item_id: i32,
    user_id: i32,
) -> Result<(), AppError> {
    let existing = list_item::Entity::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".to_string()))?;

    let list_id = existing.list_id;
    if !permission_service::check_permission(db, list_id, user_id, Permission::Write).await? {
        return Err(AppError::Forbidden(
            "No permission to delete items in this list".to_string(),
        ));
    }

    let txn = db.begin().await?;
    let now = Utc::now();
    existing.delete(&txn).await?;
    touch_list(&txn, list_id, now).await?;
    txn.commit().await?;

    Ok(())
}

pub async fn get_list_stats(
    db: &impl ConnectionTrait,
    list_id: i32,
    user_id: i32,
) -> Result<ListStats, AppError> {
    if !permission_service::check_permission(db, list_id, user_id, Permission::Read).await? {
        return Err(AppError::Forbidden(
            "No permission to view the stats of this list".to_string(),
        ));
    }

    let total = list_item::Entity::find()
        .filter(list_item::Column::ListId.eq(list_id))
        .count(db)
        .await?;
    let completed = list_item::Entity::find()
        .filter(list_item::Column::ListId.eq(list_id))
        .filter(list_item::Column::Completed.eq(true))
        .count(db)
        .await?;

    let percentage = if total > 0 {
        ((completed as f64 / total as f64) * 100.0).round() as u64
    } else {
        0
    };

    Ok(ListStats {
        total,
        completed,
        pending: total - completed,
        percentage,
    })
}
