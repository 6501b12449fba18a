use chrono::Utc;
use sea_orm::sea_query::{Expr, IntoCondition, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult,
    JoinType, ModelTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::Serialize;

use crate::db::entities::{list, list_share, user};
use crate::db::enums::Permission;
use crate::db::services::permission_service;
use crate::web::error::AppError;

/// A list row with the creator's display name joined in.
#[derive(Debug, Clone, FromQueryResult, Serialize)]
pub struct ListWithCreator {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_individual: bool,
    pub created_by: i32,
    pub creator_name: String,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

/// A list row annotated with the viewer's effective permission label:
/// `"owner"` when the viewer created it, otherwise the raw share level.
#[derive(Debug, Clone, FromQueryResult, Serialize)]
pub struct ListWithAccess {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_individual: bool,
    pub created_by: i32,
    pub creator_name: String,
    pub user_permission: String,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

pub async fn create_list(
    db: &impl ConnectionTrait,
    user_id: i32,
    name: &str,
    description: Option<&str>,
    is_individual: bool,
) -> Result<list::Model, AppError> {
    let now = Utc::now();
    let new_list = list::ActiveModel {
        name: Set(name.to_string()),
        description: Set(description.map(|d| d.to_string())),
        is_individual: Set(is_individual),
        created_by: Set(user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(new_list.insert(db).await?)
}

pub async fn find_by_id(
    db: &impl ConnectionTrait,
    list_id: i32,
) -> Result<Option<ListWithCreator>, AppError> {
    let found = list::Entity::find_by_id(list_id)
        .join(JoinType::InnerJoin, list::Relation::Creator.def())
        .column_as(user::Column::Name, "creator_name")
        .into_model::<ListWithCreator>()
        .one(db)
        .await?;
    Ok(found)
}

/// Owned and shared lists for a viewer, most recently active first.
///
/// The join filter is what keeps foreign lists out of the result; there is
/// no post-hoc permission check.
pub async fn find_by_user(
    db: &impl ConnectionTrait,
    user_id: i32,
) -> Result<Vec<ListWithAccess>, AppError> {
    let permission_label: SimpleExpr = Expr::case(
        Expr::col((list::Entity, list::Column::CreatedBy)).eq(user_id),
        Expr::val("owner"),
    )
    .finally(Expr::col((
        list_share::Entity,
        list_share::Column::Permission,
    )))
    .into();

    let lists = list::Entity::find()
        .join(JoinType::InnerJoin, list::Relation::Creator.def())
        .join(
            JoinType::LeftJoin,
            list::Relation::Shares.def().on_condition(move |_left, right| {
                Expr::col((right, list_share::Column::UserId))
                    .eq(user_id)
                    .into_condition()
            }),
        )
        .filter(
            Condition::any()
                .add(list::Column::CreatedBy.eq(user_id))
                .add(list_share::Column::UserId.eq(user_id)),
        )
        .column_as(user::Column::Name, "creator_name")
        .column_as(permission_label, "user_permission")
        .order_by_desc(list::Column::UpdatedAt)
        .into_model::<ListWithAccess>()
        .all(db)
        .await?;
    Ok(lists)
}

/// Renames or re-describes a list. Requires `write`; the kind flag is
/// immutable after creation.
pub async fn update_list(
    db: &impl ConnectionTrait,
    list_id: i32,
    user_id: i32,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<list::Model, AppError> {
    if !permission_service::check_permission(db, list_id, user_id, Permission::Write).await? {
        return Err(AppError::Forbidden(
            "No permission to edit this list".to_string(),
        ));
    }

    let existing = list::Entity::find_by_id(list_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("List not found".to_string()))?;

    let mut active: list::ActiveModel = existing.into();
    if let Some(name) = name {
        active.name = Set(name.to_string());
    }
    if let Some(description) = description {
        active.description = Set(Some(description.to_string()));
    }
    active.updated_at = Set(Utc::now());
    Ok(active.update(db).await?)
}

/// Deletion is stricter than any share level: only the creator may destroy
/// a list, an `admin` sharee included.
pub async fn delete_list(
    db: &impl ConnectionTrait,
    list_id: i32,
    user_id: i32,
) -> Result<(), AppError> {
    let existing = list::Entity::find_by_id(list_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("List not found".to_string()))?;

    if existing.created_by != user_id {
        return Err(AppError::Forbidden(
            "Only the creator can delete this list".to_string(),
        ));
    }

    existing.delete(db).await?;
    Ok(())
}
