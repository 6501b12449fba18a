use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::Serialize;

use crate::db::entities::{list, list_share, user};
use crate::db::enums::Permission;
use crate::web::error::AppError;

/// A sharee of a list, joined with their profile and the grant date.
#[derive(Debug, Clone, FromQueryResult, Serialize)]
pub struct SharedUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub permission: Permission,
    pub shared_at: chrono::DateTime<Utc>,
}

/// Loads the list and enforces the owner-only gate. Sharing authority is
/// never delegable, not even to an `admin` sharee.
async fn require_owner(
    db: &impl ConnectionTrait,
    list_id: i32,
    requester_id: i32,
    action: &str,
) -> Result<list::Model, AppError> {
    let existing = list::Entity::find_by_id(list_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("List not found".to_string()))?;

    if existing.created_by != requester_id {
        return Err(AppError::Forbidden(format!(
            "Only the creator can {action} this list"
        )));
    }
    Ok(existing)
}

/// Grants or upgrades a share. Re-sharing an already-shared user overwrites
/// the level in place, so the (list, user) pair stays unique.
pub async fn share_list(
    db: &impl ConnectionTrait,
    list_id: i32,
    target_email: &str,
    permission: Permission,
    requester_id: i32,
) -> Result<(), AppError> {
    let existing = require_owner(db, list_id, requester_id, "share").await?;

    if existing.is_individual {
        return Err(AppError::InvariantViolation(
            "Individual lists cannot be shared".to_string(),
        ));
    }

    let target = user::Entity::find()
        .filter(user::Column::Email.eq(target_email))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let current = list_share::Entity::find()
        .filter(list_share::Column::ListId.eq(list_id))
        .filter(list_share::Column::UserId.eq(target.id))
        .one(db)
        .await?;

    match current {
        Some(share) => {
            let mut active: list_share::ActiveModel = share.into();
            active.permission = Set(permission);
            active.update(db).await?;
        }
        None => {
            list_share::ActiveModel {
                list_id: Set(list_id),
                user_id: Set(target.id),
                permission: Set(permission),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    Ok(())
}

/// Revokes a share. Returns whether a row actually existed.
pub async fn remove_share(
    db: &impl ConnectionTrait,
    list_id: i32,
    target_user_id: i32,
    requester_id: i32,
) -> Result<bool, AppError> {
    require_owner(db, list_id, requester_id, "unshare").await?;

    let result = list_share::Entity::delete_many()
        .filter(list_share::Column::ListId.eq(list_id))
        .filter(list_share::Column::UserId.eq(target_user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// All sharees of a list, newest grant first. Owner-only.
pub async fn get_shared_users(
    db: &impl ConnectionTrait,
    list_id: i32,
    requester_id: i32,
) -> Result<Vec<SharedUser>, AppError> {
    require_owner(db, list_id, requester_id, "view the shares of").await?;

    let shares = list_share::Entity::find()
        .filter(list_share::Column::ListId.eq(list_id))
        .join(JoinType::InnerJoin, list_share::Relation::User.def())
        .select_only()
        .column_as(user::Column::Id, "id")
        .column_as(user::Column::Name, "name")
        .column_as(user::Column::Email, "email")
        .column(list_share::Column::Permission)
        .column_as(list_share::Column::CreatedAt, "shared_at")
        .order_by_desc(list_share::Column::CreatedAt)
        .into_model::<SharedUser>()
        .all(db)
        .await?;
    Ok(shares)
}
