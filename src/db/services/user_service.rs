use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, JoinType,
    ModelTrait, PaginatorTrait, QueryFilter, QuerySelect, RelationTrait, Set, SqlErr,
};
use serde::Serialize;

use crate::db::entities::{list, list_item, user};
use crate::web::error::AppError;

/// A user as exposed to callers: the credential hash never leaves this
/// module.
#[derive(Debug, Clone, FromQueryResult, Serialize)]
pub struct UserProfile {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub lists_created: u64,
    pub items_completed: u64,
}

/// Full model lookup, hash included. For credential checks only; everything
/// user-facing goes through [`find_by_id`].
pub async fn find_by_email(
    db: &impl ConnectionTrait,
    email: &str,
) -> Result<Option<user::Model>, AppError> {
    Ok(user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?)
}

pub async fn find_by_id(
    db: &impl ConnectionTrait,
    user_id: i32,
) -> Result<Option<UserProfile>, AppError> {
    let profile = user::Entity::find_by_id(user_id)
        .select_only()
        .column(user::Column::Id)
        .column(user::Column::Name)
        .column(user::Column::Email)
        .column(user::Column::Avatar)
        .column(user::Column::CreatedAt)
        .into_model::<UserProfile>()
        .one(db)
        .await?;
    Ok(profile)
}

pub async fn create_user(
    db: &impl ConnectionTrait,
    name: &str,
    email: &str,
    password: &str,
) -> Result<user::Model, AppError> {
    if find_by_email(db, email).await?.is_some() {
        return Err(AppError::Conflict("Email already in use".to_string()));
    }

    let password_hash = hash(password, DEFAULT_COST)
        .map_err(|e| AppError::PasswordHashingError(e.to_string()))?;

    let now = Utc::now();
    let new_user = user::ActiveModel {
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        avatar: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    // The pre-check above can race a concurrent registration; the unique
    // column closes the gap.
    match new_user.insert(db).await {
        Ok(model) => Ok(model),
        Err(e) => match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                Err(AppError::Conflict("Email already in use".to_string()))
            }
            _ => Err(e.into()),
        },
    }
}

/// Profile edit (name/email/avatar). A changed email must stay unique.
pub async fn update_profile(
    db: &impl ConnectionTrait,
    user_id: i32,
    name: Option<&str>,
    email: Option<&str>,
    avatar: Option<&str>,
) -> Result<UserProfile, AppError> {
    let existing = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if let Some(new_email) = email
        && new_email != existing.email
        && find_by_email(db, new_email).await?.is_some()
    {
        return Err(AppError::Conflict("Email already in use".to_string()));
    }

    let mut active: user::ActiveModel = existing.into();
    if let Some(name) = name {
        active.name = Set(name.to_string());
    }
    if let Some(email) = email {
        active.email = Set(email.to_string());
    }
    active.avatar = Set(avatar.map(|a| a.to_string()));
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    Ok(UserProfile {
        id: updated.id,
        name: updated.name,
        email: updated.email,
        avatar: updated.avatar,
        created_at: updated.created_at,
    })
}

pub async fn update_password(
    db: &impl ConnectionTrait,
    user_id: i32,
    new_password: &str,
) -> Result<(), AppError> {
    let existing = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let password_hash = hash(new_password, DEFAULT_COST)
        .map_err(|e| AppError::PasswordHashingError(e.to_string()))?;

    let mut active: user::ActiveModel = existing.into();
    active.password_hash = Set(password_hash);
    active.updated_at = Set(Utc::now());
    active.update(db).await?;
    Ok(())
}

/// Account deletion. Owned lists, their items and all share rows go with it
/// through the cascades.
pub async fn delete_user(db: &impl ConnectionTrait, user_id: i32) -> Result<(), AppError> {
    let existing = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    existing.delete(db).await?;
    Ok(())
}

pub fn validate_password(user: &user::Model, password: &str) -> Result<bool, AppError> {
    verify(password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))
}

pub async fn get_stats(db: &impl ConnectionTrait, user_id: i32) -> Result<UserStats, AppError> {
    let lists_created = list::Entity::find()
        .filter(list::Column::CreatedBy.eq(user_id))
        .count(db)
        .await?;

    let items_completed = list_item::Entity::find()
        .join(JoinType::InnerJoin, list_item::Relation::List.def())
        .filter(list::Column::CreatedBy.eq(user_id))
        .filter(list_item::Column::Completed.eq(true))
        .count(db)
        .await?;

    Ok(UserStats {
        lists_created,
        items_completed,
    })
}
