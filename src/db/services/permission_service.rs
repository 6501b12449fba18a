use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::db::entities::{list, list_share};
use crate::db::enums::Permission;
use crate::web::error::AppError;

/// The single source of truth for list access. Every list/item read or
/// mutation that is not a pure self-lookup goes through here.
///
/// Ownership satisfies every level unconditionally; otherwise the caller's
/// share row must carry a level at least as high as `required`. A missing
/// list or share denies rather than failing, so callers decide how a `false`
/// surfaces at their boundary.
pub async fn check_permission<C: ConnectionTrait>(
    db: &C,
    list_id: i32,
    user_id: i32,
    required: Permission,
) -> Result<bool, AppError> {
    let Some(list) = list::Entity::find_by_id(list_id).one(db).await? else {
        return Ok(false);
    };

    if list.created_by == user_id {
        return Ok(true);
    }

    let share = list_share::Entity::find()
        .filter(list_share::Column::ListId.eq(list_id))
        .filter(list_share::Column::UserId.eq(user_id))
        .one(db)
        .await?;

    Ok(share.is_some_and(|s| s.permission >= required))
}
