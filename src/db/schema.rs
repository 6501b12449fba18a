use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};

use crate::db::entities::{list, list_item, list_share, user};

/// Creates the four tables and their lookup indexes if they do not exist.
///
/// Foreign keys (with cascade deletes) are derived from the entity relation
/// definitions. The unique index on (list_id, user_id) is what makes a share
/// an upsert target rather than a growing set of rows.
pub async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut tables = vec![
        schema.create_table_from_entity(user::Entity),
        schema.create_table_from_entity(list::Entity),
        schema.create_table_from_entity(list_item::Entity),
        schema.create_table_from_entity(list_share::Entity),
    ];
    for stmt in tables.iter_mut() {
        db.execute(backend.build(stmt.if_not_exists())).await?;
    }

    // Permission checks key on (list, user); share listing keys on list; a
    // user's own list discovery keys on creator.
    let indexes: Vec<IndexCreateStatement> = vec![
        Index::create()
            .name("idx_lists_created_by")
            .table(list::Entity)
            .col(list::Column::CreatedBy)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_list_items_list_id")
            .table(list_item::Entity)
            .col(list_item::Column::ListId)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_list_shares_list_id")
            .table(list_share::Entity)
            .col(list_share::Column::ListId)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_list_shares_user_id")
            .table(list_share::Entity)
            .col(list_share::Column::UserId)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_list_shares_list_user")
            .table(list_share::Entity)
            .col(list_share::Column::ListId)
            .col(list_share::Column::UserId)
            .unique()
            .if_not_exists()
            .to_owned(),
    ];
    for stmt in indexes {
        db.execute(backend.build(&stmt)).await?;
    }

    Ok(())
}
