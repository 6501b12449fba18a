use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set,
};

use verifiq_server::db::entities::{list, list_item, list_share, user};
use verifiq_server::db::enums::Permission;
use verifiq_server::db::schema;
use verifiq_server::db::services::{
    item_service, list_service, permission_service, share_service, user_service,
};
use verifiq_server::web::error::AppError;

async fn setup_db() -> DatabaseConnection {
    // A single pinned connection: every pooled connection to `sqlite::memory:`
    // would otherwise get its own empty database.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1);
    let db = Database::connect(options).await.expect("sqlite connect");
    schema::create_tables(&db).await.expect("create tables");
    db
}

async fn seed_user(db: &DatabaseConnection, name: &str, email: &str) -> user::Model {
    user_service::create_user(db, name, email, "password123")
        .await
        .expect("create user")
}

async fn share_count(db: &DatabaseConnection, list_id: i32) -> u64 {
    list_share::Entity::find()
        .filter(list_share::Column::ListId.eq(list_id))
        .count(db)
        .await
        .expect("count shares")
}

#[tokio::test]
async fn owner_passes_every_permission_level() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    let groceries = list_service::create_list(&db, alice.id, "Groceries", None, false)
        .await
        .unwrap();

    for level in [Permission::Read, Permission::Write, Permission::Admin] {
        assert!(
            permission_service::check_permission(&db, groceries.id, alice.id, level)
                .await
                .unwrap()
        );
    }
}

#[tokio::test]
async fn share_level_gates_by_total_order() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    let bob = seed_user(&db, "Bob", "bob@example.com").await;
    let shared = list_service::create_list(&db, alice.id, "Chores", None, false)
        .await
        .unwrap();

    share_service::share_list(&db, shared.id, "bob@example.com", Permission::Write, alice.id)
        .await
        .unwrap();

    assert!(
        permission_service::check_permission(&db, shared.id, bob.id, Permission::Read)
            .await
            .unwrap()
    );
    assert!(
        permission_service::check_permission(&db, shared.id, bob.id, Permission::Write)
            .await
            .unwrap()
    );
    assert!(
        !permission_service::check_permission(&db, shared.id, bob.id, Permission::Admin)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn no_share_and_no_list_both_deny() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    let carol = seed_user(&db, "Carol", "carol@example.com").await;
    let shared = list_service::create_list(&db, alice.id, "Chores", None, false)
        .await
        .unwrap();

    assert!(
        !permission_service::check_permission(&db, shared.id, carol.id, Permission::Read)
            .await
            .unwrap()
    );
    assert!(
        !permission_service::check_permission(&db, 9999, carol.id, Permission::Read)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn individual_list_cannot_be_shared_even_by_creator() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    seed_user(&db, "Bob", "bob@example.com").await;
    let private = list_service::create_list(&db, alice.id, "Diary", None, true)
        .await
        .unwrap();

    let err = share_service::share_list(
        &db,
        private.id,
        "bob@example.com",
        Permission::Read,
        alice.id,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::InvariantViolation(_)));
    assert_eq!(share_count(&db, private.id).await, 0);
}

#[tokio::test]
async fn only_the_creator_may_delete_a_list() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    let bob = seed_user(&db, "Bob", "bob@example.com").await;
    let shared = list_service::create_list(&db, alice.id, "Chores", None, false)
        .await
        .unwrap();

    share_service::share_list(&db, shared.id, "bob@example.com", Permission::Admin, alice.id)
        .await
        .unwrap();

    // Admin share level passes write checks but never deletion.
    assert!(
        permission_service::check_permission(&db, shared.id, bob.id, Permission::Admin)
            .await
            .unwrap()
    );
    let err = list_service::delete_list(&db, shared.id, bob.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    list_service::delete_list(&db, shared.id, alice.id)
        .await
        .unwrap();
    assert!(
        list::Entity::find_by_id(shared.id)
            .one(&db)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn resharing_updates_the_level_in_place() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    let bob = seed_user(&db, "Bob", "bob@example.com").await;
    let shared = list_service::create_list(&db, alice.id, "Chores", None, false)
        .await
        .unwrap();

    share_service::share_list(&db, shared.id, "bob@example.com", Permission::Read, alice.id)
        .await
        .unwrap();
    share_service::share_list(&db, shared.id, "bob@example.com", Permission::Admin, alice.id)
        .await
        .unwrap();

    assert_eq!(share_count(&db, shared.id).await, 1);
    let row = list_share::Entity::find()
        .filter(list_share::Column::ListId.eq(shared.id))
        .filter(list_share::Column::UserId.eq(bob.id))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.permission, Permission::Admin);
}

#[tokio::test]
async fn sharing_authority_is_owner_only() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    let bob = seed_user(&db, "Bob", "bob@example.com").await;
    seed_user(&db, "Carol", "carol@example.com").await;
    let shared = list_service::create_list(&db, alice.id, "Chores", None, false)
        .await
        .unwrap();

    share_service::share_list(&db, shared.id, "bob@example.com", Permission::Admin, alice.id)
        .await
        .unwrap();

    // Even an admin-level sharee may not grant, revoke or inspect shares.
    let err = share_service::share_list(
        &db,
        shared.id,
        "carol@example.com",
        Permission::Read,
        bob.id,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = share_service::remove_share(&db, shared.id, bob.id, bob.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = share_service::get_shared_users(&db, shared.id, bob.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn sharing_with_unknown_email_is_not_found() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    let shared = list_service::create_list(&db, alice.id, "Chores", None, false)
        .await
        .unwrap();

    let err = share_service::share_list(
        &db,
        shared.id,
        "nobody@example.com",
        Permission::Read,
        alice.id,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn stats_on_an_empty_list_are_all_zero() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    let empty = list_service::create_list(&db, alice.id, "Empty", None, false)
        .await
        .unwrap();

    let stats = item_service::get_list_stats(&db, empty.id, alice.id)
        .await
        .unwrap();
    assert_eq!(stats.total, 0);
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.percentage, 0);
}

#[tokio::test]
async fn toggling_twice_restores_the_original_state() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    let groceries = list_service::create_list(&db, alice.id, "Groceries", None, false)
        .await
        .unwrap();
    let milk = item_service::create_item(&db, groceries.id, alice.id, "Milk", None, None)
        .await
        .unwrap();
    assert!(!milk.completed);

    let toggled = item_service::toggle_completed(&db, milk.id, alice.id)
        .await
        .unwrap();
    assert!(toggled.completed);

    let toggled_back = item_service::toggle_completed(&db, milk.id, alice.id)
        .await
        .unwrap();
    assert!(!toggled_back.completed);
}

#[tokio::test]
async fn item_mutations_bump_the_parent_list_timestamp() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    let groceries = list_service::create_list(&db, alice.id, "Groceries", None, false)
        .await
        .unwrap();
    let created_stamp = groceries.updated_at;

    let milk = item_service::create_item(&db, groceries.id, alice.id, "Milk", None, None)
        .await
        .unwrap();
    let after_create = list::Entity::find_by_id(groceries.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap()
        .updated_at;
    assert!(after_create > created_stamp);

    item_service::toggle_completed(&db, milk.id, alice.id)
        .await
        .unwrap();
    let after_toggle = list::Entity::find_by_id(groceries.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap()
        .updated_at;
    assert!(after_toggle > after_create);
}

#[tokio::test]
async fn items_sort_incomplete_first_then_newest() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    let groceries = list_service::create_list(&db, alice.id, "Groceries", None, false)
        .await
        .unwrap();

    let base = Utc::now();
    let mut ids = Vec::new();
    // (completed, created_at) = (false, t1), (true, t2), (false, t3), t3 > t1
    for (completed, offset) in [(false, 1), (true, 2), (false, 3)] {
        let stamp = base + Duration::seconds(offset);
        let item = list_item::ActiveModel {
            list_id: Set(groceries.id),
            name: Set(format!("item-{offset}")),
            description: Set(None),
            image: Set(None),
            completed: Set(completed),
            created_at: Set(stamp),
            updated_at: Set(stamp),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        ids.push(item.id);
    }

    let ordered = item_service::find_by_list(&db, groceries.id, alice.id)
        .await
        .unwrap();
    let ordered_ids: Vec<i32> = ordered.iter().map(|i| i.id).collect();
    assert_eq!(ordered_ids, vec![ids[2], ids[0], ids[1]]);
}

#[tokio::test]
async fn full_update_replaces_every_item_field() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    let groceries = list_service::create_list(&db, alice.id, "Groceries", None, false)
        .await
        .unwrap();
    let milk = item_service::create_item(
        &db,
        groceries.id,
        alice.id,
        "Milk",
        Some("2 liters"),
        Some("https://example.com/milk.png"),
    )
    .await
    .unwrap();

    let updated = item_service::update_item(
        &db,
        milk.id,
        alice.id,
        "Oat milk",
        None,
        None,
        true,
    )
    .await
    .unwrap();

    assert_eq!(updated.name, "Oat milk");
    assert_eq!(updated.description, None);
    assert_eq!(updated.image, None);
    assert!(updated.completed);
    assert_eq!(updated.list_id, groceries.id);
}

#[tokio::test]
async fn shared_collaboration_scenario_reaches_full_completion() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    let bob = seed_user(&db, "Bob", "bob@example.com").await;

    let groceries = list_service::create_list(&db, alice.id, "Groceries", None, false)
        .await
        .unwrap();
    share_service::share_list(&db, groceries.id, "bob@example.com", Permission::Write, alice.id)
        .await
        .unwrap();

    let milk = item_service::create_item(&db, groceries.id, bob.id, "Milk", None, None)
        .await
        .unwrap();
    item_service::toggle_completed(&db, milk.id, alice.id)
        .await
        .unwrap();

    for viewer in [alice.id, bob.id] {
        let stats = item_service::get_list_stats(&db, groceries.id, viewer)
            .await
            .unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.percentage, 100);
    }
}

#[tokio::test]
async fn strangers_are_denied_every_operation() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    let carol = seed_user(&db, "Carol", "carol@example.com").await;
    let shared = list_service::create_list(&db, alice.id, "Chores", None, false)
        .await
        .unwrap();
    let item = item_service::create_item(&db, shared.id, alice.id, "Laundry", None, None)
        .await
        .unwrap();

    let err = list_service::update_list(&db, shared.id, carol.id, Some("Hijacked"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = list_service::delete_list(&db, shared.id, carol.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = item_service::find_by_list(&db, shared.id, carol.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = item_service::get_list_stats(&db, shared.id, carol.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = item_service::toggle_completed(&db, item.id, carol.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = item_service::create_item(&db, shared.id, carol.id, "Sneaky", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn list_discovery_labels_effective_permission() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    let bob = seed_user(&db, "Bob", "bob@example.com").await;
    let carol = seed_user(&db, "Carol", "carol@example.com").await;

    let alices = list_service::create_list(&db, alice.id, "Alice's", None, false)
        .await
        .unwrap();
    let bobs = list_service::create_list(&db, bob.id, "Bob's", None, true)
        .await
        .unwrap();
    share_service::share_list(&db, alices.id, "bob@example.com", Permission::Write, alice.id)
        .await
        .unwrap();

    // Bob adds an item, so Alice's list is the more recently active one.
    item_service::create_item(&db, alices.id, bob.id, "Milk", None, None)
        .await
        .unwrap();

    let bob_lists = list_service::find_by_user(&db, bob.id).await.unwrap();
    assert_eq!(bob_lists.len(), 2);
    assert_eq!(bob_lists[0].id, alices.id);
    assert_eq!(bob_lists[0].user_permission, "write");
    assert_eq!(bob_lists[0].creator_name, "Alice");
    assert_eq!(bob_lists[1].id, bobs.id);
    assert_eq!(bob_lists[1].user_permission, "owner");

    let carol_lists = list_service::find_by_user(&db, carol.id).await.unwrap();
    assert!(carol_lists.is_empty());
}

#[tokio::test]
async fn revoking_a_share_drops_access() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    let bob = seed_user(&db, "Bob", "bob@example.com").await;
    let shared = list_service::create_list(&db, alice.id, "Chores", None, false)
        .await
        .unwrap();

    share_service::share_list(&db, shared.id, "bob@example.com", Permission::Write, alice.id)
        .await
        .unwrap();
    assert!(
        permission_service::check_permission(&db, shared.id, bob.id, Permission::Read)
            .await
            .unwrap()
    );

    assert!(
        share_service::remove_share(&db, shared.id, bob.id, alice.id)
            .await
            .unwrap()
    );
    assert!(
        !permission_service::check_permission(&db, shared.id, bob.id, Permission::Read)
            .await
            .unwrap()
    );

    // A second revoke finds nothing to remove.
    assert!(
        !share_service::remove_share(&db, shared.id, bob.id, alice.id)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn shared_users_listing_is_newest_first() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    seed_user(&db, "Bob", "bob@example.com").await;
    seed_user(&db, "Carol", "carol@example.com").await;
    let shared = list_service::create_list(&db, alice.id, "Chores", None, false)
        .await
        .unwrap();

    share_service::share_list(&db, shared.id, "bob@example.com", Permission::Read, alice.id)
        .await
        .unwrap();
    share_service::share_list(&db, shared.id, "carol@example.com", Permission::Admin, alice.id)
        .await
        .unwrap();

    let sharees = share_service::get_shared_users(&db, shared.id, alice.id)
        .await
        .unwrap();
    assert_eq!(sharees.len(), 2);
    assert_eq!(sharees[0].email, "carol@example.com");
    assert_eq!(sharees[0].permission, Permission::Admin);
    assert_eq!(sharees[1].email, "bob@example.com");
}

#[tokio::test]
async fn duplicate_emails_are_rejected() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    let bob = seed_user(&db, "Bob", "bob@example.com").await;

    let err = user_service::create_user(&db, "Imposter", "alice@example.com", "password123")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = user_service::update_profile(&db, bob.id, None, Some("alice@example.com"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Re-saving your own email is not a conflict.
    let profile = user_service::update_profile(&db, alice.id, None, Some("alice@example.com"), None)
        .await
        .unwrap();
    assert_eq!(profile.email, "alice@example.com");
}

#[tokio::test]
async fn profile_lookup_never_exposes_the_hash() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;

    let profile = user_service::find_by_id(&db, alice.id)
        .await
        .unwrap()
        .unwrap();
    let as_json = serde_json::to_value(&profile).unwrap();
    assert!(as_json.get("password_hash").is_none());
    assert_eq!(as_json["email"], "alice@example.com");
}

#[tokio::test]
async fn deleting_a_user_cascades_to_lists_items_and_shares() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    let bob = seed_user(&db, "Bob", "bob@example.com").await;
    let shared = list_service::create_list(&db, alice.id, "Chores", None, false)
        .await
        .unwrap();
    share_service::share_list(&db, shared.id, "bob@example.com", Permission::Write, alice.id)
        .await
        .unwrap();
    item_service::create_item(&db, shared.id, alice.id, "Laundry", None, None)
        .await
        .unwrap();

    user_service::delete_user(&db, alice.id).await.unwrap();

    assert_eq!(list::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(list_item::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(list_share::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn deleting_a_list_cascades_to_items_and_shares() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    seed_user(&db, "Bob", "bob@example.com").await;
    let shared = list_service::create_list(&db, alice.id, "Chores", None, false)
        .await
        .unwrap();
    share_service::share_list(&db, shared.id, "bob@example.com", Permission::Read, alice.id)
        .await
        .unwrap();
    item_service::create_item(&db, shared.id, alice.id, "Laundry", None, None)
        .await
        .unwrap();

    list_service::delete_list(&db, shared.id, alice.id)
        .await
        .unwrap();

    assert_eq!(list_item::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(list_share::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn user_stats_count_owned_lists_and_completed_items() {
    let db = setup_db().await;
    let alice = seed_user(&db, "Alice", "alice@example.com").await;
    let bob = seed_user(&db, "Bob", "bob@example.com").await;

    let groceries = list_service::create_list(&db, alice.id, "Groceries", None, false)
        .await
        .unwrap();
    list_service::create_list(&db, alice.id, "Diary", None, true)
        .await
        .unwrap();
    list_service::create_list(&db, bob.id, "Bob's", None, true)
        .await
        .unwrap();

    let milk = item_service::create_item(&db, groceries.id, alice.id, "Milk", None, None)
        .await
        .unwrap();
    item_service::create_item(&db, groceries.id, alice.id, "Eggs", None, None)
        .await
        .unwrap();
    item_service::toggle_completed(&db, milk.id, alice.id)
        .await
        .unwrap();

    let stats = user_service::get_stats(&db, alice.id).await.unwrap();
    assert_eq!(stats.lists_created, 2);
    assert_eq!(stats.items_completed, 1);
}
