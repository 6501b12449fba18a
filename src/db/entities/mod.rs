//! SeaORM entities for the four persisted tables: users, lists, list items
//! and list shares.

pub mod list;
pub mod list_item;
pub mod list_share;
pub mod user;
