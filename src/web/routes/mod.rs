pub mod item_routes;
pub mod list_routes;
pub mod user_routes;
