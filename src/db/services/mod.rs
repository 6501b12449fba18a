pub mod item_service;
pub mod list_service;
pub mod permission_service;
pub mod share_service;
pub mod user_service;
