pub mod auth_service;
pub mod customer_service;
pub mod export_service;
pub mod live_list;
