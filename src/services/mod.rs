pub mod cart_service;
pub mod inventory_service;
pub mod lifecycle_service;
pub mod notification_service;
pub mod order_service;
