pub mod cart;
pub mod checkout;
pub mod notifications;
pub mod orders;
