pub mod email;
pub mod inapp;
pub mod socket;

pub use email::{EmailDispatcher, LogMailer, Mailer, SmtpMailer};
pub use inapp::InAppDispatcher;
pub use socket::{SocketDispatcher, SocketHub};
