pub mod auth;
pub mod error;
pub mod messages;

pub use error::AppError;
