pub mod models;
pub mod services;

pub use models::{PaymentError, PaymentRecord, PaymentStatus};
pub use services::{PaymentLedger, PaymobClient};
