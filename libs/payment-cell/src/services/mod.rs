pub mod ledger;
pub mod paymob;
pub mod webhook;

pub use ledger::PaymentLedger;
pub use paymob::PaymobClient;
pub use webhook::{signing_payload, verify_callback};
