pub mod checkout;
pub mod eligibility;
pub mod intake;
pub mod lifecycle;
pub mod reconcile;
pub mod writer;

pub use checkout::CheckoutService;
pub use eligibility::FreeSessionGate;
pub use intake::IntakeService;
pub use lifecycle::SessionLifecycleService;
pub use reconcile::{PaymentReconciler, ReconcileOutcome};
pub use writer::BookingWriter;
