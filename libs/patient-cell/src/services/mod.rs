pub mod consent;
pub mod identity;
pub mod phone;

pub use consent::ConsentService;
pub use identity::PatientIdentityService;
