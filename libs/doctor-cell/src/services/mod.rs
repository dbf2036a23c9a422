pub mod accounts;
pub mod directory;

pub use accounts::DoctorAccounts;
pub use directory::{
    build_directory, DatabaseDoctorDirectory, DoctorDirectory, StaticDoctorDirectory,
};
