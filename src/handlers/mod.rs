pub mod health;
pub mod mfa;
pub mod recovery;

pub use health::health_check;
pub use mfa::{setup_mfa, verify_mfa};
pub use recovery::{generate_recovery_codes, verify_recovery_code};
