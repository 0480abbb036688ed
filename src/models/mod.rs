pub mod mfa_record;
pub mod recovery_code;
pub mod user;

pub use mfa_record::MfaRecord;
pub use recovery_code::RecoveryCode;
pub use user::User;
