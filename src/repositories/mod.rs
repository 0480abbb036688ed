pub mod mfa_record;
pub mod recovery_code;
pub mod user;

pub use mfa_record::MfaRecordRepository;
pub use recovery_code::RecoveryCodeRepository;
pub use user::UserRepository;
