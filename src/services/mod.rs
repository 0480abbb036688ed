pub mod crypto;
pub mod mfa;
pub mod recovery;
pub mod totp;

pub use crypto::FieldCipher;
pub use mfa::MfaService;
pub use recovery::RecoveryCodeService;
pub use totp::TotpEngine;
