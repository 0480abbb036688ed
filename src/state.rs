use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::PgPool;

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::{MfaRecordRepository, RecoveryCodeRepository, UserRepository};
use crate::services::{FieldCipher, MfaService, RecoveryCodeService, TotpEngine};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL コネクションプール
    pub db_pool: PgPool,
    /// アプリケーション設定（Arc で共有）
    pub config: Arc<Config>,
    /// MFAオーケストレーター
    pub mfa_service: MfaService,
}

impl AppState {
    /// 新しい AppState を作成
    ///
    /// 暗号化鍵の派生はここで一度だけ行われ、
    /// 以降のリクエスト処理で鍵素材を参照することはない
    pub fn new(db_pool: PgPool, config: Config) -> Result<Self, AppError> {
        let config = Arc::new(config);

        let mfa_record_repo = MfaRecordRepository::new(db_pool.clone());
        let recovery_code_repo = RecoveryCodeRepository::new(db_pool.clone());
        let user_repo = UserRepository::new(db_pool.clone());

        let field_cipher = FieldCipher::new(config.data_encryption_key.expose_secret())?;
        let totp_engine = TotpEngine::new(config.totp_skew);
        let recovery_code_service = RecoveryCodeService::new(recovery_code_repo);

        let mfa_service = MfaService::new(
            mfa_record_repo,
            user_repo,
            recovery_code_service,
            field_cipher,
            totp_engine,
            config.totp_issuer.clone(),
        );

        Ok(Self {
            db_pool,
            config,
            mfa_service,
        })
    }
}
