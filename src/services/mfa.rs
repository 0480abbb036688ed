use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::repositories::{MfaRecordRepository, UserRepository};
use crate::services::crypto::{Decrypted, FieldCipher};
use crate::services::recovery::RecoveryCodeService;
use crate::services::totp::TotpEngine;

/// 検証アクション
///
/// - `setup`: 初回コード検証。成功で Provisioned → Enabled 遷移
/// - `login`: 通常ログイン時の検証。Enabled 状態でのみ許可
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MfaAction {
    Setup,
    Login,
}

/// setup 開始時に呼び出し元へ一度だけ返す情報
#[derive(Debug)]
pub struct ProvisionedSecret {
    /// Base32エンコードされた平文シークレット
    pub secret: String,
    /// 認証アプリ登録用URI
    pub otpauth_url: String,
}

/// 二要素認証オーケストレーター
///
/// ユーザーごとのMFAレコードに対する状態機械
/// `NoMfa → Provisioned (is_enabled=false) → Enabled` を管理する。
/// 検証の不一致はエラーではなく false として返す（再試行ポリシーは呼び出し元の責務。
/// レート制限もリクエスト識別基盤を持つ外部レイヤーの責務）
#[derive(Clone)]
pub struct MfaService {
    mfa_record_repo: MfaRecordRepository,
    user_repo: UserRepository,
    recovery_code_service: RecoveryCodeService,
    field_cipher: FieldCipher,
    totp_engine: TotpEngine,
    issuer: String,
}

impl MfaService {
    /// 新しい MfaService を作成
    pub fn new(
        mfa_record_repo: MfaRecordRepository,
        user_repo: UserRepository,
        recovery_code_service: RecoveryCodeService,
        field_cipher: FieldCipher,
        totp_engine: TotpEngine,
        issuer: String,
    ) -> Self {
        Self {
            mfa_record_repo,
            user_repo,
            recovery_code_service,
            field_cipher,
            totp_engine,
            issuer,
        }
    }

    /// MFAセットアップを開始（NoMfa → Provisioned）
    ///
    /// シークレットを生成・暗号化してレコードを作成し、
    /// 平文シークレットと otpauth URI を一度だけ返す。
    ///
    /// # Security
    /// - シークレット平文はログ出力禁止
    pub async fn begin_setup(&self, user_id: Uuid) -> Result<ProvisionedSecret, AppError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        // 既に有効化済みなら拒否。未有効化の残骸は削除して再セットアップを許可
        if let Some(existing) = self.mfa_record_repo.find_by_user_id(user.id).await? {
            if existing.is_enabled {
                return Err(AppError::MfaAlreadyEnabled);
            }
            self.mfa_record_repo.delete(user.id).await?;
        }

        let secret = TotpEngine::generate_secret();
        let encrypted = self.field_cipher.encrypt(&secret)?;
        self.mfa_record_repo.create(user.id, &encrypted).await?;

        let otpauth_url = TotpEngine::otpauth_url(&self.issuer, &user.email, &secret);

        tracing::info!(
            user_id = %user.id,
            email = %crate::masking::mask_email(&user.email),
            "MFAセットアップ開始"
        );

        Ok(ProvisionedSecret {
            secret,
            otpauth_url,
        })
    }

    /// TOTPコードを検証し、成功時に状態を遷移させる
    ///
    /// - `setup` 成功: is_enabled=true、verified_at / last_used_at 設定、
    ///   ユーザープロファイルの mfa_enabled をミラー更新
    /// - `login` 成功: last_used_at のみ更新
    /// - 不一致: 状態を一切変更せず Ok(false)
    pub async fn verify_code(
        &self,
        user_id: Uuid,
        action: MfaAction,
        code: &str,
    ) -> Result<bool, AppError> {
        let record = self
            .mfa_record_repo
            .find_by_user_id(user_id)
            .await?
            .ok_or(AppError::MfaNotConfigured)?;

        check_action_precondition(record.is_enabled, action)?;

        let secret = match self.field_cipher.decrypt(&record.totp_secret)? {
            Decrypted::Value(s) => s,
            Decrypted::Plaintext(s) => {
                // 未暗号化のレガシーレコード。読み取りは許容するが記録を残す
                tracing::warn!(user_id = %user_id, "未暗号化のTOTPシークレットを検出");
                s
            }
        };

        if !self.totp_engine.verify(&secret, code)? {
            return Ok(false);
        }

        match action {
            MfaAction::Setup => {
                self.mfa_record_repo.mark_verified(user_id).await?;
                self.user_repo.set_mfa_enabled(user_id, true).await?;
                tracing::info!(user_id = %user_id, "MFA有効化完了");
            }
            MfaAction::Login => {
                self.mfa_record_repo.touch_last_used(user_id).await?;
                tracing::info!(user_id = %user_id, "MFAコード検証成功");
            }
        }

        Ok(true)
    }

    /// リカバリーコードを発行（Enabled 状態でのみ到達可能）
    pub async fn generate_recovery_codes(&self, user_id: Uuid) -> Result<Vec<String>, AppError> {
        self.require_enabled_record(user_id).await?;
        self.recovery_code_service.generate_batch(user_id).await
    }

    /// リカバリーコードを検証・消費する
    ///
    /// 成功時は last_used_at を更新する
    pub async fn verify_recovery_code(
        &self,
        user_id: Uuid,
        code: &str,
    ) -> Result<bool, AppError> {
        self.require_enabled_record(user_id).await?;

        let verified = self
            .recovery_code_service
            .verify_and_consume(user_id, code)
            .await?;

        if verified {
            self.mfa_record_repo.touch_last_used(user_id).await?;
        }

        Ok(verified)
    }

    /// Enabled 状態のMFAレコードを要求する
    async fn require_enabled_record(&self, user_id: Uuid) -> Result<(), AppError> {
        let record = self
            .mfa_record_repo
            .find_by_user_id(user_id)
            .await?
            .ok_or(AppError::MfaNotConfigured)?;

        if !record.is_enabled {
            return Err(AppError::MfaNotEnabled);
        }

        Ok(())
    }
}

/// アクションと現在状態の整合性チェック（純粋関数）
///
/// 状態機械に存在しない遷移を拒否する:
/// - `setup` は Provisioned からのみ（Enabled で再実行は不可）
/// - `login` は Enabled からのみ
fn check_action_precondition(is_enabled: bool, action: MfaAction) -> Result<(), AppError> {
    match action {
        MfaAction::Setup if is_enabled => Err(AppError::MfaAlreadyEnabled),
        MfaAction::Login if !is_enabled => Err(AppError::MfaNotEnabled),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 状態遷移の事前条件チェックのユニットテスト
    /// MfaService のインスタンス化には PgPool が必要なため、
    /// 純粋な判定ロジックを直接テスト
    #[test]
    fn test_setup_allowed_on_provisioned_record() {
        assert!(check_action_precondition(false, MfaAction::Setup).is_ok());
    }

    #[test]
    fn test_setup_rejected_on_enabled_record() {
        assert!(matches!(
            check_action_precondition(true, MfaAction::Setup),
            Err(AppError::MfaAlreadyEnabled)
        ));
    }

    #[test]
    fn test_login_allowed_on_enabled_record() {
        assert!(check_action_precondition(true, MfaAction::Login).is_ok());
    }

    #[test]
    fn test_login_rejected_on_provisioned_record() {
        assert!(matches!(
            check_action_precondition(false, MfaAction::Login),
            Err(AppError::MfaNotEnabled)
        ));
    }

    #[test]
    fn test_action_deserialization() {
        assert_eq!(
            serde_json::from_str::<MfaAction>("\"setup\"").unwrap(),
            MfaAction::Setup
        );
        assert_eq!(
            serde_json::from_str::<MfaAction>("\"login\"").unwrap(),
            MfaAction::Login
        );
        assert!(serde_json::from_str::<MfaAction>("\"disable\"").is_err());
    }
}
