use sqlx::PgPool;
use uuid::Uuid;

use crate::models::MfaRecord;

#[derive(Clone)]
pub struct MfaRecordRepository {
    pool: PgPool,
}

impl MfaRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// ユーザーIDでMFAレコードを検索
    pub async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<MfaRecord>, sqlx::Error> {
        sqlx::query_as::<_, MfaRecord>(
            r#"
            SELECT user_id, totp_secret, is_enabled, verified_at, last_used_at,
                   created_at, updated_at
            FROM mfa_records
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// 新しいMFAレコードを作成
    ///
    /// # Note
    /// 作成時は is_enabled = false（Provisioned 状態）
    /// setup 検証の成功後に mark_verified() を呼び出す
    pub async fn create(
        &self,
        user_id: Uuid,
        totp_secret_ciphertext: &str,
    ) -> Result<MfaRecord, sqlx::Error> {
        sqlx::query_as::<_, MfaRecord>(
            r#"
            INSERT INTO mfa_records (user_id, totp_secret)
            VALUES ($1, $2)
            RETURNING user_id, totp_secret, is_enabled, verified_at, last_used_at,
                      created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(totp_secret_ciphertext)
        .fetch_one(&self.pool)
        .await
    }

    /// setup 検証成功: Provisioned → Enabled 遷移を記録
    ///
    /// is_enabled = true、verified_at / last_used_at を現在時刻に設定。
    /// verified_at は初回のみ設定する（COALESCE で既存値を保持）
    pub async fn mark_verified(&self, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE mfa_records
            SET is_enabled = true,
                verified_at = COALESCE(verified_at, NOW()),
                last_used_at = NOW(),
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// login 検証成功: last_used_at のみ更新
    pub async fn touch_last_used(&self, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE mfa_records
            SET last_used_at = NOW(), updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// MFAレコードを削除
    ///
    /// # Note
    /// 未有効化レコードの再セットアップ時のみ使用する。
    /// 有効化済みレコードの無効化・削除は外部の管理操作
    pub async fn delete(&self, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            DELETE FROM mfa_records
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
