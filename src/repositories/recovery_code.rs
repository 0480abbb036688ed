use sqlx::PgPool;
use uuid::Uuid;

use crate::models::RecoveryCode;

#[derive(Clone)]
pub struct RecoveryCodeRepository {
    pool: PgPool,
}

impl RecoveryCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// ユーザーのリカバリーコード一式を新しいバッチで置き換える
    ///
    /// 旧バッチの削除と新バッチの挿入を単一トランザクションで実行する。
    /// 途中でエラーが発生した場合は全てロールバックされ、
    /// 旧コードと新コードが混在する状態は発生しない
    pub async fn replace_all(
        &self,
        user_id: Uuid,
        code_hashes: &[String],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM recovery_codes
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        for code_hash in code_hashes {
            sqlx::query(
                r#"
                INSERT INTO recovery_codes (user_id, code_hash)
                VALUES ($1, $2)
                "#,
            )
            .bind(user_id)
            .bind(code_hash)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    /// リカバリーコードを消費する（一回限り使用）
    ///
    /// (user_id, code_hash) に一致する行を単一文で削除して返す。
    /// 照合と削除が分かれないため、同一コードの並行使用でも
    /// 成功するのは一方だけ
    pub async fn consume(
        &self,
        user_id: Uuid,
        code_hash: &str,
    ) -> Result<Option<RecoveryCode>, sqlx::Error> {
        sqlx::query_as::<_, RecoveryCode>(
            r#"
            DELETE FROM recovery_codes
            WHERE user_id = $1 AND code_hash = $2
            RETURNING user_id, code_hash, created_at
            "#,
        )
        .bind(user_id)
        .bind(code_hash)
        .fetch_optional(&self.pool)
        .await
    }
}
