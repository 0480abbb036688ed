use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// リカバリーコード（一回限り使用可能なバックアップ認証コード）
///
/// コード自体はSHA256ハッシュのみ保存（code_hash）
/// 平文コードは生成時に一度だけ呼び出し元へ返し、DBには保存しない
#[derive(Debug, FromRow, Serialize)]
pub struct RecoveryCode {
    pub user_id: Uuid,
    #[serde(skip)]
    pub code_hash: String,
    pub created_at: OffsetDateTime,
}
