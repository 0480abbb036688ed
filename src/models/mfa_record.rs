use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// ユーザーごとの二要素認証（TOTP）レコード
///
/// TOTPシークレットは `enc:` マーカー付きのAES-256-GCM暗号文として保存される。
/// 平文シークレットは検証処理の間だけメモリ上に存在し、ログに出力禁止。
///
/// 不変条件: `is_enabled == true` ならば `verified_at` は必ず設定されている。
#[derive(Debug, FromRow, Serialize)]
pub struct MfaRecord {
    pub user_id: Uuid,
    #[serde(skip)]
    pub totp_secret: String,
    pub is_enabled: bool,
    /// 初回セットアップ検証が成功した時刻（一度だけ設定される）
    pub verified_at: Option<OffsetDateTime>,
    /// 最後に検証が成功した時刻（setup / login どちらでも更新）
    pub last_used_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
