use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// ユーザープロファイル
///
/// ユーザー管理自体は外部の認証レイヤーの責務。
/// このサブシステムは otpauth URI のアカウント表示名として email を読み、
/// 二要素認証の有効化状態を mfa_enabled にミラーする。
#[derive(Debug, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub mfa_enabled: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
