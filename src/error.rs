use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("認証されていないリクエスト")]
    Unauthorized,

    #[error("バリデーションエラー: {0}")]
    Validation(String),

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),

    #[error("設定エラー: {0}")]
    Configuration(String),

    #[error("暗号化データの完全性検証に失敗")]
    Integrity,

    #[error("二要素認証が設定されていません")]
    MfaNotConfigured,

    #[error("二要素認証が有効化されていません")]
    MfaNotEnabled,

    #[error("二要素認証は既に有効です")]
    MfaAlreadyEnabled,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "認証されていないリクエストです".to_string(),
            ),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Database(e) => {
                tracing::error!(error = ?e, "データベースエラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
            Self::Configuration(msg) => {
                tracing::error!(reason = %msg, "設定エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
            Self::Integrity => {
                // 鍵ローテーション不整合または改ざんの兆候。再試行してはならない
                tracing::error!("暗号化データの完全性検証に失敗（鍵不整合または改ざんの可能性）");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
            Self::MfaNotConfigured => (
                StatusCode::NOT_FOUND,
                "二要素認証が設定されていません".to_string(),
            ),
            Self::MfaNotEnabled => (
                StatusCode::BAD_REQUEST,
                "二要素認証が有効化されていません".to_string(),
            ),
            Self::MfaAlreadyEnabled => {
                (StatusCode::CONFLICT, "二要素認証は既に有効です".to_string())
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
