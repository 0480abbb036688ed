use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extract::AuthenticatedUser;
use crate::services::mfa::MfaAction;
use crate::state::AppState;

// === MFA Setup ===

#[derive(Debug, Serialize)]
pub struct SetupResponse {
    pub secret: String,
    pub otpauth_url: String,
}

/// POST /api/mfa/setup
///
/// MFAセットアップを開始（シークレット生成、otpauth URI返却）
///
/// # Security
/// - シークレット平文をこのレスポンス以外で返す経路は存在しない
/// - シークレット平文はログ出力禁止
pub async fn setup_mfa(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<SetupResponse>, AppError> {
    let provisioned = state.mfa_service.begin_setup(user_id).await?;

    Ok(Json(SetupResponse {
        secret: provisioned.secret,
        otpauth_url: provisioned.otpauth_url,
    }))
}

// === MFA Verify ===

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub code: String,
    pub action: MfaAction,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub verified: bool,
}

/// POST /api/mfa/verify
///
/// TOTPコードを検証する。
/// action="setup" は初回検証（成功でMFA有効化）、action="login" は通常検証。
/// コード不一致は 200 + verified:false（エラーではなく期待される結果）
///
/// # Security
/// - コードはログ出力禁止
pub async fn verify_mfa(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, AppError> {
    // バリデーション
    validate_totp_code(&request.code)?;

    let verified = state
        .mfa_service
        .verify_code(user_id, request.action, &request.code)
        .await?;

    Ok(Json(VerifyResponse { verified }))
}

// === Helper Functions ===

/// TOTPコードバリデーション
fn validate_totp_code(code: &str) -> Result<(), AppError> {
    if code.is_empty() {
        return Err(AppError::Validation("認証コードは必須です".to_string()));
    }
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "認証コードは6桁の数字で入力してください".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_empty_code() {
        assert!(validate_totp_code("").is_err());
    }

    #[test]
    fn test_validate_short_code() {
        assert!(validate_totp_code("12345").is_err());
    }

    #[test]
    fn test_validate_non_digit_code() {
        assert!(validate_totp_code("12345a").is_err());
    }

    #[test]
    fn test_validate_valid_code() {
        assert!(validate_totp_code("123456").is_ok());
    }

    #[test]
    fn test_verify_response_shape() {
        // 不一致時もエラーボディではなく verified:false を返す
        let body = serde_json::to_value(VerifyResponse { verified: false }).unwrap();
        assert_eq!(body, serde_json::json!({ "verified": false }));
    }

    #[test]
    fn test_verify_request_rejects_unknown_action() {
        let result = serde_json::from_str::<VerifyRequest>(
            r#"{ "code": "123456", "action": "disable" }"#,
        );
        assert!(result.is_err());
    }
}
