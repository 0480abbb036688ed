use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extract::AuthenticatedUser;
use crate::state::AppState;

// === リカバリーコード発行 ===

#[derive(Debug, Serialize)]
pub struct GenerateRecoveryCodesResponse {
    pub codes: Vec<String>,
}

/// POST /api/mfa/recovery-codes
///
/// リカバリーコードを新規バッチで発行する（MFA有効化済みユーザーのみ）。
/// 旧バッチは同時に全て無効化される。
/// 平文コードが送信されるのはこのレスポンスの一度きり
///
/// # Security
/// - コード平文はログ出力禁止
pub async fn generate_recovery_codes(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<GenerateRecoveryCodesResponse>, AppError> {
    let codes = state.mfa_service.generate_recovery_codes(user_id).await?;

    Ok(Json(GenerateRecoveryCodesResponse { codes }))
}

// === リカバリーコード検証 ===

#[derive(Debug, Deserialize)]
pub struct VerifyRecoveryCodeRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyRecoveryCodeResponse {
    pub verified: bool,
}

/// POST /api/mfa/recovery-codes/verify
///
/// リカバリーコードを検証し、一致すればその場で消費する（一回限り使用）。
/// 不一致は 200 + verified:false の一様なレスポンス
/// （コードの残数や存在有無は漏らさない）
pub async fn verify_recovery_code(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<VerifyRecoveryCodeRequest>,
) -> Result<Json<VerifyRecoveryCodeResponse>, AppError> {
    // バリデーション
    validate_recovery_code(&request.code)?;

    let verified = state
        .mfa_service
        .verify_recovery_code(user_id, &request.code)
        .await?;

    Ok(Json(VerifyRecoveryCodeResponse { verified }))
}

// === Helper Functions ===

/// リカバリーコードバリデーション
///
/// # Note
/// 形式が正しくないコードは 400 ではなく検証不一致として扱われるため、
/// ここでは空チェックのみ行う（存在有無を漏らさない一様レスポンス）
fn validate_recovery_code(code: &str) -> Result<(), AppError> {
    if code.trim().is_empty() {
        return Err(AppError::Validation(
            "リカバリーコードは必須です".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_empty_code() {
        assert!(validate_recovery_code("").is_err());
        assert!(validate_recovery_code("   ").is_err());
    }

    #[test]
    fn test_validate_nonempty_code() {
        assert!(validate_recovery_code("a1b2c3d4").is_ok());
        // 形式違いはバリデーションでは落とさない（検証側で不一致になる）
        assert!(validate_recovery_code("UPPERCASE").is_ok());
    }

    #[test]
    fn test_codes_response_shape() {
        let body = serde_json::to_value(GenerateRecoveryCodesResponse {
            codes: vec!["a1b2c3d4".to_string()],
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "codes": ["a1b2c3d4"] }));
    }
}
