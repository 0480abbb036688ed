use rand::Rng;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppError;
use crate::repositories::RecoveryCodeRepository;

/// 1バッチあたりのコード数
const BATCH_SIZE: usize = 10;

/// コード長（文字数）
const CODE_LEN: usize = 8;

/// コード文字種（英小文字 + 数字、36種）
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// リカバリーコードサービス
///
/// # Security
/// - 平文コードは生成時に一度だけ返し、DBにはSHA256ハッシュのみ保存
/// - 平文コードはログに出力しない
#[derive(Clone)]
pub struct RecoveryCodeService {
    recovery_code_repo: RecoveryCodeRepository,
}

impl RecoveryCodeService {
    /// 新しい RecoveryCodeService を作成
    pub fn new(recovery_code_repo: RecoveryCodeRepository) -> Self {
        Self { recovery_code_repo }
    }

    /// リカバリーコードを新しいバッチで発行する
    ///
    /// 旧バッチは単一トランザクション内で全削除される。
    /// 新旧コードが同時に有効な期間は存在しない
    pub async fn generate_batch(&self, user_id: Uuid) -> Result<Vec<String>, AppError> {
        let codes = generate_codes();
        let hashes: Vec<String> = codes.iter().map(|c| hash_code(c)).collect();

        self.recovery_code_repo.replace_all(user_id, &hashes).await?;

        tracing::info!(user_id = %user_id, count = codes.len(), "リカバリーコード発行");

        Ok(codes)
    }

    /// 提示されたリカバリーコードを検証し、一致すれば消費する
    ///
    /// 一致した行はその場で削除される（一回限り使用）。
    /// 不一致時は残数等の情報を漏らさず false のみ返す。
    /// 入力は前後空白を除去し小文字化してから照合する
    pub async fn verify_and_consume(&self, user_id: Uuid, code: &str) -> Result<bool, AppError> {
        let code_hash = hash_code(&code.trim().to_lowercase());
        let consumed = self.recovery_code_repo.consume(user_id, &code_hash).await?;

        match consumed {
            Some(_) => {
                tracing::info!(user_id = %user_id, "リカバリーコード使用");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// 暗号学的乱数で BATCH_SIZE 件のコードを生成
fn generate_codes() -> Vec<String> {
    (0..BATCH_SIZE)
        .map(|_| {
            (0..CODE_LEN)
                .map(|_| ALPHABET[OsRng.gen_range(0..ALPHABET.len())] as char)
                .collect()
        })
        .collect()
}

/// コードをSHA256でハッシュ化（16進文字列）
fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_batch_shape() {
        let codes = generate_codes();
        assert_eq!(codes.len(), 10);
        for code in &codes {
            assert_eq!(code.len(), 8);
            assert!(code.bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_batch_uniqueness() {
        // 36^8 空間からの10件抽選。衝突確率は無視できる
        let codes = generate_codes();
        let unique: HashSet<&String> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn test_hash_code_known_vector() {
        assert_eq!(
            hash_code("abcd1234"),
            "e9cee71ab932fde863338d08be4de9dfe39ea049bdafb342ce659ec5450b69ae"
        );
    }

    #[test]
    fn test_hash_code_is_deterministic() {
        let codes = generate_codes();
        assert_eq!(hash_code(&codes[0]), hash_code(&codes[0]));
        assert_ne!(hash_code(&codes[0]), hash_code(&codes[1]));
    }

    #[test]
    fn test_one_time_use_contract() {
        // consume はハッシュ一致行の削除として実装される。
        // 同一コードの2回目の提示は必ず失敗する
        let codes = generate_codes();
        let mut stored: HashSet<String> = codes.iter().map(|c| hash_code(c)).collect();

        assert!(stored.remove(&hash_code(&codes[3])));
        assert!(!stored.remove(&hash_code(&codes[3])));
    }

    #[test]
    fn test_batch_replacement_invalidates_previous() {
        // replace_all 後は旧バッチのハッシュが1つも残らない
        let old_batch: HashSet<String> = generate_codes().iter().map(|c| hash_code(c)).collect();
        let new_batch: HashSet<String> = generate_codes().iter().map(|c| hash_code(c)).collect();

        assert!(old_batch.is_disjoint(&new_batch));
    }
}
