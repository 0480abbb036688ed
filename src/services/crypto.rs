use aes_gcm::{
    Aes256Gcm, KeyInit, Nonce,
    aead::{Aead, OsRng},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::RngCore;

use crate::error::AppError;

/// 暗号化済みデータのマーカープレフィックス
const ENC_MARKER: &str = "enc:";

/// AES-GCM nonce 長（96ビット）
const NONCE_LEN: usize = 12;

/// GCM 認証タグ長（128ビット）
const TAG_LEN: usize = 16;

/// パスフレーズ伸長用の固定アプリケーションソルト
const PBKDF2_SALT: &[u8] = b"mfagate.field-cipher.v1";

/// パスフレーズ伸長のイテレーション回数
const PBKDF2_ITERATIONS: u32 = 100_000;

/// 復号結果
///
/// マーカーなしのレガシー平文データをそのまま返すパススルー経路を、
/// 型で明示的に区別する。呼び出し側は未暗号化データを
/// 「検証済み」として誤って扱えない
#[derive(Debug, PartialEq, Eq)]
pub enum Decrypted {
    /// `enc:` マーカー付き暗号文を復号した値
    Value(String),
    /// マーカーなしでそのまま返された値（未暗号化のレガシーデータ）
    Plaintext(String),
}

impl Decrypted {
    pub fn into_inner(self) -> String {
        match self {
            Self::Value(s) | Self::Plaintext(s) => s,
        }
    }
}

/// フィールド暗号化サービス
///
/// TOTPシークレット等の短い文字列をAES-256-GCMで暗号化してDB保存する。
///
/// # Security
/// - 鍵素材・派生鍵・平文はログに出力しない
/// - 認証タグ不一致は必ず AppError::Integrity として表面化させる
#[derive(Clone)]
pub struct FieldCipher {
    key: [u8; 32],
}

impl FieldCipher {
    /// 鍵素材から FieldCipher を作成
    ///
    /// Base64デコードしてちょうど32バイトならそのままAES-256鍵として使用。
    /// それ以外は生のUTF-8バイト列をPBKDF2（SHA-256、100,000回、固定ソルト）
    /// のパスワードとして256ビット鍵へ伸長する。
    /// 事前生成したランダム鍵と運用者が選んだパスフレーズの両方を許容する
    pub fn new(key_material: &str) -> Result<Self, AppError> {
        if key_material.is_empty() {
            return Err(AppError::Configuration(
                "data_encryption_key が空です".to_string(),
            ));
        }

        let key = match STANDARD.decode(key_material) {
            Ok(bytes) if bytes.len() == 32 => {
                let mut key = [0u8; 32];
                key.copy_from_slice(&bytes);
                key
            }
            _ => {
                // パスフレーズとして伸長（Base64デコードはしない）
                let mut key = [0u8; 32];
                pbkdf2::pbkdf2_hmac::<sha2::Sha256>(
                    key_material.as_bytes(),
                    PBKDF2_SALT,
                    PBKDF2_ITERATIONS,
                    &mut key,
                );
                key
            }
        };

        Ok(Self { key })
    }

    /// 平文をAES-256-GCMで暗号化
    ///
    /// # Returns
    /// `enc:` + Base64(nonce 12バイト || 暗号文 || タグ 16バイト)
    pub fn encrypt(&self, plaintext: &str) -> Result<String, AppError> {
        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|e| {
            tracing::error!(error = ?e, "AES-GCM暗号化器の初期化エラー");
            AppError::Internal(anyhow::anyhow!("cipher initialization error"))
        })?;

        // 呼び出しごとに新しい96ビットランダムnonceを生成
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher.encrypt(nonce, plaintext.as_bytes()).map_err(|e| {
            tracing::error!(error = ?e, "フィールド暗号化エラー");
            AppError::Internal(anyhow::anyhow!("encryption error"))
        })?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);

        Ok(format!("{}{}", ENC_MARKER, STANDARD.encode(blob)))
    }

    /// 保存値を復号
    ///
    /// マーカーなしの値は未暗号化のレガシーデータとしてそのまま返す
    /// （段階的移行のための意図的な挙動）。
    /// マーカー付きで復号に失敗した場合は AppError::Integrity
    pub fn decrypt(&self, stored: &str) -> Result<Decrypted, AppError> {
        let Some(encoded) = stored.strip_prefix(ENC_MARKER) else {
            return Ok(Decrypted::Plaintext(stored.to_string()));
        };

        let blob = STANDARD.decode(encoded).map_err(|e| {
            tracing::error!(error = ?e, "暗号化データのBase64デコードエラー");
            AppError::Integrity
        })?;

        if blob.len() < NONCE_LEN + TAG_LEN {
            tracing::error!(len = blob.len(), "暗号化データが短すぎる");
            return Err(AppError::Integrity);
        }

        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|e| {
            tracing::error!(error = ?e, "AES-GCM暗号化器の初期化エラー");
            AppError::Internal(anyhow::anyhow!("cipher initialization error"))
        })?;

        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        // タグ不一致はここで失敗する。握りつぶし禁止
        let plaintext = cipher.decrypt(nonce, ciphertext).map_err(|_| {
            tracing::error!("復号失敗（認証タグ不一致）");
            AppError::Integrity
        })?;

        let plaintext = String::from_utf8(plaintext).map_err(|e| {
            tracing::error!(error = ?e, "復号データのUTF-8変換エラー");
            AppError::Integrity
        })?;

        Ok(Decrypted::Value(plaintext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_cipher() -> FieldCipher {
        // テスト用の32バイト鍵
        let key_base64 = STANDARD.encode([7u8; 32]);
        FieldCipher::new(&key_base64).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = create_cipher();
        let plaintext = "JBSWY3DPEHPK3PXP";

        let encrypted = cipher.encrypt(plaintext).unwrap();
        assert!(encrypted.starts_with("enc:"));

        let decrypted = cipher.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted, Decrypted::Value(plaintext.to_string()));
    }

    #[test]
    fn test_roundtrip_arbitrary_strings() {
        let cipher = create_cipher();
        for s in ["", "a", "日本語テキスト", "enc:looks-like-marker"] {
            let encrypted = cipher.encrypt(s).unwrap();
            assert_eq!(cipher.decrypt(&encrypted).unwrap().into_inner(), s);
        }
    }

    #[test]
    fn test_nonce_freshness() {
        // 同一平文でも呼び出しごとに異なる暗号文になる
        let cipher = create_cipher();
        let a = cipher.encrypt("secret").unwrap();
        let b = cipher.encrypt("secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_passthrough_without_marker() {
        let cipher = create_cipher();
        let result = cipher.decrypt("JBSWY3DPEHPK3PXP").unwrap();
        assert_eq!(result, Decrypted::Plaintext("JBSWY3DPEHPK3PXP".to_string()));
    }

    #[test]
    fn test_tamper_detection() {
        let cipher = create_cipher();
        let encrypted = cipher.encrypt("JBSWY3DPEHPK3PXP").unwrap();

        // Base64デコードして各バイトを反転し、完全性エラーになることを確認
        let blob = STANDARD.decode(encrypted.strip_prefix("enc:").unwrap()).unwrap();
        for i in 0..blob.len() {
            let mut tampered = blob.clone();
            tampered[i] ^= 0x01;
            let stored = format!("enc:{}", STANDARD.encode(&tampered));
            match cipher.decrypt(&stored) {
                Err(AppError::Integrity) => {}
                other => panic!("byte {} flip not detected: {:?}", i, other),
            }
        }
    }

    #[test]
    fn test_wrong_key_fails_closed() {
        let cipher = create_cipher();
        let encrypted = cipher.encrypt("secret").unwrap();

        let other = FieldCipher::new(&STANDARD.encode([9u8; 32])).unwrap();
        assert!(matches!(other.decrypt(&encrypted), Err(AppError::Integrity)));
    }

    #[test]
    fn test_truncated_blob_is_integrity_error() {
        let cipher = create_cipher();
        assert!(matches!(cipher.decrypt("enc:AAAA"), Err(AppError::Integrity)));
        assert!(matches!(
            cipher.decrypt("enc:not-base64!!!"),
            Err(AppError::Integrity)
        ));
    }

    #[test]
    fn test_passphrase_key_derivation() {
        // 32バイトのBase64でない鍵素材はパスフレーズとして伸長される
        let cipher = FieldCipher::new("correct horse battery staple").unwrap();
        let encrypted = cipher.encrypt("secret").unwrap();
        assert_eq!(
            cipher.decrypt(&encrypted).unwrap(),
            Decrypted::Value("secret".to_string())
        );

        // 同一パスフレーズからは同一鍵が派生する（別インスタンスで復号可能）
        let cipher2 = FieldCipher::new("correct horse battery staple").unwrap();
        assert_eq!(cipher2.decrypt(&encrypted).unwrap().into_inner(), "secret");

        // 異なるパスフレーズでは復号できない
        let cipher3 = FieldCipher::new("wrong passphrase").unwrap();
        assert!(matches!(cipher3.decrypt(&encrypted), Err(AppError::Integrity)));
    }

    #[test]
    fn test_empty_key_material_rejected() {
        assert!(matches!(
            FieldCipher::new(""),
            Err(AppError::Configuration(_))
        ));
    }
}
