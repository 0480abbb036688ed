use data_encoding::BASE32;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;
use subtle::ConstantTimeEq;

use crate::error::AppError;

/// TOTPコードの桁数
const DIGITS: u32 = 6;

/// タイムステップ（秒）。RFC 6238 デフォルト
const TIME_STEP_SECS: u64 = 30;

/// 生成するシークレットの長さ（バイト）
const SECRET_LEN: usize = 20;

/// TOTP (Time-based One-Time Password) エンジン
///
/// RFC 4226 / 6238 準拠。HMACはSHA-1（RFCの規定。標準的な認証アプリとの
/// 互換性のために必須であり、独断でより強いハッシュに置き換えてはならない）。
///
/// # Security
/// - シークレット平文はログに出力しない
/// - コード比較は定数時間で行う
#[derive(Clone)]
pub struct TotpEngine {
    /// 検証時に許容する前後のステップ数（±skew × 30秒）
    skew: u8,
}

impl TotpEngine {
    /// 新しい TotpEngine を作成
    ///
    /// # Arguments
    /// * `skew` - 検証ウィンドウ（ステップ数）。1 で ±30秒、実効90秒。
    ///   リプレイ面がわずかに広がるが時計ずれ吸収のための標準的なトレードオフ
    pub fn new(skew: u8) -> Self {
        Self { skew }
    }

    /// 20バイトのランダムシークレットを生成し、Base32でエンコード
    pub fn generate_secret() -> String {
        let mut bytes = [0u8; SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        BASE32.encode(&bytes)
    }

    /// 認証アプリ登録用の otpauth URI を構築
    ///
    /// # Note
    /// QRコードへの変換はクライアント側の責務
    pub fn otpauth_url(issuer: &str, account: &str, secret: &str) -> String {
        format!(
            "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm=SHA1&digits={}&period={}",
            issuer, account, secret, issuer, DIGITS, TIME_STEP_SECS
        )
    }

    /// 指定カウンターの6桁コードを生成（HOTP、RFC 4226）
    ///
    /// 同一入力に対して常に同一のコードを返す純粋関数
    pub fn generate(&self, secret_base32: &str, counter: u64) -> Result<String, AppError> {
        let key = decode_secret_permissive(secret_base32)?;
        hotp(&key, counter)
    }

    /// 提示されたコードを現在時刻で検証
    pub fn verify(&self, secret_base32: &str, presented: &str) -> Result<bool, AppError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| {
                tracing::error!(error = ?e, "システム時刻取得エラー");
                AppError::Internal(anyhow::anyhow!("system time error"))
            })?
            .as_secs();

        self.verify_at(secret_base32, presented, now)
    }

    /// 提示されたコードを指定時刻で検証
    ///
    /// カウンター = unix時刻 / 30 を中心に ±skew ステップを許容し、
    /// いずれか一致すれば受理する
    pub fn verify_at(
        &self,
        secret_base32: &str,
        presented: &str,
        unix_time: u64,
    ) -> Result<bool, AppError> {
        // 入力検証: コードは6桁の数字のみ。不一致はエラーではなくデータ
        if presented.len() != DIGITS as usize || !presented.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(false);
        }

        let key = decode_secret_permissive(secret_base32)?;
        let counter = unix_time / TIME_STEP_SECS;
        let skew = self.skew as u64;

        let mut matched = false;
        for candidate in counter.saturating_sub(skew)..=counter.saturating_add(skew) {
            let expected = hotp(&key, candidate)?;
            // 定数時間比較（タイミングサイドチャネル対策）
            matched |= bool::from(expected.as_bytes().ct_eq(presented.as_bytes()));
        }

        Ok(matched)
    }
}

/// HOTP コード計算（RFC 4226 §5.3 動的トランケーション）
fn hotp(key: &[u8], counter: u64) -> Result<String, AppError> {
    let mut mac = Hmac::<Sha1>::new_from_slice(key).map_err(|e| {
        tracing::error!(error = ?e, "HMAC-SHA1初期化エラー");
        AppError::Internal(anyhow::anyhow!("hmac initialization error"))
    })?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // 末尾バイトの下位4ビットをオフセットとし、4バイト取り出して最上位ビットを落とす
    let offset = (digest[19] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);

    Ok(format!(
        "{:0width$}",
        binary % 10u32.pow(DIGITS),
        width = DIGITS as usize
    ))
}

/// 寛容な Base32 (RFC 4648) デコード
///
/// アルファベット外の文字（パディング・空白・ハイフン等）は読み飛ばし、
/// 小文字は大文字として扱う。標準的なTOTPツールの挙動に合わせた仕様で、
/// 保存済みシークレットは信頼できる生成器由来のため厳格に失敗させない
fn decode_secret_permissive(secret: &str) -> Result<Vec<u8>, AppError> {
    let mut out = Vec::with_capacity(secret.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for c in secret.bytes() {
        let value = match c.to_ascii_uppercase() {
            b @ b'A'..=b'Z' => (b - b'A') as u32,
            b @ b'2'..=b'7' => (b - b'2' + 26) as u32,
            _ => continue,
        };

        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
        }
    }

    if out.is_empty() {
        tracing::error!("シークレットにBase32文字が含まれない");
        return Err(AppError::Internal(anyhow::anyhow!("invalid base32 secret")));
    }

    Ok(out)
}
