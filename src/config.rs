use secrecy::SecretBox;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: SecretBox<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    // TOTP 設定
    /// TOTP発行者名（認証アプリに表示される）
    pub totp_issuer: String,
    /// TOTP検証の許容ウィンドウ（±Nステップ、1ステップ=30秒）
    #[serde(default = "default_totp_skew")]
    pub totp_skew: u8,

    // フィールド暗号化設定
    /// データ暗号化キー（Base64エンコードされた32バイトが理想。
    /// それ以外の値はパスフレーズとして PBKDF2 で256ビットに伸長される）
    pub data_encryption_key: SecretBox<String>,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TOTP_SKEW: u8 = 1;

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_totp_skew() -> u8 {
    DEFAULT_TOTP_SKEW
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}
