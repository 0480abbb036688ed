//! 表示用マスキングヘルパー
//!
//! ログや画面表示で機密値の末尾のみを見せるための整形関数。
//! 暗号学的な役割は一切持たない。

/// 値の末尾 `visible` 文字だけを残してマスクする
///
/// 文字数が `visible` 以下の場合は全文字をマスクする。
pub fn mask_tail(value: &str, visible: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= visible {
        return "*".repeat(chars.len());
    }
    let masked = chars.len() - visible;
    let mut out = "*".repeat(masked);
    out.extend(&chars[masked..]);
    out
}

/// メールアドレスのローカル部をマスクする
///
/// 先頭1文字のみ残す（1文字以下なら全てマスク）。
/// `@` を含まない入力は `mask_tail(value, 0)` 相当で全文字マスク。
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let chars: Vec<char> = local.chars().collect();
            if chars.len() <= 1 {
                format!("{}@{}", "*".repeat(chars.len()), domain)
            } else {
                format!("{}{}@{}", chars[0], "*".repeat(chars.len() - 1), domain)
            }
        }
        None => "*".repeat(email.chars().count()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_tail_card_number() {
        assert_eq!(mask_tail("4111111111111234", 4), "************1234");
    }

    #[test]
    fn test_mask_tail_short_value() {
        // visible 以下の長さは全てマスク
        assert_eq!(mask_tail("1234", 4), "****");
        assert_eq!(mask_tail("123", 4), "***");
    }

    #[test]
    fn test_mask_tail_empty() {
        assert_eq!(mask_tail("", 4), "");
    }

    #[test]
    fn test_mask_tail_multibyte() {
        // バイト境界ではなく文字単位でマスクする
        assert_eq!(mask_tail("山田太郎1234", 4), "****1234");
    }

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("alice@example.com"), "a****@example.com");
    }

    #[test]
    fn test_mask_email_single_char_local() {
        assert_eq!(mask_email("a@example.com"), "*@example.com");
    }

    #[test]
    fn test_mask_email_without_at() {
        assert_eq!(mask_email("not-an-email"), "************");
    }
}
