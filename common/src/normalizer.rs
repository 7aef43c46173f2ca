//! 医薬品名の正規化
//!
//! - 小文字化
//! - 用量表記（`500mg`, `2.5 ml`, `10 tab` など）の除去
//! - 記号を空白に置換
//! - 連続空白の統一・前後空白の除去

use regex::Regex;

lazy_static::lazy_static! {
    /// 数値 + 単位。単位は語境界で終わる必要がある（`500mgx` は対象外）
    static ref DOSAGE_RE: Regex = Regex::new(
        r"\d+\.?\d*\s*(?:mcg|mg|ml|gm|g|tablet|tab|capsule|cap|syrup|injection|inj)\b"
    ).unwrap();
    static ref NON_ALNUM_RE: Regex = Regex::new(r"[^\p{L}\p{N}\s]").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// 医薬品名を比較用の正規形に変換する
///
/// 空文字や記号のみの入力は空文字を返す。
///
/// ```
/// use rx_match_common::normalize_name;
///
/// assert_eq!(normalize_name("Paracetamol 500mg Tablet"), "paracetamol tablet");
/// assert_eq!(normalize_name("  Azithromycin-500 MG "), "azithromycin");
/// ```
pub fn normalize_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let without_dosage = DOSAGE_RE.replace_all(&lower, " ");
    let spaced = NON_ALNUM_RE.replace_all(&without_dosage, " ");

    // 記号除去で `5-mg` → `5 mg` のように新たな用量表記が現れるため、不動点まで除去する
    let mut current = spaced.into_owned();
    loop {
        let next = DOSAGE_RE.replace_all(&current, " ");
        if next == current {
            break;
        }
        current = next.into_owned();
    }

    WHITESPACE_RE.replace_all(&current, " ").trim().to_string()
}

/// 正規化後の文字列を長さ2超の単語に分割する
pub fn significant_words(normalized: &str) -> Vec<&str> {
    normalized
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .collect()
}
