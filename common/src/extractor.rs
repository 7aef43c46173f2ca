//! OCRテキストからの候補抽出
//!
//! ## 処理フロー
//! 1. 空行を除いて行に分割
//! 2. 医師名・患者名の検出（行ごとにパターンを順番に適用、最初の一致を採用）
//! 3. 医薬品名候補の抽出
//!    - トークン走査: 全文を単語に分割し辞書と照合
//!    - 行パターン走査: 処方行らしい形から名前部分を切り出し辞書と照合
//! 4. 重複除去・先頭大文字化・最大15件に制限
//!
//! 候補が0件でもエラーにはしない（呼び出し側で「該当なし」として扱う）。

use crate::lexicon::Lexicon;
use crate::similarity::string_similarity;
use crate::types::{ExtractionResult, NOT_DETECTED};
use regex::Regex;
use std::collections::HashSet;

/// 候補数の上限
pub const MAX_CANDIDATES: usize = 15;

/// トークン走査で類似度一致とみなす閾値
const TOKEN_SIMILARITY: f64 = 0.8;
/// 行パターン走査で類似度一致とみなす閾値
const LINE_SIMILARITY: f64 = 0.7;

/// 行パターン走査で読み飛ばす見出し語
const STRUCTURAL_KEYWORDS: &[&str] = &[
    "prescription",
    "clinic",
    "hospital",
    "doctor",
    "patient",
    "date",
    "signature",
    "stamp",
];

lazy_static::lazy_static! {
    static ref DOCTOR_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\bdr\.?\s+([a-z][a-z.\s]*)").unwrap(),
        Regex::new(r"(?i)\bdoctor\s*:?\s*([a-z][a-z.\s]*)").unwrap(),
        Regex::new(r"(?i)\bphysician\s*:?\s*([a-z][a-z.\s]*)").unwrap(),
        Regex::new(r"(?i)\bconsultant\s*:?\s*([a-z][a-z.\s]*)").unwrap(),
    ];

    static ref PATIENT_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\bpatient(?:'s)?(?:\s*name)?\s*:?\s*([a-z][a-z.\s]*)").unwrap(),
        Regex::new(r"(?i)\bname\s*:?\s*([a-z][a-z.\s]*)").unwrap(),
        Regex::new(r"(?i)\b(?:mrs|mr|ms|miss)\.?\s*([a-z][a-z.\s]*)").unwrap(),
    ];

    /// 名前の後ろに続く項目名（`Ravi Kumar Age 34` の `Age` 以降を切る）
    static ref NAME_TAIL_RE: Regex = Regex::new(
        r"(?i)\s+(?:age|sex|gender|date|mob|mobile|phone|ph|reg|mbbs|md)\b.*$"
    ).unwrap();

    /// 処方行の形（順番に適用し、最初に一致した形を採用）
    static ref LINE_PATTERNS: Vec<Regex> = vec![
        // 番号付きの行: "1. Tab Dolo 650mg"
        Regex::new(r"(?i)^\s*\d+\s*[.):\-]\s*(.+)$").unwrap(),
        // 名前 + 用量: "Amoxicillin 500mg"
        Regex::new(r"(?i)([a-z][a-z\s\-]{2,}?)\s*\d+\.?\d*\s*(?:mcg|mg|ml|gm|g|iu)\b").unwrap(),
        // 剤形 + 名前: "Tab. Pantop"
        Regex::new(r"(?i)\b(?:tablet|tab|capsule|cap|syrup|syp|injection|inj)s?\.?\s+([a-z][a-z0-9\s\-]*)").unwrap(),
        // 名前（用量）: "Montair (10)"
        Regex::new(r"(?i)([a-z][a-z\s\-]*?)\s*\(\s*\d[^)]*\)").unwrap(),
        // 名前だけの行: "Cetirizine"
        Regex::new(r"(?i)^\s*([a-z][a-z\s\-]{2,24})\s*$").unwrap(),
    ];

    static ref TOKEN_SPLIT_RE: Regex = Regex::new(r"[^\p{L}\p{N}]+").unwrap();
    static ref LEADING_NUMBER_RE: Regex = Regex::new(r"^\s*\d+\s*[.):\-]?\s*").unwrap();
    static ref DASH_TAIL_RE: Regex = Regex::new(r"\s+[-–—]+.*$").unwrap();
    /// 服用回数・日数・服用時期の指示（`1-0-1`、`x 5 days`、`before breakfast`）以降
    static ref FREQUENCY_TAIL_RE: Regex = Regex::new(
        r"(?i)\s+(?:\d+\s*-\s*\d+\s*-\s*\d+|x\s*\d+\s*(?:days?|weeks?|months?)\b|(?:before|after|with)\s+(?:food|meals?|breakfast|lunch|dinner)\b|(?:once|twice|thrice)\b|for\s+\d+\s*(?:days?|weeks?|months?)\b).*$"
    ).unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// 抽出オプション
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// 候補数の上限
    pub max_candidates: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_candidates: MAX_CANDIDATES,
        }
    }
}

/// OCRテキストから医師名・患者名・医薬品候補を抽出する
pub fn extract_prescription(text: &str, lexicon: &Lexicon) -> ExtractionResult {
    extract_prescription_with(text, lexicon, &ExtractOptions::default())
}

/// オプション指定版
///
/// `max_candidates` は 15 を超えて指定しても 15 件に制限される。
pub fn extract_prescription_with(
    text: &str,
    lexicon: &Lexicon,
    options: &ExtractOptions,
) -> ExtractionResult {
    let lines = split_lines(text);

    let doctor = detect_doctor_name(&lines);
    let patient = detect_patient_name(&lines, doctor.as_deref());

    // 検出した人名の語は医薬品候補にしない
    let name_tokens: HashSet<String> = doctor
        .iter()
        .chain(patient.iter())
        .flat_map(|name| tokenize(name))
        .collect();

    let mut medicines = Vec::new();
    let mut seen = HashSet::new();
    let limit = options.max_candidates.min(MAX_CANDIDATES);

    let from_tokens = token_scan(text, lexicon, &name_tokens);
    let from_lines = line_scan(&lines, lexicon);

    for candidate in from_tokens.into_iter().chain(from_lines) {
        if medicines.len() >= limit {
            break;
        }
        let key = collapse_whitespace(&candidate.to_lowercase());
        if key.is_empty() || name_tokens.contains(&key) {
            continue;
        }
        if seen.insert(key.clone()) {
            medicines.push(title_case(&key));
        }
    }

    tracing::debug!(
        candidates = medicines.len(),
        doctor = doctor.as_deref().unwrap_or(NOT_DETECTED),
        "処方箋テキストの抽出完了"
    );

    ExtractionResult {
        doctor_name: doctor.unwrap_or_else(|| NOT_DETECTED.to_string()),
        patient_name: patient.unwrap_or_else(|| NOT_DETECTED.to_string()),
        medicines,
    }
}

/// 空行を除いた行一覧
fn split_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect()
}

/// 医師名を検出
pub fn detect_doctor_name(lines: &[&str]) -> Option<String> {
    find_name(lines, &DOCTOR_PATTERNS, None)
}

/// 患者名を検出（医師名と同じものは除外）
pub fn detect_patient_name(lines: &[&str], doctor: Option<&str>) -> Option<String> {
    find_name(lines, &PATIENT_PATTERNS, doctor)
}

fn find_name(lines: &[&str], patterns: &[Regex], exclude: Option<&str>) -> Option<String> {
    for line in lines {
        for pattern in patterns {
            let Some(caps) = pattern.captures(line) else {
                continue;
            };
            let Some(raw) = caps.get(1) else {
                continue;
            };

            let name = clean_name(raw.as_str());
            let len = name.chars().count();
            if len <= 2 || len >= 40 {
                continue;
            }
            if let Some(excluded) = exclude {
                if name.eq_ignore_ascii_case(excluded) {
                    continue;
                }
            }
            return Some(name);
        }
    }
    None
}

fn clean_name(raw: &str) -> String {
    let without_tail = NAME_TAIL_RE.replace(raw, "");
    let trimmed = without_tail
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());
    collapse_whitespace(trimmed)
}

/// トークン走査: 全文を単語に分割し、辞書の医薬品名と照合する
pub fn token_scan(text: &str, lexicon: &Lexicon, excluded: &HashSet<String>) -> Vec<String> {
    let mut found = Vec::new();

    for token in tokenize(text) {
        if token.chars().count() <= 2
            || token.chars().all(|c| c.is_numeric())
            || lexicon.is_stopword(&token)
            || lexicon.is_dosage_form(&token)
            || excluded.contains(&token)
        {
            continue;
        }

        if lexicon.medicines().iter().any(|m| token_matches(&token, m)) {
            tracing::debug!(token = %token, "トークン走査で候補を検出");
            found.push(token);
        }
    }

    found
}

fn token_matches(token: &str, medicine: &str) -> bool {
    if token == medicine {
        return true;
    }

    let token_len = token.chars().count();
    let medicine_len = medicine.chars().count();

    if token_len >= 3 && medicine_len >= 3 && (token.contains(medicine) || medicine.contains(token)) {
        return true;
    }

    token_len >= 4 && string_similarity(token, medicine) > TOKEN_SIMILARITY
}

/// 行パターン走査: 処方行の形から名前部分を切り出し、辞書と照合する
pub fn line_scan(lines: &[&str], lexicon: &Lexicon) -> Vec<String> {
    let mut found = Vec::new();

    for line in lines {
        let lower = line.to_lowercase();
        if STRUCTURAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
            continue;
        }

        let Some(captured) = LINE_PATTERNS
            .iter()
            .find_map(|p| p.captures(line).and_then(|c| c.get(1)))
        else {
            continue;
        };

        let cleaned = clean_line_candidate(captured.as_str());
        let len = cleaned.chars().count();
        if !(3..=25).contains(&len) {
            continue;
        }

        let cleaned_lower = cleaned.to_lowercase();
        if lexicon
            .medicines()
            .iter()
            .any(|m| line_matches(&cleaned_lower, m))
        {
            tracing::debug!(line = %line, candidate = %cleaned, "行パターン走査で候補を検出");
            found.push(cleaned);
        }
    }

    found
}

fn line_matches(candidate: &str, medicine: &str) -> bool {
    (medicine.chars().count() >= 3 && (candidate.contains(medicine) || medicine.contains(candidate)))
        || string_similarity(candidate, medicine) > LINE_SIMILARITY
}

/// 先頭の番号・ダッシュ以降の補足・服用指示を除き、空白を統一する
///
/// ダッシュは前に空白がある場合のみ区切りとみなす（`Co-trimoxazole` は残す）。
fn clean_line_candidate(raw: &str) -> String {
    let without_number = LEADING_NUMBER_RE.replace(raw, "");
    let without_tail = DASH_TAIL_RE.replace(&without_number, "");
    let without_frequency = FREQUENCY_TAIL_RE.replace(&without_tail, "");
    collapse_whitespace(&without_frequency)
}

fn tokenize(text: &str) -> Vec<String> {
    TOKEN_SPLIT_RE
        .split(text)
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// 語ごとに先頭を大文字、残りを小文字にする
fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
CITY CARE CLINIC
Dr. Anil Sharma MBBS
Patient Name: Ravi Kumar  Age: 34
Date: 12/03/2024

1. Tab Dolo 650mg - after food
2. Azithromycin 500mg
3. Cap. Omez 20
Montair (10)
Cetirizine
Drink plenty of water
Signature";

    #[test]
    fn test_detects_doctor_and_patient() {
        let lexicon = Lexicon::builtin();
        let result = extract_prescription(SAMPLE, &lexicon);
        assert_eq!(result.doctor_name, "Anil Sharma");
        assert_eq!(result.patient_name, "Ravi Kumar");
    }

    #[test]
    fn test_extracts_medicines() {
        let lexicon = Lexicon::builtin();
        let result = extract_prescription(SAMPLE, &lexicon);
        let meds = &result.medicines;

        for expected in ["Dolo", "Azithromycin", "Omez", "Montair", "Cetirizine"] {
            assert!(meds.contains(&expected.to_string()), "missing {} in {:?}", expected, meds);
        }
        assert!(!meds.iter().any(|m| m == "Ravi" || m == "Kumar" || m == "Water"));
    }

    #[test]
    fn test_token_candidates_come_first() {
        let lexicon = Lexicon::builtin();
        let result = extract_prescription(SAMPLE, &lexicon);
        assert_eq!(result.medicines.first().map(String::as_str), Some("Dolo"));
    }

    #[test]
    fn test_frequency_tail_stripped() {
        let lexicon = Lexicon::builtin();
        let result = extract_prescription(
            "Tab Dolo 650 1-0-1 x 5 days\nCap Omez 20 before breakfast",
            &lexicon,
        );
        let meds = &result.medicines;
        assert!(meds.contains(&"Dolo 650".to_string()), "{:?}", meds);
        assert!(meds.contains(&"Omez 20".to_string()), "{:?}", meds);
        assert!(!meds.iter().any(|m| m.contains("1-0-1") || m.contains("Days") || m.contains("Breakfast")));
    }

    #[test]
    fn test_clean_line_candidate_keeps_hyphenated_name() {
        assert_eq!(clean_line_candidate("Co-trimoxazole 480 x 3 days"), "Co-trimoxazole 480");
        assert_eq!(clean_line_candidate("2. Dolo 650 - after food"), "Dolo 650");
        assert_eq!(clean_line_candidate("Montair 10 once at night"), "Montair 10");
    }

    #[test]
    fn test_advice_abbreviation_not_candidate() {
        let lexicon = Lexicon::builtin();
        let result = extract_prescription("Adv: walk daily, low salt diet\nRx\nSig: as directed", &lexicon);
        assert!(result.medicines.is_empty(), "{:?}", result.medicines);
    }

    #[test]
    fn test_dedup_case_insensitive() {
        let lexicon = Lexicon::builtin();
        let result = extract_prescription("Cetirizine\nCETIRIZINE\ncetirizine", &lexicon);
        assert_eq!(result.medicines, vec!["Cetirizine".to_string()]);
    }

    #[test]
    fn test_ocr_error_token() {
        let lexicon = Lexicon::builtin();
        // paracetamol の1文字欠け
        let result = extract_prescription("Paracetmol twice daily", &lexicon);
        assert_eq!(result.medicines, vec!["Paracetmol".to_string()]);
    }

    #[test]
    fn test_empty_and_garbage_text() {
        let lexicon = Lexicon::builtin();
        let empty = extract_prescription("", &lexicon);
        assert!(empty.medicines.is_empty());
        assert_eq!(empty.doctor_name, NOT_DETECTED);
        assert_eq!(empty.patient_name, NOT_DETECTED);

        let garbage = extract_prescription("\u{0}\u{1}#@!%%^ ~~ ||| \n\n\t", &lexicon);
        assert!(garbage.medicines.is_empty());
    }

    #[test]
    fn test_cap_at_fifteen() {
        let lexicon = Lexicon::builtin();
        let text = lexicon.medicines().join("\n");
        let result = extract_prescription(&text, &lexicon);
        assert_eq!(result.medicines.len(), MAX_CANDIDATES);
    }

    #[test]
    fn test_option_cannot_exceed_cap() {
        let lexicon = Lexicon::builtin();
        let text = lexicon.medicines().join(" ");
        let options = ExtractOptions { max_candidates: 100 };
        let result = extract_prescription_with(&text, &lexicon, &options);
        assert_eq!(result.medicines.len(), MAX_CANDIDATES);

        let options = ExtractOptions { max_candidates: 3 };
        let result = extract_prescription_with(&text, &lexicon, &options);
        assert_eq!(result.medicines.len(), 3);
    }

    #[test]
    fn test_patient_differs_from_doctor() {
        let lines = vec!["Dr. Meera Nair", "Name: Meera Nair", "Mrs. Lata Iyer"];
        let doctor = detect_doctor_name(&lines);
        assert_eq!(doctor.as_deref(), Some("Meera Nair"));
        let patient = detect_patient_name(&lines, doctor.as_deref());
        assert_eq!(patient.as_deref(), Some("Lata Iyer"));
    }

    #[test]
    fn test_name_length_bounds() {
        let lines = vec!["Dr. Al", "Dr. Raj"];
        assert_eq!(detect_doctor_name(&lines).as_deref(), Some("Raj"));
    }

    #[test]
    fn test_line_scan_skips_structural_lines() {
        let lexicon = Lexicon::builtin();
        let lines = vec!["Apollo Hospital Pharmacy Metformin", "Metformin 500mg"];
        let found = line_scan(&lines, &lexicon);
        assert_eq!(found, vec!["Metformin".to_string()]);
    }

    #[test]
    fn test_line_cleaning() {
        assert_eq!(clean_line_candidate("2)  Pantop   40 - before breakfast"), "Pantop 40");
        assert_eq!(clean_line_candidate("Co-trimoxazole"), "Co-trimoxazole");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("tab dolo 650mg"), "Tab Dolo 650mg");
        assert_eq!(title_case("b12"), "B12");
    }
}
