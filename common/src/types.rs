//! 照合処理の型定義
//!
//! - CatalogEntry: 在庫カタログの1商品（外部から渡され、読み取り専用）
//! - ExtractionResult: OCRテキストからの抽出結果
//! - MatchResult: 候補とカタログ商品の照合結果

use serde::{Deserialize, Serialize};

/// 医師名・患者名が検出できなかった場合の表示値
pub const NOT_DETECTED: &str = "Not detected";

/// カタログの1商品
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub price: f64,

    #[serde(default)]
    pub manufacturer: String,

    #[serde(default)]
    pub requires_prescription: bool,

    #[serde(default = "default_in_stock")]
    pub in_stock: bool,

    /// 外部医薬品レジストリのコード（RxCUI等）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_code: Option<String>,
}

fn default_in_stock() -> bool {
    true
}

/// OCRテキストの抽出結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub doctor_name: String,
    pub patient_name: String,
    /// 医薬品名候補（抽出順、最大15件）
    pub medicines: Vec<String>,
}

impl Default for ExtractionResult {
    fn default() -> Self {
        Self {
            doctor_name: NOT_DETECTED.to_string(),
            patient_name: NOT_DETECTED.to_string(),
            medicines: Vec::new(),
        }
    }
}

impl ExtractionResult {
    pub fn has_candidates(&self) -> bool {
        !self.medicines.is_empty()
    }
}

/// 最大スコアを出した照合戦略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchStrategy {
    Exact,
    Containment,
    Variation,
    BrandGeneric,
    WordOverlap,
    PartialWord,
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStrategy::Exact => write!(f, "exact"),
            MatchStrategy::Containment => write!(f, "containment"),
            MatchStrategy::Variation => write!(f, "variation"),
            MatchStrategy::BrandGeneric => write!(f, "brand-generic"),
            MatchStrategy::WordOverlap => write!(f, "word-overlap"),
            MatchStrategy::PartialWord => write!(f, "partial-word"),
        }
    }
}

/// 照合結果（1候補 → 1商品）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// 照合元の候補文字列
    pub candidate: String,
    pub entry: CatalogEntry,
    /// 0.0〜0.95 のヒューリスティックな確信度
    pub confidence: f64,
    pub strategy: MatchStrategy,
    /// 外部レジストリで確認済みか
    #[serde(default)]
    pub verified: bool,
}
