//! 処方箋1件の処理
//!
//! 抽出 → 照合 → （任意）レジストリ確認 の順に実行し、レポートを返す。
//! 抽出と照合は純粋関数で失敗しない。

use crate::registry::RegistryVerifier;
use rx_match_common::{
    extract_prescription_with, CatalogMatcher, ExtractOptions, Lexicon, MatchOptions, MatchResult, CatalogEntry,
};
use serde::{Deserialize, Serialize};

/// 処理オプション
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub threshold: f64,
    pub max_candidates: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            threshold: rx_match_common::DEFAULT_THRESHOLD,
            max_candidates: rx_match_common::MAX_CANDIDATES,
        }
    }
}

impl From<&crate::config::Config> for PipelineOptions {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            threshold: config.acceptance_threshold,
            max_candidates: config.max_candidates,
        }
    }
}

/// 処理結果の区分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    /// 医薬品候補が1件も抽出できなかった
    NoCandidates,
    /// 候補はあるが在庫商品と一致しなかった
    NoMatches,
    Matched,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionReport {
    /// 入力ファイル名（バッチ処理時）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub doctor_name: String,
    pub patient_name: String,
    pub candidates: Vec<String>,
    pub matches: Vec<MatchResult>,
    pub outcome: Outcome,
}

impl PrescriptionReport {
    pub fn verified_count(&self) -> usize {
        self.matches.iter().filter(|m| m.verified).count()
    }
}

/// OCRテキストを抽出・照合してレポートを作る
pub fn process_prescription(
    text: &str,
    catalog: &[CatalogEntry],
    lexicon: &Lexicon,
    options: &PipelineOptions,
) -> PrescriptionReport {
    let extraction = extract_prescription_with(
        text,
        lexicon,
        &ExtractOptions {
            max_candidates: options.max_candidates,
        },
    );

    let matcher = CatalogMatcher::with_options(
        lexicon,
        MatchOptions {
            threshold: options.threshold,
        },
    );
    let matches = matcher.match_candidates(&extraction.medicines, catalog);

    let outcome = if !extraction.has_candidates() {
        Outcome::NoCandidates
    } else if matches.is_empty() {
        Outcome::NoMatches
    } else {
        Outcome::Matched
    };

    tracing::info!(
        candidates = extraction.medicines.len(),
        matches = matches.len(),
        "処方箋を照合"
    );

    PrescriptionReport {
        source: None,
        doctor_name: extraction.doctor_name,
        patient_name: extraction.patient_name,
        candidates: extraction.medicines,
        matches,
        outcome,
    }
}

/// 照合済みの商品をレジストリで確認し、確認できた件数を返す
///
/// 照会に失敗した商品は `verified = false` のまま残す。
pub async fn verify_matches<V: RegistryVerifier>(report: &mut PrescriptionReport, verifier: &V) -> usize {
    let mut verified = 0;
    for result in &mut report.matches {
        match verifier.verify(&result.entry.name).await {
            Ok(v) => {
                result.verified = v.verified;
                if v.verified {
                    verified += 1;
                }
                tracing::debug!(
                    entry = %result.entry.name,
                    verified = v.verified,
                    match_type = ?v.match_type,
                    "レジストリ確認"
                );
            }
            Err(e) => {
                result.verified = false;
                tracing::warn!(entry = %result.entry.name, error = %e, "レジストリ確認に失敗");
            }
        }
    }
    verified
}
