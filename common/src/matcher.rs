//! カタログ照合
//!
//! 抽出順に候補を処理する貪欲法。各候補について未割当の在庫商品すべてを採点し、
//! 最高スコアが閾値を超えた場合のみその商品を割り当てる。
//! 割当済み商品は以降の候補の対象から外れる（1商品につき1候補まで）。
//!
//! 割当状態は1回の照合呼び出しの中だけで持つため、並行して複数の処方箋を
//! 照合しても互いに影響しない。

use crate::lexicon::Lexicon;
use crate::normalizer::normalize_name;
use crate::similarity::{partial_word_score, similarity_normalized, Score, EXACT_SCORE};
use crate::synonyms::BRAND_GENERIC_SCORE;
use crate::types::{CatalogEntry, MatchResult, MatchStrategy};
use std::collections::HashSet;

/// 採用閾値（これを超えたスコアのみ採用）
pub const DEFAULT_THRESHOLD: f64 = 0.3;

/// 包含一致の固定スコア
const CONTAINMENT_SCORE: f64 = 0.85;

/// 照合オプション
#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// 採用閾値
    pub threshold: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// カタログ照合器
#[derive(Debug, Clone)]
pub struct CatalogMatcher<'a> {
    lexicon: &'a Lexicon,
    options: MatchOptions,
}

impl<'a> CatalogMatcher<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self::with_options(lexicon, MatchOptions::default())
    }

    pub fn with_options(lexicon: &'a Lexicon, options: MatchOptions) -> Self {
        Self { lexicon, options }
    }

    /// 候補1件とカタログ商品名のスコア
    pub fn score(&self, candidate: &str, catalog_name: &str) -> Score {
        let cand = normalize_name(candidate);
        let cat = normalize_name(catalog_name);
        self.score_normalized(&cand, &cat)
    }

    fn score_normalized(&self, cand: &str, cat: &str) -> Score {
        if cand.is_empty() || cat.is_empty() {
            return Score::zero();
        }

        let mut best = Score::zero();

        if cand == cat {
            best = best.max(Score::new(EXACT_SCORE, MatchStrategy::Exact));
        }
        if cat.contains(cand) || cand.contains(cat) {
            best = best.max(Score::new(CONTAINMENT_SCORE, MatchStrategy::Containment));
        }

        best = best.max(similarity_normalized(cand, cat, self.lexicon));

        if self.lexicon.synonyms().is_brand_generic_pair(cand, cat) {
            best = best.max(Score::new(BRAND_GENERIC_SCORE, MatchStrategy::BrandGeneric));
        }

        best.max(Score::new(
            partial_word_score(cand, cat),
            MatchStrategy::PartialWord,
        ))
    }

    /// 候補リストを在庫カタログと照合する
    ///
    /// - 在庫切れの商品は照合前に除外
    /// - 候補は渡された順に処理（貪欲法、全体最適ではない）
    /// - 閾値以下の候補は結果に含めない
    pub fn match_candidates<S: AsRef<str>>(
        &self,
        candidates: &[S],
        catalog: &[CatalogEntry],
    ) -> Vec<MatchResult> {
        let in_stock: Vec<(&CatalogEntry, String)> = catalog
            .iter()
            .filter(|e| e.in_stock)
            .map(|e| (e, normalize_name(&e.name)))
            .collect();

        let mut claimed: HashSet<&str> = HashSet::new();
        let mut results = Vec::new();

        for candidate in candidates {
            let candidate: &str = candidate.as_ref();
            let cand = normalize_name(candidate);
            if cand.is_empty() {
                continue;
            }

            let mut best: Option<(&CatalogEntry, Score)> = None;
            for (entry, normalized) in &in_stock {
                if claimed.contains(entry.id.as_str()) {
                    continue;
                }
                let score = self.score_normalized(&cand, normalized);
                if best.map_or(true, |(_, b)| score.value > b.value) {
                    best = Some((*entry, score));
                }
            }

            match best {
                Some((entry, score)) if score.value > self.options.threshold => {
                    tracing::debug!(
                        candidate = %candidate,
                        entry = %entry.name,
                        confidence = score.value,
                        strategy = %score.strategy,
                        "候補を割当"
                    );
                    claimed.insert(entry.id.as_str());
                    results.push(MatchResult {
                        candidate: candidate.to_string(),
                        entry: entry.clone(),
                        confidence: score.value,
                        strategy: score.strategy,
                        verified: false,
                    });
                }
                Some((entry, score)) => {
                    tracing::debug!(
                        candidate = %candidate,
                        best = %entry.name,
                        confidence = score.value,
                        "閾値以下のため破棄"
                    );
                }
                None => {
                    tracing::debug!(candidate = %candidate, "割当可能な在庫商品なし");
                }
            }
        }

        results
    }
}

/// 既定の設定で照合する
pub fn match_candidates<S: AsRef<str>>(
    candidates: &[S],
    catalog: &[CatalogEntry],
    lexicon: &Lexicon,
) -> Vec<MatchResult> {
    CatalogMatcher::new(lexicon).match_candidates(candidates, catalog)
}
