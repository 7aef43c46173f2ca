//! 類似度スコア計算
//!
//! 候補文字列とカタログ商品名の類似度を 0.0〜0.95 で返す。
//! 複数の戦略を評価し、最大値を採用する（最初に当たった戦略ではない）。
//!
//! | 戦略 | スコア |
//! |---|---|
//! | 正規化後の完全一致 | 0.95 |
//! | 包含（カタログ ⊇ 候補） | 0.9 × 候補長 / カタログ長 |
//! | 包含（候補 ⊇ カタログ） | 0.85 × カタログ長 / 候補長 |
//! | 表記ゆれ表 | 0.85 |
//! | 単語一致 | 平均（上限 0.9） |
//!
//! 1.0 はどの戦略でも返さない。

use crate::lexicon::Lexicon;
use crate::normalizer::{normalize_name, significant_words};
use crate::types::MatchStrategy;

/// スコアの上限
pub const MAX_SCORE: f64 = 0.95;
pub const EXACT_SCORE: f64 = 0.95;
pub const VARIATION_SCORE: f64 = 0.85;
pub const WORD_SCORE_CAP: f64 = 0.9;

/// 戦略付きスコア
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub value: f64,
    pub strategy: MatchStrategy,
}

impl Score {
    pub fn new(value: f64, strategy: MatchStrategy) -> Self {
        Self {
            value: value.clamp(0.0, MAX_SCORE),
            strategy,
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, MatchStrategy::PartialWord)
    }

    /// 大きい方を返す（同点なら self を優先）
    pub fn max(self, other: Score) -> Score {
        if other.value > self.value {
            other
        } else {
            self
        }
    }
}

/// Levenshtein距離（挿入・削除・置換コスト1）
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// 編集距離ベースの類似度（1 - 距離 / 長い方の長さ）
pub fn string_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 0.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// 包含スコア（正規化済み文字列を受け取る）
pub fn containment_score(candidate: &str, catalog: &str) -> f64 {
    if candidate.is_empty() || catalog.is_empty() {
        return 0.0;
    }

    let cand_len = candidate.chars().count() as f64;
    let cat_len = catalog.chars().count() as f64;

    let mut score: f64 = 0.0;
    if catalog.contains(candidate) {
        score = score.max(0.9 * cand_len / cat_len);
    }
    if candidate.contains(catalog) {
        score = score.max(0.85 * cat_len / cand_len);
    }
    score
}

/// 単語一致スコア（候補単語ごとの最良一致を候補単語数で平均）
pub fn word_overlap_score(candidate: &str, catalog: &str) -> f64 {
    let cand_words = significant_words(candidate);
    let cat_words = significant_words(catalog);
    if cand_words.is_empty() || cat_words.is_empty() {
        return 0.0;
    }

    let total: f64 = cand_words
        .iter()
        .map(|cw| {
            cat_words
                .iter()
                .map(|kw| word_pair_score(cw, kw))
                .fold(0.0, f64::max)
        })
        .sum();

    (total / cand_words.len() as f64).min(WORD_SCORE_CAP)
}

fn word_pair_score(cw: &str, kw: &str) -> f64 {
    if cw == kw {
        return 1.0;
    }

    let cw_len = cw.chars().count();
    let kw_len = kw.chars().count();
    let mut score: f64 = 0.0;

    if cw_len >= 4 && kw_len >= 4 && levenshtein(cw, kw) <= 2 {
        score = score.max(0.8);
    }
    if cw_len.min(kw_len) >= 3 && (cw.contains(kw) || kw.contains(cw)) {
        score = score.max(0.6);
    }
    score
}

/// 部分単語一致スコア
///
/// 全単語ペアの比較回数で割る点が `word_overlap_score` と異なる。
pub fn partial_word_score(candidate: &str, catalog: &str) -> f64 {
    let cand_words = significant_words(candidate);
    let cat_words = significant_words(catalog);

    let mut total = 0.0;
    let mut comparisons = 0usize;

    for cw in &cand_words {
        for kw in &cat_words {
            comparisons += 1;

            let cw_len = cw.chars().count();
            let kw_len = kw.chars().count();

            if cw == kw {
                total += 1.0;
            } else if cw_len.min(kw_len) >= 3 && (cw.contains(kw) || kw.contains(cw)) {
                let ratio = cw_len.min(kw_len) as f64 / cw_len.max(kw_len) as f64;
                total += ratio * 0.8;
            } else if cw_len >= 4 && kw_len >= 4 && levenshtein(cw, kw) <= 2 {
                total += 0.6;
            }
        }
    }

    if comparisons == 0 {
        return 0.0;
    }
    (total / comparisons as f64).min(WORD_SCORE_CAP)
}

/// 候補とカタログ商品名の類似度（完全一致・包含・表記ゆれ・単語一致の最大値）
pub fn similarity(candidate: &str, catalog_name: &str, lexicon: &Lexicon) -> Score {
    let cand = normalize_name(candidate);
    let cat = normalize_name(catalog_name);
    similarity_normalized(&cand, &cat, lexicon)
}

/// 正規化済み文字列どうしの類似度
pub fn similarity_normalized(cand: &str, cat: &str, lexicon: &Lexicon) -> Score {
    if cand.is_empty() || cat.is_empty() {
        return Score::zero();
    }

    let mut best = Score::zero();

    if cand == cat {
        best = best.max(Score::new(EXACT_SCORE, MatchStrategy::Exact));
    }

    best = best.max(Score::new(
        containment_score(cand, cat),
        MatchStrategy::Containment,
    ));

    if lexicon.variations().is_variation(cand, cat) {
        best = best.max(Score::new(VARIATION_SCORE, MatchStrategy::Variation));
    }

    best.max(Score::new(
        word_overlap_score(cand, cat),
        MatchStrategy::WordOverlap,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("dolo", "dolo"), 0);
        assert_eq!(levenshtein("paracetmol", "paracetamol"), 1);
    }

    #[test]
    fn test_string_similarity() {
        assert!(approx(string_similarity("abcd", "abcd"), 1.0));
        assert!(approx(string_similarity("abcd", "abce"), 0.75));
        assert_eq!(string_similarity("", ""), 0.0);
    }

    #[test]
    fn test_containment_catalog_contains_candidate() {
        // "dolo" (4) ⊂ "dolo 650" (8)
        assert!(approx(containment_score("dolo", "dolo 650"), 0.45));
    }

    #[test]
    fn test_containment_candidate_contains_catalog() {
        // "crocin" (6) ⊂ "crocin advance" (14)
        assert!(approx(containment_score("crocin advance", "crocin"), 0.85 * 6.0 / 14.0));
    }

    #[test]
    fn test_containment_empty() {
        assert_eq!(containment_score("", "dolo"), 0.0);
        assert_eq!(containment_score("dolo", ""), 0.0);
    }

    #[test]
    fn test_word_overlap_exact_words() {
        let score = word_overlap_score("azithromycin", "azithromycin tablet");
        assert!(approx(score, 0.9));
    }

    #[test]
    fn test_word_overlap_ocr_error() {
        // 編集距離1 → 0.8
        let score = word_overlap_score("amoxicilin", "amoxicillin capsule");
        assert!(approx(score, 0.8));
    }

    #[test]
    fn test_word_overlap_averaged_over_candidate_words() {
        // pantoprazole → 1.0, unrelated → 0.0
        let score = word_overlap_score("pantoprazole unrelated", "pantoprazole");
        assert!(approx(score, 0.5));
    }

    #[test]
    fn test_partial_word_divides_by_comparisons() {
        // 2候補語 × 2カタログ語 = 4比較, 完全一致1件
        let score = partial_word_score("cetirizine syrup", "cetirizine tablet");
        assert!(approx(score, 0.25));
    }

    #[test]
    fn test_partial_word_substring_ratio() {
        // "pan" ⊂ "pantop": 3/6 × 0.8 = 0.4
        let score = partial_word_score("pan", "pantop");
        assert!(approx(score, 0.4));
    }

    #[test]
    fn test_partial_word_capped() {
        assert!(approx(partial_word_score("montair", "montair"), 0.9));
    }

    #[test]
    fn test_similarity_exact() {
        let lexicon = Lexicon::builtin();
        let score = similarity("Azithromycin 500mg", "Azithromycin 500mg", &lexicon);
        assert!(approx(score.value, 0.95));
        assert_eq!(score.strategy, MatchStrategy::Exact);
    }

    #[test]
    fn test_similarity_variation() {
        let lexicon = Lexicon::builtin();
        let score = similarity("Acetaminophen", "Tylenol 500mg", &lexicon);
        assert!(approx(score.value, 0.85));
        assert_eq!(score.strategy, MatchStrategy::Variation);
    }

    #[test]
    fn test_similarity_unrelated() {
        let lexicon = Lexicon::builtin();
        let score = similarity("Xyzzyplex 12mg", "Paracetamol 500mg", &lexicon);
        assert_eq!(score.value, 0.0);
    }

    #[test]
    fn test_similarity_bounds() {
        let lexicon = Lexicon::builtin();
        let pairs = [
            ("Dolo 650", "Dolo 650"),
            ("a", "a"),
            ("metformin", "metformin metformin"),
            ("", "Paracetamol"),
            ("Tab Pan 40", "Pan 40"),
        ];
        for (cand, cat) in pairs {
            let score = similarity(cand, cat, &lexicon);
            assert!(score.value >= 0.0 && score.value <= MAX_SCORE);
        }
    }
}
