//! 一般名・商品名の相互参照
//!
//! - SynonymTable: 一般名 → 商品名群（例: paracetamol → dolo, crocin, ...）
//! - VariationTable: 国・地域による表記ゆれ（paracetamol / acetaminophen / tylenol）
//!
//! どちらも読み込み後は変更しない参照データ。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 一般名・商品名の関連が見つかった場合のスコア
pub const BRAND_GENERIC_SCORE: f64 = 0.88;

/// 部分一致を許す最小文字数
const MIN_PARTIAL_LEN: usize = 4;

/// 一般名 → 商品名群
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SynonymTable {
    brands: BTreeMap<String, Vec<String>>,
}

impl SynonymTable {
    pub fn insert(&mut self, generic: &str, brands: &[&str]) {
        let entry = self.brands.entry(generic.trim().to_lowercase()).or_default();
        for brand in brands {
            let brand = brand.trim().to_lowercase();
            if !brand.is_empty() && !entry.contains(&brand) {
                entry.push(brand);
            }
        }
    }

    /// 一般名に対応する商品名群
    pub fn brands_of(&self, generic: &str) -> Option<&[String]> {
        self.brands.get(generic).map(|v| v.as_slice())
    }

    /// 商品名から一般名を逆引き
    pub fn generic_of(&self, brand: &str) -> Option<&str> {
        self.brands
            .iter()
            .find(|(_, brands)| brands.iter().any(|b| b == brand))
            .map(|(generic, _)| generic.as_str())
    }

    /// 正規化済みテキストが言及している商品名から一般名を引く（`dolo 650` → `paracetamol`）
    pub fn generic_mentioned_in(&self, text: &str) -> Option<&str> {
        self.brands
            .iter()
            .find(|(_, brands)| brands.iter().any(|b| mentions(text, b)))
            .map(|(generic, _)| generic.as_str())
    }

    pub fn len(&self) -> usize {
        self.brands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
    }

    /// 後から追加した定義で上書きせず、商品名を追記する
    pub fn merge(&mut self, other: &SynonymTable) {
        for (generic, brands) in &other.brands {
            let refs: Vec<&str> = brands.iter().map(|s| s.as_str()).collect();
            self.insert(generic, &refs);
        }
    }

    pub(crate) fn normalize_keys(&mut self) {
        let brands = std::mem::take(&mut self.brands);
        for (generic, list) in brands {
            let refs: Vec<&str> = list.iter().map(|s| s.as_str()).collect();
            self.insert(&generic, &refs);
        }
    }

    /// 正規化済みの候補とカタログ名が一般名⇔商品名の関係にあるか
    ///
    /// 候補が一般名でカタログ側が商品名、またはその逆を両方向で確認する。
    pub fn is_brand_generic_pair(&self, candidate: &str, catalog: &str) -> bool {
        self.brands.iter().any(|(generic, brands)| {
            let cand_generic = mentions(candidate, generic);
            let cat_generic = mentions(catalog, generic);
            let cand_brand = || brands.iter().any(|b| mentions(candidate, b));
            let cat_brand = || brands.iter().any(|b| mentions(catalog, b));

            (cand_generic && cat_brand()) || (cat_generic && cand_brand())
        })
    }

    /// 一般名⇔商品名の関係があれば 0.88、なければ 0.0
    pub fn brand_generic_score(&self, candidate: &str, catalog: &str) -> f64 {
        if candidate.is_empty() || catalog.is_empty() {
            return 0.0;
        }
        if self.is_brand_generic_pair(candidate, catalog) {
            BRAND_GENERIC_SCORE
        } else {
            0.0
        }
    }
}

/// 表記ゆれグループの一覧
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariationTable {
    groups: Vec<Vec<String>>,
}

impl VariationTable {
    pub fn push(&mut self, group: &[&str]) {
        let group: Vec<String> = group
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        if group.len() > 1 {
            self.groups.push(group);
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn merge(&mut self, other: &VariationTable) {
        for group in &other.groups {
            if !self.groups.contains(group) {
                self.groups.push(group.clone());
            }
        }
    }

    pub(crate) fn normalize_keys(&mut self) {
        let groups = std::mem::take(&mut self.groups);
        for group in groups {
            let refs: Vec<&str> = group.iter().map(|s| s.as_str()).collect();
            self.push(&refs);
        }
    }

    /// 候補とカタログ名が同じ表記ゆれグループに属する名前を含むか
    pub fn is_variation(&self, candidate: &str, catalog: &str) -> bool {
        if candidate.is_empty() || catalog.is_empty() {
            return false;
        }
        self.groups.iter().any(|group| {
            group.iter().any(|m| mentions(candidate, m)) && group.iter().any(|m| mentions(catalog, m))
        })
    }
}

/// 正規化済みテキストが名前に言及しているか
///
/// - 複数語の名前: テキストに部分文字列として含まれる
/// - 単語: いずれかの語と完全一致、または4文字以上どうしで包含関係
pub fn mentions(text: &str, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    if name.contains(' ') {
        return text.contains(name);
    }

    let name_len = name.chars().count();
    text.split_whitespace().any(|token| {
        if token == name {
            return true;
        }
        let token_len = token.chars().count();
        token_len >= MIN_PARTIAL_LEN
            && name_len >= MIN_PARTIAL_LEN
            && (token.contains(name) || name.contains(token))
    })
}
