//! 医薬品辞書（Lexicon）
//!
//! 抽出・照合で使う参照データをまとめたバージョン付きアセット。
//! 組み込み版は `data/lexicon.json` をバイナリに埋め込み、
//! 利用者のJSONファイルで追記・差し替えできる。

use crate::error::{Error, Result};
use crate::synonyms::{SynonymTable, VariationTable};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const BUILTIN_LEXICON_JSON: &str = include_str!("../data/lexicon.json");

lazy_static::lazy_static! {
    static ref BUILTIN_LEXICON: Lexicon = Lexicon::from_json(BUILTIN_LEXICON_JSON)
        .expect("組み込み辞書 data/lexicon.json が不正です");
}

/// 医薬品辞書
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lexicon {
    /// 辞書バージョン（互換性チェック用）
    pub version: u32,
    /// 既知の一般名・商品名
    #[serde(default)]
    medicines: Vec<String>,
    /// 剤形・単位（tab, syrup, ...）
    #[serde(default)]
    dosage_forms: Vec<String>,
    /// 候補にしない一般語（用法・定型語）
    #[serde(default)]
    stopwords: Vec<String>,
    /// 一般名 → 商品名
    #[serde(default)]
    brand_synonyms: SynonymTable,
    /// 表記ゆれグループ
    #[serde(default)]
    variations: VariationTable,

    #[serde(skip)]
    dosage_form_set: HashSet<String>,
    #[serde(skip)]
    stopword_set: HashSet<String>,
}

impl Lexicon {
    /// 組み込み辞書
    pub fn builtin() -> Self {
        BUILTIN_LEXICON.clone()
    }

    /// JSONファイルから読み込み
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// JSON文字列から読み込み
    pub fn from_json(json: &str) -> Result<Self> {
        let mut lexicon: Self = serde_json::from_str(json)?;
        if lexicon.version == 0 {
            return Err(Error::Parse("辞書の version は1以上が必要です".into()));
        }
        lexicon.prepare();
        Ok(lexicon)
    }

    /// 組み込み辞書に利用者の辞書を追記したもの
    pub fn builtin_with(path: Option<&std::path::Path>) -> Result<Self> {
        let mut lexicon = Self::builtin();
        if let Some(path) = path {
            let custom = Self::from_file(path)?;
            tracing::debug!(path = %path.display(), version = custom.version, "カスタム辞書をマージ");
            lexicon.merge(&custom);
        }
        Ok(lexicon)
    }

    /// 設定をマージ（後から追加した辞書の語を追記し、バージョンは大きい方）
    pub fn merge(&mut self, other: &Lexicon) {
        self.version = self.version.max(other.version);
        extend_unique(&mut self.medicines, &other.medicines);
        extend_unique(&mut self.dosage_forms, &other.dosage_forms);
        extend_unique(&mut self.stopwords, &other.stopwords);
        self.brand_synonyms.merge(&other.brand_synonyms);
        self.variations.merge(&other.variations);
        self.prepare();
    }

    /// 小文字化・重複除去と検索用セットの構築
    fn prepare(&mut self) {
        for list in [&mut self.medicines, &mut self.dosage_forms, &mut self.stopwords] {
            let mut seen = HashSet::new();
            let cleaned: Vec<String> = list
                .iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty() && seen.insert(s.clone()))
                .collect();
            *list = cleaned;
        }
        self.brand_synonyms.normalize_keys();
        self.variations.normalize_keys();

        self.dosage_form_set = self.dosage_forms.iter().cloned().collect();
        self.stopword_set = self.stopwords.iter().cloned().collect();
    }

    pub fn medicines(&self) -> &[String] {
        &self.medicines
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.brand_synonyms
    }

    pub fn variations(&self) -> &VariationTable {
        &self.variations
    }

    /// 小文字の語が剤形・単位か（複数形 `tabs` なども辞書側で持つ）
    pub fn is_dosage_form(&self, word: &str) -> bool {
        self.dosage_form_set.contains(word)
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopword_set.contains(word)
    }
}

fn extend_unique(target: &mut Vec<String>, extra: &[String]) {
    for item in extra {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}
