//! Rx Match Common Library
//!
//! 処方箋OCRテキストから医薬品候補を抽出し、在庫カタログと照合する純粋ロジック。
//! I/Oは辞書ファイルの読み込みのみで、照合処理はエラーを返さない。

pub mod types;
pub mod error;
pub mod normalizer;
pub mod similarity;
pub mod synonyms;
pub mod lexicon;
pub mod extractor;
pub mod matcher;

pub use types::{CatalogEntry, ExtractionResult, MatchResult, MatchStrategy, NOT_DETECTED};
pub use error::{Error, Result};
pub use normalizer::normalize_name;
pub use similarity::{levenshtein, similarity, string_similarity, Score};
pub use synonyms::{SynonymTable, VariationTable};
pub use lexicon::Lexicon;
pub use extractor::{extract_prescription, extract_prescription_with, ExtractOptions, MAX_CANDIDATES};
pub use matcher::{match_candidates, CatalogMatcher, MatchOptions, DEFAULT_THRESHOLD};
