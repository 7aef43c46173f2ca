//! rx-match
//!
//! 処方箋OCRテキストの照合処理を取り巻く層。
//! カタログ読み込み、レジストリ確認、一括処理、設定を提供する。
//! 照合ロジック本体は `rx_match_common` にある。

pub mod batch;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod registry;
