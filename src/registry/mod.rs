//! 外部医薬品レジストリによる照合結果の確認
//!
//! 確認は任意の補強情報で、照合結果の追加・削除は行わない。
//! 成功した場合に `verified` フラグを立てるだけ。

pub mod cache;
pub mod rxnav;

pub use cache::{CachedVerifier, VerificationCache};
pub use rxnav::RxNavVerifier;

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// レジストリ側の一致種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchType {
    Exact,
    Partial,
    /// 商品名で照会し一般名が返った
    Generic,
    /// 一般名で照会し商品名が返った
    Brand,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchType::Exact => write!(f, "exact"),
            MatchType::Partial => write!(f, "partial"),
            MatchType::Generic => write!(f, "generic"),
            MatchType::Brand => write!(f, "brand"),
        }
    }
}

/// 1件の照会結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub verified: bool,
    pub confidence: f64,
    pub match_type: Option<MatchType>,
    /// レジストリが返した名称
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_code: Option<String>,
}

impl Verification {
    pub fn unverified() -> Self {
        Self {
            verified: false,
            confidence: 0.0,
            match_type: None,
            registry_name: None,
            registry_code: None,
        }
    }
}

/// 医薬品名の照会先
#[allow(async_fn_in_trait)]
pub trait RegistryVerifier {
    /// 照会先の識別子（キャッシュキーに使う）
    fn source(&self) -> &str;

    async fn verify(&self, name: &str) -> Result<Verification>;
}
