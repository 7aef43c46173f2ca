//! RxNav (NLM) の approximateTerm API による照会

use super::{MatchType, RegistryVerifier, Verification};
use crate::error::{Result, RxMatchError};
use rx_match_common::synonyms::mentions;
use rx_match_common::{normalize_name, string_similarity, SynonymTable, VariationTable};
use serde::Deserialize;
use std::time::Duration;

/// 部分一致として確認済みにする最低類似度
const MIN_PARTIAL_SIMILARITY: f64 = 0.5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApproximateTermResponse {
    approximate_group: Option<ApproximateGroup>,
}

#[derive(Debug, Deserialize)]
struct ApproximateGroup {
    #[serde(default)]
    candidate: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    rxcui: Option<String>,
    name: Option<String>,
}

pub struct RxNavVerifier {
    client: reqwest::Client,
    base_url: String,
    synonyms: SynonymTable,
    variations: VariationTable,
}

impl RxNavVerifier {
    pub fn new(
        base_url: &str,
        timeout_seconds: u64,
        synonyms: SynonymTable,
        variations: VariationTable,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            synonyms,
            variations,
        })
    }
}

impl RegistryVerifier for RxNavVerifier {
    fn source(&self) -> &str {
        &self.base_url
    }

    async fn verify(&self, name: &str) -> Result<Verification> {
        let url = format!("{}/approximateTerm.json", self.base_url);
        tracing::debug!(name = %name, url = %url, "RxNav照会");

        let response = self
            .client
            .get(&url)
            .query(&[("term", name), ("maxEntries", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RxMatchError::Registry(format!("RxNav がステータス {} を返しました", status)));
        }

        let body: ApproximateTermResponse = response.json().await?;
        let best = body
            .approximate_group
            .and_then(|g| g.candidate.into_iter().find(|c| c.name.is_some()));

        Ok(match best {
            Some(candidate) => classify(name, candidate.name, candidate.rxcui, &self.synonyms, &self.variations),
            None => Verification::unverified(),
        })
    }
}

/// 照会名とレジストリが返した名称から一致種別を決める
///
/// 商品名の照会は一般名に読み替えてから表記ゆれ（paracetamol ⇔ acetaminophen）を確認する。
pub(crate) fn classify(
    query: &str,
    registry_name: Option<String>,
    registry_code: Option<String>,
    synonyms: &SynonymTable,
    variations: &VariationTable,
) -> Verification {
    let Some(found_raw) = registry_name else {
        return Verification::unverified();
    };
    let query = normalize_name(query);
    let found = normalize_name(&found_raw);
    if query.is_empty() || found.is_empty() {
        return Verification::unverified();
    }

    let brand_of = synonyms.generic_mentioned_in(&query);
    let is_generic_of_query = |generic: &str| mentions(&found, generic) || variations.is_variation(generic, &found);
    let similarity = string_similarity(&query, &found);

    let match_type = if query == found {
        Some(MatchType::Exact)
    } else if brand_of.is_some_and(is_generic_of_query) {
        Some(MatchType::Generic)
    } else if variations.is_variation(&query, &found) {
        Some(MatchType::Generic)
    } else if synonyms.generic_mentioned_in(&found).is_some_and(|g| mentions(&query, g)) {
        Some(MatchType::Brand)
    } else if found.contains(&query) || query.contains(&found) || similarity >= MIN_PARTIAL_SIMILARITY {
        Some(MatchType::Partial)
    } else {
        None
    };

    let confidence = match match_type {
        Some(MatchType::Exact) => 1.0,
        Some(MatchType::Generic) | Some(MatchType::Brand) => 0.9,
        Some(MatchType::Partial) => similarity.max(MIN_PARTIAL_SIMILARITY),
        None => similarity,
    };

    Verification {
        verified: match_type.is_some(),
        confidence,
        match_type,
        registry_name: Some(found_raw),
        registry_code,
    }
}
