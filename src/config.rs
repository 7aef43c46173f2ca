use crate::error::{RxMatchError, Result};
use crate::registry::cache::MAX_CACHE_TTL_HOURS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// RxNav REST API のベースURL
pub const DEFAULT_REGISTRY_URL: &str = "https://rxnav.nlm.nih.gov/REST";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 採用閾値（これを超えたスコアのみ採用）
    pub acceptance_threshold: f64,
    /// 抽出候補数の上限（15を超える値は15に制限）
    pub max_candidates: usize,
    /// 組み込み辞書に追記するカスタム辞書
    pub lexicon_path: Option<PathBuf>,
    pub registry_url: String,
    /// レジストリ照会を既定で有効にする
    pub verify: bool,
    /// 照会キャッシュの有効期間（時間）
    pub cache_ttl_hours: i64,
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            acceptance_threshold: rx_match_common::DEFAULT_THRESHOLD,
            max_candidates: rx_match_common::MAX_CANDIDATES,
            lexicon_path: None,
            registry_url: DEFAULT_REGISTRY_URL.into(),
            verify: false,
            cache_ttl_hours: 24 * 7,
            timeout_seconds: 10,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.validate()?;
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| RxMatchError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("rx-match").join("config.json"))
    }

    /// 照会キャッシュの保存先
    pub fn cache_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| RxMatchError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".cache").join("rx-match"))
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.acceptance_threshold) {
            return Err(RxMatchError::Config(format!(
                "acceptance_threshold は 0.0 以上 1.0 未満で指定してください: {}",
                self.acceptance_threshold
            )));
        }
        if self.max_candidates == 0 {
            return Err(RxMatchError::Config("max_candidates は1以上が必要です".into()));
        }
        if !(0..=MAX_CACHE_TTL_HOURS).contains(&self.cache_ttl_hours) {
            return Err(RxMatchError::Config(format!(
                "cache_ttl_hours は 0 以上 {} 以下で指定してください: {}",
                MAX_CACHE_TTL_HOURS, self.cache_ttl_hours
            )));
        }
        Ok(())
    }

    pub fn get_registry_url(&self) -> String {
        // 環境変数を優先
        if let Ok(url) = std::env::var("RX_MATCH_REGISTRY_URL") {
            return url;
        }
        self.registry_url.clone()
    }

    pub fn set_threshold(&mut self, threshold: f64) -> Result<()> {
        self.acceptance_threshold = threshold;
        self.save()
    }

    pub fn set_lexicon_path(&mut self, path: PathBuf) -> Result<()> {
        if !path.exists() {
            return Err(RxMatchError::FileNotFound(path.display().to_string()));
        }
        self.lexicon_path = Some(path);
        self.save()
    }

    pub fn set_registry_url(&mut self, url: String) -> Result<()> {
        self.registry_url = url;
        self.save()
    }
}
