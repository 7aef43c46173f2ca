//! レジストリ照会結果のキャッシュ
//!
//! 照会先と正規化済み医薬品名のSHA-256をキーにして結果を保存し、
//! 有効期間内の同じ照会をスキップする。期限切れのエントリはミス扱い。

use super::{RegistryVerifier, Verification};
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use rx_match_common::normalize_name;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const CACHE_FILE_NAME: &str = "verification-cache.json";

/// 有効期間の上限（100年）
pub const MAX_CACHE_TTL_HOURS: i64 = 24 * 365 * 100;

/// 有効期間（時間）を `Duration` に変換（0〜上限に丸める）
pub fn ttl_duration(hours: i64) -> Duration {
    Duration::hours(hours.clamp(0, MAX_CACHE_TTL_HOURS))
}

/// キャッシュファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationCache {
    /// バージョン（互換性チェック用）
    version: u32,
    /// 照会シグネチャ → 照会結果のマップ
    entries: HashMap<String, CacheEntry>,
}

/// キャッシュエントリ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// 照会した医薬品名
    pub name: String,
    pub cached_at: DateTime<Utc>,
    pub result: Verification,
}

impl VerificationCache {
    const CURRENT_VERSION: u32 = 1;

    pub fn cache_path(dir: &Path) -> PathBuf {
        dir.join(CACHE_FILE_NAME)
    }

    /// キャッシュファイルを読み込み（壊れている場合は空で開始）
    pub fn load(dir: &Path) -> Self {
        let cache_path = Self::cache_path(dir);
        if !cache_path.exists() {
            return Self::default();
        }

        let file = match File::open(&cache_path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %cache_path.display(), error = %e, "キャッシュを開けません");
                return Self::default();
            }
        };

        match serde_json::from_reader::<_, VerificationCache>(BufReader::new(file)) {
            Ok(cache) if cache.version == Self::CURRENT_VERSION => cache,
            Ok(_) => {
                tracing::warn!("キャッシュバージョン不一致、再生成します");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "キャッシュを解析できません、再生成します");
                Self::default()
            }
        }
    }

    /// キャッシュファイルを保存
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let file = File::create(Self::cache_path(dir))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// キャッシュファイルを削除（存在しなかった場合は false）
    pub fn clear(dir: &Path) -> Result<bool> {
        let cache_path = Self::cache_path(dir);
        if cache_path.exists() {
            std::fs::remove_file(cache_path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// 有効期間内のエントリをルックアップ
    pub fn get(&self, signature: &str, ttl: Duration, now: DateTime<Utc>) -> Option<&Verification> {
        self.entries
            .get(signature)
            .filter(|e| now - e.cached_at <= ttl)
            .map(|e| &e.result)
    }

    /// キャッシュに追加
    pub fn insert(&mut self, signature: String, name: String, result: Verification, now: DateTime<Utc>) {
        self.entries.insert(
            signature,
            CacheEntry {
                name,
                cached_at: now,
                result,
            },
        );
    }

    /// 期限切れのエントリを削除し、削除件数を返す
    pub fn prune_expired(&mut self, ttl: Duration, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| now - e.cached_at <= ttl);
        before - self.entries.len()
    }

    /// キャッシュ件数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for VerificationCache {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: HashMap::new(),
        }
    }
}

/// 照会シグネチャ（照会先 + 正規化済み名称のSHA-256）
pub fn request_signature(source: &str, name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"\n");
    hasher.update(normalize_name(name).as_bytes());
    hex::encode(hasher.finalize())
}

/// キャッシュ付きの照会
///
/// 失敗した照会はキャッシュしない。
pub struct CachedVerifier<V> {
    inner: V,
    cache: Mutex<VerificationCache>,
    ttl: Duration,
}

impl<V: RegistryVerifier> CachedVerifier<V> {
    pub fn new(inner: V, cache: VerificationCache, ttl_hours: i64) -> Self {
        Self {
            inner,
            cache: Mutex::new(cache),
            ttl: ttl_duration(ttl_hours),
        }
    }

    /// キャッシュを取り出す（保存用）
    pub fn into_cache(self) -> VerificationCache {
        self.cache.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lookup(&self, signature: &str) -> Option<Verification> {
        let cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.get(signature, self.ttl, Utc::now()).cloned()
    }
}

impl<V: RegistryVerifier> RegistryVerifier for CachedVerifier<V> {
    fn source(&self) -> &str {
        self.inner.source()
    }

    async fn verify(&self, name: &str) -> Result<Verification> {
        let signature = request_signature(self.inner.source(), name);
        if let Some(hit) = self.lookup(&signature) {
            tracing::debug!(name = %name, "照会キャッシュにヒット");
            return Ok(hit);
        }

        let result = self.inner.verify(name).await?;
        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.insert(signature, name.to_string(), result.clone(), Utc::now());
        Ok(result)
    }
}
