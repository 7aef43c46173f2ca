//! キャッシュ機能テスト
//!
//! レジストリ照会キャッシュの保存・期限切れ・削除を検証

use chrono::{Duration, Utc};
use rx_match::registry::cache::request_signature;
use rx_match::registry::{MatchType, Verification, VerificationCache};
use tempfile::tempdir;

fn verification() -> Verification {
    Verification {
        verified: true,
        confidence: 0.9,
        match_type: Some(MatchType::Generic),
        registry_name: Some("acetaminophen".to_string()),
        registry_code: Some("161".to_string()),
    }
}

/// 空のキャッシュファイル
#[test]
fn test_cache_file_empty() {
    let dir = tempdir().expect("Failed to create temp dir");
    let cache = VerificationCache::load(dir.path());

    assert_eq!(cache.len(), 0);
    assert!(cache.is_empty());
}

/// キャッシュの保存と読み込み
#[test]
fn test_cache_save_and_load() {
    let dir = tempdir().expect("Failed to create temp dir");
    let signature = request_signature("https://rxnav.nlm.nih.gov/REST", "Dolo 650");

    let mut cache = VerificationCache::load(dir.path());
    cache.insert(signature.clone(), "Dolo 650".to_string(), verification(), Utc::now());
    cache.save(dir.path()).expect("キャッシュ保存失敗");

    let loaded = VerificationCache::load(dir.path());
    assert_eq!(loaded.len(), 1);
    let hit = loaded
        .get(&signature, Duration::hours(1), Utc::now())
        .expect("キャッシュにヒットしない");
    assert_eq!(hit, &verification());
}

/// 壊れたキャッシュファイルは空として扱う
#[test]
fn test_corrupt_cache_ignored() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(VerificationCache::cache_path(dir.path()), "not json").expect("書き込み失敗");

    assert!(VerificationCache::load(dir.path()).is_empty());
}

/// 期限切れエントリはミス扱いで、prune で削除される
#[test]
fn test_expired_entries() {
    let dir = tempdir().expect("Failed to create temp dir");
    let now = Utc::now();
    let ttl = Duration::hours(24);

    let mut cache = VerificationCache::default();
    cache.insert("old".to_string(), "crocin".to_string(), verification(), now - Duration::hours(30));
    cache.insert("new".to_string(), "dolo".to_string(), verification(), now);
    cache.save(dir.path()).expect("キャッシュ保存失敗");

    let mut loaded = VerificationCache::load(dir.path());
    assert!(loaded.get("old", ttl, now).is_none());
    assert!(loaded.get("new", ttl, now).is_some());

    assert_eq!(loaded.prune_expired(ttl, now), 1);
    assert_eq!(loaded.len(), 1);
}

/// キャッシュ削除
#[test]
fn test_cache_clear() {
    let dir = tempdir().expect("Failed to create temp dir");
    VerificationCache::default().save(dir.path()).expect("キャッシュ保存失敗");

    assert!(VerificationCache::clear(dir.path()).expect("削除失敗"));
    assert!(!VerificationCache::clear(dir.path()).expect("削除失敗"));
}
