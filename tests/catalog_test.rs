//! カタログ読み込みテスト
//!
//! JSON / CSV スナップショットの読み込みと不正入力の扱いを検証

use rx_match::catalog;
use rx_match::error::RxMatchError;
use std::fs;
use tempfile::tempdir;

/// JSONカタログ（camelCase、省略項目は既定値）
#[test]
fn test_load_json_catalog() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("catalog.json");
    fs::write(
        &path,
        r#"[
            {"id": "p1", "name": "Paracetamol 500mg", "price": 12.5, "requiresPrescription": false},
            {"id": "a1", "name": "Azithromycin 500mg", "inStock": false, "registryCode": "18631"}
        ]"#,
    )
    .expect("書き込み失敗");

    let entries = catalog::load_catalog(&path).expect("読み込み失敗");
    assert_eq!(entries.len(), 2);
    assert!(entries[0].in_stock);
    assert_eq!(entries[0].price, 12.5);
    assert!(!entries[1].in_stock);
    assert_eq!(entries[1].registry_code.as_deref(), Some("18631"));
    assert_eq!(catalog::in_stock(&entries).len(), 1);
}

/// CSVカタログ（引用符付きフィールドを含む）
#[test]
fn test_load_csv_catalog() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("catalog.csv");
    fs::write(
        &path,
        "id,name,category,price,manufacturer,requires_prescription,in_stock,registry_code\n\
         p1,Dolo 650,Analgesic,30.5,\"Micro Labs, Ltd\",false,true,\n\
         o1,Omez 20,Antacid,55,Dr. Reddy's,true,false,7646\n",
    )
    .expect("書き込み失敗");

    let entries = catalog::load_catalog(&path).expect("読み込み失敗");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].manufacturer, "Micro Labs, Ltd");
    assert_eq!(entries[0].registry_code, None);
    assert!(entries[1].requires_prescription);
    assert!(!entries[1].in_stock);
    assert_eq!(entries[1].registry_code.as_deref(), Some("7646"));
}

/// 存在しないファイル
#[test]
fn test_missing_catalog() {
    let result = catalog::load_catalog(std::path::Path::new("/nonexistent/catalog.json"));
    assert!(matches!(result, Err(RxMatchError::FileNotFound(_))));
}

/// 壊れたJSON
#[test]
fn test_invalid_json_catalog() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("catalog.json");
    fs::write(&path, "{ not json").expect("書き込み失敗");

    assert!(matches!(catalog::load_catalog(&path), Err(RxMatchError::InvalidCatalog(_))));
}

/// id の重複
#[test]
fn test_duplicate_ids_rejected() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("catalog.csv");
    fs::write(&path, "id,name\np1,Dolo 650\np1,Crocin\n").expect("書き込み失敗");

    assert!(matches!(catalog::load_catalog(&path), Err(RxMatchError::InvalidCatalog(_))));
}

/// 未対応の拡張子
#[test]
fn test_unsupported_extension() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("catalog.xml");
    fs::write(&path, "<catalog/>").expect("書き込み失敗");

    assert!(matches!(
        catalog::load_catalog(&path),
        Err(RxMatchError::UnsupportedCatalogFormat(_))
    ));
}
