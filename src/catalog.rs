//! 在庫カタログの読み込み
//!
//! JSON配列（camelCase）またはCSVのスナップショットを読み込む。
//! 形式は拡張子で判定する。

use crate::error::{Result, RxMatchError};
use rx_match_common::CatalogEntry;
use std::collections::HashSet;
use std::path::Path;

const CSV_COLUMNS: [&str; 8] = [
    "id",
    "name",
    "category",
    "price",
    "manufacturer",
    "requires_prescription",
    "in_stock",
    "registry_code",
];

/// カタログファイルを読み込む
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogEntry>> {
    if !path.exists() {
        return Err(RxMatchError::FileNotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let entries = match ext.as_str() {
        "json" => parse_json(&content)?,
        "csv" => parse_csv(&content)?,
        _ => return Err(RxMatchError::UnsupportedCatalogFormat(path.display().to_string())),
    };

    validate(&entries)?;
    tracing::info!(path = %path.display(), count = entries.len(), "カタログを読み込み");
    Ok(entries)
}

pub fn parse_json(content: &str) -> Result<Vec<CatalogEntry>> {
    serde_json::from_str(content).map_err(|e| RxMatchError::InvalidCatalog(e.to_string()))
}

/// CSVを解析（ヘッダ行必須、列順は任意）
pub fn parse_csv(content: &str) -> Result<Vec<CatalogEntry>> {
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty());

    let (_, header) = lines
        .next()
        .ok_or_else(|| RxMatchError::InvalidCatalog("ヘッダ行がありません".into()))?;
    let header: Vec<String> = parse_csv_line(header.trim_start_matches('\u{feff}'))
        .into_iter()
        .map(|h| h.to_lowercase())
        .collect();

    let column = |name: &str| header.iter().position(|h| h == name);
    let id_col = column("id")
        .ok_or_else(|| RxMatchError::InvalidCatalog("id 列がありません".into()))?;
    let name_col = column("name")
        .ok_or_else(|| RxMatchError::InvalidCatalog("name 列がありません".into()))?;
    let cols: Vec<Option<usize>> = CSV_COLUMNS.iter().map(|c| column(*c)).collect();

    let mut entries = Vec::new();
    for (idx, line) in lines {
        let fields = parse_csv_line(line);
        let field = |col: Option<usize>| col.and_then(|c| fields.get(c)).copied().unwrap_or("");
        let line_no = idx + 1;

        let price = match field(cols[3]) {
            "" => 0.0,
            p => p.parse::<f64>().map_err(|_| {
                RxMatchError::InvalidCatalog(format!("{}行目: price が数値ではありません: {}", line_no, p))
            })?,
        };

        let registry_code = match field(cols[7]) {
            "" => None,
            code => Some(code.to_string()),
        };

        entries.push(CatalogEntry {
            id: field(Some(id_col)).to_string(),
            name: field(Some(name_col)).to_string(),
            category: field(cols[2]).to_string(),
            price,
            manufacturer: field(cols[4]).to_string(),
            requires_prescription: parse_bool(field(cols[5]), false, line_no)?,
            in_stock: parse_bool(field(cols[6]), true, line_no)?,
            registry_code,
        });
    }

    Ok(entries)
}

fn parse_bool(value: &str, default: bool, line_no: usize) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "" => Ok(default),
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => Err(RxMatchError::InvalidCatalog(format!(
            "{}行目: 真偽値として解釈できません: {}",
            line_no, other
        ))),
    }
}

/// id・name の欠落と id の重複を拒否
fn validate(entries: &[CatalogEntry]) -> Result<()> {
    let mut seen = HashSet::new();
    for entry in entries {
        if entry.id.trim().is_empty() {
            return Err(RxMatchError::InvalidCatalog(format!("id が空の商品があります: {}", entry.name)));
        }
        if entry.name.trim().is_empty() {
            return Err(RxMatchError::InvalidCatalog(format!("name が空の商品があります: {}", entry.id)));
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(RxMatchError::InvalidCatalog(format!("id が重複しています: {}", entry.id)));
        }
    }
    Ok(())
}

/// 在庫ありの商品のみ
pub fn in_stock(catalog: &[CatalogEntry]) -> Vec<&CatalogEntry> {
    catalog.iter().filter(|e| e.in_stock).collect()
}

/// CSV行をパース（ダブルクォート対応）
fn parse_csv_line(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut in_quotes = false;
    let mut field_start = 0;

    for (i, c) in line.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == ',' && !in_quotes {
            fields.push(trim_field(&line[field_start..i]));
            field_start = i + 1;
        }
    }
    fields.push(trim_field(&line[field_start..]));

    fields
}

fn trim_field(field: &str) -> &str {
    let field = field.trim();
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(field)
}
