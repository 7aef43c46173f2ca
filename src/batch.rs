//! フォルダ内の処方箋テキストを一括処理
//!
//! 各ファイルは独立に照合する（割当状態はファイルごと）。
//! カタログと辞書は全スレッドで読み取り専用に共有する。

use crate::error::{Result, RxMatchError};
use crate::pipeline::{process_prescription, Outcome, PipelineOptions, PrescriptionReport};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rx_match_common::{CatalogEntry, Lexicon};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const TEXT_EXTENSIONS: &[&str] = &["txt", "TXT"];

/// 1ファイル分の結果
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub path: PathBuf,
    pub report: PrescriptionReport,
}

/// バッチ全体の集計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub files: usize,
    pub matched: usize,
    pub no_matches: usize,
    pub no_candidates: usize,
    pub total_matches: usize,
}

impl BatchSummary {
    pub fn from_items(items: &[BatchItem]) -> Self {
        let mut summary = Self {
            files: items.len(),
            ..Default::default()
        };
        for item in items {
            match item.report.outcome {
                Outcome::Matched => summary.matched += 1,
                Outcome::NoMatches => summary.no_matches += 1,
                Outcome::NoCandidates => summary.no_candidates += 1,
            }
            summary.total_matches += item.report.matches.len();
        }
        summary
    }
}

/// フォルダ直下（recursive 指定時はサブフォルダも）の .txt を列挙
pub fn scan_text_files(folder: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(RxMatchError::FolderNotFound(folder.display().to_string()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .map(|ext| TEXT_EXTENSIONS.iter().any(|&t| t == ext.to_string_lossy()))
                .unwrap_or(false)
        })
        .collect();

    files.sort();
    Ok(files)
}

/// ファイル群を並列に処理する（結果はファイル名順）
pub fn run_batch(
    files: &[PathBuf],
    catalog: &[CatalogEntry],
    lexicon: &Lexicon,
    options: &PipelineOptions,
    show_progress: bool,
) -> Result<Vec<BatchItem>> {
    let progress = if show_progress {
        let pb = ProgressBar::new(files.len() as u64);
        if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
            pb.set_style(style);
        }
        pb
    } else {
        ProgressBar::hidden()
    };

    let items = files
        .par_iter()
        .map(|path| -> Result<BatchItem> {
            let text = std::fs::read_to_string(path)?;
            let mut report = process_prescription(&text, catalog, lexicon, options);
            report.source = path.file_name().map(|n| n.to_string_lossy().to_string());
            progress.inc(1);
            Ok(BatchItem {
                path: path.clone(),
                report,
            })
        })
        .collect::<Result<Vec<BatchItem>>>()?;

    progress.finish_and_clear();
    Ok(items)
}

/// レポートのファイル名（スキャン起点からの相対パスを `_` で連結）
///
/// `ward2/rx.txt` → `ward2_rx.json`
pub fn report_file_name(path: &Path, scan_root: &Path) -> String {
    let relative = path.strip_prefix(scan_root).unwrap_or(path);
    let mut parts: Vec<String> = relative
        .parent()
        .map(|p| {
            p.components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s.to_string_lossy().to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "report".to_string());
    parts.push(stem);
    format!("{}.json", parts.join("_"))
}

/// 各レポートを保存（ファイル名が重複する場合は何も書かずにエラー）
pub fn write_reports(items: &[BatchItem], scan_root: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut targets = Vec::with_capacity(items.len());
    for item in items {
        let name = report_file_name(&item.path, scan_root);
        if !seen.insert(name.clone()) {
            return Err(RxMatchError::OutputConflict(format!(
                "{} ({})",
                name,
                item.path.display()
            )));
        }
        targets.push(output_dir.join(name));
    }

    std::fs::create_dir_all(output_dir)?;
    for (item, out) in items.iter().zip(&targets) {
        let json = serde_json::to_string_pretty(&item.report)?;
        std::fs::write(out, json)?;
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_scan_text_files_filters_and_sorts() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "x").unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        fs::write(dir.path().join("c.jpg"), "x").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("d.txt"), "x").unwrap();

        let files = scan_text_files(dir.path(), false).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);

        assert_eq!(scan_text_files(dir.path(), true).unwrap().len(), 3);
    }

    #[test]
    fn test_report_file_name_keeps_subfolder() {
        let root = Path::new("/data/rx");
        assert_eq!(report_file_name(Path::new("/data/rx/a.txt"), root), "a.json");
        assert_eq!(report_file_name(Path::new("/data/rx/ward2/rx.txt"), root), "ward2_rx.json");
        assert_eq!(report_file_name(Path::new("/data/rx/w/b/rx.txt"), root), "w_b_rx.json");
    }

    #[test]
    fn test_scan_missing_folder() {
        let result = scan_text_files(Path::new("/nonexistent/rx-match"), false);
        assert!(matches!(result, Err(RxMatchError::FolderNotFound(_))));
    }

    #[test]
    fn test_summary_counts() {
        let report = |outcome, n| PrescriptionReport {
            source: None,
            doctor_name: String::new(),
            patient_name: String::new(),
            candidates: Vec::new(),
            matches: vec![
                rx_match_common::MatchResult {
                    candidate: "Dolo".into(),
                    entry: CatalogEntry::default(),
                    confidence: 0.88,
                    strategy: rx_match_common::MatchStrategy::BrandGeneric,
                    verified: false,
                };
                n
            ],
            outcome,
        };
        let items = vec![
            BatchItem { path: "a.txt".into(), report: report(Outcome::Matched, 2) },
            BatchItem { path: "b.txt".into(), report: report(Outcome::NoCandidates, 0) },
        ];
        let summary = BatchSummary::from_items(&items);
        assert_eq!(summary.files, 2);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.no_candidates, 1);
        assert_eq!(summary.total_matches, 2);
    }
}
