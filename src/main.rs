use clap::Parser;
use rx_match::{batch, catalog, cli, config, error, pipeline, registry};
use cli::{Cli, Commands};
use config::Config;
use error::Result;
use registry::{CachedVerifier, RxNavVerifier, VerificationCache};
use rx_match_common::{extract_prescription_with, ExtractOptions, Lexicon};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// 進捗表示（`to_stderr` が真なら標準エラーへ）
macro_rules! status {
    ($to_stderr:expr, $($arg:tt)*) => {
        if $to_stderr {
            eprintln!($($arg)*);
        } else {
            println!($($arg)*);
        }
    };
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// CLI指定を優先して辞書を読み込む
fn load_lexicon(cli_path: Option<&Path>, config: &Config) -> Result<Lexicon> {
    let path = cli_path.or(config.lexicon_path.as_deref());
    Ok(Lexicon::builtin_with(path)?)
}

/// CLI指定を優先して処理オプションを決める
fn pipeline_options(config: &Config, threshold: Option<f64>) -> Result<pipeline::PipelineOptions> {
    let mut effective = config.clone();
    if let Some(t) = threshold {
        effective.acceptance_threshold = t;
    }
    effective.validate()?;
    Ok(pipeline::PipelineOptions::from(&effective))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Extract { input, lexicon, json } => {
            if !input.exists() {
                return Err(error::RxMatchError::FileNotFound(input.display().to_string()));
            }
            let lexicon = load_lexicon(lexicon.as_deref(), &config)?;
            let text = std::fs::read_to_string(&input)?;
            let result = extract_prescription_with(
                &text,
                &lexicon,
                &ExtractOptions {
                    max_candidates: config.max_candidates,
                },
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("医師: {}", result.doctor_name);
                println!("患者: {}", result.patient_name);
                println!("医薬品候補: {}件", result.medicines.len());
                for (i, name) in result.medicines.iter().enumerate() {
                    println!("  {}. {}", i + 1, name);
                }
            }
        }

        Commands::Match { input, catalog: catalog_path, output, threshold, lexicon, verify } => {
            // JSONを標準出力に書くときは進捗を標準エラーへ
            let json_to_stdout = output.is_none();
            status!(json_to_stdout, "💊 rx-match - 処方箋照合\n");

            if !input.exists() {
                return Err(error::RxMatchError::FileNotFound(input.display().to_string()));
            }
            let options = pipeline_options(&config, threshold)?;

            // 1. カタログ・辞書読み込み
            status!(json_to_stdout, "[1/3] カタログを読み込み中...");
            let entries = catalog::load_catalog(&catalog_path)?;
            let lexicon = load_lexicon(lexicon.as_deref(), &config)?;
            status!(
                json_to_stdout,
                "✔ {}商品（在庫あり {}）\n",
                entries.len(),
                catalog::in_stock(&entries).len()
            );

            // 2. 抽出・照合
            status!(json_to_stdout, "[2/3] 抽出・照合中...");
            let text = std::fs::read_to_string(&input)?;
            let mut report = pipeline::process_prescription(&text, &entries, &lexicon, &options);
            status!(
                json_to_stdout,
                "✔ 候補{}件 / 一致{}件\n",
                report.candidates.len(),
                report.matches.len()
            );

            // 3. レジストリ確認（任意）
            if (verify || config.verify) && !report.matches.is_empty() {
                status!(json_to_stdout, "[3/3] レジストリ確認中...");
                let cache_dir = Config::cache_dir()?;
                let verifier = RxNavVerifier::new(
                    &config.get_registry_url(),
                    config.timeout_seconds,
                    lexicon.synonyms().clone(),
                    lexicon.variations().clone(),
                )?;
                let cached = CachedVerifier::new(
                    verifier,
                    VerificationCache::load(&cache_dir),
                    config.cache_ttl_hours,
                );
                let verified = pipeline::verify_matches(&mut report, &cached).await;
                if let Err(e) = cached.into_cache().save(&cache_dir) {
                    tracing::warn!(error = %e, "照会キャッシュを保存できません");
                }
                status!(json_to_stdout, "✔ {}/{}件を確認\n", verified, report.matches.len());
            }

            let json = serde_json::to_string_pretty(&report)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    status!(json_to_stdout, "✔ 結果を保存: {}", path.display());
                }
                None => println!("{}", json),
            }

            status!(json_to_stdout, "\n✅ 照合完了");
        }

        Commands::Batch { folder, catalog: catalog_path, output_dir, threshold, lexicon, recursive } => {
            println!("💊 rx-match - 一括照合\n");
            let options = pipeline_options(&config, threshold)?;

            // 1. スキャン
            println!("[1/3] テキストをスキャン中...");
            let files = batch::scan_text_files(&folder, recursive)?;
            println!("✔ {}件のテキストを検出\n", files.len());
            if files.is_empty() {
                println!("処理対象がありません");
                return Ok(());
            }

            let entries = catalog::load_catalog(&catalog_path)?;
            let lexicon = load_lexicon(lexicon.as_deref(), &config)?;

            // 2. 照合
            println!("[2/3] 照合中...");
            let items = batch::run_batch(&files, &entries, &lexicon, &options, true)?;
            println!("✔ 照合完了\n");

            // 3. 保存
            println!("[3/3] レポートを保存中...");
            let output_dir = output_dir.unwrap_or_else(|| folder.join("reports"));
            let written = batch::write_reports(&items, &folder, &output_dir)?;
            println!("✔ {}件のレポートを保存: {}", written.len(), output_dir.display());

            let summary = batch::BatchSummary::from_items(&items);
            println!(
                "\n✅ 完了: {}件中 一致あり {} / 一致なし {} / 候補なし {}（合計一致 {}件）",
                summary.files, summary.matched, summary.no_matches, summary.no_candidates, summary.total_matches
            );
        }

        Commands::Config { show, set_threshold, set_lexicon, set_registry_url } => {
            let mut config = config;

            if let Some(t) = set_threshold {
                config.set_threshold(t)?;
                println!("✔ 採用閾値を設定しました: {}", t);
            }
            if let Some(path) = set_lexicon {
                config.set_lexicon_path(path)?;
                println!("✔ カスタム辞書を設定しました");
            }
            if let Some(url) = set_registry_url {
                config.set_registry_url(url)?;
                println!("✔ レジストリURLを設定しました");
            }

            if show {
                println!("設定:");
                println!("  採用閾値: {}", config.acceptance_threshold);
                println!("  候補数上限: {}", config.max_candidates);
                println!(
                    "  カスタム辞書: {}",
                    config
                        .lexicon_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "未設定".to_string())
                );
                println!("  レジストリURL: {}", config.get_registry_url());
                println!("  レジストリ確認: {}", if config.verify { "有効" } else { "無効" });
                println!("  キャッシュ有効期間: {}時間", config.cache_ttl_hours);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
            }
        }

        Commands::Cache { info, clear, prune } => {
            let cache_dir: PathBuf = Config::cache_dir()?;
            let cache_path = VerificationCache::cache_path(&cache_dir);

            if prune {
                let mut cache = VerificationCache::load(&cache_dir);
                let removed = cache.prune_expired(
                    registry::cache::ttl_duration(config.cache_ttl_hours),
                    chrono::Utc::now(),
                );
                cache.save(&cache_dir)?;
                println!("✔ 期限切れのエントリを{}件削除しました", removed);
            }

            if info || !(clear || prune) {
                if cache_path.exists() {
                    let cache = VerificationCache::load(&cache_dir);
                    println!("キャッシュ情報:");
                    println!("  パス: {}", cache_path.display());
                    println!("  件数: {}", cache.len());
                    if let Ok(meta) = std::fs::metadata(&cache_path) {
                        println!("  サイズ: {} bytes", meta.len());
                    }
                } else {
                    println!("キャッシュファイルが存在しません: {}", cache_path.display());
                }
            }

            if clear {
                match VerificationCache::clear(&cache_dir) {
                    Ok(true) => println!("✔ キャッシュを削除しました: {}", cache_path.display()),
                    Ok(false) => println!("キャッシュファイルが存在しません"),
                    Err(e) => println!("キャッシュ削除エラー: {}", e),
                }
            }
        }
    }

    Ok(())
}
