use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rx-match")]
#[command(about = "処方箋OCRテキストの医薬品抽出・在庫カタログ照合ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// OCRテキストから医師名・患者名・医薬品候補を抽出
    Extract {
        /// OCRテキストファイル
        #[arg(required = true)]
        input: PathBuf,

        /// カスタム辞書（JSON）
        #[arg(long)]
        lexicon: Option<PathBuf>,

        /// JSONで出力
        #[arg(long)]
        json: bool,
    },

    /// OCRテキストを在庫カタログと照合
    Match {
        /// OCRテキストファイル
        #[arg(required = true)]
        input: PathBuf,

        /// 在庫カタログ（.json / .csv）
        #[arg(short, long, required = true)]
        catalog: PathBuf,

        /// 出力JSONファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 採用閾値（0.0-1.0、省略時は設定値）
        #[arg(short, long)]
        threshold: Option<f64>,

        /// カスタム辞書（JSON）
        #[arg(long)]
        lexicon: Option<PathBuf>,

        /// 外部レジストリで照合結果を確認
        #[arg(long)]
        verify: bool,
    },

    /// フォルダ内の .txt を一括照合
    Batch {
        /// OCRテキストのフォルダ
        #[arg(required = true)]
        folder: PathBuf,

        /// 在庫カタログ（.json / .csv）
        #[arg(short, long, required = true)]
        catalog: PathBuf,

        /// レポート出力先（デフォルト: 入力フォルダ/reports）
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// 採用閾値（0.0-1.0、省略時は設定値）
        #[arg(short, long)]
        threshold: Option<f64>,

        /// カスタム辞書（JSON）
        #[arg(long)]
        lexicon: Option<PathBuf>,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,
    },

    /// 設定を表示/編集
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// 採用閾値を設定
        #[arg(long)]
        set_threshold: Option<f64>,

        /// カスタム辞書を設定
        #[arg(long)]
        set_lexicon: Option<PathBuf>,

        /// レジストリURLを設定
        #[arg(long)]
        set_registry_url: Option<String>,
    },

    /// レジストリ照会キャッシュの管理
    Cache {
        /// キャッシュ情報を表示
        #[arg(long)]
        info: bool,

        /// キャッシュを削除
        #[arg(long)]
        clear: bool,

        /// 期限切れのエントリを削除
        #[arg(long)]
        prune: bool,
    },
}
