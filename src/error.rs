use thiserror::Error;

#[derive(Error, Debug)]
pub enum RxMatchError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("カタログファイルが不正: {0}")]
    InvalidCatalog(String),

    #[error("未対応のカタログ形式です: {0}（.json / .csv を指定してください）")]
    UnsupportedCatalogFormat(String),

    #[error("レポートの出力ファイル名が重複しています: {0}")]
    OutputConflict(String),

    #[error("レジストリ照会エラー: {0}")]
    Registry(String),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] rx_match_common::Error),
}

pub type Result<T> = std::result::Result<T, RxMatchError>;
