use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "スタックファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: stack.local.kdl, .stack.local.kdl, stack.kdl, .stack.kdl\n\
        - ./.techhealth/ ディレクトリ\n\
        - ~/.config/techhealth/stack.kdl\n\
        または TECHHEALTH_CONFIG_PATH 環境変数で直接指定できます"
    )]
    StackFileNotFound,

    #[error("TECHHEALTH_CONFIG_PATH のファイルが存在しません: {0}")]
    ConfiguredPathMissing(String),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
