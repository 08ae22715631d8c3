use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("IO エラー: {path}\n理由: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("無効なCIDR: {0}")]
    InvalidCidr(String),

    #[error("アドレス空間が不足しています: {cidr} に /{mask} を割り当てられません")]
    AddressSpaceExhausted { cidr: String, mask: u8 },

    #[error("IAMロールが見つかりません: {0}")]
    UnknownRole(String),

    #[error("リソースが見つかりません: {0}")]
    ResourceNotFound(String),

    #[error("論理IDが重複しています: {0}")]
    DuplicateLogicalId(String),

    #[error("検証エラー ({0}件)")]
    Validation(usize),

    #[error("JSONエラー: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StackError>;
