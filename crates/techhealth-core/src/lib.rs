//! TechHealth Core
//!
//! 移行用スタックの型付きモデル、`stack.kdl` のパース、到達性の検証、
//! CloudFormation テンプレートの生成を提供します。

pub mod cidr;
pub mod error;
pub mod model;
pub mod parser;
pub mod synth;
pub mod validate;

pub use cidr::Ipv4Cidr;
pub use error::{Result, StackError};
pub use model::*;
pub use parser::{parse_kdl_file, parse_kdl_string};
pub use synth::{Template, logical_id, synthesize};
pub use validate::{Finding, Severity, ValidationReport, validate};

use std::path::Path;

/// スタック記述を読み込む
///
/// ファイルが指定されていなければ固定トポロジーを返す。
pub fn load_stack(path: Option<&Path>) -> Result<Stack> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading stack description");
            parse_kdl_file(path)
        }
        None => {
            tracing::info!("No stack file, using built-in topology");
            Ok(Stack::techhealth_migration())
        }
    }
}
