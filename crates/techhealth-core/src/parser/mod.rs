//! KDLパーサー
//!
//! `stack.kdl` を読み込み、固定トポロジーに対する上書きを適用します。
//! 記述されていない値は [`Stack::techhealth_migration`] のままです。

mod resources;

use crate::error::{Result, StackError};
use crate::model::Stack;
use kdl::{KdlDocument, KdlNode};
use std::fs;
use std::path::Path;

/// KDLファイルをパースしてStackを生成
pub fn parse_kdl_file<P: AsRef<Path>>(path: P) -> Result<Stack> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| StackError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    tracing::debug!(path = %path.display(), "Parsing stack file");
    parse_kdl_string(&content)
}

/// KDL文字列をパース
pub fn parse_kdl_string(content: &str) -> Result<Stack> {
    let doc: KdlDocument = content.parse()?;
    let mut stack = Stack::techhealth_migration();

    for node in doc.nodes() {
        match node.name().value() {
            "stack" => {
                if let Some(name) = first_string(node) {
                    stack.name = name;
                }
                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        apply_stack_child(&mut stack, child)?;
                    }
                }
            }
            other => {
                tracing::warn!(node = other, "Unknown top-level node, ignoring");
            }
        }
    }

    Ok(stack)
}

fn apply_stack_child(stack: &mut Stack, node: &KdlNode) -> Result<()> {
    match node.name().value() {
        "region" => stack.region = first_string(node),
        "account" => stack.account = first_string(node),
        "tags" => {
            if let Some(children) = node.children() {
                for tag in children.nodes() {
                    let value = first_string(tag).ok_or_else(|| {
                        StackError::InvalidConfig(format!(
                            "tag '{}' requires a string value",
                            tag.name().value()
                        ))
                    })?;
                    stack.tags.insert(tag.name().value().to_string(), value);
                }
            }
        }
        "network" => resources::apply_network(&mut stack.network, node)?,
        "security-group" | "security_group" => resources::apply_security_group(stack, node)?,
        "instance" => resources::apply_instance(stack, node)?,
        "database" => resources::apply_database(stack, node)?,
        other => {
            tracing::warn!(node = other, "Unknown stack node, ignoring");
        }
    }
    Ok(())
}

/// 最初の位置引数（文字列）
pub(crate) fn first_string(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// 最初の位置引数（整数）
pub(crate) fn first_integer(node: &KdlNode) -> Option<i128> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_integer())
}

/// 全ての位置引数（文字列）
pub(crate) fn all_strings(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string().map(|s| s.to_string()))
        .collect()
}

/// `key=value` プロパティ（文字列）
pub(crate) fn prop_string(node: &KdlNode, key: &str) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some(key))
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// `key=value` プロパティ（整数）
pub(crate) fn prop_integer(node: &KdlNode, key: &str) -> Option<i128> {
    node.entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some(key))
        .and_then(|e| e.value().as_integer())
}

#[cfg(test)]
mod tests;
