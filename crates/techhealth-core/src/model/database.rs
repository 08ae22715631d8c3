//! マネージドリレーショナルデータベース

use super::compute::InstanceType;
use super::network::SubnetType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MysqlEngineVersion {
    #[serde(rename = "8.0")]
    V8_0,
    #[serde(rename = "8.4")]
    V8_4,
}

impl MysqlEngineVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            MysqlEngineVersion::V8_0 => "8.0",
            MysqlEngineVersion::V8_4 => "8.4",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "engine", content = "version", rename_all = "lowercase")]
pub enum DatabaseEngine {
    Mysql(MysqlEngineVersion),
}

impl DatabaseEngine {
    pub fn mysql(version: MysqlEngineVersion) -> Self {
        DatabaseEngine::Mysql(version)
    }

    /// CloudFormation の Engine 値
    pub fn name(&self) -> &'static str {
        match self {
            DatabaseEngine::Mysql(_) => "mysql",
        }
    }

    pub fn version(&self) -> &'static str {
        match self {
            DatabaseEngine::Mysql(v) => v.as_str(),
        }
    }

    /// エンジンの既定ポート
    pub fn default_port(&self) -> u16 {
        match self {
            DatabaseEngine::Mysql(_) => 3306,
        }
    }
}

/// スタック削除時のリソースの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    /// スタックと一緒に削除する（データは復元できない）
    Destroy,
    /// スタックから切り離して残す
    Retain,
    /// 削除前にスナップショットを取る
    Snapshot,
}

impl RemovalPolicy {
    /// `DeletionPolicy` / `UpdateReplacePolicy` の値
    pub fn cfn_value(&self) -> &'static str {
        match self {
            RemovalPolicy::Destroy => "Delete",
            RemovalPolicy::Retain => "Retain",
            RemovalPolicy::Snapshot => "Snapshot",
        }
    }
}

impl std::str::FromStr for RemovalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "destroy" | "delete" => Ok(RemovalPolicy::Destroy),
            "retain" => Ok(RemovalPolicy::Retain),
            "snapshot" => Ok(RemovalPolicy::Snapshot),
            other => Err(format!("unknown removal policy: {}", other)),
        }
    }
}

impl std::fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemovalPolicy::Destroy => write!(f, "destroy"),
            RemovalPolicy::Retain => write!(f, "retain"),
            RemovalPolicy::Snapshot => write!(f, "snapshot"),
        }
    }
}

/// データベースインスタンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInstance {
    pub id: String,

    pub engine: DatabaseEngine,

    pub instance_type: InstanceType,

    /// ストレージ容量 (GiB)
    pub allocated_storage: u32,

    pub subnet_type: SubnetType,

    pub security_groups: Vec<String>,

    pub removal_policy: RemovalPolicy,

    /// マスターユーザー名（パスワードはSecrets Managerで生成）
    pub master_username: String,
}

impl DatabaseInstance {
    /// スタック削除でデータが失われるか
    pub fn loses_data_on_teardown(&self) -> bool {
        self.removal_policy == RemovalPolicy::Destroy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_values() {
        let engine = DatabaseEngine::mysql(MysqlEngineVersion::V8_0);
        assert_eq!(engine.name(), "mysql");
        assert_eq!(engine.version(), "8.0");
        assert_eq!(engine.default_port(), 3306);
    }

    #[test]
    fn test_removal_policy_parse() {
        assert_eq!("DESTROY".parse::<RemovalPolicy>(), Ok(RemovalPolicy::Destroy));
        assert_eq!("retain".parse::<RemovalPolicy>(), Ok(RemovalPolicy::Retain));
        assert_eq!(RemovalPolicy::Destroy.cfn_value(), "Delete");
        assert!("keep".parse::<RemovalPolicy>().is_err());
    }
}
