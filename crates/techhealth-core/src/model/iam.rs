//! IAMロールとマネージドポリシー

use serde::{Deserialize, Serialize};

/// ロールを引き受けられるAWSサービス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePrincipal(pub String);

impl ServicePrincipal {
    pub fn new(service: impl Into<String>) -> Self {
        Self(service.into())
    }

    pub fn ec2() -> Self {
        Self::new("ec2.amazonaws.com")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// AWSが管理するポリシー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedPolicy {
    pub name: String,
}

impl ManagedPolicy {
    pub fn aws_managed(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// パーティションを除いたARNの後半部分
    pub fn arn_suffix(&self) -> String {
        format!(":iam::aws:policy/{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,

    pub assumed_by: ServicePrincipal,

    pub managed_policies: Vec<ManagedPolicy>,
}

impl Role {
    pub fn new(id: impl Into<String>, assumed_by: ServicePrincipal) -> Self {
        Self {
            id: id.into(),
            assumed_by,
            managed_policies: Vec::new(),
        }
    }

    pub fn add_managed_policy(&mut self, policy: ManagedPolicy) {
        if !self.managed_policies.contains(&policy) {
            self.managed_policies.push(policy);
        }
    }
}
