//! スタック記述の検証
//!
//! 到達性に関わる不変条件を確認し、結果を [`ValidationReport`] にまとめる。
//! エラーが1つでもあればテンプレートは生成しない。

use crate::model::{Peer, Port, RemovalPolicy, Stack};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// 検出結果の重要度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,

    /// 対象リソースID
    pub resource: String,

    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    fn error(&mut self, resource: &str, message: impl Into<String>) {
        self.findings.push(Finding {
            severity: Severity::Error,
            resource: resource.to_string(),
            message: message.into(),
        });
    }

    fn warning(&mut self, resource: &str, message: impl Into<String>) {
        self.findings.push(Finding {
            severity: Severity::Warning,
            resource: resource.to_string(),
            message: message.into(),
        });
    }

    /// エラーがなければ true（警告は許容）
    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
    }
}

/// 全ての検査を実行
pub fn validate(stack: &Stack) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_unique_ids(stack, &mut report);
    check_network(stack, &mut report);
    check_references(stack, &mut report);
    check_compute_access(stack, &mut report);
    check_data_access(stack, &mut report);
    check_database_placement(stack, &mut report);
    check_removal_policy(stack, &mut report);

    debug!(
        findings = report.findings.len(),
        ok = report.is_ok(),
        "Validated stack {}",
        stack.name
    );
    report
}

fn check_network(stack: &Stack, report: &mut ValidationReport) {
    let network = &stack.network;
    if network.max_azs == 0 {
        report.error(&network.id, "max-azs は1以上が必要です");
        return;
    }
    if network.subnet_configuration.is_empty() {
        report.error(&network.id, "サブネット構成がありません");
        return;
    }
    if let Err(e) = network.allocate_subnets() {
        report.error(&network.id, e.to_string());
    }
}

/// リソースIDは論理IDの元になるため、種類をまたいで一意でなければならない
fn check_unique_ids(stack: &Stack, report: &mut ValidationReport) {
    let ids = std::iter::once(stack.network.id.as_str())
        .chain(stack.security_groups.iter().map(|sg| sg.id.as_str()))
        .chain(stack.roles.iter().map(|r| r.id.as_str()))
        .chain(stack.instances.iter().map(|i| i.id.as_str()))
        .chain(stack.databases.iter().map(|db| db.id.as_str()));

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for id in ids {
        if !seen.insert(id) && reported.insert(id) {
            report.error(id, format!("ID '{}' が複数のリソースで使われています", id));
        }
    }
}

fn check_references(stack: &Stack, report: &mut ValidationReport) {
    for sg in &stack.security_groups {
        for rule in &sg.ingress {
            if let Peer::SecurityGroup(source) = &rule.peer {
                if stack.security_group(source).is_none() {
                    report.error(
                        &sg.id,
                        format!("参照先のセキュリティグループ '{}' が存在しません", source),
                    );
                }
            }
        }
    }

    for instance in &stack.instances {
        if stack.security_group(&instance.security_group).is_none() {
            report.error(
                &instance.id,
                format!(
                    "セキュリティグループ '{}' が存在しません",
                    instance.security_group
                ),
            );
        }
        if let Some(role) = &instance.role {
            if stack.role(role).is_none() {
                report.error(&instance.id, format!("IAMロール '{}' が存在しません", role));
            }
        }
        if !stack.network.has_subnet_type(instance.subnet_type) {
            report.error(
                &instance.id,
                format!("{} サブネットがネットワークに存在しません", instance.subnet_type),
            );
        }
    }

    for db in &stack.databases {
        if db.security_groups.is_empty() {
            report.error(&db.id, "セキュリティグループが指定されていません");
        }
        for sg in &db.security_groups {
            if stack.security_group(sg).is_none() {
                report.error(&db.id, format!("セキュリティグループ '{}' が存在しません", sg));
            }
        }
        if !stack.network.has_subnet_type(db.subnet_type) {
            report.error(
                &db.id,
                format!("{} サブネットがネットワークに存在しません", db.subnet_type),
            );
        }
    }
}

/// コンピュート層は任意のIPv4から SSH(22) と HTTP(80) を受け付ける
fn check_compute_access(stack: &Stack, report: &mut ValidationReport) {
    for instance in &stack.instances {
        let Some(sg) = stack.security_group(&instance.security_group) else {
            continue;
        };
        for port in [Port::tcp(22), Port::tcp(80)] {
            if !sg.allows_from_anywhere(port) {
                report.error(
                    &sg.id,
                    format!("{} が 0.0.0.0/0 から許可されていません", port),
                );
            }
        }
    }
}

/// データ層はコンピュート層のグループからのみ受け付ける
fn check_data_access(stack: &Stack, report: &mut ValidationReport) {
    let compute_groups: Vec<&str> = stack
        .instances
        .iter()
        .map(|i| i.security_group.as_str())
        .collect();

    for db in &stack.databases {
        let port = Port::tcp(db.engine.default_port());
        for sg_id in &db.security_groups {
            let Some(sg) = stack.security_group(sg_id) else {
                continue;
            };

            let mut admitted_from_compute = false;
            for rule in &sg.ingress {
                match &rule.peer {
                    Peer::SecurityGroup(source) if compute_groups.contains(&source.as_str()) => {
                        if rule.port == port {
                            admitted_from_compute = true;
                        }
                    }
                    peer => report.error(
                        &sg.id,
                        format!(
                            "データ層は {} からの {} を受け付けてはいけません",
                            peer, rule.port
                        ),
                    ),
                }
            }

            if !admitted_from_compute {
                report.warning(
                    &sg.id,
                    format!("コンピュート層からの {} が許可されていません", port),
                );
            }
        }
    }
}

fn check_database_placement(stack: &Stack, report: &mut ValidationReport) {
    for db in &stack.databases {
        if db.subnet_type.is_public() {
            report.error(&db.id, "データベースを public サブネットに配置することはできません");
        }
    }
}

fn check_removal_policy(stack: &Stack, report: &mut ValidationReport) {
    for db in &stack.databases {
        if db.removal_policy == RemovalPolicy::Destroy {
            report.warning(
                &db.id,
                "削除ポリシーが DESTROY です。スタック削除時にデータベースも削除され、データは復元できません",
            );
        }
    }
}
