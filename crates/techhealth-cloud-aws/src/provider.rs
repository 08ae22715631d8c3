//! CloudFormation provider implementation

use crate::error::AwsError;
use crate::template::holds_data;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use techhealth_cloud::{
    Action, ActionType, ApplyResult, CloudProvider, DeletionPolicy, Plan, ResourceSet,
    ResourceState, ResourceStatus, StackState, StateManager,
};
use tokio::fs;

/// CloudFormation provider backed by the local state store
pub struct CloudFormationProvider {
    state: StateManager,
    out_dir: PathBuf,
}

impl CloudFormationProvider {
    /// `project_root` holds `.techhealth/`; templates are written to `out_dir`
    pub fn new(project_root: impl AsRef<Path>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            state: StateManager::new(project_root),
            out_dir: out_dir.into(),
        }
    }

    /// Where the template of a stack is written on apply
    pub fn template_path(&self, stack_name: &str) -> PathBuf {
        self.out_dir.join(format!("{}.template.json", stack_name))
    }

    async fn write_template(&self, desired: &ResourceSet) -> techhealth_cloud::Result<PathBuf> {
        if !self.out_dir.exists() {
            fs::create_dir_all(&self.out_dir).await?;
        }
        let path = self.template_path(&desired.stack_name);
        let content = serde_json::to_string_pretty(&desired.template)?;
        fs::write(&path, content).await?;
        tracing::debug!("Wrote template: {}", path.display());
        Ok(path)
    }
}

fn data_loss_warning(logical_id: &str, resource_type: &str) -> String {
    format!(
        "{} ({}) は削除ポリシー Delete のため削除されました。データは復元できません",
        logical_id, resource_type
    )
}

fn retained_warning(logical_id: &str, resource_type: &str) -> String {
    format!(
        "{} ({}) は Retain のためスタックから切り離されました。手動で削除してください",
        logical_id, resource_type
    )
}

#[async_trait]
impl CloudProvider for CloudFormationProvider {
    fn name(&self) -> &str {
        "cloudformation"
    }

    fn display_name(&self) -> &str {
        "AWS CloudFormation"
    }

    async fn get_state(&self, stack_name: &str) -> techhealth_cloud::Result<StackState> {
        let global = self.state.load().await?;
        Ok(global
            .stack(stack_name)
            .cloned()
            .unwrap_or_else(|| StackState::new(stack_name)))
    }

    async fn plan(&self, desired: &ResourceSet) -> techhealth_cloud::Result<Plan> {
        let current = self.get_state(&desired.stack_name).await?;
        let mut actions = Vec::new();

        for resource in desired.iter() {
            let action = match current.get(&resource.logical_id) {
                None => Action::new(
                    ActionType::Create,
                    &resource.resource_type,
                    &resource.logical_id,
                )
                .with_detail("fingerprint", serde_json::json!(resource.fingerprint)),
                Some(recorded) if recorded.fingerprint != resource.fingerprint => Action::new(
                    ActionType::Update,
                    &resource.resource_type,
                    &resource.logical_id,
                )
                .with_detail("previous", serde_json::json!(recorded.fingerprint))
                .with_detail("fingerprint", serde_json::json!(resource.fingerprint)),
                Some(_) => Action::new(
                    ActionType::NoOp,
                    &resource.resource_type,
                    &resource.logical_id,
                ),
            };
            actions.push(action);
        }

        for (logical_id, recorded) in current.iter() {
            if desired.get(logical_id).is_none() {
                actions.push(
                    Action::new(ActionType::Delete, &recorded.resource_type, logical_id)
                        .with_detail(
                            "deletion_policy",
                            serde_json::json!(recorded.deletion_policy),
                        ),
                );
            }
        }

        let plan = Plan::new(&desired.stack_name, actions);
        tracing::debug!("Plan for {}: {}", plan.stack_name, plan.summary());
        Ok(plan)
    }

    async fn apply(&self, desired: &ResourceSet, plan: &Plan) -> techhealth_cloud::Result<ApplyResult> {
        if plan.stack_name != desired.stack_name {
            return Err(AwsError::StackMismatch {
                plan: plan.stack_name.clone(),
                desired: desired.stack_name.clone(),
            }
            .into());
        }

        let start = std::time::Instant::now();
        let lock = self.state.acquire_lock().await?;

        let mut global = self.state.load().await?;
        let mut stack = global
            .stack(&desired.stack_name)
            .cloned()
            .unwrap_or_else(|| StackState::new(&desired.stack_name));
        let mut result = ApplyResult::new();

        for action in &plan.actions {
            match action.action_type {
                ActionType::Create => {
                    let Some(resource) = desired.get(&action.logical_id) else {
                        result.add_failure(
                            action.id.clone(),
                            format!("{} はテンプレートに存在しません", action.logical_id),
                        );
                        continue;
                    };
                    tracing::info!("Creating {}", action.logical_id);
                    stack.add(
                        ResourceState::new(
                            &resource.logical_id,
                            &resource.resource_type,
                            &resource.fingerprint,
                        )
                        .with_status(ResourceStatus::CreateComplete)
                        .with_deletion_policy(resource.deletion_policy),
                    );
                    result.add_success(
                        action.id.clone(),
                        format!("{} を作成しました", action.logical_id),
                    );
                }
                ActionType::Update => {
                    let resource = desired.get(&action.logical_id);
                    let recorded = stack.resources.get_mut(&action.logical_id);
                    match (resource, recorded) {
                        (Some(resource), Some(recorded)) => {
                            tracing::info!("Updating {}", action.logical_id);
                            recorded.touch(&resource.fingerprint);
                            recorded.deletion_policy = resource.deletion_policy;
                            recorded.status = ResourceStatus::UpdateComplete;
                            result.add_success(
                                action.id.clone(),
                                format!("{} を更新しました", action.logical_id),
                            );
                        }
                        _ => result.add_failure(
                            action.id.clone(),
                            format!("{} の状態が計画時と異なります", action.logical_id),
                        ),
                    }
                }
                ActionType::Delete => {
                    let Some(recorded) = stack.remove(&action.logical_id) else {
                        result.add_failure(
                            action.id.clone(),
                            format!("{} は記録されていません", action.logical_id),
                        );
                        continue;
                    };
                    tracing::info!("Deleting {}", action.logical_id);
                    match recorded.deletion_policy {
                        DeletionPolicy::Retain => {
                            result.add_warning(retained_warning(
                                &recorded.logical_id,
                                &recorded.resource_type,
                            ));
                        }
                        DeletionPolicy::Delete if holds_data(&recorded.resource_type) => {
                            result.add_warning(data_loss_warning(
                                &recorded.logical_id,
                                &recorded.resource_type,
                            ));
                        }
                        _ => {}
                    }
                    result.add_success(
                        action.id.clone(),
                        format!("{} を削除しました", action.logical_id),
                    );
                }
                ActionType::NoOp => {}
            }
        }

        let template_path = self.write_template(desired).await?;
        stack.template_path = Some(template_path);
        stack.deployed_at = Some(Utc::now());
        global.set_stack(stack);
        self.state.save(&global).await?;
        lock.release().await?;

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    async fn destroy_all(&self, stack_name: &str) -> techhealth_cloud::Result<ApplyResult> {
        let start = std::time::Instant::now();
        let lock = self.state.acquire_lock().await?;

        let mut global = self.state.load().await?;
        let mut result = ApplyResult::new();

        let Some(stack) = global.remove_stack(stack_name) else {
            tracing::debug!("Stack {} has no recorded resources", stack_name);
            lock.release().await?;
            return Ok(result);
        };

        for (logical_id, recorded) in stack.iter() {
            let action_id = format!("{}-{}", ActionType::Delete, logical_id);
            match recorded.deletion_policy {
                DeletionPolicy::Retain => {
                    result.add_success(action_id, format!("{} を保持しました", logical_id));
                    result.add_warning(retained_warning(logical_id, &recorded.resource_type));
                }
                DeletionPolicy::Snapshot => {
                    result.add_success(
                        action_id,
                        format!("{} のスナップショットを取得して削除しました", logical_id),
                    );
                }
                DeletionPolicy::Delete => {
                    if holds_data(&recorded.resource_type) {
                        result.add_warning(data_loss_warning(logical_id, &recorded.resource_type));
                    }
                    result.add_success(action_id, format!("{} を削除しました", logical_id));
                }
            }
        }

        self.state.save(&global).await?;
        lock.release().await?;

        if let Some(path) = &stack.template_path {
            if path.exists() {
                if let Err(e) = fs::remove_file(path).await {
                    tracing::warn!("Failed to remove template {}: {}", path.display(), e);
                    result.add_warning(format!(
                        "テンプレート {} を削除できませんでした: {}",
                        path.display(),
                        e
                    ));
                }
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }
}
