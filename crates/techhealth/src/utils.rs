use colored::Colorize;
use std::path::{Path, PathBuf};
use techhealth_cloud::{Action, ActionType, Plan, ResourceSet, STATE_DIR, StackState};
use techhealth_cloud_aws::CloudFormationProvider;
use techhealth_config::ConfigError;
use techhealth_core::{RemovalPolicy, Severity, Stack, ValidationReport};

/// スタック記述ファイルを決定する
///
/// 明示指定があればそれを使い、なければ自動検出する。
/// どこにも無い場合は None（既定の構成を使う）。
pub fn resolve_stack_file(explicit: Option<PathBuf>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("スタック記述ファイルが存在しません: {}", path.display());
        }
        return Ok(Some(path));
    }

    match techhealth_config::find_stack_file() {
        Ok(path) => Ok(Some(path)),
        Err(ConfigError::StackFileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// 状態ファイルとテンプレートを置くディレクトリの親
pub fn project_root(stack_file: Option<&Path>) -> anyhow::Result<PathBuf> {
    match stack_file {
        Some(path) => Ok(techhealth_config::project_root_for(path)),
        None => Ok(std::env::current_dir()?),
    }
}

pub fn provider(project_root: &Path) -> CloudFormationProvider {
    CloudFormationProvider::new(project_root, project_root.join(STATE_DIR).join("out"))
}

/// 読み込んだスタック記述を表示
pub fn print_loaded_stack_file(stack_file: Option<&Path>) {
    match stack_file {
        Some(path) => eprintln!("📄 スタック記述: {}", path.display().to_string().cyan()),
        None => eprintln!("📄 スタック記述: {}", "(既定の構成)".dimmed()),
    }
}

pub fn print_findings(report: &ValidationReport) {
    for finding in &report.findings {
        let label = match finding.severity {
            Severity::Error => "✗ エラー".red().bold(),
            Severity::Warning => "⚠ 警告".yellow().bold(),
        };
        eprintln!("  {} [{}] {}", label, finding.resource.cyan(), finding.message);
    }
}

/// 検証してエラーがあれば終了コード1で終了
pub fn validate_or_exit(stack: &Stack) -> ValidationReport {
    let report = techhealth_core::validate(stack);
    if !report.is_ok() {
        eprintln!();
        eprintln!("{}", "✗ スタック記述にエラーがあります".red().bold());
        print_findings(&report);
        std::process::exit(1);
    }
    report
}

/// テンプレートを生成して望ましいリソース集合にする
pub fn desired_resources(stack: &Stack) -> anyhow::Result<ResourceSet> {
    let template = techhealth_core::synthesize(stack)?;
    Ok(techhealth_cloud_aws::resource_set(
        &stack.name,
        template.into_body(),
    )?)
}

fn print_action(action: &Action) {
    let (marker, label) = match action.action_type {
        ActionType::Create => ("+".green(), action.logical_id.green()),
        ActionType::Update => ("~".yellow(), action.logical_id.yellow()),
        ActionType::Delete => ("-".red(), action.logical_id.red()),
        ActionType::NoOp => return,
    };
    println!(
        "  {} {} ({})",
        marker,
        label,
        action.resource_type.dimmed()
    );
}

pub fn print_plan(plan: &Plan) {
    println!("{}", format!("スタック: {}", plan.stack_name).bold());
    if !plan.has_changes {
        println!("{}", "✓ 変更はありません".green());
        return;
    }
    for action in &plan.actions {
        print_action(action);
    }
    println!();
    println!("{}", plan.summary());
}

/// 削除ポリシーが DESTROY のデータベースを警告
pub fn print_data_loss_hazard(stack: &Stack) {
    let hazardous = stack
        .databases
        .iter()
        .filter(|db| db.removal_policy == RemovalPolicy::Destroy);

    for db in hazardous {
        println!(
            "{}",
            format!(
                "警告: {} の削除ポリシーは DESTROY です。スタック削除時にデータベースのデータは失われます。",
                db.id
            )
            .yellow()
        );
    }
}

/// 記録済みの状態から、削除でデータが失われるリソースを警告
pub fn print_recorded_data_loss_hazard(recorded: &StackState) {
    for resource in techhealth_cloud_aws::data_loss_hazards(recorded) {
        println!(
            "{}",
            format!(
                "警告: {} ({}) は削除ポリシー Delete でデプロイされています。スタック削除時にデータは失われます。",
                resource.logical_id, resource.resource_type
            )
            .yellow()
        );
    }
}

pub fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        println!("  {} {}", "⚠".yellow(), warning.yellow());
    }
}
