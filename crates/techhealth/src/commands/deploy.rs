use crate::utils;
use colored::Colorize;
use std::path::Path;
use techhealth_cloud::CloudProvider;
use techhealth_core::Stack;

pub async fn handle(stack: &Stack, project_root: &Path, yes: bool) -> anyhow::Result<()> {
    println!("{}", "デプロイを開始します...".blue().bold());
    let report = utils::validate_or_exit(stack);
    utils::print_findings(&report);

    let desired = utils::desired_resources(stack)?;
    let provider = utils::provider(project_root);
    let plan = provider.plan(&desired).await?;

    println!();
    utils::print_plan(&plan);
    println!();
    utils::print_data_loss_hazard(stack);

    if !plan.has_changes {
        return Ok(());
    }

    // 確認（--yesが指定されていない場合）
    if !yes {
        println!("実行するには --yes オプションを指定してください");
        return Ok(());
    }

    println!();
    println!(
        "{}",
        format!("{} に適用中...", provider.display_name()).blue()
    );
    let result = provider.apply(&desired, &plan).await?;

    for success in &result.succeeded {
        println!("  {} {}", "✓".green(), success.message);
    }
    for failure in &result.failed {
        let error = failure.error.as_deref().unwrap_or("unknown error");
        eprintln!("  {} {}: {}", "✗".red(), failure.action_id, error);
    }
    utils::print_warnings(&result.warnings);

    if !result.is_success() {
        anyhow::bail!("{}個のアクションが失敗しました", result.failed.len());
    }

    println!();
    println!(
        "{} ({}ms)",
        "✓ デプロイが完了しました".green().bold(),
        result.duration_ms
    );
    println!(
        "テンプレート: {}",
        provider
            .template_path(&stack.name)
            .display()
            .to_string()
            .cyan()
    );

    Ok(())
}
