use crate::utils;
use colored::Colorize;
use std::path::Path;
use techhealth_cloud::CloudProvider;
use techhealth_core::Stack;

pub async fn handle(stack: &Stack, project_root: &Path, yes: bool) -> anyhow::Result<()> {
    let provider = utils::provider(project_root);
    let recorded = provider.get_state(&stack.name).await?;

    if recorded.is_empty() {
        println!(
            "{}",
            format!("スタック {} はデプロイされていません", stack.name).yellow()
        );
        return Ok(());
    }

    println!(
        "{}",
        format!("削除対象 ({} 個):", recorded.resources.len()).bold()
    );
    for (logical_id, resource) in recorded.iter() {
        println!(
            "  {} {} ({}, {})",
            "-".red(),
            logical_id.red(),
            resource.resource_type.dimmed(),
            resource.deletion_policy
        );
    }
    println!();
    utils::print_recorded_data_loss_hazard(&recorded);

    // 確認（--yesが指定されていない場合）
    if !yes {
        println!("実行するには --yes オプションを指定してください");
        return Ok(());
    }

    let result = provider.destroy_all(&stack.name).await?;
    for success in &result.succeeded {
        println!("  {} {}", "✓".green(), success.message);
    }
    utils::print_warnings(&result.warnings);

    println!();
    println!(
        "{} ({}ms)",
        "✓ スタックを削除しました".green().bold(),
        result.duration_ms
    );

    Ok(())
}
