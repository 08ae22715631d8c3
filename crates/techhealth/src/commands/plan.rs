use crate::utils;
use colored::Colorize;
use std::path::Path;
use techhealth_cloud::CloudProvider;
use techhealth_core::Stack;

pub async fn handle(stack: &Stack, project_root: &Path) -> anyhow::Result<()> {
    utils::validate_or_exit(stack);

    let desired = utils::desired_resources(stack)?;
    let provider = utils::provider(project_root);
    println!(
        "{}",
        format!("{} の状態と比較中...", provider.display_name()).blue()
    );

    let plan = provider.plan(&desired).await?;
    println!();
    utils::print_plan(&plan);

    Ok(())
}
