use crate::utils;
use colored::Colorize;
use std::path::Path;
use techhealth_core::Stack;

pub async fn handle(
    stack: &Stack,
    stack_file: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    utils::print_loaded_stack_file(stack_file);
    let report = utils::validate_or_exit(stack);
    utils::print_findings(&report);

    let template = techhealth_core::synthesize(stack)?;
    let json = template.to_json_pretty()?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            tokio::fs::write(path, format!("{}\n", json)).await?;
            eprintln!(
                "{} {} ({}個のリソース)",
                "✓ テンプレートを書き出しました:".green(),
                path.display().to_string().cyan(),
                template.resources().count()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}
