use crate::utils;
use colored::Colorize;
use std::path::Path;
use techhealth_core::Stack;

pub async fn handle(stack: &Stack, stack_file: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "スタック記述を検証中...".blue());
    utils::print_loaded_stack_file(stack_file);

    let report = techhealth_core::validate(stack);
    if !report.is_ok() {
        eprintln!();
        eprintln!("{}", "✗ 検証エラー".red().bold());
        utils::print_findings(&report);
        std::process::exit(1);
    }

    println!("{}", "✓ スタック記述は正常です！".green().bold());
    utils::print_findings(&report);
    println!();
    println!("サマリー:");
    println!("  スタック: {}", stack.name.cyan());
    println!(
        "  ネットワーク: {} ({} AZ)",
        stack.network.cidr.to_string().cyan(),
        stack.network.max_azs
    );
    for subnet in stack.network.allocate_subnets()? {
        println!(
            "    - {} {} ({})",
            subnet.construct_id(),
            subnet.cidr.to_string().cyan(),
            subnet.subnet_type
        );
    }
    println!("  セキュリティグループ: {}個", stack.security_groups.len());
    for sg in &stack.security_groups {
        println!("    - {} ({}個の受信ルール)", sg.id.cyan(), sg.ingress.len());
    }
    println!("  インスタンス: {}個", stack.instances.len());
    for instance in &stack.instances {
        println!(
            "    - {} ({}, {})",
            instance.id.cyan(),
            instance.instance_type,
            instance.subnet_type
        );
    }
    println!("  データベース: {}個", stack.databases.len());
    for db in &stack.databases {
        println!(
            "    - {} ({} {}, {}, 削除ポリシー: {})",
            db.id.cyan(),
            db.engine.name(),
            db.engine.version(),
            db.instance_type.db_class(),
            db.removal_policy
        );
    }

    Ok(())
}
