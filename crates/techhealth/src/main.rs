mod commands;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "techhealth")]
#[command(about = "移行スタックを定義し、検証し、デプロイする。", long_about = None)]
struct Cli {
    /// スタック記述ファイル（省略時は自動検出、見つからなければ既定の構成）
    #[arg(short, long, global = true, env = "TECHHEALTH_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// CloudFormation テンプレートを生成
    Synth {
        /// 出力先ファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// スタック記述を検証
    Validate,
    /// 記録済みの状態との差分を表示
    Plan,
    /// スタックをデプロイ
    Deploy {
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// スタックを削除
    Destroy {
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout はテンプレート出力に使うので、ログは stderr に出力
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("techhealth {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let stack_file = utils::resolve_stack_file(cli.config)?;
    let stack = techhealth_core::load_stack(stack_file.as_deref())?;
    let project_root = utils::project_root(stack_file.as_deref())?;
    tracing::debug!(
        project_root = %project_root.display(),
        "Loaded stack {}",
        stack.name
    );

    match cli.command {
        Commands::Synth { output } => {
            commands::synth::handle(&stack, stack_file.as_deref(), output.as_deref()).await?;
        }
        Commands::Validate => {
            commands::validate::handle(&stack, stack_file.as_deref()).await?;
        }
        Commands::Plan => {
            commands::plan::handle(&stack, &project_root).await?;
        }
        Commands::Deploy { yes } => {
            commands::deploy::handle(&stack, &project_root, yes).await?;
        }
        Commands::Destroy { yes } => {
            commands::destroy::handle(&stack, &project_root, yes).await?;
        }
        Commands::Version => {
            unreachable!("Version is handled before config loading");
        }
    }

    Ok(())
}
