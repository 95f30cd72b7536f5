use anyhow::{Context, Result};
use bedrock::cli::commands::dump::{DumpCommand, DumpCommandHandler};
use bedrock::cli::commands::migrate::{MigrateCommand, MigrateCommandHandler};
use bedrock::cli::commands::status::{StatusCommand, StatusCommandHandler};
use bedrock::cli::{Cli, Commands};
use clap::Parser;
use colored::control as color_control;
use std::env;
use std::io;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    sqlx::any::install_default_drivers();

    // CLIをパースして実行
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // 非同期ランタイムを作成して実行
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create Tokio runtime")
        .unwrap_or_else(|e| {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        });

    let result = runtime.block_on(run_command(cli));

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// ログ出力を初期化（標準エラーへ出力）
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// コマンドを実行する
async fn run_command(cli: Cli) -> Result<String> {
    // --no-color フラグの処理
    if cli.no_color {
        color_control::set_override(false);
    }

    // プロジェクトのルートパスを取得
    let project_path = env::current_dir()?;

    // --config フラグの処理（絶対パスに変換）
    let config_path: Option<PathBuf> = cli.config.map(|p| {
        if p.is_absolute() {
            p
        } else {
            project_path.join(p)
        }
    });

    match cli.command {
        Commands::Migrate { env, dry_run } => {
            let handler = MigrateCommandHandler::new();
            let command = MigrateCommand {
                project_path,
                config_path,
                env,
                dry_run,
            };
            handler.execute(&command).await
        }

        Commands::Status { env } => {
            let handler = StatusCommandHandler::new();
            let command = StatusCommand {
                project_path,
                config_path,
                env,
            };
            handler.execute(&command).await
        }

        Commands::Dump { env, output } => {
            let handler = DumpCommandHandler::new();
            let command = DumpCommand {
                project_path,
                config_path,
                env,
                output,
            };
            handler.execute(&command).await
        }
    }
}
