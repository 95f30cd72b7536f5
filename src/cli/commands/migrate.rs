// migrateコマンドハンドラー
//
// データベースを必要に応じて作成・選択し、フレームワークスキーマと
// アプリケーションスキーマの未適用バージョンを適用します。
// --dry-run では実行予定のDDLだけを表示します。

use crate::cli::command_context::CommandContext;
use crate::cli::commands::connect_existing;
use crate::core::error::ReconcileError;
use crate::services::setup::SchemaSetupService;
use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use tracing::{debug, error};

/// migrateコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct MigrateCommand {
    /// プロジェクトのルートパス
    pub project_path: PathBuf,
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 環境名
    pub env: String,
    /// ドライラン
    pub dry_run: bool,
}

/// migrateコマンドハンドラー
#[derive(Debug, Default)]
pub struct MigrateCommandHandler {}

impl MigrateCommandHandler {
    /// 新しいMigrateCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// migrateコマンドを実行
    ///
    /// # Arguments
    ///
    /// * `command` - migrateコマンドのパラメータ
    ///
    /// # Returns
    ///
    /// 成功時は実行（予定）のDDLと状況メッセージ、失敗時はエラー
    pub async fn execute(&self, command: &MigrateCommand) -> Result<String> {
        let context = CommandContext::load_with_config(
            command.project_path.clone(),
            command.config_path.clone(),
        )?;

        let framework = context.framework_schema();
        let application = context.application_schema()?;

        let mut db = context.management(&command.env)?;
        let database = db_name(&context, &command.env)?;
        let mut lines = Vec::new();

        if connect_existing(db.as_mut()).await? {
            lines.push(format!("db {} already exists", database));
        } else if command.dry_run {
            lines.push(
                format!("db {} does not exist (not created in dry run)", database)
                    .yellow()
                    .to_string(),
            );
            return Ok(lines.join("\n"));
        } else {
            db.create_and_select_database()
                .await
                .with_context(|| format!("Failed to create database '{}'", database))?;
            lines.push(format!("created db {}", database).green().to_string());
        }

        let service = SchemaSetupService::new();
        let result = if command.dry_run {
            service
                .pending_changes(db.as_mut(), &framework, &application)
                .await
        } else {
            service.run(db.as_mut(), &framework, &application).await
        };

        let output = result.map_err(|e| self.report(e))?;
        debug!(lines = output.len(), dry_run = command.dry_run, "migrate finished");

        lines.extend(output);
        lines.push("done!".green().bold().to_string());
        Ok(lines.join("\n"))
    }

    fn report(&self, err: ReconcileError) -> anyhow::Error {
        if err.is_fatal() {
            error!(error = %err, "aborting migration");
            return anyhow!(err).context("Migration aborted");
        }
        anyhow!(err).context("Migration failed; the ledger keeps the last completed version")
    }
}

fn db_name(context: &CommandContext, env: &str) -> Result<String> {
    Ok(context.database_config(env)?.database)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_execute_without_config() {
        let dir = TempDir::new().unwrap();
        let handler = MigrateCommandHandler::new();
        let command = MigrateCommand {
            project_path: dir.path().to_path_buf(),
            config_path: None,
            env: "development".to_string(),
            dry_run: true,
        };

        let err = handler.execute(&command).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Config file not found"));
    }

    #[test]
    fn test_report_aborts_on_identity_ambiguity() {
        let handler = MigrateCommandHandler::new();
        let err = handler.report(ReconcileError::UnsupportedIdentityChange {
            table: "widgets".to_string(),
            message: "multiple identity columns".to_string(),
        });

        let text = format!("{:#}", err);
        assert!(text.contains("Migration aborted"));
        assert!(text.contains("widgets"));
    }
}
