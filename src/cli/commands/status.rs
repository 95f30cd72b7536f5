// statusコマンドハンドラー
//
// 台帳に記録されたフレームワーク/アプリケーションのスキーマバージョンと、
// dry-run で求めた未適用の変更を表示します。

use crate::cli::command_context::CommandContext;
use crate::cli::commands::{connect_existing, missing_database};
use crate::services::setup::{SchemaSetupService, SchemaVersions};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

/// statusコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct StatusCommand {
    /// プロジェクトのルートパス
    pub project_path: PathBuf,
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 環境名
    pub env: String,
}

/// statusコマンドハンドラー
#[derive(Debug, Default)]
pub struct StatusCommandHandler {}

impl StatusCommandHandler {
    /// 新しいStatusCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// statusコマンドを実行
    ///
    /// # Returns
    ///
    /// 成功時はバージョンと未適用の変更の一覧、失敗時はエラー
    pub async fn execute(&self, command: &StatusCommand) -> Result<String> {
        let context = CommandContext::load_with_config(
            command.project_path.clone(),
            command.config_path.clone(),
        )?;

        let framework = context.framework_schema();
        let application = context.application_schema()?;

        let mut db = context.management(&command.env)?;
        if !connect_existing(db.as_mut()).await? {
            return Err(missing_database(&context.database_config(&command.env)?.database));
        }

        let service = SchemaSetupService::new();
        let versions = service
            .current_versions(db.as_ref())
            .await
            .with_context(|| "Failed to read schema ledger")?;
        let pending = service
            .pending_changes(db.as_mut(), &framework, &application)
            .await
            .with_context(|| "Failed to compute pending changes")?;

        Ok(self.format_status(&versions, &pending))
    }

    /// ステータスを整形
    fn format_status(&self, versions: &SchemaVersions, pending: &[String]) -> String {
        let mut output = vec![
            "Schema Status".bold().to_string(),
            format!("  Framework Schema Version:   {}", versions.framework),
            format!("  Application Schema Version: {}", versions.application),
            String::new(),
        ];

        if pending.is_empty() {
            output.push("Schema is up to date.".green().to_string());
        } else {
            output.push("Pending changes:".yellow().bold().to_string());
            output.extend(pending.iter().cloned());
        }
        output.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions() -> SchemaVersions {
        SchemaVersions {
            framework: "1.0.2".to_string(),
            application: "v0.0.0".to_string(),
        }
    }

    #[test]
    fn test_format_up_to_date() {
        colored::control::set_override(false);
        let text = StatusCommandHandler::new().format_status(&versions(), &[]);

        assert!(text.contains("Framework Schema Version:   1.0.2"));
        assert!(text.contains("Application Schema Version: v0.0.0"));
        assert!(text.contains("Schema is up to date."));
    }

    #[test]
    fn test_format_pending_lists_statements() {
        colored::control::set_override(false);
        let pending = vec![
            "/* Changes for Application Schema Version: 1.0.0 */".to_string(),
            "ALTER TABLE `widgets` ADD COLUMN `name` varchar(64) NULL;".to_string(),
        ];
        let text = StatusCommandHandler::new().format_status(&versions(), &pending);

        assert!(text.contains("Pending changes:"));
        assert!(text.ends_with("NULL;"));
    }
}
