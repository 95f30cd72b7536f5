// dumpコマンドハンドラー
//
// ライブデータベースのテーブルをイントロスペクションし、
// アプリケーションスキーマと同じYAML形式で出力します。

use crate::cli::command_context::CommandContext;
use crate::cli::commands::{connect_existing, missing_database};
use crate::core::error::IoError;
use crate::services::schema_dump::dump_schema;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// dumpコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct DumpCommand {
    /// プロジェクトのルートパス
    pub project_path: PathBuf,
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 環境名
    pub env: String,
    /// 出力先ファイル（None の場合は標準出力）
    pub output: Option<PathBuf>,
}

/// dumpコマンドハンドラー
#[derive(Debug, Default)]
pub struct DumpCommandHandler {}

impl DumpCommandHandler {
    /// 新しいDumpCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// dumpコマンドを実行
    ///
    /// # Returns
    ///
    /// 出力先が無い場合はYAMLテキスト、ある場合は書き込み結果のメッセージ
    pub async fn execute(&self, command: &DumpCommand) -> Result<String> {
        let context = CommandContext::load_with_config(
            command.project_path.clone(),
            command.config_path.clone(),
        )?;

        let mut db = context.management(&command.env)?;
        if !connect_existing(db.as_mut()).await? {
            return Err(missing_database(&context.database_config(&command.env)?.database));
        }

        let mut tables = Vec::new();
        for name in db.tables(true).await.with_context(|| "Failed to list tables")? {
            debug!(table = %name, "introspecting table");
            let table = db
                .introspect_table(&name)
                .await
                .with_context(|| format!("Failed to introspect table '{}'", name))?;
            tables.push(table);
        }

        let yaml = dump_schema(&tables)?;

        match &command.output {
            None => Ok(yaml),
            Some(path) => {
                let path = if path.is_absolute() {
                    path.clone()
                } else {
                    command.project_path.join(path)
                };
                fs::write(&path, &yaml).map_err(|e| IoError::FileWrite {
                    path: path.display().to_string(),
                    cause: e.to_string(),
                })?;
                Ok(format!(
                    "Dumped {} tables to {}",
                    tables.len(),
                    path.display()
                ))
            }
        }
    }
}
