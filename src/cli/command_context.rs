// コマンド共通コンテキスト
//
// 設定ファイル読み込み、接続設定の解決、スキーマソースの構築を
// CLI層で集約する。

use crate::adapters::db_management::{create_management, DbManagement};
use crate::adapters::dialect::TableDefaults;
use crate::core::config::{Config, DatabaseConfig, Dialect};
use crate::services::base_schema::BaseSchema;
use crate::services::config_loader::ConfigLoader;
use crate::services::database_config_resolver::DatabaseConfigResolver;
use crate::services::schema_loader::YamlSchemaSource;
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use tracing::warn;

/// CLIコマンド共通の実行コンテキスト
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub project_path: PathBuf,
    pub config_path: PathBuf,
    pub config: Config,
}

impl CommandContext {
    /// プロジェクトルートから設定を読み込んでコンテキストを作成
    pub fn load(project_path: PathBuf) -> Result<Self> {
        Self::load_with_config(project_path, None)
    }

    /// カスタム設定ファイルパスを指定してコンテキストを作成
    pub fn load_with_config(
        project_path: PathBuf,
        custom_config_path: Option<PathBuf>,
    ) -> Result<Self> {
        let config_path = custom_config_path
            .unwrap_or_else(|| project_path.join(Config::DEFAULT_CONFIG_PATH));

        if !config_path.exists() {
            return Err(anyhow!(
                "Config file not found: {:?}. Create {} in the project root or pass --config.",
                config_path,
                Config::DEFAULT_CONFIG_PATH
            ));
        }

        let config =
            ConfigLoader::from_file(&config_path).with_context(|| "Failed to read config file")?;

        Ok(Self {
            project_path,
            config_path,
            config,
        })
    }

    /// 環境に応じたデータベース設定を取得（環境変数上書き込み）
    pub fn database_config(&self, env: &str) -> Result<DatabaseConfig> {
        let config = self
            .config
            .get_database_config(env)
            .with_context(|| format!("Config for environment '{}' not found", env))?;
        Ok(DatabaseConfigResolver::apply_env_overrides(&config))
    }

    /// データベース方言を取得
    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    /// 設定に応じたテーブルの既定値
    pub fn table_defaults(&self) -> TableDefaults {
        TableDefaults::new(
            self.config.effective_collate(),
            self.config.effective_charset(),
        )
    }

    /// 環境のデータベース管理を作成（未接続）
    pub fn management(&self, env: &str) -> Result<Box<dyn DbManagement>> {
        Ok(create_management(
            self.config.dialect,
            self.database_config(env)?,
            self.config.ledger_table.clone(),
            self.table_defaults(),
        ))
    }

    /// フレームワークスキーマ
    pub fn framework_schema(&self) -> BaseSchema {
        BaseSchema::new(
            self.config.ledger_table.clone(),
            self.config.user_table.clone(),
        )
    }

    /// スキーマファイルの絶対パス
    pub fn schema_file(&self) -> PathBuf {
        self.project_path.join(&self.config.schema_file)
    }

    /// アプリケーションスキーマ
    ///
    /// スキーマファイルが無い場合はフレームワークスキーマだけを扱います。
    pub fn application_schema(&self) -> Result<YamlSchemaSource> {
        let path = self.schema_file();
        if !path.exists() {
            warn!(path = %path.display(), "schema file not found, using framework schema only");
            return Ok(YamlSchemaSource::empty());
        }
        YamlSchemaSource::from_file(&path)
    }
}
