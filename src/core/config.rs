// 設定ファイル管理
//
// プロジェクトの設定ファイル（YAML形式）の読み込み、検証、
// 環境別のデータベース接続設定と台帳・照合順序の既定値の管理を行います。

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

/// データベース方言
///
/// 実行時にどちらの方言実装を使うかを選択する明示的な設定値です。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[serde(rename = "postgresql", alias = "postgres", alias = "pgsql")]
    PostgreSQL,
    #[serde(rename = "mysql")]
    MySQL,
}

impl Dialect {
    /// 方言ごとの既定ポート
    pub fn default_port(&self) -> u16 {
        match self {
            Dialect::PostgreSQL => 5432,
            Dialect::MySQL => 3306,
        }
    }

    /// 方言ごとの既定照合順序
    pub fn default_collate(&self) -> &'static str {
        match self {
            Dialect::PostgreSQL => "en_US.utf8",
            Dialect::MySQL => "utf8mb4_unicode_ci",
        }
    }

    /// 方言ごとの既定文字セット
    pub fn default_charset(&self) -> &'static str {
        match self {
            Dialect::PostgreSQL => "UTF8",
            Dialect::MySQL => "utf8mb4",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::PostgreSQL => write!(f, "postgresql"),
            Dialect::MySQL => write!(f, "mysql"),
        }
    }
}

impl FromStr for Dialect {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" | "pgsql" => Ok(Dialect::PostgreSQL),
            "mysql" => Ok(Dialect::MySQL),
            other => Err(anyhow!(
                "Unsupported database dialect: {}. Please specify one of: postgresql, mysql.",
                other
            )),
        }
    }
}

/// プロジェクト設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 設定ファイルのバージョン
    pub version: String,

    /// データベース方言
    pub dialect: Dialect,

    /// 台帳テーブル名
    #[serde(default = "default_ledger_table")]
    pub ledger_table: String,

    /// 既定の照合順序（未指定時は方言の既定値）
    #[serde(default)]
    pub collate: Option<String>,

    /// 既定の文字セット（未指定時は方言の既定値）
    #[serde(default)]
    pub charset: Option<String>,

    /// アプリケーションスキーマ定義ファイル
    #[serde(default = "default_schema_file")]
    pub schema_file: PathBuf,

    /// ユーザーテーブル定義
    #[serde(default)]
    pub user_table: UserTableConfig,

    /// 環境別のデータベース設定
    pub environments: HashMap<String, DatabaseConfig>,
}

fn default_ledger_table() -> String {
    crate::core::naming::LEDGER_TABLE.to_string()
}

fn default_schema_file() -> PathBuf {
    PathBuf::from("schema.yaml")
}

impl Config {
    /// デフォルトの設定ファイルパス
    pub const DEFAULT_CONFIG_PATH: &'static str = crate::core::naming::CONFIG_FILE;

    /// 指定された環境のデータベース設定を取得
    pub fn get_database_config(&self, environment: &str) -> Result<DatabaseConfig> {
        self.environments.get(environment).cloned().ok_or_else(|| {
            let mut available = self.environments.keys().collect::<Vec<_>>();
            available.sort();
            anyhow!(
                "Environment '{}' not found. Available environments: {:?}",
                environment,
                available
            )
        })
    }

    /// 実効の照合順序
    pub fn effective_collate(&self) -> String {
        self.collate
            .clone()
            .unwrap_or_else(|| self.dialect.default_collate().to_string())
    }

    /// 実効の文字セット
    pub fn effective_charset(&self) -> String {
        self.charset
            .clone()
            .unwrap_or_else(|| self.dialect.default_charset().to_string())
    }

    /// 設定の妥当性を検証
    pub fn validate(&self) -> Result<()> {
        // バージョンチェック
        if self.version.is_empty() {
            return Err(anyhow!("Config file version is not specified"));
        }

        if self.ledger_table.trim().is_empty() {
            return Err(anyhow!("Ledger table name must not be empty"));
        }

        // 環境設定チェック
        if self.environments.is_empty() {
            return Err(anyhow!(
                "At least one environment configuration is required"
            ));
        }

        // 各環境のデータベース設定を検証
        for (env_name, db_config) in &self.environments {
            db_config
                .validate()
                .with_context(|| format!("Invalid config for environment '{}'", env_name))?;
        }

        self.user_table
            .validate()
            .with_context(|| "Invalid user table config")?;

        Ok(())
    }
}

/// std::str::FromStrトレイトの実装
impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(yaml: &str) -> Result<Self, Self::Err> {
        serde_saphyr::from_str(yaml).with_context(|| "Failed to parse config file")
    }
}

/// データベース接続設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// ホスト名
    #[serde(default = "default_host")]
    pub host: String,

    /// ポート番号（未指定時は方言の既定ポート）
    #[serde(default)]
    pub port: Option<u16>,

    /// データベース名
    pub database: String,

    /// PostgreSQLのスキーマ名
    #[serde(default = "default_schema")]
    pub schema: String,

    /// ユーザー名
    pub user: Option<String>,

    /// パスワード
    pub password: Option<String>,

    /// 接続タイムアウト（秒）
    pub timeout: Option<u64>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_schema() -> String {
    "public".to_string()
}

impl DatabaseConfig {
    /// Validate database configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.is_empty() {
            return Err(anyhow!("Database name is not specified"));
        }

        if self.schema.is_empty() {
            return Err(anyhow!("Schema name must not be empty"));
        }

        Ok(())
    }

    /// 実効のポート番号
    pub fn port_for(&self, dialect: Dialect) -> u16 {
        self.port.unwrap_or_else(|| dialect.default_port())
    }
}

/// 認証先
///
/// ユーザーテーブルにローカルパスワード列を持つかどうかを決めます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationTarget {
    /// データベースで認証
    #[default]
    Database,
    /// ユーザーごとにデータベース側で定義
    DefinedOnDatabase,
    /// 外部ディレクトリ（LDAP等）で認証
    External,
}

impl AuthenticationTarget {
    /// ローカルパスワード列が必要かどうか
    pub fn uses_local_password(&self) -> bool {
        matches!(
            self,
            AuthenticationTarget::Database | AuthenticationTarget::DefinedOnDatabase
        )
    }
}

/// ユーザーテーブル定義
///
/// フレームワークスキーマ（1.0.0）が作成するユーザーテーブルの
/// テーブル名と各フィールド名です。空文字のオプションフィールドは作成されません。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserTableConfig {
    pub table: String,
    pub user_id: String,
    /// ユーザーIDの型（int または varchar）
    pub user_id_type: String,
    pub username: String,
    /// ユーザー名の型（varchar または int）
    pub username_type: String,
    pub access_control_target: String,
    pub grant_login: String,
    pub authentication_target: String,
    pub local_password: String,
    pub service_account: String,
    pub last_tab: String,
    pub last_login: String,
    pub login_count: String,
    pub password_expires: String,
    pub password_last_change: String,
    pub password_expires_after_days: String,
    pub authentication: AuthenticationTarget,
}

impl Default for UserTableConfig {
    fn default() -> Self {
        Self {
            table: "tbl_User".to_string(),
            user_id: "User_ID".to_string(),
            user_id_type: "int".to_string(),
            username: "Username".to_string(),
            username_type: "varchar".to_string(),
            access_control_target: String::new(),
            grant_login: "GrantLogin".to_string(),
            authentication_target: "AuthenticationTarget".to_string(),
            local_password: "LocalPassword".to_string(),
            service_account: "ServiceAccount".to_string(),
            last_tab: "LastTab".to_string(),
            last_login: "LastLogin".to_string(),
            login_count: "LoginCount".to_string(),
            password_expires: String::new(),
            password_last_change: "PasswordLastChange".to_string(),
            password_expires_after_days: "PasswordExpiresAfterDays".to_string(),
            authentication: AuthenticationTarget::Database,
        }
    }
}

impl UserTableConfig {
    /// 必須フィールドの検証
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("table", &self.table),
            ("user_id", &self.user_id),
            ("username", &self.username),
            ("grant_login", &self.grant_login),
            ("authentication_target", &self.authentication_target),
            ("service_account", &self.service_account),
            ("last_tab", &self.last_tab),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(anyhow!("User table field '{}' must not be empty", field));
            }
        }
        if self.authentication.uses_local_password() && self.local_password.is_empty() {
            return Err(anyhow!(
                "User table field 'local_password' is required for database authentication"
            ));
        }
        Ok(())
    }
}
