// 接続文字列ビルダー
//
// DatabaseConfig と Dialect から接続文字列を生成する。
// データベース作成前に使うサーバーレベルの接続文字列も提供する。

use crate::core::config::{DatabaseConfig, Dialect};

/// PostgreSQLでデータベース未作成時に接続する管理用データベース
const POSTGRES_MAINTENANCE_DB: &str = "postgres";

fn credentials(dialect: Dialect, config: &DatabaseConfig) -> String {
    let fallback_user = match dialect {
        Dialect::PostgreSQL => "postgres",
        Dialect::MySQL => "root",
    };
    let user = config.user.as_deref().unwrap_or(fallback_user);
    match config.password.as_deref() {
        Some(password) if !password.is_empty() => format!("{}:{}", user, password),
        _ => user.to_string(),
    }
}

fn scheme(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::PostgreSQL => "postgresql",
        Dialect::MySQL => "mysql",
    }
}

/// 接続文字列を生成
pub fn build_connection_string(dialect: Dialect, config: &DatabaseConfig) -> String {
    format!(
        "{}://{}@{}:{}/{}",
        scheme(dialect),
        credentials(dialect, config),
        config.host,
        config.port_for(dialect),
        config.database
    )
}

/// サーバーレベルの接続文字列を生成
///
/// 対象データベースの存在確認・作成に使用します。
/// MySQLはデータベースを指定せず、PostgreSQLは管理用データベースに接続します。
pub fn build_server_connection_string(dialect: Dialect, config: &DatabaseConfig) -> String {
    let path = match dialect {
        Dialect::PostgreSQL => format!("/{}", POSTGRES_MAINTENANCE_DB),
        Dialect::MySQL => String::new(),
    };
    format!(
        "{}://{}@{}:{}{}",
        scheme(dialect),
        credentials(dialect, config),
        config.host,
        config.port_for(dialect),
        path
    )
}
