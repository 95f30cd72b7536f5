// データベース接続アダプター
//
// SQLxを使用したデータベース接続プールの管理を行います。
// PostgreSQL、MySQLに対応した統一されたインターフェースを提供します。

use crate::adapters::connection_string::{build_connection_string, build_server_connection_string};
use crate::adapters::sql_quote::quote_identifier_postgres;
use crate::core::config::{DatabaseConfig, Dialect};
use crate::core::error::DatabaseError;
use sqlx::pool::PoolOptions;
use sqlx::{Any, AnyPool};
use std::time::Duration;
use tracing::debug;

/// データベース接続サービス
///
/// データベース接続プールの初期化と管理を行います。
#[derive(Debug, Clone)]
pub struct DatabaseConnectionService {
    max_connections: u32,
}

impl DatabaseConnectionService {
    /// 新しいDatabaseConnectionServiceを作成
    pub fn new() -> Self {
        Self { max_connections: 5 }
    }

    /// データベース接続プールを作成
    ///
    /// PostgreSQLの場合は各接続で search_path を設定スキーマに合わせます。
    ///
    /// # Arguments
    ///
    /// * `dialect` - データベース方言
    /// * `config` - データベース設定
    ///
    /// # Returns
    ///
    /// 接続プールまたはエラー
    pub async fn create_pool(
        &self,
        dialect: Dialect,
        config: &DatabaseConfig,
    ) -> Result<AnyPool, DatabaseError> {
        let connection_string = build_connection_string(dialect, config);
        let mut pool_options = self.create_pool_options(config.timeout);

        if dialect == Dialect::PostgreSQL {
            let set_search_path = format!(
                "SET search_path TO {}",
                quote_identifier_postgres(&config.schema)
            );
            pool_options = pool_options.after_connect(move |conn, _meta| {
                let sql = set_search_path.clone();
                Box::pin(async move {
                    sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(&sql)).await?;
                    Ok(())
                })
            });
        }

        debug!(%dialect, database = %config.database, "opening connection pool");

        pool_options
            .connect(&connection_string)
            .await
            .map_err(|e| DatabaseError::Connection {
                message: format!("データベース接続プールの作成に失敗しました: {}", dialect),
                cause: e.to_string(),
            })
    }

    /// サーバーレベルの接続プールを作成
    ///
    /// 対象データベースがまだ存在しない状態で使用します。
    pub async fn create_server_pool(
        &self,
        dialect: Dialect,
        config: &DatabaseConfig,
    ) -> Result<AnyPool, DatabaseError> {
        let connection_string = build_server_connection_string(dialect, config);

        debug!(%dialect, host = %config.host, "opening server connection pool");

        self.create_pool_options(config.timeout)
            .connect(&connection_string)
            .await
            .map_err(|e| DatabaseError::Connection {
                message: format!("データベースサーバーへの接続に失敗しました: {}", dialect),
                cause: e.to_string(),
            })
    }

    /// 接続テストを実行
    pub async fn test_connection(&self, pool: &AnyPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1")
            .execute(pool)
            .await
            .map(|_| ())
            .map_err(|e| DatabaseError::Connection {
                message: "データベース接続テストに失敗しました".to_string(),
                cause: e.to_string(),
            })
    }

    /// プールオプションを作成
    ///
    /// # Arguments
    ///
    /// * `timeout_secs` - 接続取得のタイムアウト秒数（未指定時は30秒）
    pub fn create_pool_options(&self, timeout_secs: Option<u64>) -> PoolOptions<Any> {
        let timeout = timeout_secs.unwrap_or(30);
        PoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(timeout))
    }
}

impl Default for DatabaseConnectionService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_service() {
        let service = DatabaseConnectionService::new();
        assert!(format!("{:?}", service).contains("DatabaseConnectionService"));
    }

    #[test]
    fn test_create_pool_options() {
        let service = DatabaseConnectionService::default();
        let pool_options = service.create_pool_options(Some(60));

        assert!(format!("{:?}", pool_options).contains("PoolOptions"));
    }

    #[tokio::test]
    async fn test_create_pool_reports_connection_error() {
        sqlx::any::install_default_drivers();
        let config = DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: Some(1),
            database: "missing".to_string(),
            schema: "public".to_string(),
            user: Some("nobody".to_string()),
            password: None,
            timeout: Some(1),
        };

        let result = DatabaseConnectionService::new()
            .create_pool(Dialect::MySQL, &config)
            .await;

        assert!(result.unwrap_err().is_connection());
    }
}
