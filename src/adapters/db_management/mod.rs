// データベース管理
//
// DDLの実行（または dry-run 時の記録）、ライブスキーマのイントロスペクション、
// バージョン台帳の読み書きを方言ごとに提供します。
// メタデータの読み取りはプールから取得した一時的な接続で行います。

pub mod mysql;
pub mod postgres;

use crate::adapters::database::DatabaseConnectionService;
use crate::adapters::dialect::{
    ColumnManagement, ForeignKeyManagement, IndexManagement, TableDefaults,
};
use crate::core::config::{DatabaseConfig, Dialect};
use crate::core::error::DatabaseError;
use crate::core::naming::Track;
use crate::core::schema::Table;
use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::{AnyPool, Row};
use tracing::{debug, warn};

pub use mysql::MysqlManagement;
pub use postgres::PostgresManagement;

/// データベース管理インターフェース
///
/// 方言ごとに1つの実装を持ちます。
#[async_trait]
pub trait DbManagement: Send + Sync {
    /// データベース方言
    fn dialect(&self) -> Dialect;

    /// テーブルの既定の照合順序・文字セット
    fn table_defaults(&self) -> &TableDefaults;

    /// dry-run モードを切り替え
    fn set_dry_run(&mut self, dry_run: bool);

    fn is_dry_run(&self) -> bool;

    /// 記録済みの dry-run ステートメントを取り出す
    fn take_dry_run_statements(&mut self) -> Vec<String>;

    /// dry-run の出力に注釈コメントを追加（dry-run 時のみ）
    fn annotate(&mut self, comment: &str);

    /// DDLを実行（dry-run 時は記録のみ）
    async fn execute(&mut self, sql: &str) -> Result<(), DatabaseError>;

    /// データベースサーバーへ接続
    ///
    /// 接続エラーは警告として記録し、呼び出し元へ返します。
    async fn connect(&mut self) -> Result<(), DatabaseError>;

    /// 対象データベースが存在するかどうか
    async fn database_exists(&self) -> Result<bool, DatabaseError>;

    /// 対象データベースを作成して選択
    async fn create_and_select_database(&mut self) -> Result<(), DatabaseError>;

    /// 対象データベースを選択
    async fn select_database(&mut self) -> Result<(), DatabaseError>;

    async fn table_exists(&self, table: &str) -> Result<bool, DatabaseError>;

    /// テーブル一覧
    ///
    /// # Arguments
    ///
    /// * `sorted` - 名前順に並べるかどうか
    async fn tables(&self, sorted: bool) -> Result<Vec<String>, DatabaseError>;

    /// カラム一覧（定義順）
    ///
    /// 対応する型が無いカラムは `DatabaseError::UnknownType` になります。
    async fn columns(&self, table: &str) -> Result<Vec<Box<dyn ColumnManagement>>, DatabaseError>;

    /// インデックス一覧（主キーを除く）
    async fn indices(&self, table: &str) -> Result<Vec<Box<dyn IndexManagement>>, DatabaseError>;

    async fn foreign_keys(
        &self,
        table: &str,
    ) -> Result<Vec<Box<dyn ForeignKeyManagement>>, DatabaseError>;

    /// 主キーのカラム（キー内の順序）
    async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>, DatabaseError>;

    /// 主キー制約名（主キーが無い場合は空文字）
    async fn primary_key_name(&self, table: &str) -> Result<String, DatabaseError>;

    async fn table_comment(&self, table: &str) -> Result<String, DatabaseError>;

    /// 台帳のバージョンを取得
    ///
    /// 行または台帳テーブルが無い場合は `default` を返します。
    async fn get_version(
        &self,
        track: Track,
        value: &str,
        default: &str,
    ) -> Result<String, DatabaseError>;

    /// 台帳のバージョンを登録・更新（dry-run 時は何もしない）
    async fn set_version(
        &mut self,
        track: Track,
        value: &str,
        version: &str,
    ) -> Result<(), DatabaseError>;

    /// ステートメントがこのバージョンで適用済みかどうか
    async fn statement_completed(&self, hash: &str, version: &str) -> Result<bool, DatabaseError>;

    /// テーブルを宣言モデルとして読み出す
    async fn introspect_table(&self, table: &str) -> Result<Table, DatabaseError> {
        let mut model = Table::new(table).with_comment(self.table_comment(table).await?);
        for column in self.columns(table).await? {
            model = model.column(column.to_model());
        }
        for index in self.indices(table).await? {
            model = model.index(index.to_model());
        }
        for foreign_key in self.foreign_keys(table).await? {
            model = model.foreign_key(foreign_key.to_model());
        }
        Ok(model)
    }
}

/// 方言に応じたデータベース管理を作成
pub fn create_management(
    dialect: Dialect,
    config: DatabaseConfig,
    ledger_table: impl Into<String>,
    defaults: TableDefaults,
) -> Box<dyn DbManagement> {
    let session = Session::new(dialect, config, ledger_table.into(), defaults);
    match dialect {
        Dialect::MySQL => Box::new(MysqlManagement::new(session)),
        Dialect::PostgreSQL => Box::new(PostgresManagement::new(session)),
    }
}

/// 接続と dry-run 状態
///
/// 両方言の管理実装が共有します。
#[derive(Debug)]
pub struct Session {
    dialect: Dialect,
    config: DatabaseConfig,
    ledger_table: String,
    defaults: TableDefaults,
    service: DatabaseConnectionService,
    server_pool: Option<AnyPool>,
    pool: Option<AnyPool>,
    dry_run: bool,
    dry_run_statements: Vec<String>,
}

impl Session {
    pub fn new(
        dialect: Dialect,
        config: DatabaseConfig,
        ledger_table: String,
        defaults: TableDefaults,
    ) -> Self {
        Self {
            dialect,
            config,
            ledger_table,
            defaults,
            service: DatabaseConnectionService::new(),
            server_pool: None,
            pool: None,
            dry_run: false,
            dry_run_statements: Vec::new(),
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn ledger_table(&self) -> &str {
        &self.ledger_table
    }

    pub fn defaults(&self) -> &TableDefaults {
        &self.defaults
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn take_dry_run_statements(&mut self) -> Vec<String> {
        std::mem::take(&mut self.dry_run_statements)
    }

    pub fn annotate(&mut self, comment: &str) {
        if self.dry_run {
            self.dry_run_statements.push(format!("/*{}*/", comment));
        }
    }

    /// サーバーレベルのプールを開く
    pub async fn connect_server(&mut self) -> Result<(), DatabaseError> {
        let result = match self
            .service
            .create_server_pool(self.dialect, &self.config)
            .await
        {
            Ok(pool) => self.service.test_connection(&pool).await.map(|_| pool),
            Err(e) => Err(e),
        };
        match result {
            Ok(pool) => {
                self.server_pool = Some(pool);
                Ok(())
            }
            Err(e) => {
                warn!(host = %self.config.host, error = %e, "database server connection failed");
                Err(e)
            }
        }
    }

    /// 対象データベースのプールを開く
    pub async fn open_database(&mut self) -> Result<(), DatabaseError> {
        match self.service.create_pool(self.dialect, &self.config).await {
            Ok(pool) => {
                self.pool = Some(pool);
                Ok(())
            }
            Err(e) => {
                warn!(database = %self.config.database, error = %e, "database connection failed");
                Err(e)
            }
        }
    }

    pub fn pool(&self) -> Result<&AnyPool, DatabaseError> {
        self.pool.as_ref().ok_or_else(|| DatabaseError::NotConnected {
            message: format!("データベース {} が選択されていません", self.config.database),
        })
    }

    pub fn server_pool(&self) -> Result<&AnyPool, DatabaseError> {
        self.server_pool
            .as_ref()
            .ok_or_else(|| DatabaseError::NotConnected {
                message: format!("サーバー {} に接続されていません", self.config.host),
            })
    }

    /// DDLを実行（dry-run 時は記録のみ）
    pub async fn execute(&mut self, sql: &str) -> Result<(), DatabaseError> {
        if self.dry_run {
            debug!(sql, "recording statement (dry run)");
            self.dry_run_statements.push(sql.to_string());
            return Ok(());
        }
        self.apply(sql).await
    }

    /// dry-run に関係なくDDLを実行
    pub async fn apply(&self, sql: &str) -> Result<(), DatabaseError> {
        debug!(sql, "executing statement");
        sqlx::raw_sql(sql)
            .execute(self.pool()?)
            .await
            .map(|_| ())
            .map_err(|e| DatabaseError::query("ステートメントの実行に失敗しました", sql, e))
    }

    /// サーバーレベルのプールでDDLを実行
    pub async fn execute_on_server(&self, sql: &str) -> Result<(), DatabaseError> {
        debug!(sql, "executing server statement");
        sqlx::raw_sql(sql)
            .execute(self.server_pool()?)
            .await
            .map(|_| ())
            .map_err(|e| DatabaseError::query("ステートメントの実行に失敗しました", sql, e))
    }

    /// パラメータ付きの更新を実行（台帳の書き込み用）
    pub async fn run(&self, sql: &str, binds: &[&str]) -> Result<(), DatabaseError> {
        let mut query = sqlx::query(sql);
        for value in binds {
            query = query.bind(value.to_string());
        }
        query
            .execute(self.pool()?)
            .await
            .map(|_| ())
            .map_err(|e| DatabaseError::query("台帳の更新に失敗しました", sql, e))
    }

    /// 一時的な接続でメタデータを読み取る
    pub async fn fetch(&self, sql: &str, binds: &[&str]) -> Result<Vec<AnyRow>, DatabaseError> {
        Self::fetch_from(self.pool()?, sql, binds).await
    }

    /// サーバーレベルのプールでメタデータを読み取る
    pub async fn fetch_server(
        &self,
        sql: &str,
        binds: &[&str],
    ) -> Result<Vec<AnyRow>, DatabaseError> {
        Self::fetch_from(self.server_pool()?, sql, binds).await
    }

    async fn fetch_from(
        pool: &AnyPool,
        sql: &str,
        binds: &[&str],
    ) -> Result<Vec<AnyRow>, DatabaseError> {
        let mut connection = pool.acquire().await.map_err(|e| DatabaseError::Connection {
            message: "メタデータ取得用の接続を確保できませんでした".to_string(),
            cause: e.to_string(),
        })?;

        let mut query = sqlx::query(sql);
        for value in binds {
            query = query.bind(value.to_string());
        }
        query
            .fetch_all(&mut *connection)
            .await
            .map_err(|e| DatabaseError::query("メタデータの取得に失敗しました", sql, e))
    }
}

/// 文字列カラムを取得
pub(crate) fn text(row: &AnyRow, index: usize) -> Result<String, DatabaseError> {
    optional_text(row, index).map(Option::unwrap_or_default)
}

/// NULL許可の文字列カラムを取得
pub(crate) fn optional_text(row: &AnyRow, index: usize) -> Result<Option<String>, DatabaseError> {
    row.try_get::<Option<String>, _>(index)
        .map_err(|e| decode_error(index, e))
}

/// NULL許可の整数カラムを取得
pub(crate) fn optional_integer(row: &AnyRow, index: usize) -> Result<Option<i64>, DatabaseError> {
    row.try_get::<Option<i64>, _>(index)
        .map_err(|e| decode_error(index, e))
}

/// 整数カラムを取得（NULLは0）
pub(crate) fn integer(row: &AnyRow, index: usize) -> Result<i64, DatabaseError> {
    optional_integer(row, index).map(|v| v.unwrap_or(0))
}

fn decode_error(index: usize, cause: sqlx::Error) -> DatabaseError {
    DatabaseError::Introspection {
        message: format!("{}番目の列を読み取れませんでした: {}", index, cause),
    }
}

/// 複数行にまたがるインデックス定義を名前ごとにまとめる
pub(crate) fn group_index_rows(
    rows: Vec<(String, String, bool, String)>,
) -> Vec<crate::adapters::dialect::IndexSpec> {
    let mut grouped: indexmap::IndexMap<String, crate::adapters::dialect::IndexSpec> =
        indexmap::IndexMap::new();
    for (name, column, unique, index_type) in rows {
        grouped
            .entry(name.clone())
            .or_insert_with(|| crate::adapters::dialect::IndexSpec {
                name,
                columns: Vec::new(),
                index_type,
                unique,
            })
            .columns
            .push(column);
    }
    grouped.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(
            Dialect::MySQL,
            DatabaseConfig {
                host: "localhost".to_string(),
                port: None,
                database: "app".to_string(),
                schema: "public".to_string(),
                user: None,
                password: None,
                timeout: None,
            },
            "bs_schema".to_string(),
            TableDefaults::for_dialect(Dialect::MySQL),
        )
    }

    #[tokio::test]
    async fn test_dry_run_records_without_connection() {
        let mut session = session();
        session.set_dry_run(true);

        session.execute("CREATE TABLE a (id int)").await.unwrap();
        session.annotate("note");

        assert_eq!(
            session.take_dry_run_statements(),
            vec!["CREATE TABLE a (id int)", "/*note*/"]
        );
        assert!(session.take_dry_run_statements().is_empty());
    }

    #[tokio::test]
    async fn test_execute_without_pool_is_not_connected() {
        let mut session = session();

        let err = session.execute("SELECT 1").await.unwrap_err();

        assert!(err.is_not_connected());
    }

    #[test]
    fn test_annotate_is_ignored_outside_dry_run() {
        let mut session = session();
        session.annotate("note");

        assert!(session.take_dry_run_statements().is_empty());
    }

    #[test]
    fn test_group_index_rows_keeps_column_order() {
        let rows = vec![
            ("idx_b".to_string(), "y".to_string(), false, String::new()),
            ("idx_a".to_string(), "x".to_string(), true, String::new()),
            ("idx_b".to_string(), "x".to_string(), false, String::new()),
        ];

        let grouped = group_index_rows(rows);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].name, "idx_b");
        assert_eq!(grouped[0].columns, vec!["y", "x"]);
        assert!(grouped[1].unique);
    }
}
