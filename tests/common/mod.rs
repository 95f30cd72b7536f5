// テスト共通ヘルパー
//
// メモリ上のテーブルモデルと台帳で DbManagement を模倣するフェイク。
// 実行されたDDLは記録するだけで、テーブルモデルは変更しません。
// イントロスペクション結果は指定した方言のオブジェクトとして返します。

#![allow(dead_code)]

use async_trait::async_trait;
use bedrock::adapters::db_management::DbManagement;
use bedrock::adapters::dialect::mysql::{MysqlColumn, MysqlForeignKey, MysqlIndex, PRIMARY_KEY_NAME};
use bedrock::adapters::dialect::postgres::{PostgresColumn, PostgresForeignKey, PostgresIndex};
use bedrock::adapters::dialect::{
    ColumnManagement, ColumnSpec, ForeignKeyManagement, ForeignKeySpec, IndexManagement,
    IndexSpec, TableDefaults,
};
use bedrock::core::config::Dialect;
use bedrock::core::error::DatabaseError;
use bedrock::core::naming::Track;
use bedrock::core::schema::Table;
use std::collections::{BTreeMap, HashMap};

/// フェイクデータベース（既定は MySQL）
#[derive(Debug)]
pub struct FakeDatabase {
    dialect: Dialect,
    defaults: TableDefaults,
    tables: BTreeMap<String, Table>,
    ledger: HashMap<(String, String), String>,
    executed: Vec<String>,
    dry_run: bool,
    dry_run_statements: Vec<String>,
    fail_on: Option<String>,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::for_dialect(Dialect::MySQL)
    }

    /// PostgreSQL として振る舞うフェイク
    pub fn postgres() -> Self {
        Self::for_dialect(Dialect::PostgreSQL)
    }

    fn for_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            defaults: TableDefaults::for_dialect(dialect),
            tables: BTreeMap::new(),
            ledger: HashMap::new(),
            executed: Vec::new(),
            dry_run: false,
            dry_run_statements: Vec::new(),
            fail_on: None,
        }
    }

    /// 現行テーブルを追加
    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.insert(table.name().to_string(), table);
        self
    }

    /// 台帳の行を追加
    pub fn with_version(mut self, track: Track, value: &str, version: &str) -> Self {
        self.ledger.insert(
            (track.as_str().to_string(), value.to_string()),
            version.to_string(),
        );
        self
    }

    /// 指定の文字列を含むDDLを失敗させる
    pub fn failing_on(mut self, pattern: &str) -> Self {
        self.fail_on = Some(pattern.to_string());
        self
    }

    /// 現行テーブルを置き換える（DDL適用後の状態を模倣）
    pub fn replace_table(&mut self, table: Table) {
        self.tables.insert(table.name().to_string(), table);
    }

    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    pub fn clear_executed(&mut self) {
        self.executed.clear();
    }

    pub fn stored_version(&self, track: Track, value: &str) -> Option<&str> {
        self.ledger
            .get(&(track.as_str().to_string(), value.to_string()))
            .map(String::as_str)
    }

    fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    fn collate_for(&self, table: &Table) -> String {
        table
            .collate()
            .unwrap_or(&self.defaults.collate)
            .to_string()
    }
}

#[async_trait]
impl DbManagement for FakeDatabase {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn table_defaults(&self) -> &TableDefaults {
        &self.defaults
    }

    fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn take_dry_run_statements(&mut self) -> Vec<String> {
        std::mem::take(&mut self.dry_run_statements)
    }

    fn annotate(&mut self, comment: &str) {
        if self.dry_run {
            self.dry_run_statements.push(format!("/*{}*/", comment));
        }
    }

    async fn execute(&mut self, sql: &str) -> Result<(), DatabaseError> {
        if self.dry_run {
            self.dry_run_statements.push(sql.to_string());
            return Ok(());
        }
        if let Some(pattern) = &self.fail_on {
            if sql.contains(pattern.as_str()) {
                return Err(DatabaseError::Query {
                    message: "simulated failure".to_string(),
                    sql: Some(sql.to_string()),
                });
            }
        }
        self.executed.push(sql.to_string());
        Ok(())
    }

    async fn connect(&mut self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn database_exists(&self) -> Result<bool, DatabaseError> {
        Ok(true)
    }

    async fn create_and_select_database(&mut self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn select_database(&mut self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn table_exists(&self, table: &str) -> Result<bool, DatabaseError> {
        Ok(self.tables.contains_key(table))
    }

    async fn tables(&self, _sorted: bool) -> Result<Vec<String>, DatabaseError> {
        Ok(self.tables.keys().cloned().collect())
    }

    async fn columns(&self, table: &str) -> Result<Vec<Box<dyn ColumnManagement>>, DatabaseError> {
        let Some(model) = self.table(table) else {
            return Ok(Vec::new());
        };
        let collate = self.collate_for(model);
        Ok(model
            .columns()
            .map(|c| {
                let spec = ColumnSpec::from_model(c);
                match self.dialect {
                    Dialect::MySQL => Box::new(MysqlColumn::new(spec, Some(&collate)))
                        as Box<dyn ColumnManagement>,
                    Dialect::PostgreSQL => Box::new(PostgresColumn::new(spec)),
                }
            })
            .collect())
    }

    async fn indices(&self, table: &str) -> Result<Vec<Box<dyn IndexManagement>>, DatabaseError> {
        let Some(model) = self.table(table) else {
            return Ok(Vec::new());
        };
        Ok(model
            .indices()
            .map(|i| {
                let spec = IndexSpec::from_model(i);
                match self.dialect {
                    Dialect::MySQL => Box::new(MysqlIndex::new(spec)) as Box<dyn IndexManagement>,
                    Dialect::PostgreSQL => Box::new(PostgresIndex::new(spec)),
                }
            })
            .collect())
    }

    async fn foreign_keys(
        &self,
        table: &str,
    ) -> Result<Vec<Box<dyn ForeignKeyManagement>>, DatabaseError> {
        let Some(model) = self.table(table) else {
            return Ok(Vec::new());
        };
        Ok(model
            .foreign_keys()
            .map(|fk| {
                let spec = ForeignKeySpec::from_model(fk);
                match self.dialect {
                    Dialect::MySQL => Box::new(MysqlForeignKey::new(spec))
                        as Box<dyn ForeignKeyManagement>,
                    Dialect::PostgreSQL => Box::new(PostgresForeignKey::new(spec)),
                }
            })
            .collect())
    }

    async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>, DatabaseError> {
        Ok(self
            .table(table)
            .map(|model| {
                model
                    .columns()
                    .filter(|c| c.is_primary())
                    .map(|c| c.name().to_string())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn primary_key_name(&self, table: &str) -> Result<String, DatabaseError> {
        if self.primary_key_columns(table).await?.is_empty() {
            return Ok(String::new());
        }
        Ok(match self.dialect {
            Dialect::MySQL => PRIMARY_KEY_NAME.to_string(),
            Dialect::PostgreSQL => format!("{}_pkey", table.to_lowercase()),
        })
    }

    async fn table_comment(&self, table: &str) -> Result<String, DatabaseError> {
        Ok(self
            .table(table)
            .map(|model| model.comment().to_string())
            .unwrap_or_default())
    }

    async fn get_version(
        &self,
        track: Track,
        value: &str,
        default: &str,
    ) -> Result<String, DatabaseError> {
        Ok(self
            .stored_version(track, value)
            .unwrap_or(default)
            .to_string())
    }

    async fn set_version(
        &mut self,
        track: Track,
        value: &str,
        version: &str,
    ) -> Result<(), DatabaseError> {
        if self.dry_run {
            return Ok(());
        }
        self.ledger.insert(
            (track.as_str().to_string(), value.to_string()),
            version.to_string(),
        );
        Ok(())
    }

    async fn statement_completed(&self, hash: &str, version: &str) -> Result<bool, DatabaseError> {
        Ok(self.stored_version(Track::Statement, hash) == Some(version))
    }
}
