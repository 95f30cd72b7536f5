// MySQLのデータベース管理
//
// information_schema からライブスキーマを読み取り、MySQLの方言オブジェクトへ変換します。
// 文字列・数値はAnyドライバーで扱えるよう CAST してから取得します。

use super::{group_index_rows, integer, optional_integer, optional_text, text, DbManagement, Session};
use crate::adapters::dialect::mysql::{
    introspected_length, vendor_type, MysqlColumn, MysqlForeignKey, MysqlIndex, PRIMARY_KEY_NAME,
};
use crate::adapters::dialect::{
    ColumnManagement, ColumnSpec, ForeignKeyManagement, ForeignKeySpec, IndexManagement,
    TableDefaults,
};
use crate::adapters::sql_quote::quote_identifier_mysql;
use crate::core::config::Dialect;
use crate::core::default_value::normalize_catalog_literal;
use crate::core::error::DatabaseError;
use crate::core::naming::Track;
use async_trait::async_trait;
use tracing::{debug, info};

/// MySQLのデータベース管理
#[derive(Debug)]
pub struct MysqlManagement {
    session: Session,
}

impl MysqlManagement {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    fn ledger(&self) -> String {
        quote_identifier_mysql(self.session.ledger_table())
    }
}

#[async_trait]
impl DbManagement for MysqlManagement {
    fn dialect(&self) -> Dialect {
        Dialect::MySQL
    }

    fn table_defaults(&self) -> &TableDefaults {
        self.session.defaults()
    }

    fn set_dry_run(&mut self, dry_run: bool) {
        self.session.set_dry_run(dry_run);
    }

    fn is_dry_run(&self) -> bool {
        self.session.is_dry_run()
    }

    fn take_dry_run_statements(&mut self) -> Vec<String> {
        self.session.take_dry_run_statements()
    }

    fn annotate(&mut self, comment: &str) {
        self.session.annotate(comment);
    }

    async fn execute(&mut self, sql: &str) -> Result<(), DatabaseError> {
        self.session.execute(sql).await
    }

    async fn connect(&mut self) -> Result<(), DatabaseError> {
        self.session.connect_server().await
    }

    async fn database_exists(&self) -> Result<bool, DatabaseError> {
        let rows = self
            .session
            .fetch_server(
                "SELECT CAST(SCHEMA_NAME AS CHAR) FROM information_schema.SCHEMATA WHERE SCHEMA_NAME = ?",
                &[self.session.config().database.as_str()],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn create_and_select_database(&mut self) -> Result<(), DatabaseError> {
        let defaults = self.session.defaults();
        let sql = format!(
            "CREATE DATABASE IF NOT EXISTS {} DEFAULT CHARACTER SET {} COLLATE {}",
            quote_identifier_mysql(&self.session.config().database),
            defaults.charset,
            defaults.collate
        );
        self.session.execute_on_server(&sql).await?;
        info!(database = %self.session.config().database, "database created");
        self.select_database().await
    }

    async fn select_database(&mut self) -> Result<(), DatabaseError> {
        self.session.open_database().await
    }

    async fn table_exists(&self, table: &str) -> Result<bool, DatabaseError> {
        let rows = self
            .session
            .fetch(
                "SELECT CAST(COUNT(*) AS SIGNED) FROM information_schema.TABLES \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?",
                &[table],
            )
            .await?;
        match rows.first() {
            Some(row) => Ok(integer(row, 0)? > 0),
            None => Ok(false),
        }
    }

    async fn tables(&self, sorted: bool) -> Result<Vec<String>, DatabaseError> {
        let mut sql = String::from(
            "SELECT CAST(TABLE_NAME AS CHAR) FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE'",
        );
        if sorted {
            sql.push_str(" ORDER BY TABLE_NAME");
        }
        let rows = self.session.fetch(&sql, &[]).await?;
        rows.iter().map(|row| text(row, 0)).collect()
    }

    async fn columns(&self, table: &str) -> Result<Vec<Box<dyn ColumnManagement>>, DatabaseError> {
        let sql = "SELECT CAST(COLUMN_NAME AS CHAR), CAST(DATA_TYPE AS CHAR), CAST(COLUMN_TYPE AS CHAR), \
                   CAST(IS_NULLABLE AS CHAR), CAST(COLUMN_DEFAULT AS CHAR), CAST(COLUMN_KEY AS CHAR), \
                   CAST(EXTRA AS CHAR), CAST(COLUMN_COMMENT AS CHAR), CAST(COLLATION_NAME AS CHAR) \
                   FROM information_schema.COLUMNS \
                   WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
                   ORDER BY ORDINAL_POSITION";
        let rows = self.session.fetch(sql, &[table]).await?;

        let mut columns: Vec<Box<dyn ColumnManagement>> = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = text(row, 0)?;
            let data_type = text(row, 1)?;
            let column_type =
                vendor_type(&data_type).ok_or_else(|| DatabaseError::UnknownType {
                    table: table.to_string(),
                    column: name.clone(),
                    vendor_type: data_type.clone(),
                })?;

            let mut spec = ColumnSpec::introspected(name, column_type);
            spec.length = introspected_length(column_type, &text(row, 2)?);
            spec.nullable = text(row, 3)?.eq_ignore_ascii_case("YES");
            spec.default = optional_text(row, 4)?
                .and_then(|raw| normalize_catalog_literal(&raw, column_type));
            spec.primary = text(row, 5)? == "PRI";
            spec.identity = text(row, 6)?.to_lowercase().contains("auto_increment");
            spec.comment = text(row, 7)?;
            spec.collate = optional_text(row, 8)?;

            columns.push(Box::new(MysqlColumn::new(spec, None)));
        }

        debug!(table, count = columns.len(), "introspected columns");
        Ok(columns)
    }

    async fn indices(&self, table: &str) -> Result<Vec<Box<dyn IndexManagement>>, DatabaseError> {
        // 外部キー制約が自動で作成するインデックスは除外する
        let sql = "SELECT CAST(INDEX_NAME AS CHAR), CAST(COLUMN_NAME AS CHAR), \
                   CAST(NON_UNIQUE AS SIGNED), CAST(INDEX_TYPE AS CHAR) \
                   FROM information_schema.STATISTICS \
                   WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND INDEX_NAME <> 'PRIMARY' \
                   AND INDEX_NAME NOT IN ( \
                       SELECT CONSTRAINT_NAME FROM information_schema.KEY_COLUMN_USAGE \
                       WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
                       AND REFERENCED_TABLE_NAME IS NOT NULL) \
                   ORDER BY INDEX_NAME, SEQ_IN_INDEX";
        let rows = self.session.fetch(sql, &[table, table]).await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let index_type = text(row, 3)?;
            let index_type = if index_type.eq_ignore_ascii_case("BTREE") {
                String::new()
            } else {
                index_type.to_lowercase()
            };
            entries.push((text(row, 0)?, text(row, 1)?, integer(row, 2)? == 0, index_type));
        }

        Ok(group_index_rows(entries)
            .into_iter()
            .map(|spec| Box::new(MysqlIndex::new(spec)) as Box<dyn IndexManagement>)
            .collect())
    }

    async fn foreign_keys(
        &self,
        table: &str,
    ) -> Result<Vec<Box<dyn ForeignKeyManagement>>, DatabaseError> {
        let sql = "SELECT CAST(CONSTRAINT_NAME AS CHAR), CAST(COLUMN_NAME AS CHAR), \
                   CAST(REFERENCED_TABLE_NAME AS CHAR), CAST(REFERENCED_COLUMN_NAME AS CHAR) \
                   FROM information_schema.KEY_COLUMN_USAGE \
                   WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
                   AND REFERENCED_TABLE_NAME IS NOT NULL \
                   ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION";
        let rows = self.session.fetch(sql, &[table]).await?;

        let mut foreign_keys: Vec<Box<dyn ForeignKeyManagement>> = Vec::with_capacity(rows.len());
        for row in &rows {
            let spec = ForeignKeySpec {
                name: text(row, 0)?,
                table: table.to_string(),
                column: text(row, 1)?,
                target_table: text(row, 2)?,
                target_column: text(row, 3)?,
            };
            foreign_keys.push(Box::new(MysqlForeignKey::new(spec)));
        }
        Ok(foreign_keys)
    }

    async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>, DatabaseError> {
        let sql = "SELECT CAST(COLUMN_NAME AS CHAR) FROM information_schema.STATISTICS \
                   WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND INDEX_NAME = 'PRIMARY' \
                   ORDER BY SEQ_IN_INDEX";
        let rows = self.session.fetch(sql, &[table]).await?;
        rows.iter().map(|row| text(row, 0)).collect()
    }

    async fn primary_key_name(&self, table: &str) -> Result<String, DatabaseError> {
        if self.primary_key_columns(table).await?.is_empty() {
            Ok(String::new())
        } else {
            Ok(PRIMARY_KEY_NAME.to_string())
        }
    }

    async fn table_comment(&self, table: &str) -> Result<String, DatabaseError> {
        let rows = self
            .session
            .fetch(
                "SELECT CAST(TABLE_COMMENT AS CHAR) FROM information_schema.TABLES \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?",
                &[table],
            )
            .await?;
        match rows.first() {
            Some(row) => text(row, 0),
            None => Ok(String::new()),
        }
    }

    async fn get_version(
        &self,
        track: Track,
        value: &str,
        default: &str,
    ) -> Result<String, DatabaseError> {
        if !self.table_exists(self.session.ledger_table()).await? {
            return Ok(default.to_string());
        }

        let sql = format!(
            "SELECT CAST(`version` AS CHAR) FROM {} WHERE `type` = ? AND `value` = ?",
            self.ledger()
        );
        let rows = self.session.fetch(&sql, &[track.as_str(), value]).await?;
        let version = match rows.first() {
            Some(row) => optional_text(row, 0)?.unwrap_or_else(|| default.to_string()),
            None => default.to_string(),
        };
        debug!(%track, value, version = %version, "read ledger version");
        Ok(version)
    }

    async fn set_version(
        &mut self,
        track: Track,
        value: &str,
        version: &str,
    ) -> Result<(), DatabaseError> {
        if self.session.is_dry_run() {
            return Ok(());
        }

        let ledger = self.ledger();
        let count_sql = format!(
            "SELECT CAST(COUNT(*) AS SIGNED) FROM {} WHERE `type` = ? AND `value` = ?",
            ledger
        );
        let rows = self.session.fetch(&count_sql, &[track.as_str(), value]).await?;
        let exists = match rows.first() {
            Some(row) => optional_integer(row, 0)?.unwrap_or(0) > 0,
            None => false,
        };

        if exists {
            let sql = format!(
                "UPDATE {} SET `version` = ?, `done` = 1 WHERE `type` = ? AND `value` = ?",
                ledger
            );
            self.session.run(&sql, &[version, track.as_str(), value]).await?;
        } else {
            let sql = format!(
                "INSERT INTO {} (`type`, `value`, `version`, `done`) VALUES (?, ?, ?, 1)",
                ledger
            );
            self.session.run(&sql, &[track.as_str(), value, version]).await?;
        }

        info!(%track, value, version, "ledger stamped");
        Ok(())
    }

    async fn statement_completed(&self, hash: &str, version: &str) -> Result<bool, DatabaseError> {
        if !self.table_exists(self.session.ledger_table()).await? {
            return Ok(false);
        }

        let sql = format!(
            "SELECT CAST(`done` AS SIGNED) FROM {} WHERE `type` = ? AND `value` = ? AND `version` = ?",
            self.ledger()
        );
        let rows = self
            .session
            .fetch(&sql, &[Track::Statement.as_str(), hash, version])
            .await?;
        match rows.first() {
            Some(row) => Ok(integer(row, 0)? == 1),
            None => Ok(false),
        }
    }
}
