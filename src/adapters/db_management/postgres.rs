// PostgreSQLのデータベース管理
//
// information_schema とシステムカタログからライブスキーマを読み取り、
// PostgreSQLの方言オブジェクトへ変換します。
// ドメイン型の列はAnyドライバーで扱えるよう ::text / ::int8 にキャストします。

use super::{
    group_index_rows, integer, optional_integer, optional_text, text, DbManagement, Session,
};
use crate::adapters::dialect::postgres::{
    vendor_type, PostgresColumn, PostgresForeignKey, PostgresIndex,
};
use crate::adapters::dialect::{
    ColumnManagement, ColumnSpec, ForeignKeyManagement, ForeignKeySpec, IndexManagement,
    TableDefaults,
};
use crate::adapters::sql_quote::{quote_folded_postgres, quote_identifier_postgres};
use crate::core::column_type::{ColumnLength, ColumnType};
use crate::core::config::Dialect;
use crate::core::default_value::normalize_default;
use crate::core::error::DatabaseError;
use crate::core::naming::Track;
use async_trait::async_trait;
use sqlx::Row;
use tracing::{debug, info};

/// PostgreSQLのデータベース管理
#[derive(Debug)]
pub struct PostgresManagement {
    session: Session,
}

impl PostgresManagement {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    fn schema(&self) -> &str {
        &self.session.config().schema
    }

    fn ledger(&self) -> String {
        quote_folded_postgres(self.session.ledger_table())
    }

    /// 主キー制約名とカラム
    ///
    /// 主キー制約が複数見つかった場合はカタログの不整合としてエラーにします。
    async fn primary_key(&self, table: &str) -> Result<(String, Vec<String>), DatabaseError> {
        let sql = "SELECT con.conname::text, a.attname::text \
                   FROM pg_constraint con \
                   JOIN pg_class t ON t.oid = con.conrelid \
                   JOIN pg_namespace n ON n.oid = t.relnamespace \
                   JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = ANY(con.conkey) \
                   WHERE con.contype = 'p' AND n.nspname = $1 AND t.relname = $2 \
                   ORDER BY con.conname, array_position(con.conkey, a.attnum)";
        let rows = self.session.fetch(sql, &[self.schema(), table]).await?;

        let mut name = String::new();
        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let constraint = text(row, 0)?;
            if name.is_empty() {
                name = constraint;
            } else if name != constraint {
                return Err(DatabaseError::Introspection {
                    message: format!("テーブル {} に複数の主キー制約があります", table),
                });
            }
            columns.push(text(row, 1)?);
        }
        Ok((name, columns))
    }
}

/// information_schema の長さ情報から宣言上の長さを復元
///
/// u32 に収まらない値はカタログの不整合としてエラーにします。
fn introspected_length(
    column_type: ColumnType,
    character_length: Option<i64>,
    precision: Option<i64>,
    scale: Option<i64>,
) -> Result<Option<ColumnLength>, DatabaseError> {
    let length = match column_type {
        ColumnType::Varchar | ColumnType::Char => match character_length {
            Some(n) => Some(ColumnLength::Size(catalog_u32("character_maximum_length", n)?)),
            None => None,
        },
        ColumnType::Decimal => match precision {
            Some(p) => Some(ColumnLength::Precision(
                catalog_u32("numeric_precision", p)?,
                catalog_u32("numeric_scale", scale.unwrap_or(0))?,
            )),
            None => None,
        },
        _ => None,
    };
    Ok(length)
}

fn catalog_u32(field: &str, value: i64) -> Result<u32, DatabaseError> {
    u32::try_from(value).map_err(|_| DatabaseError::Introspection {
        message: format!("{} の値 {} は範囲外です", field, value),
    })
}

#[async_trait]
impl DbManagement for PostgresManagement {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSQL
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
                "SELECT datname::text FROM pg_database WHERE datname = $1",
                &[self.session.config().database.as_str()],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn create_and_select_database(&mut self) -> Result<(), DatabaseError> {
        if !self.database_exists().await? {
            let sql = format!(
                "CREATE DATABASE {}",
                quote_identifier_postgres(&self.session.config().database)
            );
            self.session.execute_on_server(&sql).await?;
            info!(database = %self.session.config().database, "database created");
        }

        self.select_database().await?;

        let schema = self.schema().to_string();
        if schema != "public" {
            let sql = format!(
                "CREATE SCHEMA IF NOT EXISTS {}",
                quote_identifier_postgres(&schema)
            );
            self.session.apply(&sql).await?;
        }
        Ok(())
    }

    async fn select_database(&mut self) -> Result<(), DatabaseError> {
        self.session.open_database().await
    }

    async fn table_exists(&self, table: &str) -> Result<bool, DatabaseError> {
        let rows = self
            .session
            .fetch(
                "SELECT COUNT(*)::int8 FROM information_schema.tables \
                 WHERE table_schema = $1 AND table_name = $2",
                &[self.schema(), table],
            )
            .await?;
        match rows.first() {
            Some(row) => Ok(integer(row, 0)? > 0),
            None => Ok(false),
        }
    }

    async fn tables(&self, sorted: bool) -> Result<Vec<String>, DatabaseError> {
        let mut sql = String::from(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = $1 AND table_type = 'BASE TABLE'",
        );
        if sorted {
            sql.push_str(" ORDER BY table_name");
        }
        let rows = self.session.fetch(&sql, &[self.schema()]).await?;
        rows.iter().map(|row| text(row, 0)).collect()
    }

    async fn columns(&self, table: &str) -> Result<Vec<Box<dyn ColumnManagement>>, DatabaseError> {
        let (_, primary_key) = self.primary_key(table).await?;

        let sql = "SELECT c.column_name::text, c.data_type::text, c.is_nullable::text, \
                   c.column_default::text, c.character_maximum_length::int8, \
                   c.numeric_precision::int8, c.numeric_scale::int8, c.is_identity::text, \
                   c.collation_name::text, \
                   col_description(format('%I.%I', c.table_schema, c.table_name)::regclass::oid, \
                                   c.ordinal_position::int)::text \
                   FROM information_schema.columns c \
                   WHERE c.table_schema = $1 AND c.table_name = $2 \
                   ORDER BY c.ordinal_position";
        let rows = self.session.fetch(sql, &[self.schema(), table]).await?;

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

            let raw_default = optional_text(row, 3)?;
            let sequence_backed = raw_default
                .as_deref()
                .is_some_and(|d| d.starts_with("nextval("));

            let mut spec = ColumnSpec::introspected(name.clone(), column_type);
            spec.nullable = text(row, 2)?.eq_ignore_ascii_case("YES");
            spec.length = introspected_length(
                column_type,
                optional_integer(row, 4)?,
                optional_integer(row, 5)?,
                optional_integer(row, 6)?,
            )?;
            spec.identity = text(row, 7)?.eq_ignore_ascii_case("YES") || sequence_backed;
            spec.default = raw_default.and_then(|raw| normalize_default(&raw, column_type));
            spec.collate = optional_text(row, 8)?;
            spec.comment = text(row, 9)?;
            spec.primary = primary_key.contains(&name);

            columns.push(Box::new(PostgresColumn::new(spec)));
        }

        debug!(table, count = columns.len(), "introspected columns");
        Ok(columns)
    }

    async fn indices(&self, table: &str) -> Result<Vec<Box<dyn IndexManagement>>, DatabaseError> {
        let sql = "SELECT i.relname::text, a.attname::text, ix.indisunique, am.amname::text \
                   FROM pg_index ix \
                   JOIN pg_class t ON t.oid = ix.indrelid \
                   JOIN pg_class i ON i.oid = ix.indexrelid \
                   JOIN pg_namespace n ON n.oid = t.relnamespace \
                   JOIN pg_am am ON am.oid = i.relam \
                   JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey) \
                   WHERE n.nspname = $1 AND t.relname = $2 AND NOT ix.indisprimary \
                   ORDER BY i.relname, array_position(ix.indkey::int2[], a.attnum)";
        let rows = self.session.fetch(sql, &[self.schema(), table]).await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let unique: bool = row
                .try_get::<Option<bool>, _>(2)
                .map_err(|e| DatabaseError::Introspection {
                    message: format!("インデックスのユニーク属性を読み取れませんでした: {}", e),
                })?
                .unwrap_or(false);
            let method = text(row, 3)?;
            let index_type = if method == "btree" { String::new() } else { method };
            entries.push((text(row, 0)?, text(row, 1)?, unique, index_type));
        }

        Ok(group_index_rows(entries)
            .into_iter()
            .map(|spec| Box::new(PostgresIndex::new(spec)) as Box<dyn IndexManagement>)
            .collect())
    }

    async fn foreign_keys(
        &self,
        table: &str,
    ) -> Result<Vec<Box<dyn ForeignKeyManagement>>, DatabaseError> {
        let sql = "SELECT con.conname::text, a.attname::text, ft.relname::text, fa.attname::text \
                   FROM pg_constraint con \
                   JOIN pg_class t ON t.oid = con.conrelid \
                   JOIN pg_namespace n ON n.oid = t.relnamespace \
                   JOIN pg_class ft ON ft.oid = con.confrelid \
                   JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = con.conkey[1] \
                   JOIN pg_attribute fa ON fa.attrelid = con.confrelid AND fa.attnum = con.confkey[1] \
                   WHERE con.contype = 'f' AND n.nspname = $1 AND t.relname = $2 \
                   ORDER BY con.conname";
        let rows = self.session.fetch(sql, &[self.schema(), table]).await?;

        let mut foreign_keys: Vec<Box<dyn ForeignKeyManagement>> = Vec::with_capacity(rows.len());
        for row in &rows {
            let spec = ForeignKeySpec {
                name: text(row, 0)?,
                table: table.to_string(),
                column: text(row, 1)?,
                target_table: text(row, 2)?,
                target_column: text(row, 3)?,
            };
            foreign_keys.push(Box::new(PostgresForeignKey::new(spec)));
        }
        Ok(foreign_keys)
    }

    async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>, DatabaseError> {
        Ok(self.primary_key(table).await?.1)
    }

    async fn primary_key_name(&self, table: &str) -> Result<String, DatabaseError> {
        Ok(self.primary_key(table).await?.0)
    }

    async fn table_comment(&self, table: &str) -> Result<String, DatabaseError> {
        let rows = self
            .session
            .fetch(
                "SELECT obj_description(c.oid, 'pg_class')::text FROM pg_class c \
                 JOIN pg_namespace n ON n.oid = c.relnamespace \
                 WHERE n.nspname = $1 AND c.relname = $2",
                &[self.schema(), table],
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
        let ledger_table = self.session.ledger_table().to_lowercase();
        if !self.table_exists(&ledger_table).await? {
            return Ok(default.to_string());
        }

        let sql = format!(
            "SELECT \"version\"::text FROM {} WHERE \"type\" = $1 AND \"value\" = $2",
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
            "SELECT COUNT(*)::int8 FROM {} WHERE \"type\" = $1 AND \"value\" = $2",
            ledger
        );
        let rows = self.session.fetch(&count_sql, &[track.as_str(), value]).await?;
        let exists = match rows.first() {
            Some(row) => integer(row, 0)? > 0,
            None => false,
        };

        if exists {
            let sql = format!(
                "UPDATE {} SET \"version\" = $1, \"done\" = 1 WHERE \"type\" = $2 AND \"value\" = $3",
                ledger
            );
            self.session.run(&sql, &[version, track.as_str(), value]).await?;
        } else {
            let sql = format!(
                "INSERT INTO {} (\"type\", \"value\", \"version\", \"done\") VALUES ($1, $2, $3, 1)",
                ledger
            );
            self.session.run(&sql, &[track.as_str(), value, version]).await?;
        }

        info!(%track, value, version, "ledger stamped");
        Ok(())
    }

    async fn statement_completed(&self, hash: &str, version: &str) -> Result<bool, DatabaseError> {
        let ledger_table = self.session.ledger_table().to_lowercase();
        if !self.table_exists(&ledger_table).await? {
            return Ok(false);
        }

        let sql = format!(
            "SELECT \"done\"::int8 FROM {} WHERE \"type\" = $1 AND \"value\" = $2 AND \"version\" = $3",
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
