// MySQL方言
//
// 方言非依存の型をMySQLの型・表示幅へ変換し、カラム・インデックス・
// 外部キー・テーブルのDDLを生成します。
// 宣言側とイントロスペクション側は同じコンストラクタで正規化されます。

use crate::adapters::dialect::{
    render_default, ColumnManagement, ColumnSpec, ForeignKeyManagement, ForeignKeySpec,
    IdentityTransition, IndexManagement, IndexSpec, PrimaryKeyMember, TableDefaults,
    TableManagement,
};
use crate::adapters::sql_quote::{quote_columns_mysql, quote_identifier_mysql};
use crate::core::column_type::{ColumnLength, ColumnType};
use crate::core::default_value::quote_literal;
use crate::core::schema::Table;
use regex::Regex;
use std::sync::LazyLock;

/// MySQLの主キー制約名
pub const PRIMARY_KEY_NAME: &str = "PRIMARY";

/// ストレージエンジン
const ENGINE: &str = "InnoDB";

/// COLUMN_TYPE の括弧内（長さ・精度・列挙値）
static LENGTH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]*)\)").expect("Invalid length pattern"));

/// 方言非依存の型をMySQLの型と長さへ変換
///
/// 全ての型を網羅し、未指定の表示幅には既定値を補います。
/// MySQL 8.0.19 以降は整数の表示幅を報告しないため、整数型の幅は
/// 宣言値に関わらず既定値へ揃えます（真偽値の `tinyint(1)` のみ保持）。
pub fn map_type(
    column_type: ColumnType,
    length: Option<ColumnLength>,
) -> (ColumnType, Option<ColumnLength>) {
    use ColumnType as T;
    match column_type {
        T::Bool | T::Boolean => (T::TinyInt, Some(ColumnLength::Size(1))),
        T::TinyInt => match length {
            Some(ColumnLength::Size(1)) => (T::TinyInt, Some(ColumnLength::Size(1))),
            _ => (T::TinyInt, Some(ColumnLength::Size(4))),
        },
        T::SmallInt => (T::SmallInt, Some(ColumnLength::Size(6))),
        T::MediumInt => (T::MediumInt, Some(ColumnLength::Size(9))),
        T::Int | T::Integer => (T::Int, Some(ColumnLength::Size(11))),
        T::BigInt => (T::BigInt, Some(ColumnLength::Size(20))),
        T::Bit => (T::Bit, size_or(length, 2)),
        T::Year => (T::Year, None),
        T::Decimal => (T::Decimal, Some(precision_or_default(length))),
        T::Money => (T::Decimal, Some(ColumnLength::Precision(19, 4))),
        T::Float => (T::Float, None),
        T::Real | T::Double => (T::Double, None),
        T::Date => (T::Date, None),
        T::DateTime => (T::DateTime, None),
        T::Timestamp => (T::Timestamp, None),
        T::Time => (T::Time, None),
        T::Char => match length {
            Some(ColumnLength::Max) => (T::LongText, None),
            other => (T::Char, size_or(other, 1)),
        },
        T::Varchar => match length {
            Some(ColumnLength::Max) => (T::LongText, None),
            other => (T::Varchar, size_or(other, 255)),
        },
        T::TinyText => (T::TinyText, None),
        T::Text => (T::Text, None),
        T::MediumText => (T::MediumText, None),
        T::LongText => (T::LongText, None),
        T::Enum => (T::Enum, values_only(length)),
        T::Set => (T::Set, values_only(length)),
        T::Binary => (T::Binary, size_or(length, 1)),
        T::VarBinary => match length {
            Some(ColumnLength::Max) => (T::LongBlob, None),
            other => (T::VarBinary, size_or(other, 255)),
        },
        T::TinyBlob => (T::TinyBlob, None),
        T::Blob => (T::Blob, None),
        T::MediumBlob => (T::MediumBlob, None),
        T::LongBlob | T::Bytea => (T::LongBlob, None),
        T::Geometry | T::Circle => (T::Geometry, None),
        T::Point => (T::Point, None),
        T::LineString | T::Path => (T::LineString, None),
        T::Polygon | T::Box => (T::Polygon, None),
        T::MultiPoint => (T::MultiPoint, None),
        T::MultiLineString => (T::MultiLineString, None),
        T::MultiPolygon => (T::MultiPolygon, None),
        T::GeometryCollection => (T::GeometryCollection, None),
        T::Cidr | T::Inet => (T::Varchar, Some(ColumnLength::Size(43))),
        T::MacAddr => (T::Varchar, Some(ColumnLength::Size(17))),
        T::Uuid => (T::Char, Some(ColumnLength::Size(36))),
        T::TsVector | T::TsQuery => (T::LongText, None),
    }
}

/// MySQLの型キーワード
pub fn type_keyword(column_type: ColumnType) -> &'static str {
    use ColumnType as T;
    match column_type {
        T::TinyInt | T::Bool | T::Boolean => "tinyint",
        T::SmallInt => "smallint",
        T::MediumInt => "mediumint",
        T::Int | T::Integer => "int",
        T::BigInt => "bigint",
        T::Bit => "bit",
        T::Year => "year",
        T::Decimal | T::Money => "decimal",
        T::Float => "float",
        T::Real | T::Double => "double",
        T::Date => "date",
        T::DateTime => "datetime",
        T::Timestamp => "timestamp",
        T::Time => "time",
        T::Char | T::Uuid => "char",
        T::Varchar | T::Cidr | T::Inet | T::MacAddr => "varchar",
        T::TinyText => "tinytext",
        T::Text => "text",
        T::MediumText => "mediumtext",
        T::LongText | T::TsVector | T::TsQuery => "longtext",
        T::Enum => "enum",
        T::Set => "set",
        T::Binary => "binary",
        T::VarBinary => "varbinary",
        T::TinyBlob => "tinyblob",
        T::Blob => "blob",
        T::MediumBlob => "mediumblob",
        T::LongBlob | T::Bytea => "longblob",
        T::Geometry | T::Circle => "geometry",
        T::Point => "point",
        T::LineString | T::Path => "linestring",
        T::Polygon | T::Box => "polygon",
        T::MultiPoint => "multipoint",
        T::MultiLineString => "multilinestring",
        T::MultiPolygon => "multipolygon",
        T::GeometryCollection => "geometrycollection",
    }
}

/// information_schema の DATA_TYPE から型を解決
pub fn vendor_type(data_type: &str) -> Option<ColumnType> {
    match data_type.trim().to_lowercase().as_str() {
        "geomcollection" => Some(ColumnType::GeometryCollection),
        other => other.parse().ok(),
    }
}

/// COLUMN_TYPE（例: `varchar(64)`）から長さを取り出す
///
/// 長さを持つ型以外では None を返します。
pub fn introspected_length(column_type: ColumnType, full_type: &str) -> Option<ColumnLength> {
    use ColumnType as T;
    let takes_length = matches!(
        column_type,
        T::TinyInt
            | T::SmallInt
            | T::MediumInt
            | T::Int
            | T::BigInt
            | T::Bit
            | T::Decimal
            | T::Char
            | T::Varchar
            | T::Binary
            | T::VarBinary
            | T::Enum
            | T::Set
    );
    if !takes_length {
        return None;
    }
    let captures = LENGTH_PATTERN.captures(full_type)?;
    captures.get(1)?.as_str().parse().ok()
}

fn size_or(length: Option<ColumnLength>, default: u32) -> Option<ColumnLength> {
    match length {
        Some(ColumnLength::Size(n)) => Some(ColumnLength::Size(n)),
        _ => Some(ColumnLength::Size(default)),
    }
}

fn precision_or_default(length: Option<ColumnLength>) -> ColumnLength {
    match length {
        Some(ColumnLength::Size(p)) => ColumnLength::Precision(p, 0),
        Some(ColumnLength::Precision(p, s)) => ColumnLength::Precision(p, s),
        _ => ColumnLength::Precision(10, 0),
    }
}

fn values_only(length: Option<ColumnLength>) -> Option<ColumnLength> {
    length.filter(|l| matches!(l, ColumnLength::Values(_)))
}

/// 照合順序を指定する型かどうか
fn takes_collation(column_type: ColumnType) -> bool {
    use ColumnType as T;
    matches!(
        column_type,
        T::Char
            | T::Varchar
            | T::TinyText
            | T::Text
            | T::MediumText
            | T::LongText
            | T::Enum
            | T::Set
    )
}

/// リテラルのデフォルト値を持てる型かどうか
fn accepts_default(column_type: ColumnType) -> bool {
    use ColumnType as T;
    !matches!(
        column_type,
        T::TinyText
            | T::Text
            | T::MediumText
            | T::LongText
            | T::TinyBlob
            | T::Blob
            | T::MediumBlob
            | T::LongBlob
            | T::Geometry
            | T::Point
            | T::LineString
            | T::Polygon
            | T::MultiPoint
            | T::MultiLineString
            | T::MultiPolygon
            | T::GeometryCollection
    )
}

/// `CHANGE old new_definition` 句
fn change_clause(current: &dyn ColumnManagement, target: &dyn ColumnManagement) -> String {
    format!(
        "CHANGE {} {}",
        quote_identifier_mysql(current.name()),
        target.definition()
    )
}

fn alter_table(table: &str) -> String {
    format!("ALTER TABLE {}", quote_identifier_mysql(table))
}

/// MySQLのカラム
#[derive(Debug, Clone, PartialEq)]
pub struct MysqlColumn {
    spec: ColumnSpec,
}

impl MysqlColumn {
    /// 属性を正規化してカラムを作成
    ///
    /// # Arguments
    ///
    /// * `spec` - 宣言またはイントロスペクションの属性
    /// * `default_collate` - カラムに照合順序が無い場合の既定値
    pub fn new(mut spec: ColumnSpec, default_collate: Option<&str>) -> Self {
        let (column_type, length) = map_type(spec.column_type, spec.length.take());
        spec.column_type = column_type;
        spec.length = length;
        spec.default = if spec.identity || !accepts_default(column_type) {
            None
        } else {
            spec.default.take().and_then(|d| d.coerce(column_type))
        };
        spec.collate = if takes_collation(column_type) {
            spec.collate.take().or_else(|| default_collate.map(str::to_string))
        } else {
            None
        };
        Self { spec }
    }
}

impl ColumnManagement for MysqlColumn {
    fn spec(&self) -> &ColumnSpec {
        &self.spec
    }

    fn type_clause(&self) -> String {
        let keyword = type_keyword(self.spec.column_type);
        match &self.spec.length {
            Some(ColumnLength::Max) | None => keyword.to_string(),
            Some(length) => format!("{}({})", keyword, length),
        }
    }

    fn definition(&self) -> String {
        let mut parts = vec![quote_identifier_mysql(&self.spec.new_name), self.type_clause()];

        if let Some(collate) = &self.spec.collate {
            parts.push(format!("COLLATE {}", collate));
        }

        parts.push(if self.spec.nullable { "NULL" } else { "NOT NULL" }.to_string());

        if self.spec.identity {
            parts.push("AUTO_INCREMENT".to_string());
        }

        if let Some(default) = &self.spec.default {
            parts.push(format!("DEFAULT {}", render_default(default)));
        }

        if !self.spec.comment.is_empty() {
            parts.push(format!("COMMENT {}", quote_literal(&self.spec.comment)));
        }

        parts.join(" ")
    }

    fn add_statements(&self, table: &str) -> Vec<String> {
        vec![format!("{} ADD COLUMN {}", alter_table(table), self.definition())]
    }

    fn drop_statements(&self, table: &str) -> Vec<String> {
        vec![format!(
            "{} DROP COLUMN {}",
            alter_table(table),
            quote_identifier_mysql(&self.spec.name)
        )]
    }

    fn update_statements(&self, table: &str, current: &dyn ColumnManagement) -> Vec<String> {
        vec![format!("{} {}", alter_table(table), change_clause(current, self))]
    }
}

/// MySQLのインデックス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MysqlIndex {
    spec: IndexSpec,
}

impl MysqlIndex {
    pub fn new(spec: IndexSpec) -> Self {
        Self { spec }
    }
}

/// CREATE TABLE 内のキー定義
fn key_definition(spec: &IndexSpec) -> String {
    format!(
        "{}KEY {} ({})",
        if spec.unique { "UNIQUE " } else { "" },
        quote_identifier_mysql(&spec.name),
        quote_columns_mysql(&spec.columns)
    )
}

impl IndexManagement for MysqlIndex {
    fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    fn add_statements(&self, table: &str) -> Vec<String> {
        if self.spec.columns.is_empty() {
            return Vec::new();
        }
        vec![format!(
            "{} ADD {}INDEX {} ({})",
            alter_table(table),
            if self.spec.unique { "UNIQUE " } else { "" },
            quote_identifier_mysql(&self.spec.name),
            quote_columns_mysql(&self.spec.columns)
        )]
    }

    fn drop_statements(&self, table: &str) -> Vec<String> {
        vec![format!(
            "{} DROP INDEX {}",
            alter_table(table),
            quote_identifier_mysql(&self.spec.name)
        )]
    }
}

/// MySQLの外部キー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MysqlForeignKey {
    spec: ForeignKeySpec,
}

impl MysqlForeignKey {
    pub fn new(spec: ForeignKeySpec) -> Self {
        Self { spec }
    }
}

impl ForeignKeyManagement for MysqlForeignKey {
    fn spec(&self) -> &ForeignKeySpec {
        &self.spec
    }

    fn constraint_definition(&self) -> String {
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            quote_identifier_mysql(&self.spec.name),
            quote_identifier_mysql(&self.spec.column),
            quote_identifier_mysql(&self.spec.target_table),
            quote_identifier_mysql(&self.spec.target_column)
        )
    }

    fn add_statements(&self, table: &str) -> Vec<String> {
        vec![format!("{} ADD {}", alter_table(table), self.constraint_definition())]
    }

    fn drop_statements(&self, table: &str) -> Vec<String> {
        vec![format!(
            "{} DROP FOREIGN KEY {}",
            alter_table(table),
            quote_identifier_mysql(&self.spec.name)
        )]
    }
}

/// MySQLのテーブル
#[derive(Debug)]
pub struct MysqlTable {
    name: String,
    comment: String,
    collate: String,
    charset: String,
    columns: Vec<Box<dyn ColumnManagement>>,
    indices: Vec<Box<dyn IndexManagement>>,
    foreign_keys: Vec<Box<dyn ForeignKeyManagement>>,
}

impl MysqlTable {
    /// 宣言テーブルから作成
    pub fn from_model(table: &Table, defaults: &TableDefaults) -> Self {
        let collate = table.collate().unwrap_or(&defaults.collate).to_string();
        let charset = table.charset().unwrap_or(&defaults.charset).to_string();

        let columns = table
            .columns()
            .map(|c| {
                Box::new(MysqlColumn::new(ColumnSpec::from_model(c), Some(&collate)))
                    as Box<dyn ColumnManagement>
            })
            .collect();
        let indices = table
            .indices()
            .map(|i| Box::new(MysqlIndex::new(IndexSpec::from_model(i))) as Box<dyn IndexManagement>)
            .collect();
        let foreign_keys = table
            .foreign_keys()
            .map(|fk| {
                Box::new(MysqlForeignKey::new(ForeignKeySpec::from_model(fk)))
                    as Box<dyn ForeignKeyManagement>
            })
            .collect();

        Self {
            name: table.name().to_string(),
            comment: table.comment().to_string(),
            collate,
            charset,
            columns,
            indices,
            foreign_keys,
        }
    }

    fn alter(&self) -> String {
        alter_table(&self.name)
    }

    fn primary_key_clause(&self) -> Option<String> {
        let columns = self.primary_key_columns();
        if columns.is_empty() {
            None
        } else {
            Some(format!("PRIMARY KEY ({})", quote_columns_mysql(&columns)))
        }
    }

    /// identity を手放すカラムの句（定義を残すか削除するか）
    fn release_clause(
        released: &dyn ColumnManagement,
        retained: Option<&dyn ColumnManagement>,
    ) -> String {
        match retained {
            Some(column) => change_clause(released, column),
            None => format!("DROP COLUMN {}", quote_identifier_mysql(released.name())),
        }
    }
}

impl TableManagement for MysqlTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn comment(&self) -> &str {
        &self.comment
    }

    fn columns(&self) -> &[Box<dyn ColumnManagement>] {
        &self.columns
    }

    fn indices(&self) -> &[Box<dyn IndexManagement>] {
        &self.indices
    }

    fn foreign_keys(&self) -> &[Box<dyn ForeignKeyManagement>] {
        &self.foreign_keys
    }

    /// identity カラムを先頭に並べる
    fn primary_key_columns(&self) -> Vec<String> {
        let identity = self
            .columns
            .iter()
            .filter(|c| c.is_primary() && c.is_identity());
        let others = self
            .columns
            .iter()
            .filter(|c| c.is_primary() && !c.is_identity());
        identity
            .chain(others)
            .map(|c| c.new_name().to_string())
            .collect()
    }

    fn create_statements(&self) -> Vec<String> {
        if self.columns.is_empty() {
            return Vec::new();
        }

        let mut items: Vec<String> = self.columns.iter().map(|c| c.definition()).collect();
        if let Some(primary_key) = self.primary_key_clause() {
            items.push(primary_key);
        }
        for index in self.indices.iter().filter(|i| !i.columns().is_empty()) {
            items.push(key_definition(index.spec()));
        }
        for foreign_key in &self.foreign_keys {
            items.push(foreign_key.constraint_definition());
        }

        let mut statement = format!(
            "CREATE TABLE {} (\n{}\n) ENGINE={} DEFAULT CHARSET={} COLLATE={}",
            quote_identifier_mysql(&self.name),
            items.join(",\n"),
            ENGINE,
            self.charset,
            self.collate
        );
        if !self.comment.is_empty() {
            statement.push_str(&format!(" COMMENT={}", quote_literal(&self.comment)));
        }
        vec![statement]
    }

    fn comment_statements(&self) -> Vec<String> {
        vec![format!("{} COMMENT={}", self.alter(), quote_literal(&self.comment))]
    }

    fn primary_key_statements(
        &self,
        current_name: &str,
        members: &[PrimaryKeyMember<'_>],
    ) -> Vec<String> {
        let mut clauses = Vec::new();
        if !current_name.is_empty() {
            clauses.push("DROP PRIMARY KEY".to_string());
        }
        clauses.extend(members.iter().map(|m| change_clause(m.current, m.target)));
        if let Some(primary_key) = self.primary_key_clause() {
            clauses.push(format!("ADD {}", primary_key));
        }
        if clauses.is_empty() {
            return Vec::new();
        }
        vec![format!("{} {}", self.alter(), clauses.join(", "))]
    }

    fn identity_transition_statements(
        &self,
        current_pk_name: &str,
        transition: &IdentityTransition<'_>,
        members: &[PrimaryKeyMember<'_>],
    ) -> Vec<String> {
        let mut clauses = Vec::new();
        if !current_pk_name.is_empty() {
            clauses.push("DROP PRIMARY KEY".to_string());
        }
        clauses.extend(members.iter().map(|m| change_clause(m.current, m.target)));

        match *transition {
            IdentityTransition::AddColumn { target } => {
                clauses.push(format!("ADD COLUMN {}", target.definition()));
            }
            IdentityTransition::Convert { current, target }
            | IdentityTransition::Rename { current, target } => {
                clauses.push(change_clause(current, target));
            }
            IdentityTransition::Remove { released, retained } => {
                clauses.push(Self::release_clause(released, retained));
            }
            IdentityTransition::Move {
                released,
                retained,
                current,
                target,
            } => {
                clauses.push(Self::release_clause(released, retained));
                clauses.push(change_clause(current, target));
            }
            IdentityTransition::Replace {
                released,
                retained,
                target,
            } => {
                clauses.push(Self::release_clause(released, retained));
                clauses.push(format!("ADD COLUMN {}", target.definition()));
            }
        }

        if let Some(primary_key) = self.primary_key_clause() {
            clauses.push(format!("ADD {}", primary_key));
        }

        vec![format!("{} {}", self.alter(), clauses.join(", "))]
    }
}
