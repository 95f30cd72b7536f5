// PostgreSQL方言
//
// 識別子は小文字へ畳み込んでダブルクォートします。
// identity は GENERATED ALWAYS AS IDENTITY、コメントは COMMENT ON で表現します。

use crate::adapters::dialect::{
    not_identical, render_default, ColumnManagement, ColumnSpec, ForeignKeyManagement,
    ForeignKeySpec, IdentityTransition, IndexManagement, IndexSpec, PrimaryKeyMember,
    TableManagement, DIFF_DEFAULT, DIFF_LENGTH, DIFF_NULLABLE, DIFF_TYPE,
};
use crate::adapters::sql_quote::{
    quote_columns_postgres, quote_folded_postgres as ident, quote_identifier_postgres,
};
use crate::core::column_type::{ColumnLength, ColumnType};
use crate::core::default_value::quote_literal;
use crate::core::schema::Table;

/// 方言非依存の型をPostgreSQLの型と長さへ変換
///
/// 長さを保持するのは varchar / char / numeric のみです。
pub fn map_type(
    column_type: ColumnType,
    length: Option<ColumnLength>,
) -> (ColumnType, Option<ColumnLength>) {
    use ColumnType as T;
    match column_type {
        T::TinyInt | T::SmallInt | T::Year => (T::SmallInt, None),
        T::MediumInt | T::Int | T::Integer => (T::Integer, None),
        T::BigInt => (T::BigInt, None),
        T::Bool | T::Boolean | T::Bit => (T::Boolean, None),
        T::Decimal => (T::Decimal, numeric_precision(length)),
        T::Money => (T::Money, None),
        T::Float | T::Real => (T::Real, None),
        T::Double => (T::Double, None),
        T::Date => (T::Date, None),
        T::DateTime | T::Timestamp => (T::Timestamp, None),
        T::Time => (T::Time, None),
        T::Char => match length {
            Some(ColumnLength::Max) => (T::Text, None),
            Some(ColumnLength::Size(n)) => (T::Char, Some(ColumnLength::Size(n))),
            _ => (T::Char, Some(ColumnLength::Size(1))),
        },
        T::Varchar => match length {
            Some(ColumnLength::Max) => (T::Text, None),
            Some(ColumnLength::Size(n)) => (T::Varchar, Some(ColumnLength::Size(n))),
            _ => (T::Varchar, None),
        },
        T::TinyText | T::Text | T::MediumText | T::LongText | T::Enum | T::Set => (T::Text, None),
        T::Binary
        | T::VarBinary
        | T::TinyBlob
        | T::Blob
        | T::MediumBlob
        | T::LongBlob
        | T::Bytea
        | T::Geometry
        | T::MultiPoint
        | T::MultiLineString
        | T::MultiPolygon
        | T::GeometryCollection => (T::Bytea, None),
        T::Point => (T::Point, None),
        T::LineString => (T::LineString, None),
        T::Polygon => (T::Polygon, None),
        T::Box => (T::Box, None),
        T::Circle => (T::Circle, None),
        T::Path => (T::Path, None),
        T::Cidr => (T::Cidr, None),
        T::Inet => (T::Inet, None),
        T::MacAddr => (T::MacAddr, None),
        T::Uuid => (T::Uuid, None),
        T::TsVector => (T::TsVector, None),
        T::TsQuery => (T::TsQuery, None),
    }
}

/// PostgreSQLの型キーワード
pub fn type_keyword(column_type: ColumnType) -> &'static str {
    use ColumnType as T;
    match column_type {
        T::TinyInt | T::SmallInt | T::Year => "smallint",
        T::MediumInt | T::Int | T::Integer => "integer",
        T::BigInt => "bigint",
        T::Bool | T::Boolean | T::Bit => "boolean",
        T::Decimal => "numeric",
        T::Money => "money",
        T::Float | T::Real => "real",
        T::Double => "double precision",
        T::Date => "date",
        T::DateTime | T::Timestamp => "timestamp",
        T::Time => "time",
        T::Char => "char",
        T::Varchar => "varchar",
        T::TinyText | T::Text | T::MediumText | T::LongText | T::Enum | T::Set => "text",
        T::Binary
        | T::VarBinary
        | T::TinyBlob
        | T::Blob
        | T::MediumBlob
        | T::LongBlob
        | T::Bytea
        | T::Geometry
        | T::MultiPoint
        | T::MultiLineString
        | T::MultiPolygon
        | T::GeometryCollection => "bytea",
        T::Point => "point",
        T::LineString => "line",
        T::Polygon => "polygon",
        T::Box => "box",
        T::Circle => "circle",
        T::Path => "path",
        T::Cidr => "cidr",
        T::Inet => "inet",
        T::MacAddr => "macaddr",
        T::Uuid => "uuid",
        T::TsVector => "tsvector",
        T::TsQuery => "tsquery",
    }
}

/// information_schema.columns の data_type から型を解決
///
/// タイムゾーン付きの日時型は対応する型が無いため None になります。
pub fn vendor_type(data_type: &str) -> Option<ColumnType> {
    use ColumnType as T;
    let column_type = match data_type.trim().to_lowercase().as_str() {
        "smallint" | "int2" => T::SmallInt,
        "integer" | "int" | "int4" => T::Integer,
        "bigint" | "int8" => T::BigInt,
        "boolean" | "bool" => T::Boolean,
        "numeric" | "decimal" => T::Decimal,
        "money" => T::Money,
        "real" | "float4" => T::Real,
        "double precision" | "float8" => T::Double,
        "date" => T::Date,
        "timestamp without time zone" | "timestamp" => T::Timestamp,
        "time without time zone" | "time" => T::Time,
        "character" | "char" | "bpchar" => T::Char,
        "character varying" | "varchar" => T::Varchar,
        "text" => T::Text,
        "bytea" => T::Bytea,
        "point" => T::Point,
        "line" => T::LineString,
        "polygon" => T::Polygon,
        "box" => T::Box,
        "circle" => T::Circle,
        "path" => T::Path,
        "cidr" => T::Cidr,
        "inet" => T::Inet,
        "macaddr" => T::MacAddr,
        "uuid" => T::Uuid,
        "tsvector" => T::TsVector,
        "tsquery" => T::TsQuery,
        _ => return None,
    };
    Some(column_type)
}

fn numeric_precision(length: Option<ColumnLength>) -> Option<ColumnLength> {
    match length {
        Some(ColumnLength::Size(p)) => Some(ColumnLength::Precision(p, 0)),
        Some(ColumnLength::Precision(p, s)) => Some(ColumnLength::Precision(p, s)),
        _ => None,
    }
}

fn alter_table(table: &str) -> String {
    format!("ALTER TABLE {}", ident(table))
}

fn column_comment_statement(table: &str, column: &str, comment: &str) -> String {
    let value = if comment.is_empty() {
        "NULL".to_string()
    } else {
        quote_literal(comment)
    };
    format!("COMMENT ON COLUMN {}.{} IS {}", ident(table), ident(column), value)
}

/// PostgreSQLのカラム
#[derive(Debug, Clone, PartialEq)]
pub struct PostgresColumn {
    spec: ColumnSpec,
}

impl PostgresColumn {
    /// 属性を正規化してカラムを作成
    pub fn new(mut spec: ColumnSpec) -> Self {
        let (column_type, length) = map_type(spec.column_type, spec.length.take());
        spec.name = spec.name.to_lowercase();
        spec.new_name = spec.new_name.to_lowercase();
        spec.column_type = column_type;
        spec.length = length;
        spec.default = if spec.identity {
            None
        } else {
            spec.default.take().and_then(|d| d.coerce(column_type))
        };
        Self { spec }
    }
}

impl ColumnManagement for PostgresColumn {
    fn spec(&self) -> &ColumnSpec {
        &self.spec
    }

    fn type_clause(&self) -> String {
        let keyword = type_keyword(self.spec.column_type);
        match &self.spec.length {
            Some(ColumnLength::Size(n)) => format!("{}({})", keyword, n),
            Some(ColumnLength::Precision(p, s)) => format!("{}({},{})", keyword, p, s),
            Some(ColumnLength::Max) | Some(ColumnLength::Values(_)) | None => keyword.to_string(),
        }
    }

    fn definition(&self) -> String {
        let mut parts = vec![ident(&self.spec.new_name), self.type_clause()];

        if let Some(collate) = &self.spec.collate {
            parts.push(format!("COLLATE {}", quote_identifier_postgres(collate)));
        }

        if self.spec.identity {
            parts.push("GENERATED ALWAYS AS IDENTITY".to_string());
        }

        if !self.spec.nullable {
            parts.push("NOT NULL".to_string());
        }

        if let Some(default) = &self.spec.default {
            parts.push(format!("DEFAULT {}", render_default(default)));
        }

        parts.join(" ")
    }

    fn add_statements(&self, table: &str) -> Vec<String> {
        let mut statements = vec![format!("{} ADD COLUMN {}", alter_table(table), self.definition())];
        if !self.spec.comment.is_empty() {
            statements.push(column_comment_statement(
                table,
                &self.spec.new_name,
                &self.spec.comment,
            ));
        }
        statements
    }

    fn drop_statements(&self, table: &str) -> Vec<String> {
        vec![format!("{} DROP COLUMN {}", alter_table(table), ident(&self.spec.name))]
    }

    fn update_statements(&self, table: &str, current: &dyn ColumnManagement) -> Vec<String> {
        let mut statements = Vec::new();
        let name = ident(&self.spec.new_name);

        if !current.name().eq_ignore_ascii_case(&self.spec.new_name) {
            statements.push(format!(
                "{} RENAME COLUMN {} TO {}",
                alter_table(table),
                ident(current.name()),
                name
            ));
        }

        let mask = not_identical(current, self);
        let mut actions = Vec::new();
        if mask & (DIFF_TYPE | DIFF_LENGTH) != 0 {
            let clause = self.type_clause();
            actions.push(format!(
                "ALTER COLUMN {} TYPE {} USING {}::{}",
                name, clause, name, clause
            ));
        }
        if mask & DIFF_NULLABLE != 0 {
            actions.push(if self.spec.nullable {
                format!("ALTER COLUMN {} DROP NOT NULL", name)
            } else {
                format!("ALTER COLUMN {} SET NOT NULL", name)
            });
        }
        if mask & DIFF_DEFAULT != 0 {
            actions.push(match &self.spec.default {
                Some(default) => format!("ALTER COLUMN {} SET DEFAULT {}", name, render_default(default)),
                None => format!("ALTER COLUMN {} DROP DEFAULT", name),
            });
        }
        if !actions.is_empty() {
            statements.push(format!("{} {}", alter_table(table), actions.join(", ")));
        }

        if current.spec().comment != self.spec.comment {
            statements.push(column_comment_statement(
                table,
                &self.spec.new_name,
                &self.spec.comment,
            ));
        }

        statements
    }
}

/// PostgreSQLのインデックス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresIndex {
    spec: IndexSpec,
}

impl PostgresIndex {
    pub fn new(mut spec: IndexSpec) -> Self {
        spec.name = spec.name.to_lowercase();
        spec.columns = spec.columns.iter().map(|c| c.to_lowercase()).collect();
        Self { spec }
    }
}

impl IndexManagement for PostgresIndex {
    fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    fn add_statements(&self, table: &str) -> Vec<String> {
        if self.spec.columns.is_empty() {
            return Vec::new();
        }
        vec![format!(
            "CREATE {}INDEX {} ON {} ({})",
            if self.spec.unique { "UNIQUE " } else { "" },
            ident(&self.spec.name),
            ident(table),
            quote_columns_postgres(&self.spec.columns)
        )]
    }

    fn drop_statements(&self, _table: &str) -> Vec<String> {
        vec![format!("DROP INDEX {}", ident(&self.spec.name))]
    }
}

/// PostgreSQLの外部キー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresForeignKey {
    spec: ForeignKeySpec,
}

impl PostgresForeignKey {
    pub fn new(mut spec: ForeignKeySpec) -> Self {
        spec.name = spec.name.to_lowercase();
        spec.table = spec.table.to_lowercase();
        spec.column = spec.column.to_lowercase();
        spec.target_table = spec.target_table.to_lowercase();
        spec.target_column = spec.target_column.to_lowercase();
        Self { spec }
    }
}

impl ForeignKeyManagement for PostgresForeignKey {
    fn spec(&self) -> &ForeignKeySpec {
        &self.spec
    }

    fn constraint_definition(&self) -> String {
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            ident(&self.spec.name),
            ident(&self.spec.column),
            ident(&self.spec.target_table),
            ident(&self.spec.target_column)
        )
    }

    fn add_statements(&self, table: &str) -> Vec<String> {
        vec![format!("{} ADD {}", alter_table(table), self.constraint_definition())]
    }

    fn drop_statements(&self, table: &str) -> Vec<String> {
        vec![format!(
            "{} DROP CONSTRAINT {}",
            alter_table(table),
            ident(&self.spec.name)
        )]
    }
}

/// PostgreSQLのテーブル
#[derive(Debug)]
pub struct PostgresTable {
    name: String,
    comment: String,
    columns: Vec<Box<dyn ColumnManagement>>,
    indices: Vec<Box<dyn IndexManagement>>,
    foreign_keys: Vec<Box<dyn ForeignKeyManagement>>,
}

impl PostgresTable {
    /// 宣言テーブルから作成
    ///
    /// 照合順序はカラムに明示されたものだけを使用します。
    pub fn from_model(table: &Table) -> Self {
        let columns = table
            .columns()
            .map(|c| Box::new(PostgresColumn::new(ColumnSpec::from_model(c))) as Box<dyn ColumnManagement>)
            .collect();
        let indices = table
            .indices()
            .map(|i| Box::new(PostgresIndex::new(IndexSpec::from_model(i))) as Box<dyn IndexManagement>)
            .collect();
        let foreign_keys = table
            .foreign_keys()
            .map(|fk| {
                Box::new(PostgresForeignKey::new(ForeignKeySpec::from_model(fk)))
                    as Box<dyn ForeignKeyManagement>
            })
            .collect();

        Self {
            name: table.name().to_lowercase(),
            comment: table.comment().to_string(),
            columns,
            indices,
            foreign_keys,
        }
    }

    fn alter(&self) -> String {
        alter_table(&self.name)
    }

    fn add_primary_key_statement(&self) -> Option<String> {
        let columns = self.primary_key_columns();
        if columns.is_empty() {
            None
        } else {
            Some(format!(
                "{} ADD PRIMARY KEY ({})",
                self.alter(),
                quote_columns_postgres(&columns)
            ))
        }
    }

    fn drop_constraint_statement(&self, constraint: &str) -> String {
        format!("{} DROP CONSTRAINT {}", self.alter(), quote_identifier_postgres(constraint))
    }

    /// identity を手放すカラムのDDL
    fn release_statements(
        &self,
        released: &dyn ColumnManagement,
        retained: Option<&dyn ColumnManagement>,
    ) -> Vec<String> {
        match retained {
            Some(column) => {
                let mut statements = vec![format!(
                    "{} ALTER COLUMN {} DROP IDENTITY",
                    self.alter(),
                    ident(released.name())
                )];
                statements.extend(column.update_statements(&self.name, released));
                statements
            }
            None => released.drop_statements(&self.name),
        }
    }

    /// 既存カラムを identity 化するDDL
    /// 主キー所属が変わるカラムの更新
    fn member_statements(&self, members: &[PrimaryKeyMember<'_>]) -> Vec<String> {
        members
            .iter()
            .flat_map(|m| m.target.update_statements(&self.name, m.current))
            .collect()
    }

    fn acquire_statements(
        &self,
        current: &dyn ColumnManagement,
        target: &dyn ColumnManagement,
    ) -> Vec<String> {
        let mut statements = target.update_statements(&self.name, current);
        statements.push(format!(
            "{} ALTER COLUMN {} ADD GENERATED ALWAYS AS IDENTITY",
            self.alter(),
            ident(target.new_name())
        ));
        statements
    }
}

impl TableManagement for PostgresTable {
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

    fn primary_key_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.is_primary())
            .map(|c| c.new_name().to_string())
            .collect()
    }

    fn create_statements(&self) -> Vec<String> {
        if self.columns.is_empty() {
            return Vec::new();
        }

        let mut items: Vec<String> = self.columns.iter().map(|c| c.definition()).collect();
        let primary_key = self.primary_key_columns();
        if !primary_key.is_empty() {
            items.push(format!("PRIMARY KEY ({})", quote_columns_postgres(&primary_key)));
        }
        for foreign_key in &self.foreign_keys {
            items.push(foreign_key.constraint_definition());
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} (\n{}\n)",
            ident(&self.name),
            items.join(",\n")
        )];
        for index in &self.indices {
            statements.extend(index.add_statements(&self.name));
        }
        if !self.comment.is_empty() {
            statements.extend(self.comment_statements());
        }
        for column in self.columns.iter().filter(|c| !c.spec().comment.is_empty()) {
            statements.push(column_comment_statement(
                &self.name,
                column.new_name(),
                &column.spec().comment,
            ));
        }
        statements
    }

    fn comment_statements(&self) -> Vec<String> {
        let value = if self.comment.is_empty() {
            "NULL".to_string()
        } else {
            quote_literal(&self.comment)
        };
        vec![format!("COMMENT ON TABLE {} IS {}", ident(&self.name), value)]
    }

    fn primary_key_statements(
        &self,
        current_name: &str,
        members: &[PrimaryKeyMember<'_>],
    ) -> Vec<String> {
        let mut statements = Vec::new();
        if !current_name.is_empty() {
            statements.push(self.drop_constraint_statement(current_name));
        }
        statements.extend(self.member_statements(members));
        statements.extend(self.add_primary_key_statement());
        statements
    }

    fn identity_transition_statements(
        &self,
        current_pk_name: &str,
        transition: &IdentityTransition<'_>,
        members: &[PrimaryKeyMember<'_>],
    ) -> Vec<String> {
        let mut statements = Vec::new();
        if !current_pk_name.is_empty() {
            statements.push(self.drop_constraint_statement(current_pk_name));
        }
        statements.extend(self.member_statements(members));

        match *transition {
            IdentityTransition::AddColumn { target } => {
                statements.extend(target.add_statements(&self.name));
            }
            IdentityTransition::Convert { current, target } => {
                statements.extend(self.acquire_statements(current, target));
            }
            IdentityTransition::Remove { released, retained } => {
                statements.extend(self.release_statements(released, retained));
            }
            IdentityTransition::Rename { current, target } => {
                statements.extend(target.update_statements(&self.name, current));
            }
            IdentityTransition::Move {
                released,
                retained,
                current,
                target,
            } => {
                statements.extend(self.release_statements(released, retained));
                statements.extend(self.acquire_statements(current, target));
            }
            IdentityTransition::Replace {
                released,
                retained,
                target,
            } => {
                statements.extend(self.release_statements(released, retained));
                statements.extend(target.add_statements(&self.name));
            }
        }

        statements.extend(self.add_primary_key_statement());
        statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::default_value::{normalize_default, DefaultValue};
    use crate::core::schema::{Column, ForeignKey, Index};

    fn column(model: Column) -> PostgresColumn {
        PostgresColumn::new(ColumnSpec::from_model(&model))
    }

    // ======================================
    // 型変換
    // ======================================

    #[test]
    fn test_map_type_covers_every_type() {
        for column_type in ColumnType::ALL {
            let (mapped, _) = map_type(column_type, None);
            assert_eq!(map_type(mapped, None).0, mapped, "{}", column_type);
            assert_eq!(type_keyword(column_type), type_keyword(mapped));
            // 変換後の型はイントロスペクションで読み戻せる
            assert_eq!(vendor_type(type_keyword(mapped)), Some(mapped), "{}", column_type);
        }
    }

    #[test]
    fn test_map_type_lengths() {
        assert_eq!(map_type(ColumnType::Int, Some(ColumnLength::Size(11))), (ColumnType::Integer, None));
        assert_eq!(
            map_type(ColumnType::Varchar, Some(ColumnLength::Size(64))),
            (ColumnType::Varchar, Some(ColumnLength::Size(64)))
        );
        assert_eq!(map_type(ColumnType::Varchar, Some(ColumnLength::Max)), (ColumnType::Text, None));
        assert_eq!(map_type(ColumnType::Blob, None), (ColumnType::Bytea, None));
        assert_eq!(
            map_type(ColumnType::Decimal, Some(ColumnLength::Precision(10, 2))),
            (ColumnType::Decimal, Some(ColumnLength::Precision(10, 2)))
        );
    }

    #[test]
    fn test_vendor_type_time_zones_are_unknown() {
        assert_eq!(vendor_type("time without time zone"), Some(ColumnType::Time));
        assert_eq!(vendor_type("timestamp without time zone"), Some(ColumnType::Timestamp));
        assert_eq!(vendor_type("timestamp with time zone"), None);
        assert_eq!(vendor_type("jsonb"), None);
    }

    // ======================================
    // カラム
    // ======================================

    #[test]
    fn test_column_definition() {
        let name = column(
            Column::new("Name", ColumnType::Varchar)
                .with_length(ColumnLength::Size(64))
                .nullable(false),
        );
        let id = column(Column::new("ID", ColumnType::Int).primary().identity());
        let flag = column(Column::new("flag", ColumnType::Bit));

        assert_eq!(name.definition(), r#""name" varchar(64) NOT NULL DEFAULT ''"#);
        assert_eq!(id.definition(), r#""id" integer GENERATED ALWAYS AS IDENTITY NOT NULL"#);
        assert_eq!(flag.spec().default, Some(DefaultValue::Bool(false)));
        assert_eq!(flag.definition(), r#""flag" boolean NOT NULL DEFAULT FALSE"#);
    }

    #[test]
    fn test_string_default_survives_catalog_round_trip() {
        let cases = [
            ("'::1'", "'::1'::character varying", "DEFAULT '::1'"),
            ("' '", "' '::character varying", "DEFAULT ' '"),
            ("'NULL'", "'NULL'::character varying", "DEFAULT 'NULL'"),
            ("'''a'''", "'''a'''::character varying", "DEFAULT '''a'''"),
        ];
        for (declared, reported, expected) in cases {
            let target = column(Column::new("addr", ColumnType::Varchar).with_default(declared));
            assert!(target.definition().ends_with(expected), "{}", target.definition());

            let mut spec = ColumnSpec::introspected("addr", ColumnType::Varchar);
            spec.default = normalize_default(reported, ColumnType::Varchar);
            let live = PostgresColumn::new(spec);
            assert_eq!(live.spec().default, target.spec().default, "{reported}");
        }
    }

    #[test]
    fn test_update_statements_only_touch_changed_attributes() {
        let current = column(Column::new("title", ColumnType::Varchar).with_length(ColumnLength::Size(32)));
        let target = column(
            Column::new("title", ColumnType::Varchar)
                .with_length(ColumnLength::Size(64))
                .rename_to("headline"),
        );

        assert_eq!(
            target.update_statements("Posts", &current),
            vec![
                r#"ALTER TABLE "posts" RENAME COLUMN "title" TO "headline""#,
                r#"ALTER TABLE "posts" ALTER COLUMN "headline" TYPE varchar(64) USING "headline"::varchar(64)"#,
            ]
        );
    }

    #[test]
    fn test_update_statements_nullability_and_default() {
        let current = column(Column::new("name", ColumnType::Varchar));
        let target = column(Column::new("name", ColumnType::Varchar).nullable(false));

        assert_eq!(
            target.update_statements("widgets", &current),
            vec![
                r#"ALTER TABLE "widgets" ALTER COLUMN "name" SET NOT NULL, ALTER COLUMN "name" SET DEFAULT ''"#
            ]
        );
    }

    // ======================================
    // テーブル
    // ======================================

    fn widgets() -> Table {
        let name = Column::new("name", ColumnType::Varchar)
            .with_length(ColumnLength::Size(64))
            .nullable(false)
            .with_comment("display name");
        let index = Index::on_columns("idx_name", &[&name]);
        Table::new("Widgets")
            .column(Column::new("id", ColumnType::Int).primary().identity())
            .column(name)
            .column(Column::new("owner_id", ColumnType::Int))
            .index(index)
            .foreign_key(ForeignKey::new("owner_id", "owners", "id"))
            .with_comment("things")
    }

    #[test]
    fn test_create_table_statements() {
        let statements = PostgresTable::from_model(&widgets()).create_statements();

        assert_eq!(statements.len(), 4);
        assert!(statements[0].starts_with("CREATE TABLE \"widgets\" (\n\"id\" integer GENERATED ALWAYS AS IDENTITY NOT NULL,"));
        assert!(statements[0].contains(r#"PRIMARY KEY ("id")"#));
        assert!(statements[0].contains(
            r#"CONSTRAINT "fk_widgets_owner_id" FOREIGN KEY ("owner_id") REFERENCES "owners" ("id")"#
        ));
        assert_eq!(statements[1], r#"CREATE INDEX "idx_name" ON "widgets" ("name")"#);
        assert_eq!(statements[2], r#"COMMENT ON TABLE "widgets" IS 'things'"#);
        assert_eq!(statements[3], r#"COMMENT ON COLUMN "widgets"."name" IS 'display name'"#);
    }

    #[test]
    fn test_primary_key_statements() {
        let table = PostgresTable::from_model(&widgets());

        assert_eq!(
            table.primary_key_statements("widgets_pkey", &[]),
            vec![
                r#"ALTER TABLE "widgets" DROP CONSTRAINT "widgets_pkey""#,
                r#"ALTER TABLE "widgets" ADD PRIMARY KEY ("id")"#,
            ]
        );
    }

    #[test]
    fn test_primary_key_statements_update_members_between_drop_and_add() {
        let target = PostgresTable::from_model(
            &Table::new("lines")
                .column(Column::new("order_id", ColumnType::Int).primary())
                .column(
                    Column::new("code", ColumnType::Varchar)
                        .with_length(ColumnLength::Size(32))
                        .nullable(false)
                        .primary(),
                ),
        );
        let current = column(Column::new("code", ColumnType::Varchar).with_length(ColumnLength::Size(16)));
        let members = [PrimaryKeyMember {
            current: &current,
            target: target.columns()[1].as_ref(),
        }];

        assert_eq!(
            target.primary_key_statements("lines_pkey", &members),
            vec![
                r#"ALTER TABLE "lines" DROP CONSTRAINT "lines_pkey""#,
                r#"ALTER TABLE "lines" ALTER COLUMN "code" TYPE varchar(32) USING "code"::varchar(32), ALTER COLUMN "code" SET NOT NULL, ALTER COLUMN "code" SET DEFAULT ''"#,
                r#"ALTER TABLE "lines" ADD PRIMARY KEY ("order_id", "code")"#,
            ]
        );
    }

    #[test]
    fn test_identity_convert_statements() {
        let target = PostgresTable::from_model(
            &Table::new("jobs").column(Column::new("id", ColumnType::Int).primary().identity()),
        );
        let current = column(Column::new("id", ColumnType::Int));
        let id = target.columns()[0].as_ref();

        let statements = target.identity_transition_statements(
            "",
            &IdentityTransition::Convert {
                current: &current,
                target: id,
            },
            &[],
        );

        assert_eq!(
            statements,
            vec![
                r#"ALTER TABLE "jobs" ALTER COLUMN "id" DROP DEFAULT"#,
                r#"ALTER TABLE "jobs" ALTER COLUMN "id" ADD GENERATED ALWAYS AS IDENTITY"#,
                r#"ALTER TABLE "jobs" ADD PRIMARY KEY ("id")"#,
            ]
        );
    }

    #[test]
    fn test_identity_remove_drops_column() {
        let target = PostgresTable::from_model(
            &Table::new("jobs").column(
                Column::new("code", ColumnType::Varchar)
                    .with_length(ColumnLength::Size(16))
                    .nullable(false)
                    .primary(),
            ),
        );
        let released = column(Column::new("id", ColumnType::Int).primary().identity());

        let statements = target.identity_transition_statements(
            "jobs_pkey",
            &IdentityTransition::Remove {
                released: &released,
                retained: None,
            },
            &[],
        );

        assert_eq!(
            statements,
            vec![
                r#"ALTER TABLE "jobs" DROP CONSTRAINT "jobs_pkey""#,
                r#"ALTER TABLE "jobs" DROP COLUMN "id""#,
                r#"ALTER TABLE "jobs" ADD PRIMARY KEY ("code")"#,
            ]
        );
    }

    #[test]
    fn test_index_statements() {
        let index = PostgresIndex::new(IndexSpec {
            name: "IDX_Name".to_string(),
            columns: vec!["Name".to_string()],
            index_type: String::new(),
            unique: true,
        });

        assert_eq!(
            index.add_statements("widgets"),
            vec![r#"CREATE UNIQUE INDEX "idx_name" ON "widgets" ("name")"#]
        );
        assert_eq!(index.drop_statements("widgets"), vec![r#"DROP INDEX "idx_name""#]);
    }
}
