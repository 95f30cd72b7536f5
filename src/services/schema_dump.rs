// スキーマダンプ
//
// イントロスペクションしたテーブルを、YamlSchemaSource が読み込める
// 宣言文書へ変換する純粋関数です。暗黙値と既定のNULL許可は出力しません。

use crate::core::schema::{default_foreign_key_name, Column, Table};
use crate::services::dto::{
    ColumnDto, ForeignKeyDto, IndexDto, Scalar, SchemaDocumentDto, StepDto, TableDto, VersionDto,
};
use anyhow::{Context, Result};

/// ダンプ文書のバージョンラベル
pub const DUMP_VERSION: &str = "1.0.0";

fn column_dto(column: &Column) -> ColumnDto {
    let column_type = column.column_type();

    // 型から推定される値と同じなら省略
    let nullable = if column.is_nullable() == !column_type.is_numeric() {
        None
    } else {
        Some(column.is_nullable())
    };

    let implicit = !column.is_nullable() && !column.is_identity();
    let default = column.explicit_default().and_then(|value| {
        if implicit && value.is_implicit_for(column_type) {
            None
        } else {
            Some(Scalar(value.declared()))
        }
    });

    ColumnDto {
        name: column.new_name().to_string(),
        column_type: column_type.as_str().to_string(),
        length: column.length().map(|l| Scalar(l.to_string())),
        nullable,
        primary: column.is_primary(),
        identity: column.is_identity(),
        default,
        rename_to: None,
        comment: Some(column.comment().to_string()).filter(|c| !c.is_empty()),
        collate: column.collate().map(str::to_string),
    }
}

/// テーブルを宣言DTOへ変換
pub fn table_dto(table: &Table) -> TableDto {
    let indices = table
        .indices()
        .map(|index| IndexDto {
            name: index.name().to_string(),
            columns: index.columns().to_vec(),
            unique: index.is_unique(),
            index_type: Some(index.index_type().to_string())
                .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("unique")),
        })
        .collect();

    let foreign_keys = table
        .foreign_keys()
        .map(|foreign_key| {
            let name = foreign_key.constraint_name();
            let implied = default_foreign_key_name(table.name(), foreign_key.source_column());
            ForeignKeyDto {
                column: foreign_key.source_column().to_string(),
                target_table: foreign_key.target_table().to_string(),
                target_column: foreign_key.target_column().to_string(),
                name: if name == implied { None } else { Some(name) },
            }
        })
        .collect();

    TableDto {
        name: table.name().to_string(),
        comment: Some(table.comment().to_string()).filter(|c| !c.is_empty()),
        collate: table.collate().map(str::to_string),
        charset: table.charset().map(str::to_string),
        columns: table.columns().map(column_dto).collect(),
        indices,
        foreign_keys,
    }
}

/// テーブル群を宣言文書へ変換
///
/// テーブルは名前順に1つのバージョンへまとめます。
pub fn dump_document(tables: &[Table]) -> SchemaDocumentDto {
    let mut sorted: Vec<&Table> = tables.iter().collect();
    sorted.sort_by(|a, b| a.name().cmp(b.name()));

    SchemaDocumentDto {
        versions: vec![VersionDto {
            version: DUMP_VERSION.to_string(),
            steps: sorted
                .into_iter()
                .map(|table| StepDto {
                    table: Some(table_dto(table)),
                    statement: None,
                })
                .collect(),
        }],
    }
}

/// テーブル群をYAMLテキストへ変換
pub fn dump_schema(tables: &[Table]) -> Result<String> {
    serde_saphyr::to_string(&dump_document(tables)).with_context(|| "Failed to serialize schema")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::column_type::{ColumnLength, ColumnType};
    use crate::core::schema::{ForeignKey, Index, SchemaSource, State, Step};
    use crate::services::schema_loader::YamlSchemaSource;

    fn widgets() -> Table {
        Table::new("widgets")
            .column(Column::new("id", ColumnType::Int).primary().identity())
            .column(
                Column::new("name", ColumnType::Varchar)
                    .with_length(ColumnLength::Size(64))
                    .nullable(false),
            )
            .column(Column::new("note", ColumnType::Text).with_comment("free text"))
            .index(Index::new("idx_name", ["name"]).unique(true))
            .foreign_key(ForeignKey::new("id", "parts", "id"))
    }

    #[test]
    fn test_column_omits_implicit_values() {
        let dto = table_dto(&widgets());

        let name = &dto.columns[1];
        assert_eq!(name.nullable, Some(false));
        assert_eq!(name.default, None);
        assert_eq!(name.length, Some(Scalar::from("64")));

        let id = &dto.columns[0];
        assert_eq!(id.nullable, None);
        assert!(id.identity);

        assert_eq!(dto.columns[2].comment.as_deref(), Some("free text"));
    }

    #[test]
    fn test_default_foreign_key_name_is_omitted() {
        let dto = table_dto(&widgets());
        assert_eq!(dto.foreign_keys[0].name, None);

        let named = Table::new("a").foreign_key(ForeignKey::new("b", "c", "d").with_name("custom"));
        assert_eq!(table_dto(&named).foreign_keys[0].name.as_deref(), Some("custom"));
    }

    #[test]
    fn test_string_defaults_are_written_quoted() {
        let table = Table::new("hosts")
            .column(Column::new("addr", ColumnType::Varchar).with_default("'::1'"))
            .column(Column::new("label", ColumnType::Varchar).with_default("'NULL'"));
        let dto = table_dto(&table);
        assert_eq!(dto.columns[0].default, Some(Scalar::from("'::1'")));

        let yaml = dump_schema(&[table.clone()]).unwrap();
        let source: YamlSchemaSource = yaml.parse().unwrap();
        let mut state = State::new();
        source.populate(&mut state, DUMP_VERSION).unwrap();
        let Step::Table(loaded) = &state.steps(DUMP_VERSION)[0] else {
            panic!("expected a table step");
        };
        assert_eq!(loaded, &table);
    }

    #[test]
    fn test_tables_are_sorted() {
        let document = dump_document(&[Table::new("zeta"), Table::new("alpha")]);
        let names: Vec<&str> = document.versions[0]
            .steps
            .iter()
            .map(|s| s.table.as_ref().unwrap().name.as_str())
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_dump_is_loadable() {
        let yaml = dump_schema(&[widgets()]).unwrap();
        let source: YamlSchemaSource = yaml.parse().unwrap();

        let mut state = State::new();
        source.populate(&mut state, DUMP_VERSION).unwrap();
        let Step::Table(table) = &state.steps(DUMP_VERSION)[0] else {
            panic!("expected a table step");
        };
        assert_eq!(table, &widgets());
    }
}
