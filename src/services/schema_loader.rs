// アプリケーションスキーマの読み込み
//
// YAMLのスキーマ宣言文書を読み込み、バージョンごとのステップを
// スキーマモデルとして State に展開します。

use crate::core::column_type::ColumnLength;
use crate::core::error::{DeclarationError, IoError};
use crate::core::schema::{Column, ForeignKey, Index, SchemaSource, State, Statement, Table};
use crate::core::version::{parse_version, sort_versions};
use crate::services::dto::{ColumnDto, SchemaDocumentDto, StepDto, TableDto};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// YAMLファイルによるアプリケーションスキーマ
#[derive(Debug, Clone, Default)]
pub struct YamlSchemaSource {
    document: SchemaDocumentDto,
}

impl YamlSchemaSource {
    /// 宣言文書から作成
    ///
    /// バージョンラベルの妥当性と重複、ステップの形式を検証します。
    pub fn new(document: SchemaDocumentDto) -> Result<Self, DeclarationError> {
        let mut seen = HashSet::new();
        for version in &document.versions {
            parse_version(&version.version)?;
            if !seen.insert(version.version.clone()) {
                return Err(DeclarationError::Document {
                    message: format!("version '{}' is declared twice", version.version),
                });
            }
            for step in &version.steps {
                if step.table.is_some() == step.statement.is_some() {
                    return Err(DeclarationError::Document {
                        message: format!(
                            "each step of version '{}' needs exactly one of 'table' or 'statement'",
                            version.version
                        ),
                    });
                }
            }
        }
        Ok(Self { document })
    }

    /// スキーマファイルを読み込む
    ///
    /// # Errors
    ///
    /// - ファイルが存在しない、または読み込めない場合
    /// - YAMLの解析や宣言の検証に失敗した場合
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IoError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = fs::read_to_string(path).map_err(|e| IoError::FileRead {
            path: path.display().to_string(),
            cause: e.to_string(),
        })?;

        content
            .parse::<Self>()
            .with_context(|| format!("Failed to load schema file: {:?}", path))
    }

    /// 空のスキーマ（アプリケーションスキーマを持たない場合）
    pub fn empty() -> Self {
        Self::default()
    }
}

impl FromStr for YamlSchemaSource {
    type Err = DeclarationError;

    fn from_str(yaml: &str) -> Result<Self, Self::Err> {
        let document: SchemaDocumentDto =
            serde_saphyr::from_str(yaml).map_err(|e| DeclarationError::Document {
                message: e.to_string(),
            })?;
        Self::new(document)
    }
}

impl SchemaSource for YamlSchemaSource {
    fn versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = self
            .document
            .versions
            .iter()
            .map(|v| v.version.clone())
            .collect();
        // ラベルは new() で検証済み
        if sort_versions(&mut versions).is_err() {
            versions.sort();
        }
        versions
    }

    fn populate(&self, state: &mut State, version: &str) -> Result<(), DeclarationError> {
        state.set_version(version);
        let Some(declared) = self.document.versions.iter().find(|v| v.version == version) else {
            return Ok(());
        };

        for step in &declared.steps {
            match step {
                StepDto {
                    table: Some(table), ..
                } => state.add_table(to_table(table)?),
                StepDto {
                    statement: Some(sql),
                    ..
                } => state.add_statement(Statement::new(sql.clone())),
                _ => {}
            }
        }
        Ok(())
    }
}

/// テーブル宣言をモデルへ変換
pub fn to_table(dto: &TableDto) -> Result<Table, DeclarationError> {
    let mut table = Table::new(&dto.name);
    if let Some(comment) = &dto.comment {
        table = table.with_comment(comment);
    }
    if let Some(collate) = &dto.collate {
        table = table.with_collate(collate);
    }
    if let Some(charset) = &dto.charset {
        table = table.with_charset(charset);
    }

    for column in &dto.columns {
        table = table.column(to_column(column)?);
    }

    for index in &dto.indices {
        let mut model = Index::new(&index.name, index.columns.iter().cloned()).unique(index.unique);
        if let Some(index_type) = &index.index_type {
            model = model.with_type(index_type);
        }
        table = table.index(model);
    }

    for foreign_key in &dto.foreign_keys {
        let mut model = ForeignKey::new(
            &foreign_key.column,
            &foreign_key.target_table,
            &foreign_key.target_column,
        );
        if let Some(name) = &foreign_key.name {
            model = model.with_name(name);
        }
        table = table.foreign_key(model);
    }

    Ok(table)
}

fn to_column(dto: &ColumnDto) -> Result<Column, DeclarationError> {
    let mut column = Column::declare(&dto.name, &dto.column_type)?;
    if let Some(length) = &dto.length {
        column = column.with_length(length.as_str().parse::<ColumnLength>()?);
    }
    if let Some(nullable) = dto.nullable {
        column = column.nullable(nullable);
    }
    if dto.primary {
        column = column.primary();
    }
    if dto.identity {
        column = column.identity();
    }
    if let Some(default) = &dto.default {
        column = column.with_default(default.as_str());
    }
    if let Some(rename_to) = &dto.rename_to {
        column = column.rename_to(rename_to);
    }
    if let Some(comment) = &dto.comment {
        column = column.with_comment(comment);
    }
    if let Some(collate) = &dto.collate {
        column = column.with_collate(collate);
    }
    Ok(column)
}
