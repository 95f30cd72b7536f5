// スキーマモデル
//
// 方言に依存しない目標スキーマの宣言モデル（Table, Column, Index, ForeignKey,
// Statement）と、バージョン単位でステップを保持する State を定義します。
// モデルは宣言時に構築され、以降は変更されません。

use crate::core::column_type::{ColumnLength, ColumnType};
use crate::core::default_value::{normalize_default, DefaultValue};
use crate::core::error::DeclarationError;
use indexmap::IndexMap;
use md5::{Digest, Md5};

/// カラム定義
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    rename_to: Option<String>,
    column_type: ColumnType,
    length: Option<ColumnLength>,
    nullable: bool,
    primary: bool,
    identity: bool,
    default: Option<DefaultValue>,
    comment: String,
    collate: Option<String>,
}

impl Column {
    /// 新しいカラムを作成
    ///
    /// NULL許可は型から推定します（数値型は NOT NULL、それ以外は NULL 許可）。
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            rename_to: None,
            column_type,
            length: None,
            nullable: !column_type.is_numeric(),
            primary: false,
            identity: false,
            default: None,
            comment: String::new(),
            collate: None,
        }
    }

    /// 型名の文字列からカラムを作成
    pub fn declare(name: impl Into<String>, type_name: &str) -> Result<Self, DeclarationError> {
        let name = name.into();
        let column_type = type_name.parse::<ColumnType>().map_err(|_| {
            DeclarationError::UnknownColumnType {
                type_name: type_name.to_string(),
                column: Some(name.clone()),
            }
        })?;
        Ok(Self::new(name, column_type))
    }

    /// 長さ・精度を設定
    pub fn with_length(mut self, length: ColumnLength) -> Self {
        self.length = Some(length);
        self
    }

    /// NULL許可を明示的に設定
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// 主キーに含める
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// identity（自動採番）カラムにする
    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    /// デフォルト値を設定（型に従って正規化）
    pub fn with_default(mut self, raw: &str) -> Self {
        self.default = normalize_default(raw, self.column_type);
        self
    }

    /// 正規化済みのデフォルト値を設定
    pub fn with_default_value(mut self, default: Option<DefaultValue>) -> Self {
        self.default = default;
        self
    }

    /// コメントを設定
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// 照合順序を上書き
    pub fn with_collate(mut self, collate: impl Into<String>) -> Self {
        self.collate = Some(collate.into());
        self
    }

    /// 名前変更先を設定
    pub fn rename_to(mut self, new_name: impl Into<String>) -> Self {
        let new_name = new_name.into();
        self.rename_to = if new_name.is_empty() || new_name == self.name {
            None
        } else {
            Some(new_name)
        };
        self
    }

    /// 宣言上の（現行の）カラム名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 実効のカラム名（名前変更先があればそれ）
    pub fn new_name(&self) -> &str {
        self.rename_to.as_deref().unwrap_or(&self.name)
    }

    /// 名前変更先
    pub fn rename_target(&self) -> Option<&str> {
        self.rename_to.as_deref()
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn length(&self) -> Option<&ColumnLength> {
        self.length.as_ref()
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// 明示的に宣言されたデフォルト値
    pub fn explicit_default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    /// 実効のデフォルト値
    ///
    /// NOT NULL かつ identity でないカラムに明示的なデフォルトが無い場合は
    /// 暗黙の値（数値は 0、文字列は空文字）を返します。
    pub fn default_value(&self) -> Option<DefaultValue> {
        match &self.default {
            Some(value) => Some(value.clone()),
            None if !self.nullable && !self.identity => {
                DefaultValue::implicit_for(self.column_type)
            }
            None => None,
        }
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn collate(&self) -> Option<&str> {
        self.collate.as_deref()
    }
}

/// インデックス定義
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    name: String,
    columns: Vec<String>,
    index_type: String,
    unique: bool,
}

impl Index {
    /// 新しいインデックスを作成
    ///
    /// カラムの並び順は比較対象に含まれます。
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            index_type: String::new(),
            unique: false,
        }
    }

    /// カラム定義からインデックスを作成（実効名を使用）
    pub fn on_columns(name: impl Into<String>, columns: &[&Column]) -> Self {
        Self::new(name, columns.iter().map(|c| c.new_name().to_string()))
    }

    /// ユニーク制約を設定
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// エンジン固有のインデックス種別を設定
    ///
    /// "unique" はユニーク制約として扱います。
    pub fn with_type(mut self, index_type: impl Into<String>) -> Self {
        let index_type = index_type.into();
        if index_type.eq_ignore_ascii_case("unique") {
            self.unique = true;
        }
        self.index_type = index_type;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index_type(&self) -> &str {
        &self.index_type
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }
}

/// 外部キー定義
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    column: String,
    source_table: String,
    target_table: String,
    target_column: String,
    name: Option<String>,
}

impl ForeignKey {
    /// 新しい外部キーを作成
    pub fn new(
        column: impl Into<String>,
        target_table: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            source_table: String::new(),
            target_table: target_table.into(),
            target_column: target_column.into(),
            name: None,
        }
    }

    /// 制約名を明示的に設定
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = if name.is_empty() { None } else { Some(name) };
        self
    }

    pub fn source_column(&self) -> &str {
        &self.column
    }

    pub fn source_table(&self) -> &str {
        &self.source_table
    }

    pub fn target_table(&self) -> &str {
        &self.target_table
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// 制約名（未指定時は fk_<table>_<column>）
    pub fn constraint_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| default_foreign_key_name(&self.source_table, &self.column))
    }
}

/// 外部キー制約の既定名
pub fn default_foreign_key_name(table: &str, column: &str) -> String {
    format!("fk_{}_{}", table, column)
}

/// テーブル定義
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: IndexMap<String, Column>,
    indices: IndexMap<String, Index>,
    foreign_keys: IndexMap<String, ForeignKey>,
    comment: String,
    collate: Option<String>,
    charset: Option<String>,
}

impl Table {
    /// 新しいテーブルを作成
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            indices: IndexMap::new(),
            foreign_keys: IndexMap::new(),
            comment: String::new(),
            collate: None,
            charset: None,
        }
    }

    /// カラムを追加（同名のカラムは置き換え）
    pub fn column(mut self, column: Column) -> Self {
        self.columns.insert(column.name().to_string(), column);
        self
    }

    /// インデックスを追加
    pub fn index(mut self, index: Index) -> Self {
        self.indices.insert(index.name().to_string(), index);
        self
    }

    /// 外部キーを追加（ソースカラム単位）
    pub fn foreign_key(mut self, mut foreign_key: ForeignKey) -> Self {
        foreign_key.source_table = self.name.clone();
        self.foreign_keys
            .insert(foreign_key.source_column().to_string(), foreign_key);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_collate(mut self, collate: impl Into<String>) -> Self {
        self.collate = Some(collate.into());
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn indices(&self) -> impl Iterator<Item = &Index> {
        self.indices.values()
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKey> {
        self.foreign_keys.values()
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn collate(&self) -> Option<&str> {
        self.collate.as_deref()
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }
}

/// 任意のSQLステートメント
///
/// テーブルDDL以外の一度きりのマイグレーションです。
/// 内容のハッシュが台帳上の識別子になります。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }

    /// ステートメントの識別子（MD5の16進表記）
    pub fn name(&self) -> String {
        let digest = Md5::digest(self.sql.as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql)
    }
}

/// バージョン内の1ステップ
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Table(Table),
    Statement(Statement),
}

/// 宣言ステートのバッファ
///
/// 同時に保持するのは1バージョン分のステップのみです。
/// アクティブなバージョンを切り替えるとバッファはクリアされます。
#[derive(Debug, Clone, Default)]
pub struct State {
    version: Option<String>,
    steps: Vec<Step>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// アクティブなバージョンを設定（バッファをクリア）
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = Some(version.into());
        self.steps.clear();
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// テーブルステップを追加
    pub fn add_table(&mut self, table: Table) {
        self.steps.push(Step::Table(table));
    }

    /// ステートメントステップを追加
    pub fn add_statement(&mut self, statement: Statement) {
        self.steps.push(Step::Statement(statement));
    }

    /// 指定バージョンのステップを宣言順に取得
    ///
    /// アクティブでないバージョンの場合は空を返します。
    pub fn steps(&self, version: &str) -> &[Step] {
        match &self.version {
            Some(active) if active == version => &self.steps,
            _ => &[],
        }
    }
}

/// バージョン付きスキーマ宣言の提供元
///
/// フレームワークスキーマとアプリケーションスキーマの両方が実装する
/// 2メソッドの契約です。
pub trait SchemaSource {
    /// 宣言済みバージョンの一覧
    fn versions(&self) -> Vec<String>;

    /// 指定バージョンのステップを State に追加
    fn populate(&self, state: &mut State, version: &str) -> Result<(), DeclarationError>;
}
