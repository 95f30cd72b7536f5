// 方言抽象化レイヤー
//
// 方言非依存のスキーマモデルを、各データベース方言のカラム・インデックス・
// 外部キー・テーブル管理オブジェクトへ変換します。
// 差分比較のビットマスクと identity 遷移の表現もここで定義します。

pub mod mysql;
pub mod postgres;

use crate::core::column_type::{ColumnLength, ColumnType};
use crate::core::config::Dialect;
use crate::core::default_value::{quote_literal, DefaultValue};
use crate::core::schema::{Column, ForeignKey, Index, Table};
use std::fmt;

/// identity（自動採番）の差分ビット
pub const DIFF_IDENTITY: u8 = 1 << 0;
/// NULL許可の差分ビット
pub const DIFF_NULLABLE: u8 = 1 << 1;
/// 型の差分ビット
pub const DIFF_TYPE: u8 = 1 << 2;
/// 長さ・精度の差分ビット
pub const DIFF_LENGTH: u8 = 1 << 3;
/// デフォルト値の差分ビット
pub const DIFF_DEFAULT: u8 = 1 << 4;
/// 主キー所属の差分ビット
pub const DIFF_PRIMARY: u8 = 1 << 5;

/// 方言オブジェクトが共有するカラム属性
///
/// `column_type` と `length` は方言の型変換を適用した後の値を保持します。
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub new_name: String,
    pub column_type: ColumnType,
    pub length: Option<ColumnLength>,
    pub nullable: bool,
    pub primary: bool,
    pub identity: bool,
    pub default: Option<DefaultValue>,
    pub comment: String,
    pub collate: Option<String>,
}

impl ColumnSpec {
    /// 宣言モデルのカラムから作成
    ///
    /// 暗黙のデフォルト値はここで確定します。
    pub fn from_model(column: &Column) -> Self {
        Self {
            name: column.name().to_string(),
            new_name: column.new_name().to_string(),
            column_type: column.column_type(),
            length: column.length().cloned(),
            nullable: column.is_nullable(),
            primary: column.is_primary(),
            identity: column.is_identity(),
            default: column.default_value(),
            comment: column.comment().to_string(),
            collate: column.collate().map(str::to_string),
        }
    }

    /// イントロスペクション結果から作成（名前変更なし）
    pub fn introspected(name: impl Into<String>, column_type: ColumnType) -> Self {
        let name = name.into();
        Self {
            new_name: name.clone(),
            name,
            column_type,
            length: None,
            nullable: true,
            primary: false,
            identity: false,
            default: None,
            comment: String::new(),
            collate: None,
        }
    }

    /// 名前変更を伴うかどうか
    pub fn is_renamed(&self) -> bool {
        self.name != self.new_name
    }

    /// 宣言モデルへ逆変換
    pub fn to_model(&self) -> Column {
        let mut column = Column::new(self.new_name.clone(), self.column_type)
            .nullable(self.nullable)
            .with_default_value(self.default.clone())
            .with_comment(self.comment.clone());
        if let Some(length) = &self.length {
            column = column.with_length(length.clone());
        }
        if self.primary {
            column = column.primary();
        }
        if self.identity {
            column = column.identity();
        }
        if let Some(collate) = &self.collate {
            column = column.with_collate(collate.clone());
        }
        column
    }
}

/// 方言オブジェクトが共有するインデックス属性
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
    pub index_type: String,
    pub unique: bool,
}

impl IndexSpec {
    pub fn from_model(index: &Index) -> Self {
        Self {
            name: index.name().to_string(),
            columns: index.columns().to_vec(),
            index_type: index.index_type().to_string(),
            unique: index.is_unique(),
        }
    }

    pub fn to_model(&self) -> Index {
        let mut index = Index::new(self.name.clone(), self.columns.clone()).unique(self.unique);
        if !self.index_type.is_empty() {
            index = index.with_type(self.index_type.clone());
        }
        index
    }
}

/// 方言オブジェクトが共有する外部キー属性
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeySpec {
    pub name: String,
    pub table: String,
    pub column: String,
    pub target_table: String,
    pub target_column: String,
}

impl ForeignKeySpec {
    pub fn from_model(foreign_key: &ForeignKey) -> Self {
        Self {
            name: foreign_key.constraint_name(),
            table: foreign_key.source_table().to_string(),
            column: foreign_key.source_column().to_string(),
            target_table: foreign_key.target_table().to_string(),
            target_column: foreign_key.target_column().to_string(),
        }
    }

    pub fn to_model(&self) -> ForeignKey {
        ForeignKey::new(
            self.column.clone(),
            self.target_table.clone(),
            self.target_column.clone(),
        )
        .with_name(self.name.clone())
    }

    /// 参照先が同じかどうか（制約名は比較しない）
    pub fn same_reference(&self, other: &ForeignKeySpec) -> bool {
        self.target_table.eq_ignore_ascii_case(&other.target_table)
            && self.target_column.eq_ignore_ascii_case(&other.target_column)
    }
}

/// カラム管理
pub trait ColumnManagement: fmt::Debug + Send + Sync {
    /// 方言変換済みの属性
    fn spec(&self) -> &ColumnSpec;

    /// 現行のカラム名
    fn name(&self) -> &str {
        &self.spec().name
    }

    /// 実効のカラム名
    fn new_name(&self) -> &str {
        &self.spec().new_name
    }

    fn is_identity(&self) -> bool {
        self.spec().identity
    }

    fn is_primary(&self) -> bool {
        self.spec().primary
    }

    /// 型と長さの句（例: `varchar(64)`）
    fn type_clause(&self) -> String;

    /// CREATE TABLE / ADD COLUMN で使うカラム定義
    fn definition(&self) -> String;

    /// カラム追加のDDL
    fn add_statements(&self, table: &str) -> Vec<String>;

    /// カラム削除のDDL
    fn drop_statements(&self, table: &str) -> Vec<String>;

    /// 現行カラムを自身の定義へ更新するDDL
    ///
    /// 名前変更を含みます。identity と主キー所属は扱いません。
    fn update_statements(&self, table: &str, current: &dyn ColumnManagement) -> Vec<String>;

    /// 宣言モデルへ逆変換
    fn to_model(&self) -> Column {
        self.spec().to_model()
    }
}

/// インデックス管理
pub trait IndexManagement: fmt::Debug + Send + Sync {
    fn spec(&self) -> &IndexSpec;

    fn name(&self) -> &str {
        &self.spec().name
    }

    fn columns(&self) -> &[String] {
        &self.spec().columns
    }

    fn is_unique(&self) -> bool {
        self.spec().unique
    }

    /// インデックス追加のDDL
    fn add_statements(&self, table: &str) -> Vec<String>;

    /// インデックス削除のDDL
    fn drop_statements(&self, table: &str) -> Vec<String>;

    /// 再作成が必要かどうか（カラム順序とユニーク性を比較）
    fn differs_from(&self, other: &dyn IndexManagement) -> bool {
        self.columns() != other.columns() || self.is_unique() != other.is_unique()
    }

    fn to_model(&self) -> Index {
        self.spec().to_model()
    }
}

/// 外部キー管理
pub trait ForeignKeyManagement: fmt::Debug + Send + Sync {
    fn spec(&self) -> &ForeignKeySpec;

    /// ソースカラム名
    fn column(&self) -> &str {
        &self.spec().column
    }

    /// CREATE TABLE 内の制約定義
    fn constraint_definition(&self) -> String;

    /// 外部キー追加のDDL
    fn add_statements(&self, table: &str) -> Vec<String>;

    /// 外部キー削除のDDL
    fn drop_statements(&self, table: &str) -> Vec<String>;

    fn to_model(&self) -> ForeignKey {
        self.spec().to_model()
    }
}

/// identity カラムの遷移
///
/// 1回の差分で発生する遷移はいずれか1つです。
/// `released` は現在の identity カラム、`retained` はそれに対応する
/// 宣言側のカラム（存在しない場合は削除）を表します。
#[derive(Debug, Clone, Copy)]
pub enum IdentityTransition<'a> {
    /// identity カラムを新規に追加
    AddColumn { target: &'a dyn ColumnManagement },
    /// 既存カラムを identity に変換
    Convert {
        current: &'a dyn ColumnManagement,
        target: &'a dyn ColumnManagement,
    },
    /// identity を廃止
    Remove {
        released: &'a dyn ColumnManagement,
        retained: Option<&'a dyn ColumnManagement>,
    },
    /// identity カラムの名前変更
    Rename {
        current: &'a dyn ColumnManagement,
        target: &'a dyn ColumnManagement,
    },
    /// identity を別の既存カラムへ移動
    Move {
        released: &'a dyn ColumnManagement,
        retained: Option<&'a dyn ColumnManagement>,
        current: &'a dyn ColumnManagement,
        target: &'a dyn ColumnManagement,
    },
    /// identity を新規カラムへ置き換え
    Replace {
        released: &'a dyn ColumnManagement,
        retained: Option<&'a dyn ColumnManagement>,
        target: &'a dyn ColumnManagement,
    },
}

impl IdentityTransition<'_> {
    /// ログ・dry-run 注釈用の名前
    pub fn kind(&self) -> &'static str {
        match self {
            IdentityTransition::AddColumn { .. } => "add identity column",
            IdentityTransition::Convert { .. } => "convert column to identity",
            IdentityTransition::Remove { .. } => "remove identity",
            IdentityTransition::Rename { .. } => "rename identity column",
            IdentityTransition::Move { .. } => "move identity",
            IdentityTransition::Replace { .. } => "replace identity column",
        }
    }
}

/// 主キー所属が変わるカラム
///
/// 主キーの再作成と同じ箇所で更新するため、カラムの差分からは除外されます。
#[derive(Debug, Clone, Copy)]
pub struct PrimaryKeyMember<'a> {
    pub current: &'a dyn ColumnManagement,
    pub target: &'a dyn ColumnManagement,
}

/// テーブル管理
pub trait TableManagement: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn comment(&self) -> &str;

    fn columns(&self) -> &[Box<dyn ColumnManagement>];

    fn indices(&self) -> &[Box<dyn IndexManagement>];

    fn foreign_keys(&self) -> &[Box<dyn ForeignKeyManagement>];

    /// 主キーのカラム（実効名、方言の並び順）
    fn primary_key_columns(&self) -> Vec<String>;

    /// CREATE TABLE と付随するDDL
    fn create_statements(&self) -> Vec<String>;

    /// テーブルコメント更新のDDL
    fn comment_statements(&self) -> Vec<String>;

    /// 主キー再作成のDDL
    ///
    /// # Arguments
    ///
    /// * `current_name` - 現在の主キー制約名（主キーが無い場合は空文字）
    /// * `members` - 主キーの削除と追加の間で更新するカラム
    fn primary_key_statements(
        &self,
        current_name: &str,
        members: &[PrimaryKeyMember<'_>],
    ) -> Vec<String>;

    /// identity 遷移のDDL（主キー再作成を含む）
    fn identity_transition_statements(
        &self,
        current_pk_name: &str,
        transition: &IdentityTransition<'_>,
        members: &[PrimaryKeyMember<'_>],
    ) -> Vec<String>;

    /// 宣言側の identity カラム
    fn identity_columns(&self) -> Vec<&dyn ColumnManagement> {
        self.columns()
            .iter()
            .filter(|c| c.is_identity())
            .map(|c| c.as_ref())
            .collect()
    }
}

/// 環境から決まるテーブルの既定値
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefaults {
    pub collate: String,
    pub charset: String,
}

impl TableDefaults {
    pub fn new(collate: impl Into<String>, charset: impl Into<String>) -> Self {
        Self {
            collate: collate.into(),
            charset: charset.into(),
        }
    }

    /// 方言の既定値
    pub fn for_dialect(dialect: Dialect) -> Self {
        Self::new(dialect.default_collate(), dialect.default_charset())
    }
}

/// 宣言テーブルを方言のテーブル管理オブジェクトへ変換
pub fn convert_table(
    dialect: Dialect,
    table: &Table,
    defaults: &TableDefaults,
) -> Box<dyn TableManagement> {
    match dialect {
        Dialect::MySQL => Box::new(mysql::MysqlTable::from_model(table, defaults)),
        Dialect::PostgreSQL => Box::new(postgres::PostgresTable::from_model(table)),
    }
}

/// 2つのカラムの差分ビットマスク
///
/// # Returns
///
/// `DIFF_*` の論理和。0 は同一を意味します。
pub fn not_identical(current: &dyn ColumnManagement, target: &dyn ColumnManagement) -> u8 {
    let a = current.spec();
    let b = target.spec();
    let mut mask = 0;
    if a.identity != b.identity {
        mask |= DIFF_IDENTITY;
    }
    if a.nullable != b.nullable {
        mask |= DIFF_NULLABLE;
    }
    if a.column_type != b.column_type {
        mask |= DIFF_TYPE;
    }
    if a.length != b.length {
        mask |= DIFF_LENGTH;
    }
    if a.default != b.default {
        mask |= DIFF_DEFAULT;
    }
    if a.primary != b.primary {
        mask |= DIFF_PRIMARY;
    }
    mask
}

/// デフォルト値のSQL表現
pub(crate) fn render_default(value: &DefaultValue) -> String {
    match value {
        DefaultValue::Text(text) => quote_literal(text),
        DefaultValue::Bool(true) => "TRUE".to_string(),
        DefaultValue::Bool(false) => "FALSE".to_string(),
        other => other.raw(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mysql_column(column: Column) -> mysql::MysqlColumn {
        mysql::MysqlColumn::new(ColumnSpec::from_model(&column), Some("utf8mb4_unicode_ci"))
    }

    #[test]
    fn test_not_identical_detects_each_attribute() {
        let base = mysql_column(Column::new("name", ColumnType::Varchar).with_length(ColumnLength::Size(64)));

        let longer =
            mysql_column(Column::new("name", ColumnType::Varchar).with_length(ColumnLength::Size(128)));
        assert_eq!(not_identical(&base, &longer), DIFF_LENGTH);

        let not_null = mysql_column(
            Column::new("name", ColumnType::Varchar)
                .with_length(ColumnLength::Size(64))
                .nullable(false),
        );
        assert_eq!(not_identical(&base, &not_null), DIFF_NULLABLE | DIFF_DEFAULT);

        let text = mysql_column(Column::new("name", ColumnType::Char).with_length(ColumnLength::Size(64)));
        assert_eq!(not_identical(&base, &text), DIFF_TYPE);
    }

    #[test]
    fn test_not_identical_identity_and_primary() {
        let plain = mysql_column(Column::new("id", ColumnType::Int));
        let identity = mysql_column(Column::new("id", ColumnType::Int).primary().identity());

        let mask = not_identical(&plain, &identity);
        assert_ne!(mask & DIFF_IDENTITY, 0);
        assert_ne!(mask & DIFF_PRIMARY, 0);
        // 暗黙の 0 は identity カラムには付かない
        assert_ne!(mask & DIFF_DEFAULT, 0);
    }

    #[test]
    fn test_identical_columns_have_empty_mask() {
        let a = mysql_column(Column::new("count", ColumnType::Int));
        let b = mysql_column(Column::new("count", ColumnType::Integer).with_default("0"));

        assert_eq!(not_identical(&a, &b), 0);
    }

    #[test]
    fn test_render_default() {
        assert_eq!(render_default(&DefaultValue::Text("it's".to_string())), "'it''s'");
        assert_eq!(render_default(&DefaultValue::Int(5)), "5");
        assert_eq!(render_default(&DefaultValue::Bool(true)), "TRUE");
        assert_eq!(
            render_default(&DefaultValue::Expression("CURRENT_TIMESTAMP".to_string())),
            "CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn test_foreign_key_spec_same_reference_ignores_name() {
        let table = Table::new("orders").foreign_key(ForeignKey::new("user_id", "users", "id"));
        let declared = ForeignKeySpec::from_model(table.foreign_keys().next().unwrap());
        let introspected = ForeignKeySpec {
            name: "orders_ibfk_1".to_string(),
            ..declared.clone()
        };

        assert!(declared.same_reference(&introspected));
    }

    #[test]
    fn test_column_spec_round_trips_to_model() {
        let column = Column::new("title", ColumnType::Varchar)
            .with_length(ColumnLength::Size(32))
            .rename_to("headline")
            .with_comment("shown in lists");
        let spec = ColumnSpec::from_model(&column);

        assert!(spec.is_renamed());
        let model = spec.to_model();
        assert_eq!(model.name(), "headline");
        assert_eq!(model.length(), Some(&ColumnLength::Size(32)));
        assert_eq!(model.comment(), "shown in lists");
    }
}
