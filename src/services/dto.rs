// スキーマ宣言DTO
//
// YAMLのスキーマ宣言文書と内部モデルを分離するためのDTO層。
// 読み込み（YamlSchemaSource）と書き出し（スキーマダンプ）の両方向で使用します。

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

fn is_false(value: &bool) -> bool {
    !*value
}

/// スキーマ宣言文書
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocumentDto {
    /// バージョンごとのステップ
    #[serde(default)]
    pub versions: Vec<VersionDto>,
}

/// 1バージョン分の宣言
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionDto {
    pub version: String,

    #[serde(default)]
    pub steps: Vec<StepDto>,
}

/// ステップ（table と statement のどちらか一方）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableDto>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
}

/// テーブル宣言
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDto {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collate: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,

    pub columns: Vec<ColumnDto>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<IndexDto>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKeyDto>,
}

/// カラム宣言
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnDto {
    pub name: String,

    /// 方言非依存の型名
    #[serde(rename = "type")]
    pub column_type: String,

    /// 長さ・精度（"64", "10,2", "MAX", "'a','b'"）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<Scalar>,

    /// 未指定時は型から推定
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub primary: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub identity: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Scalar>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collate: Option<String>,
}

/// インデックス宣言
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexDto {
    pub name: String,

    pub columns: Vec<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,

    /// エンジン固有の種別（"unique" はユニーク扱い）
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub index_type: Option<String>,
}

/// 外部キー宣言
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyDto {
    pub column: String,

    pub target_table: String,

    pub target_column: String,

    /// 未指定時は fk_<table>_<column>
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// 文字列・数値・真偽値を受け付けるスカラー値
///
/// `length: 64` と `length: "64"` を同じ値として扱います。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar(pub String);

impl Scalar {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar(value)
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = Scalar;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string, number or boolean")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Scalar, E> {
        Ok(Scalar(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Scalar, E> {
        Ok(Scalar(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Scalar, E> {
        Ok(Scalar(value.to_string()))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Scalar, E> {
        Ok(Scalar(value.to_string()))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Scalar, E> {
        Ok(Scalar(value.to_string()))
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Scalar, E> {
        Ok(Scalar(value.to_string()))
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor)
    }
}
