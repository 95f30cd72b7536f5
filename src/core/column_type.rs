// ベンダー中立のカラム型
//
// スキーマ宣言で使用できる型の閉じた列挙と、長さ・精度指定を提供します。
// 方言ごとの型キーワードへの変換は adapters::dialect 側で網羅的に行います。

use crate::core::error::DeclarationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ベンダー中立のカラム型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    // 整数
    TinyInt,
    SmallInt,
    MediumInt,
    Int,
    Integer,
    BigInt,
    Bool,
    Boolean,
    Bit,
    Year,
    // 小数
    Decimal,
    Float,
    Real,
    Double,
    Money,
    // 日時
    Date,
    DateTime,
    Timestamp,
    Time,
    // 文字列
    Char,
    Varchar,
    TinyText,
    Text,
    MediumText,
    LongText,
    Enum,
    Set,
    // バイナリ
    Binary,
    VarBinary,
    TinyBlob,
    Blob,
    MediumBlob,
    LongBlob,
    Bytea,
    // 空間
    Geometry,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
    Box,
    Circle,
    Path,
    // ネットワーク・その他
    Cidr,
    Inet,
    MacAddr,
    Uuid,
    TsVector,
    TsQuery,
}

impl ColumnType {
    /// 宣言で使用する型名
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::TinyInt => "TINYINT",
            ColumnType::SmallInt => "SMALLINT",
            ColumnType::MediumInt => "MEDIUMINT",
            ColumnType::Int => "INT",
            ColumnType::Integer => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Bool => "BOOL",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Bit => "BIT",
            ColumnType::Year => "YEAR",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::Float => "FLOAT",
            ColumnType::Real => "REAL",
            ColumnType::Double => "DOUBLE",
            ColumnType::Money => "MONEY",
            ColumnType::Date => "DATE",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Time => "TIME",
            ColumnType::Char => "CHAR",
            ColumnType::Varchar => "VARCHAR",
            ColumnType::TinyText => "TINYTEXT",
            ColumnType::Text => "TEXT",
            ColumnType::MediumText => "MEDIUMTEXT",
            ColumnType::LongText => "LONGTEXT",
            ColumnType::Enum => "ENUM",
            ColumnType::Set => "SET",
            ColumnType::Binary => "BINARY",
            ColumnType::VarBinary => "VARBINARY",
            ColumnType::TinyBlob => "TINYBLOB",
            ColumnType::Blob => "BLOB",
            ColumnType::MediumBlob => "MEDIUMBLOB",
            ColumnType::LongBlob => "LONGBLOB",
            ColumnType::Bytea => "BYTEA",
            ColumnType::Geometry => "GEOMETRY",
            ColumnType::Point => "POINT",
            ColumnType::LineString => "LINESTRING",
            ColumnType::Polygon => "POLYGON",
            ColumnType::MultiPoint => "MULTIPOINT",
            ColumnType::MultiLineString => "MULTILINESTRING",
            ColumnType::MultiPolygon => "MULTIPOLYGON",
            ColumnType::GeometryCollection => "GEOMETRYCOLLECTION",
            ColumnType::Box => "BOX",
            ColumnType::Circle => "CIRCLE",
            ColumnType::Path => "PATH",
            ColumnType::Cidr => "CIDR",
            ColumnType::Inet => "INET",
            ColumnType::MacAddr => "MACADDR",
            ColumnType::Uuid => "UUID",
            ColumnType::TsVector => "TSVECTOR",
            ColumnType::TsQuery => "TSQUERY",
        }
    }

    /// 全ての型
    pub const ALL: [ColumnType; 51] = [
        ColumnType::TinyInt,
        ColumnType::SmallInt,
        ColumnType::MediumInt,
        ColumnType::Int,
        ColumnType::Integer,
        ColumnType::BigInt,
        ColumnType::Bool,
        ColumnType::Boolean,
        ColumnType::Bit,
        ColumnType::Year,
        ColumnType::Decimal,
        ColumnType::Float,
        ColumnType::Real,
        ColumnType::Double,
        ColumnType::Money,
        ColumnType::Date,
        ColumnType::DateTime,
        ColumnType::Timestamp,
        ColumnType::Time,
        ColumnType::Char,
        ColumnType::Varchar,
        ColumnType::TinyText,
        ColumnType::Text,
        ColumnType::MediumText,
        ColumnType::LongText,
        ColumnType::Enum,
        ColumnType::Set,
        ColumnType::Binary,
        ColumnType::VarBinary,
        ColumnType::TinyBlob,
        ColumnType::Blob,
        ColumnType::MediumBlob,
        ColumnType::LongBlob,
        ColumnType::Bytea,
        ColumnType::Geometry,
        ColumnType::Point,
        ColumnType::LineString,
        ColumnType::Polygon,
        ColumnType::MultiPoint,
        ColumnType::MultiLineString,
        ColumnType::MultiPolygon,
        ColumnType::GeometryCollection,
        ColumnType::Box,
        ColumnType::Circle,
        ColumnType::Path,
        ColumnType::Cidr,
        ColumnType::Inet,
        ColumnType::MacAddr,
        ColumnType::Uuid,
        ColumnType::TsVector,
        ColumnType::TsQuery,
    ];

    /// 整数系の型かどうか
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::TinyInt
                | ColumnType::SmallInt
                | ColumnType::MediumInt
                | ColumnType::Int
                | ColumnType::Integer
                | ColumnType::BigInt
                | ColumnType::Bit
                | ColumnType::Year
        )
    }

    /// 小数系の型かどうか
    pub fn is_fractional(&self) -> bool {
        matches!(
            self,
            ColumnType::Decimal
                | ColumnType::Float
                | ColumnType::Real
                | ColumnType::Double
                | ColumnType::Money
        )
    }

    /// 真偽値型かどうか
    pub fn is_boolean(&self) -> bool {
        matches!(self, ColumnType::Bool | ColumnType::Boolean)
    }

    /// 数値型かどうか
    ///
    /// NULL許可の推定と暗黙のデフォルト値（0）に使用します。
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_fractional() || self.is_boolean()
    }

    /// 文字列型かどうか
    ///
    /// デフォルト値をクォートして出力する型です。
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            ColumnType::Char
                | ColumnType::Varchar
                | ColumnType::TinyText
                | ColumnType::Text
                | ColumnType::MediumText
                | ColumnType::LongText
                | ColumnType::Enum
                | ColumnType::Set
                | ColumnType::Uuid
                | ColumnType::Cidr
                | ColumnType::Inet
                | ColumnType::MacAddr
        )
    }

    /// 日時型かどうか
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            ColumnType::Date | ColumnType::DateTime | ColumnType::Timestamp | ColumnType::Time
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = DeclarationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        ColumnType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| DeclarationError::UnknownColumnType {
                type_name: s.to_string(),
                column: None,
            })
    }
}

impl TryFrom<String> for ColumnType {
    type Error = DeclarationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.as_str().to_string()
    }
}

/// 長さ・精度指定
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnLength {
    /// 文字列長または表示幅
    Size(u32),
    /// 数値の精度とスケール
    Precision(u32, u32),
    /// 最大長（VARCHAR(MAX) 相当）
    Max,
    /// ENUM/SET の値リスト（クォート済み）
    Values(String),
}

impl fmt::Display for ColumnLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnLength::Size(n) => write!(f, "{}", n),
            ColumnLength::Precision(p, s) => write!(f, "{},{}", p, s),
            ColumnLength::Max => write!(f, "MAX"),
            ColumnLength::Values(values) => write!(f, "{}", values),
        }
    }
}

impl FromStr for ColumnLength {
    type Err = DeclarationError;

    /// 宣言テキストから長さを解析
    ///
    /// "64", "10,2", "MAX", "-1", "'a','b'" の形式を受け付けます。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = |reason: &str| DeclarationError::InvalidLength {
            length: s.to_string(),
            reason: reason.to_string(),
        };

        if text.is_empty() {
            return Err(invalid("empty length"));
        }
        if text.eq_ignore_ascii_case("max") || text == "-1" {
            return Ok(ColumnLength::Max);
        }
        if text.starts_with('\'') {
            return Ok(ColumnLength::Values(text.to_string()));
        }
        if let Some((precision, scale)) = text.split_once(',') {
            let precision = precision
                .trim()
                .parse::<u32>()
                .map_err(|_| invalid("precision is not a number"))?;
            let scale = scale
                .trim()
                .parse::<u32>()
                .map_err(|_| invalid("scale is not a number"))?;
            if scale > precision {
                return Err(invalid("scale exceeds precision"));
            }
            return Ok(ColumnLength::Precision(precision, scale));
        }
        text.parse::<u32>()
            .map(ColumnLength::Size)
            .map_err(|_| invalid("not a number"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ======================================
    // ColumnType
    // ======================================

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("varchar".parse::<ColumnType>().unwrap(), ColumnType::Varchar);
        assert_eq!("BigInt".parse::<ColumnType>().unwrap(), ColumnType::BigInt);
        assert_eq!(" bool ".parse::<ColumnType>().unwrap(), ColumnType::Bool);
    }

    #[test]
    fn test_parse_unknown_type() {
        let err = "varchar2".parse::<ColumnType>().unwrap_err();

        assert!(err.is_unknown_column_type());
    }

    #[test]
    fn test_all_types_round_trip_through_names() {
        for ty in ColumnType::ALL {
            assert_eq!(ty.as_str().parse::<ColumnType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_numeric_and_string_classes() {
        assert!(ColumnType::Int.is_numeric());
        assert!(ColumnType::Bool.is_numeric());
        assert!(ColumnType::Decimal.is_numeric());
        assert!(!ColumnType::Varchar.is_numeric());
        assert!(ColumnType::Varchar.is_string());
        assert!(!ColumnType::DateTime.is_string());
        assert!(ColumnType::DateTime.is_temporal());
    }

    // ======================================
    // ColumnLength
    // ======================================

    #[test]
    fn test_parse_lengths() {
        assert_eq!("64".parse::<ColumnLength>().unwrap(), ColumnLength::Size(64));
        assert_eq!(
            "10, 2".parse::<ColumnLength>().unwrap(),
            ColumnLength::Precision(10, 2)
        );
        assert_eq!("MAX".parse::<ColumnLength>().unwrap(), ColumnLength::Max);
        assert_eq!("-1".parse::<ColumnLength>().unwrap(), ColumnLength::Max);
        assert_eq!(
            "'a','b'".parse::<ColumnLength>().unwrap(),
            ColumnLength::Values("'a','b'".to_string())
        );
    }

    #[test]
    fn test_parse_invalid_lengths() {
        assert!("abc".parse::<ColumnLength>().unwrap_err().is_invalid_length());
        assert!("2,10".parse::<ColumnLength>().is_err());
        assert!("".parse::<ColumnLength>().is_err());
    }

    #[test]
    fn test_length_display() {
        assert_eq!(ColumnLength::Precision(10, 2).to_string(), "10,2");
        assert_eq!(ColumnLength::Max.to_string(), "MAX");
    }
}
