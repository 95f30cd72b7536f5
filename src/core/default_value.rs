// デフォルト値の正規化
//
// 宣言された値とイントロスペクションで読み戻した値を、同じ型主導の
// 関数で正規化します。両者が同じ表現に落ちることで差分検出のドリフトを防ぎます。

use crate::core::column_type::ColumnType;
use std::fmt;

/// 正規化済みのデフォルト値
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// 整数
    Int(i64),
    /// 小数
    Float(f64),
    /// 真偽値
    Bool(bool),
    /// 文字列リテラル（クォートなし）
    Text(String),
    /// SQL式（CURRENT_TIMESTAMP 等）
    Expression(String),
}

/// 日時型で式として扱うキーワード
const TEMPORAL_KEYWORDS: [&str; 7] = [
    "CURRENT_TIMESTAMP",
    "CURRENT_DATE",
    "CURRENT_TIME",
    "NOW()",
    "LOCALTIMESTAMP",
    "LOCALTIME",
    "CURRENT_TIMESTAMP()",
];

impl DefaultValue {
    /// 生のテキスト表現
    ///
    /// 再正規化に使える、クォートを含まない表現を返します。
    pub fn raw(&self) -> String {
        match self {
            DefaultValue::Int(i) => i.to_string(),
            DefaultValue::Float(f) => format_float(*f),
            DefaultValue::Bool(b) => b.to_string(),
            DefaultValue::Text(s) => s.clone(),
            DefaultValue::Expression(e) => e.clone(),
        }
    }

    /// 別の型に合わせて再正規化
    ///
    /// 方言の型変換（BOOL → TINYINT 等）の後に呼び出します。
    /// 文字列型どうしでは値をそのまま保ち、再解析は型の分類が変わる場合だけです。
    pub fn coerce(&self, ty: ColumnType) -> Option<DefaultValue> {
        match self {
            DefaultValue::Text(_) if ty.is_string() => Some(self.clone()),
            DefaultValue::Text(s) => normalize_default(&quote_literal(s), ty),
            _ => normalize_default(&self.raw(), ty),
        }
    }

    /// 宣言ファイルへ書き戻せる表現
    ///
    /// 文字列はクォートして返すため、`normalize_default` で同じ値に戻ります。
    pub fn declared(&self) -> String {
        match self {
            DefaultValue::Text(s) => quote_literal(s),
            other => other.raw(),
        }
    }

    /// 暗黙のデフォルト値
    ///
    /// NOT NULL かつ identity でないカラムに明示的なデフォルトが無い場合の値です。
    pub fn implicit_for(ty: ColumnType) -> Option<DefaultValue> {
        if ty.is_boolean() {
            Some(DefaultValue::Bool(false))
        } else if ty.is_integer() {
            Some(DefaultValue::Int(0))
        } else if ty.is_fractional() {
            Some(DefaultValue::Float(0.0))
        } else if ty.is_string() {
            Some(DefaultValue::Text(String::new()))
        } else {
            None
        }
    }

    /// 暗黙のデフォルト値と等しいかどうか
    pub fn is_implicit_for(&self, ty: ColumnType) -> bool {
        DefaultValue::implicit_for(ty).as_ref() == Some(self)
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}

/// 小数の表示（整数値でも小数点を保つ）
fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// 文字列をSQLリテラルとしてクォート
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// デフォルト値を型に従って正規化
///
/// # Arguments
///
/// * `raw` - 宣言値またはカタログから読み出した値
/// * `ty` - カラムの型
///
/// # Returns
///
/// 正規化済みの値。NULL や連番（nextval）は None になります。
pub fn normalize_default(raw: &str, ty: ColumnType) -> Option<DefaultValue> {
    let mut text = raw.trim();

    if text.eq_ignore_ascii_case("null") {
        return None;
    }
    if text.to_lowercase().starts_with("nextval(") {
        return None;
    }

    // PostgreSQLの型キャスト ('abc'::character varying) を除去
    let stripped;
    if let Some(position) = cast_position(text) {
        stripped = text[..position].trim().to_string();
        text = &stripped;
    }

    let (value, quoted) = unquote(text);

    if ty.is_boolean() {
        return parse_bool(&value)
            .map(DefaultValue::Bool)
            .or(Some(DefaultValue::Expression(value)));
    }
    if ty.is_integer() {
        let candidate = value.trim_start_matches("b'").trim_end_matches('\'');
        if let Some(b) = parse_bool(candidate) {
            return Some(DefaultValue::Int(i64::from(b)));
        }
        return match candidate.parse::<i64>() {
            Ok(i) => Some(DefaultValue::Int(i)),
            Err(_) => match candidate.parse::<f64>() {
                Ok(f) if f.fract() == 0.0 => Some(DefaultValue::Int(f as i64)),
                _ => Some(DefaultValue::Expression(value)),
            },
        };
    }
    if ty.is_fractional() {
        let candidate = value.trim_start_matches('$').replace(',', "");
        return match candidate.parse::<f64>() {
            Ok(f) => Some(DefaultValue::Float(f)),
            Err(_) => parse_bool(&candidate)
                .map(|b| DefaultValue::Float(if b { 1.0 } else { 0.0 }))
                .or(Some(DefaultValue::Expression(value))),
        };
    }
    if ty.is_temporal() {
        let upper = value.to_uppercase();
        if !quoted && TEMPORAL_KEYWORDS.contains(&upper.as_str()) {
            let keyword = if upper == "NOW()" || upper == "CURRENT_TIMESTAMP()" {
                "CURRENT_TIMESTAMP".to_string()
            } else {
                upper
            };
            return Some(DefaultValue::Expression(keyword));
        }
        if quoted || value.starts_with(|c: char| c.is_ascii_digit()) {
            return Some(DefaultValue::Text(value));
        }
        return Some(DefaultValue::Expression(value));
    }
    if ty.is_string() {
        return Some(DefaultValue::Text(value));
    }
    if quoted {
        Some(DefaultValue::Text(value))
    } else {
        Some(DefaultValue::Expression(value))
    }
}

/// クォートされずに報告されたカタログ値を正規化
///
/// MySQLの COLUMN_DEFAULT は文字列型の値を加工せずに返すため、
/// 文字列型ではトリムやNULL判定をせずそのまま保持します。
pub fn normalize_catalog_literal(raw: &str, ty: ColumnType) -> Option<DefaultValue> {
    if ty.is_string() {
        return Some(DefaultValue::Text(raw.to_string()));
    }
    normalize_default(raw, ty)
}

/// `::` キャストの開始位置（クォート外のもの）
fn cast_position(text: &str) -> Option<usize> {
    let mut in_quote = false;
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_quote = !in_quote,
            b':' if !in_quote && i + 1 < bytes.len() && bytes[i + 1] == b':' => {
                return Some(i);
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// 前後のクォートを外す
///
/// MySQL系の "" とPostgreSQLの '' の両方を受け付け、内部の二重クォートを戻します。
fn unquote(text: &str) -> (String, bool) {
    for quote in ['\'', '"'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            let inner = &text[1..text.len() - 1];
            let doubled = format!("{}{}", quote, quote);
            return (inner.replace(&doubled, &quote.to_string()), true);
        }
    }
    (text.to_string(), false)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "t" => Some(true),
        "false" | "f" => Some(false),
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}
