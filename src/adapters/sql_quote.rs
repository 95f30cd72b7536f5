// SQL識別子クォートユーティリティ
//
// 方言のDDL生成と台帳・カタログクエリが共有する識別子のクォート関数。
// PostgreSQLでは宣言名を小文字へ畳み込んでからクォートします。

/// PostgreSQL用識別子クォート（ダブルクォート）
///
/// 識別子内のダブルクォートは二重にエスケープします。大文字小文字はそのまま保持します。
///
/// # Examples
/// ```
/// use bedrock::adapters::sql_quote::quote_identifier_postgres;
/// assert_eq!(quote_identifier_postgres("en_US.utf8"), r#""en_US.utf8""#);
/// assert_eq!(quote_identifier_postgres(r#"table"name"#), r#""table""name""#);
/// ```
pub fn quote_identifier_postgres(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// 宣言名を小文字化してクォート（PostgreSQL）
///
/// テーブル・カラム・制約名は作成時に畳み込むため、参照時も同じ規則を使います。
///
/// # Examples
/// ```
/// use bedrock::adapters::sql_quote::quote_folded_postgres;
/// assert_eq!(quote_folded_postgres("tbl_User_Settings"), r#""tbl_user_settings""#);
/// ```
pub fn quote_folded_postgres(name: &str) -> String {
    quote_identifier_postgres(&name.to_lowercase())
}

/// MySQL用識別子クォート（バッククォート）
///
/// # Examples
/// ```
/// use bedrock::adapters::sql_quote::quote_identifier_mysql;
/// assert_eq!(quote_identifier_mysql("tbl_User_Settings"), "`tbl_User_Settings`");
/// ```
pub fn quote_identifier_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn join_quoted(columns: &[String], quote: fn(&str) -> String) -> String {
    columns
        .iter()
        .map(|c| quote(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// カラムリストをクォートして結合（PostgreSQL、小文字化あり）
pub fn quote_columns_postgres(columns: &[String]) -> String {
    join_quoted(columns, quote_folded_postgres)
}

/// カラムリストをクォートして結合（MySQL）
pub fn quote_columns_mysql(columns: &[String]) -> String {
    join_quoted(columns, quote_identifier_mysql)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // PostgreSQL
    // =========================================================================

    #[test]
    fn test_quote_identifier_postgres_keeps_case() {
        assert_eq!(quote_identifier_postgres("PRIMARY"), r#""PRIMARY""#);
        assert_eq!(quote_identifier_postgres("\""), "\"\"\"\"");
    }

    #[test]
    fn test_quote_folded_postgres() {
        assert_eq!(quote_folded_postgres("User_ID"), r#""user_id""#);
        assert_eq!(quote_folded_postgres("order"), r#""order""#);
    }

    #[test]
    fn test_quote_columns_postgres_folds_names() {
        let columns = vec!["Tab".to_string(), "Cell".to_string()];
        assert_eq!(quote_columns_postgres(&columns), r#""tab", "cell""#);
    }

    // =========================================================================
    // MySQL
    // =========================================================================

    #[test]
    fn test_quote_identifier_mysql_with_embedded_backtick() {
        assert_eq!(quote_identifier_mysql("`"), "````");
        assert_eq!(quote_identifier_mysql(r#"table"name"#), r#"`table"name`"#);
    }

    #[test]
    fn test_quote_columns_mysql_keeps_case() {
        let columns = vec!["Tab".to_string(), "User_ID".to_string()];
        assert_eq!(quote_columns_mysql(&columns), "`Tab`, `User_ID`");
    }
}
