// エラー型定義
//
// アプリケーション全体で使用されるカスタムエラー型を提供します。
// thiserrorを使用して、DeclarationError, DatabaseError, ReconcileError, IoError を定義します。

use thiserror::Error;

/// スキーマ宣言エラー
///
/// スキーマモデルの構築時（DDL生成より前）に発生するエラーを表現します。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeclarationError {
    /// Unknown vendor-neutral column type
    #[error("Unknown column type '{type_name}'{}", format_column_opt(.column))]
    UnknownColumnType {
        /// 宣言された型名
        type_name: String,
        /// 対象カラム
        column: Option<String>,
    },

    /// Malformed length / precision clause
    #[error("Invalid length '{length}': {reason}")]
    InvalidLength {
        /// 宣言された長さ
        length: String,
        /// 不正な理由
        reason: String,
    },

    /// Version label that cannot be ordered
    #[error("Invalid version label '{label}': {reason}")]
    InvalidVersion {
        /// バージョンラベル
        label: String,
        /// 不正な理由
        reason: String,
    },

    /// Malformed schema document
    #[error("Invalid schema document: {message}")]
    Document {
        /// エラーメッセージ
        message: String,
    },
}

impl DeclarationError {
    /// 未知の型エラーかどうか
    pub fn is_unknown_column_type(&self) -> bool {
        matches!(self, DeclarationError::UnknownColumnType { .. })
    }

    /// 長さ指定エラーかどうか
    pub fn is_invalid_length(&self) -> bool {
        matches!(self, DeclarationError::InvalidLength { .. })
    }

    /// バージョンラベルエラーかどうか
    pub fn is_invalid_version(&self) -> bool {
        matches!(self, DeclarationError::InvalidVersion { .. })
    }

    /// スキーマ文書エラーかどうか
    pub fn is_document(&self) -> bool {
        matches!(self, DeclarationError::Document { .. })
    }
}

fn format_column_opt(column: &Option<String>) -> String {
    column
        .as_ref()
        .map_or(String::new(), |c| format!(" (column: {})", c))
}

/// データベースエラー
///
/// データベース操作時に発生するエラーを表現します。
#[derive(Debug, Clone, Error)]
pub enum DatabaseError {
    /// Connection error
    #[error("Database connection error: {message} (cause: {cause})")]
    Connection {
        /// エラーメッセージ
        message: String,
        /// エラー原因
        cause: String,
    },

    /// Query execution error
    #[error("Query execution error: {message}{}", format_sql_opt(.sql))]
    Query {
        /// エラーメッセージ
        message: String,
        /// 失敗したSQL
        sql: Option<String>,
    },

    /// Introspected vendor type without a vendor-neutral counterpart
    #[error("Unknown vendor type '{vendor_type}' in column {table}.{column}")]
    UnknownType {
        /// テーブル名
        table: String,
        /// カラム名
        column: String,
        /// データベースが返した型名
        vendor_type: String,
    },

    /// Inconsistent catalog metadata
    #[error("Introspection error: {message}")]
    Introspection {
        /// エラーメッセージ
        message: String,
    },

    /// No pool has been opened for the requested operation
    #[error("Not connected: {message}")]
    NotConnected {
        /// エラーメッセージ
        message: String,
    },
}

impl DatabaseError {
    /// 接続エラーかどうか
    pub fn is_connection(&self) -> bool {
        matches!(self, DatabaseError::Connection { .. })
    }

    /// クエリエラーかどうか
    pub fn is_query(&self) -> bool {
        matches!(self, DatabaseError::Query { .. })
    }

    /// 未知の型エラーかどうか
    pub fn is_unknown_type(&self) -> bool {
        matches!(self, DatabaseError::UnknownType { .. })
    }

    /// イントロスペクションエラーかどうか
    pub fn is_introspection(&self) -> bool {
        matches!(self, DatabaseError::Introspection { .. })
    }

    /// 未接続エラーかどうか
    pub fn is_not_connected(&self) -> bool {
        matches!(self, DatabaseError::NotConnected { .. })
    }

    /// 処理継続が不可能なエラーかどうか
    ///
    /// 分類できない型を含むスキーマは安全に差分を取れないため、
    /// 未知の型エラーは常に致命的として扱います。
    pub fn is_fatal(&self) -> bool {
        self.is_unknown_type()
    }

    /// sqlxのエラーをクエリエラーに変換
    pub fn query(message: impl Into<String>, sql: &str, cause: sqlx::Error) -> Self {
        DatabaseError::Query {
            message: format!("{}: {}", message.into(), cause),
            sql: Some(sql.to_string()),
        }
    }
}

fn format_sql_opt(sql: &Option<String>) -> String {
    sql.as_ref()
        .map_or(String::new(), |s| format!(" (SQL: {})", s))
}

/// 差分適用エラー
///
/// スキーマ差分の計算・適用時に発生するエラーを表現します。
#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    /// Database error
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Declaration error
    #[error(transparent)]
    Declaration(#[from] DeclarationError),

    /// Identity / primary key combination that cannot be resolved unambiguously
    #[error("Unsupported identity change on table '{table}': {message}")]
    UnsupportedIdentityChange {
        /// テーブル名
        table: String,
        /// エラーメッセージ
        message: String,
    },
}

impl ReconcileError {
    /// データベースエラーかどうか
    pub fn is_database(&self) -> bool {
        matches!(self, ReconcileError::Database(_))
    }

    /// 宣言エラーかどうか
    pub fn is_declaration(&self) -> bool {
        matches!(self, ReconcileError::Declaration(_))
    }

    /// 未サポートのアイデンティティ変更かどうか
    pub fn is_unsupported_identity_change(&self) -> bool {
        matches!(self, ReconcileError::UnsupportedIdentityChange { .. })
    }

    /// 処理継続が不可能なエラーかどうか
    pub fn is_fatal(&self) -> bool {
        match self {
            ReconcileError::Database(e) => e.is_fatal(),
            ReconcileError::Declaration(_) => false,
            ReconcileError::UnsupportedIdentityChange { .. } => true,
        }
    }
}

/// I/Oエラー
///
/// ファイル操作時に発生するエラーを表現します。
#[derive(Debug, Error)]
pub enum IoError {
    /// File not found
    #[error("File not found: {path}")]
    FileNotFound {
        /// ファイルパス
        path: String,
    },

    /// File read error
    #[error("Failed to read file: {path} (cause: {cause})")]
    FileRead {
        /// ファイルパス
        path: String,
        /// エラー原因
        cause: String,
    },

    /// File write error
    #[error("Failed to write file: {path} (cause: {cause})")]
    FileWrite {
        /// ファイルパス
        path: String,
        /// エラー原因
        cause: String,
    },
}

impl IoError {
    /// ファイルが見つからないエラーかどうか
    pub fn is_file_not_found(&self) -> bool {
        matches!(self, IoError::FileNotFound { .. })
    }

    /// ファイル読み込みエラーかどうか
    pub fn is_file_read(&self) -> bool {
        matches!(self, IoError::FileRead { .. })
    }

    /// ファイル書き込みエラーかどうか
    pub fn is_file_write(&self) -> bool {
        matches!(self, IoError::FileWrite { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ======================================
    // DeclarationError
    // ======================================

    #[test]
    fn test_unknown_column_type_message() {
        let error = DeclarationError::UnknownColumnType {
            type_name: "varchar2".to_string(),
            column: Some("name".to_string()),
        };

        assert!(error.is_unknown_column_type());
        assert!(!error.is_invalid_length());
        assert_eq!(
            error.to_string(),
            "Unknown column type 'varchar2' (column: name)"
        );
    }

    #[test]
    fn test_unknown_column_type_without_column() {
        let error = DeclarationError::UnknownColumnType {
            type_name: "foo".to_string(),
            column: None,
        };

        assert_eq!(error.to_string(), "Unknown column type 'foo'");
    }

    // ======================================
    // DatabaseError
    // ======================================

    #[test]
    fn test_connection_error_is_not_fatal() {
        let error = DatabaseError::Connection {
            message: "Connection failed".to_string(),
            cause: "timeout".to_string(),
        };

        assert!(error.is_connection());
        assert!(!error.is_fatal());
        assert!(error.to_string().contains("timeout"));
    }

    #[test]
    fn test_unknown_type_is_fatal() {
        let error = DatabaseError::UnknownType {
            table: "widgets".to_string(),
            column: "shape".to_string(),
            vendor_type: "hyperloglog".to_string(),
        };

        assert!(error.is_unknown_type());
        assert!(error.is_fatal());
        assert_eq!(
            error.to_string(),
            "Unknown vendor type 'hyperloglog' in column widgets.shape"
        );
    }

    #[test]
    fn test_query_error_includes_sql() {
        let error = DatabaseError::Query {
            message: "syntax error".to_string(),
            sql: Some("ALTER TABLE x".to_string()),
        };

        assert!(error.is_query());
        assert!(error.to_string().contains("(SQL: ALTER TABLE x)"));
    }

    // ======================================
    // ReconcileError
    // ======================================

    #[test]
    fn test_reconcile_error_from_database_error() {
        let error: ReconcileError = DatabaseError::UnknownType {
            table: "t".to_string(),
            column: "c".to_string(),
            vendor_type: "x".to_string(),
        }
        .into();

        assert!(error.is_database());
        assert!(error.is_fatal());
    }

    #[test]
    fn test_unsupported_identity_change_is_fatal() {
        let error = ReconcileError::UnsupportedIdentityChange {
            table: "widgets".to_string(),
            message: "two identity columns".to_string(),
        };

        assert!(error.is_unsupported_identity_change());
        assert!(error.is_fatal());
    }

    #[test]
    fn test_io_error_file_not_found() {
        let error = IoError::FileNotFound {
            path: "/tmp/schema.yaml".to_string(),
        };

        assert!(error.is_file_not_found());
        assert!(!error.is_file_read());
    }
}
