// 命名ポリシー
//
// アプリケーション名・設定ファイル名・台帳（バージョン管理テーブル）の
// 固定キーの単一ソースを提供します。

/// 現行アプリケーション名
pub const APP_NAME: &str = "bedrock";

/// 既定の設定ファイル名
pub const CONFIG_FILE: &str = ".bedrock.yaml";

/// バイナリ名
pub const BINARY_NAME: &str = "bedrock";

/// 既定の台帳テーブル名
pub const LEDGER_TABLE: &str = "bs_schema";

/// 台帳の固定値キー
pub const LEDGER_VALUE: &str = "version_identifier";

/// 台帳に記録が無い場合の初期バージョン
pub const INITIAL_VERSION: &str = "v0.0.0";

/// バージョン系列（トラック）
///
/// 台帳の `type` 列に格納される値です。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Track {
    /// フレームワーク所有のスキーマ
    Framework,
    /// 利用側アプリケーションのスキーマ
    Application,
    /// 個別ステートメントの実行記録
    Statement,
}

impl Track {
    /// 台帳に格納するキー文字列
    pub fn as_str(&self) -> &'static str {
        match self {
            Track::Framework => "bs_schema",
            Track::Application => "app_schema",
            Track::Statement => "statement",
        }
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
