/// 設定ファイル管理機能のテスト
///
/// 設定ファイルの読み込み、検証、環境別設定と環境変数による上書きが
/// 正しく動作することを確認します。

#[cfg(test)]
mod config_tests {
    use bedrock::core::config::{AuthenticationTarget, Config, Dialect};
    use bedrock::services::config_loader::ConfigLoader;
    use bedrock::services::database_config_resolver::DatabaseConfigResolver;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const FULL: &str = r#"
version: "1.0"
dialect: mysql
ledger_table: app_ledger
collate: utf8mb4_bin
charset: utf8mb4
schema_file: db/schema.yaml

user_table:
  table: accounts
  user_id: account_id
  authentication: external

environments:
  development:
    host: localhost
    port: 3306
    database: bedrock_dev
    user: root
    password: secret

  production:
    host: prod.example.com
    database: bedrock_prod
    user: app_user
"#;

    /// すべての項目をデシリアライズできることを確認
    #[test]
    fn test_config_deserialization() {
        let config: Config = FULL.parse().unwrap();

        assert_eq!(config.version, "1.0");
        assert_eq!(config.dialect, Dialect::MySQL);
        assert_eq!(config.ledger_table, "app_ledger");
        assert_eq!(config.effective_collate(), "utf8mb4_bin");
        assert_eq!(config.schema_file, Path::new("db/schema.yaml"));
        assert_eq!(config.user_table.table, "accounts");
        assert_eq!(config.user_table.user_id, "account_id");
        assert_eq!(
            config.user_table.authentication,
            AuthenticationTarget::External
        );
    }

    /// 省略可能な項目に既定値が入ることを確認
    #[test]
    fn test_config_defaults() {
        let yaml = r#"
version: "1.0"
dialect: postgresql
environments:
  development:
    database: app
"#;
        let config: Config = yaml.parse().unwrap();

        assert_eq!(config.ledger_table, "bs_schema");
        assert_eq!(config.schema_file, Path::new("schema.yaml"));
        assert_eq!(config.effective_collate(), Dialect::PostgreSQL.default_collate());
        assert_eq!(config.effective_charset(), Dialect::PostgreSQL.default_charset());

        let db = config.get_database_config("development").unwrap();
        assert_eq!(db.host, "localhost");
        assert_eq!(db.schema, "public");
        assert_eq!(db.port_for(Dialect::PostgreSQL), 5432);
    }

    /// 環境別のデータベース設定を取得できることを確認
    #[test]
    fn test_get_database_config_for_environment() {
        let config: Config = FULL.parse().unwrap();

        let dev = config.get_database_config("development").unwrap();
        assert_eq!(dev.port, Some(3306));
        assert_eq!(dev.database, "bedrock_dev");

        let prod = config.get_database_config("production").unwrap();
        assert_eq!(prod.host, "prod.example.com");
        assert_eq!(prod.port_for(Dialect::MySQL), 3306);
    }

    /// 存在しない環境名でエラーが返されることを確認
    #[test]
    fn test_get_nonexistent_environment() {
        let config: Config = FULL.parse().unwrap();
        let err = config.get_database_config("staging").unwrap_err();
        assert!(err.to_string().contains("staging"));
    }

    /// 未知の方言はパースエラー
    #[test]
    fn test_unknown_dialect_is_rejected() {
        let yaml = r#"
version: "1.0"
dialect: sqlite
environments:
  development:
    database: app
"#;
        assert!(yaml.parse::<Config>().is_err());
    }

    /// 検証エラーを確認
    #[test]
    fn test_validation_errors() {
        let mut config: Config = FULL.parse().unwrap();
        config.ledger_table = " ".to_string();
        assert!(config.validate().is_err());

        let mut config: Config = FULL.parse().unwrap();
        config.environments.clear();
        assert!(config.validate().is_err());

        let mut config: Config = FULL.parse().unwrap();
        if let Some(db) = config.environments.get_mut("development") {
            db.database = String::new();
        }
        assert!(config.validate().is_err());
    }

    /// ファイルから読み込んで検証することを確認
    #[test]
    fn test_config_loader_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".bedrock.yaml");
        fs::write(&path, FULL).unwrap();

        let config = ConfigLoader::from_file(&path).unwrap();
        assert_eq!(config.environments.len(), 2);

        assert!(ConfigLoader::from_file(&dir.path().join("missing.yaml")).is_err());
    }

    /// 環境変数相当の上書きを確認
    #[test]
    fn test_overrides_replace_selected_fields() {
        let config: Config = FULL.parse().unwrap();
        let base = config.get_database_config("development").unwrap();

        let resolved = DatabaseConfigResolver::apply_overrides(&base, |key| match key {
            "DB_HOST" => Some("db.internal".to_string()),
            "DB_PORT" => Some("13306".to_string()),
            _ => None,
        });

        assert_eq!(resolved.host, "db.internal");
        assert_eq!(resolved.port, Some(13306));
        assert_eq!(resolved.database, "bedrock_dev");
        assert_eq!(resolved.password.as_deref(), Some("secret"));
    }
}
