// データベース設定の解決サービス
//
// 環境変数による上書きをサービス層で扱い、coreは純粋な構造体に保つ。

use crate::core::config::DatabaseConfig;

/// データベース設定の解決ユーティリティ
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfigResolver;

impl DatabaseConfigResolver {
    /// 環境変数による上書きを適用
    pub fn apply_env_overrides(base: &DatabaseConfig) -> DatabaseConfig {
        Self::apply_overrides(base, |key| std::env::var(key).ok())
    }

    /// 任意の値の取得元で上書きを適用
    ///
    /// # Arguments
    ///
    /// * `base` - 設定ファイルの値
    /// * `lookup` - `DB_HOST` などのキーから値を返す関数
    pub fn apply_overrides<F>(base: &DatabaseConfig, lookup: F) -> DatabaseConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = base.clone();

        if let Some(host) = lookup("DB_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("DB_PORT") {
            if let Ok(port_num) = port.parse::<u16>() {
                config.port = Some(port_num);
            }
        }
        if let Some(database) = lookup("DB_DATABASE") {
            config.database = database;
        }
        if let Some(user) = lookup("DB_USER") {
            config.user = Some(user);
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            config.password = Some(password);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base() -> DatabaseConfig {
        DatabaseConfig {
            host: "localhost".to_string(),
            port: Some(3306),
            database: "app".to_string(),
            schema: "public".to_string(),
            user: None,
            password: None,
            timeout: None,
        }
    }

    #[test]
    fn test_overrides_replace_values() {
        let env: HashMap<&str, &str> = [
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "13306"),
            ("DB_USER", "admin"),
        ]
        .into_iter()
        .collect();

        let config =
            DatabaseConfigResolver::apply_overrides(&base(), |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, Some(13306));
        assert_eq!(config.user.as_deref(), Some("admin"));
        assert_eq!(config.database, "app");
    }

    #[test]
    fn test_invalid_port_is_ignored() {
        let config = DatabaseConfigResolver::apply_overrides(&base(), |k| {
            (k == "DB_PORT").then(|| "not-a-port".to_string())
        });
        assert_eq!(config.port, Some(3306));
    }
}
