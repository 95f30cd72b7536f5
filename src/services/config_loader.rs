// 設定ファイル読み込みサービス
//
// core::config の純粋性を保つため、ファイルI/Oと検証はこのサービスに集約する。

use crate::core::config::Config;
use anyhow::{Context, Result};
use std::path::Path;

/// 設定ファイル読み込みサービス
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// YAMLファイルから設定を読み込み、検証する
    pub fn from_file(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = content.parse()?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {:?}", path))?;
        Ok(config)
    }

    /// デフォルトパスから設定を読み込む
    pub fn load_default() -> Result<Config> {
        Self::from_file(Path::new(Config::DEFAULT_CONFIG_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_from_file_parses_and_validates() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "version: \"1.0\"\ndialect: mysql\nenvironments:\n  development:\n    database: app\n"
        )
        .unwrap();

        let config = ConfigLoader::from_file(file.path()).unwrap();

        assert_eq!(config.ledger_table, "bs_schema");
        assert!(config.environments.contains_key("development"));
    }

    #[test]
    fn test_from_file_rejects_invalid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "version: \"\"\ndialect: mysql\nenvironments: {{}}\n").unwrap();

        assert!(ConfigLoader::from_file(file.path()).is_err());
    }

    #[test]
    fn test_from_file_missing() {
        assert!(ConfigLoader::from_file(Path::new("/nonexistent/.bedrock.yaml")).is_err());
    }
}
