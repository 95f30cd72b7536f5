// フレームワークスキーマ
//
// フレームワーク自身が所有するテーブル（台帳、ユーザー設定、ユーザー、キュー）の
// バージョン付き宣言です。ユーザーテーブルは設定のフィールド名から組み立てます。

use crate::core::column_type::{ColumnLength, ColumnType};
use crate::core::config::UserTableConfig;
use crate::core::error::DeclarationError;
use crate::core::schema::{Column, SchemaSource, State, Table};

/// 宣言済みバージョン
const VERSIONS: [&str; 3] = ["1.0.0", "1.0.1", "1.0.2"];

/// フレームワークスキーマ
#[derive(Debug, Clone)]
pub struct BaseSchema {
    ledger_table: String,
    user_table: UserTableConfig,
}

fn varchar(name: &str, length: u32) -> Column {
    Column::new(name, ColumnType::Varchar).with_length(ColumnLength::Size(length))
}

fn flag(name: &str) -> Column {
    Column::new(name, ColumnType::TinyInt)
        .with_length(ColumnLength::Size(1))
        .with_default("0")
}

impl BaseSchema {
    pub fn new(ledger_table: impl Into<String>, user_table: UserTableConfig) -> Self {
        Self {
            ledger_table: ledger_table.into(),
            user_table,
        }
    }

    /// 台帳テーブル
    fn ledger(&self) -> Table {
        Table::new(&self.ledger_table)
            .column(Column::new("id", ColumnType::Int).primary().identity())
            .column(varchar("type", 256))
            .column(varchar("value", 256))
            .column(varchar("version", 256))
            .column(
                Column::new("done", ColumnType::TinyInt)
                    .with_length(ColumnLength::Size(4))
                    .nullable(true),
            )
    }

    fn user_settings() -> Table {
        let key = |name: &str| varchar(name, 64).nullable(false).primary().with_default("");
        Table::new("tbl_User_Settings")
            .column(key("Tab"))
            .column(key("Cell"))
            .column(key("Type"))
            .column(key("Item"))
            .column(varchar("Value", 64).nullable(true))
            .column(Column::new("User_ID", ColumnType::Int).primary())
    }

    /// 設定のフィールド名からユーザーテーブルを組み立てる
    fn user(&self) -> Result<Table, DeclarationError> {
        let config = &self.user_table;
        let mut table = Table::new(&config.table);

        let id = Column::declare(&config.user_id, &config.user_id_type)?;
        let id = if id.column_type() == ColumnType::Varchar {
            id.with_length(ColumnLength::Size(256)).nullable(false).primary()
        } else {
            id.nullable(false).primary().identity()
        };
        table = table.column(id);

        let username = Column::declare(&config.username, &config.username_type)?;
        let username = if username.column_type() == ColumnType::Varchar {
            username.with_length(ColumnLength::Size(256))
        } else {
            username
        };
        table = table.column(username.nullable(true));

        if !config.access_control_target.is_empty() {
            table = table.column(varchar(&config.access_control_target, 8).nullable(false));
        }
        table = table
            .column(flag(&config.grant_login))
            .column(varchar(&config.authentication_target, 16).nullable(true));
        if config.authentication.uses_local_password() {
            table = table.column(varchar(&config.local_password, 256).nullable(false));
        }
        table = table
            .column(flag(&config.service_account))
            .column(varchar(&config.last_tab, 256).nullable(true));

        if !config.last_login.is_empty() {
            table = table.column(Column::new(&config.last_login, ColumnType::DateTime));
        }
        if !config.login_count.is_empty() {
            table = table.column(Column::new(&config.login_count, ColumnType::Int));
        }
        if !config.password_expires.is_empty() {
            table = table
                .column(
                    Column::new(&config.password_expires, ColumnType::TinyInt)
                        .with_length(ColumnLength::Size(1)),
                )
                .column(Column::new(&config.password_last_change, ColumnType::Date))
                .column(Column::new(&config.password_expires_after_days, ColumnType::Int));
        }
        Ok(table)
    }

    fn queue(with_job_state: bool) -> Table {
        let mut table = Table::new("bs_queue")
            .column(Column::new("id", ColumnType::Int).primary().identity())
            .column(varchar("class", 512))
            .column(varchar("data", 12288))
            .column(varchar("queue", 256))
            .column(Column::new("tries", ColumnType::Int));
        if with_job_state {
            table = table.column(varchar("jobState", 16));
        }
        table.column(Column::new("createdOn", ColumnType::DateTime))
    }
}

impl SchemaSource for BaseSchema {
    fn versions(&self) -> Vec<String> {
        VERSIONS.iter().map(|v| v.to_string()).collect()
    }

    fn populate(&self, state: &mut State, version: &str) -> Result<(), DeclarationError> {
        state.set_version(version);
        match version {
            "1.0.0" => {
                state.add_table(self.ledger());
                state.add_table(Self::user_settings());
                state.add_table(self.user()?);
            }
            "1.0.1" => state.add_table(Self::queue(false)),
            "1.0.2" => state.add_table(Self::queue(true)),
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AuthenticationTarget;
    use crate::core::schema::Step;

    fn tables(schema: &BaseSchema, version: &str) -> Vec<Table> {
        let mut state = State::new();
        schema.populate(&mut state, version).unwrap();
        state
            .steps(version)
            .iter()
            .filter_map(|step| match step {
                Step::Table(table) => Some(table.clone()),
                Step::Statement(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_versions_are_ascending() {
        let schema = BaseSchema::new("bs_schema", UserTableConfig::default());
        assert_eq!(schema.versions(), vec!["1.0.0", "1.0.1", "1.0.2"]);
    }

    #[test]
    fn test_initial_version_declares_ledger_and_user_tables() {
        let schema = BaseSchema::new("bs_schema", UserTableConfig::default());
        let tables = tables(&schema, "1.0.0");

        let names: Vec<&str> = tables.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["bs_schema", "tbl_User_Settings", "tbl_User"]);

        let ledger = &tables[0];
        let id = ledger.get_column("id").unwrap();
        assert!(id.is_identity() && id.is_primary());
        assert!(ledger.get_column("done").unwrap().is_nullable());
    }

    #[test]
    fn test_user_table_omits_password_for_external_authentication() {
        let config = UserTableConfig {
            authentication: AuthenticationTarget::External,
            ..UserTableConfig::default()
        };
        let schema = BaseSchema::new("bs_schema", config);
        let user = tables(&schema, "1.0.0").remove(2);

        assert!(user.get_column("LocalPassword").is_none());
        assert!(user.get_column("GrantLogin").is_some());
    }

    #[test]
    fn test_user_table_with_varchar_id_has_no_identity() {
        let config = UserTableConfig {
            user_id_type: "varchar".to_string(),
            ..UserTableConfig::default()
        };
        let schema = BaseSchema::new("bs_schema", config);
        let user = tables(&schema, "1.0.0").remove(2);

        let id = user.get_column("User_ID").unwrap();
        assert!(id.is_primary());
        assert!(!id.is_identity());
    }

    #[test]
    fn test_queue_gains_job_state() {
        let schema = BaseSchema::new("bs_schema", UserTableConfig::default());

        assert!(tables(&schema, "1.0.1")[0].get_column("jobState").is_none());
        assert!(tables(&schema, "1.0.2")[0].get_column("jobState").is_some());
    }

    #[test]
    fn test_unknown_version_has_no_steps() {
        let schema = BaseSchema::new("bs_schema", UserTableConfig::default());
        assert!(tables(&schema, "9.9.9").is_empty());
    }
}
