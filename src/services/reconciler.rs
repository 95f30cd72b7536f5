// スキーマ調整サービス
//
// 宣言テーブルとイントロスペクションした現行テーブルを比較し、
// 収束に必要なDDLを順序どおりに実行（または dry-run で記録）します。
// バージョンの全ステップが成功した後にだけ台帳を更新します。

use crate::adapters::db_management::DbManagement;
use crate::adapters::dialect::{
    convert_table, not_identical, ColumnManagement, IdentityTransition, PrimaryKeyMember,
    TableManagement, DIFF_PRIMARY,
};
use crate::core::error::ReconcileError;
use crate::core::naming::{Track, INITIAL_VERSION, LEDGER_VALUE};
use crate::core::schema::{State, Statement, Step, Table};
use crate::core::version::is_newer;
use std::collections::HashMap;
use tracing::{debug, info};

/// スキーマ調整サービス
///
/// 発行したDDL（dry-run 時は注釈を含む）を順に記録します。
pub struct Reconciler<'a> {
    db: &'a mut dyn DbManagement,
    journal: Vec<String>,
}

/// 列名の比較（大文字小文字を区別しない）
fn same_name(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// 宣言カラムに対応する現行カラム
///
/// 変更後の名前で一致するものを優先します。
fn find_current<'c>(
    current: &'c [Box<dyn ColumnManagement>],
    target: &dyn ColumnManagement,
) -> Option<&'c dyn ColumnManagement> {
    current
        .iter()
        .find(|c| same_name(c.name(), target.new_name()))
        .or_else(|| current.iter().find(|c| same_name(c.name(), target.name())))
        .map(|c| c.as_ref())
}

/// 現行カラムに対応する宣言カラム
fn find_target<'t>(
    target: &'t [Box<dyn ColumnManagement>],
    current: &dyn ColumnManagement,
) -> Option<&'t dyn ColumnManagement> {
    target
        .iter()
        .find(|t| same_name(t.new_name(), current.name()))
        .or_else(|| target.iter().find(|t| same_name(t.name(), current.name())))
        .map(|t| t.as_ref())
}

/// 名前変更と属性変更（主キー所属を除く）の有無
fn needs_update(current: &dyn ColumnManagement, target: &dyn ColumnManagement) -> bool {
    let mask = not_identical(current, target) & !DIFF_PRIMARY;
    mask != 0 || !same_name(current.name(), target.new_name())
}

/// 現行と宣言の identity カラムから遷移を判定
///
/// # Returns
///
/// 遷移が不要な場合は `None`。どちらかに identity カラムが複数ある場合はエラー。
pub fn classify_identity_transition<'a>(
    table: &str,
    current: &'a [Box<dyn ColumnManagement>],
    target: &'a [Box<dyn ColumnManagement>],
) -> Result<Option<IdentityTransition<'a>>, ReconcileError> {
    let current_identity: Vec<&dyn ColumnManagement> = current
        .iter()
        .filter(|c| c.is_identity())
        .map(|c| c.as_ref())
        .collect();
    let target_identity: Vec<&dyn ColumnManagement> = target
        .iter()
        .filter(|c| c.is_identity())
        .map(|c| c.as_ref())
        .collect();

    if current_identity.len() > 1 || target_identity.len() > 1 {
        return Err(ReconcileError::UnsupportedIdentityChange {
            table: table.to_string(),
            message: format!(
                "multiple identity columns (current: {}, target: {})",
                current_identity.len(),
                target_identity.len()
            ),
        });
    }

    let transition = match (current_identity.first(), target_identity.first()) {
        (None, None) => None,
        (None, Some(&target_column)) => match find_current(current, target_column) {
            Some(current_column) => Some(IdentityTransition::Convert {
                current: current_column,
                target: target_column,
            }),
            None => Some(IdentityTransition::AddColumn {
                target: target_column,
            }),
        },
        (Some(&released), None) => Some(IdentityTransition::Remove {
            released,
            retained: find_target(target, released),
        }),
        (Some(&released), Some(&target_column)) => {
            let counterpart = find_current(current, target_column);
            match counterpart {
                Some(current_column) if std::ptr::addr_eq(current_column, released) => {
                    if needs_update(released, target_column) {
                        Some(IdentityTransition::Rename {
                            current: released,
                            target: target_column,
                        })
                    } else {
                        None
                    }
                }
                Some(current_column) => Some(IdentityTransition::Move {
                    released,
                    retained: find_target(target, released),
                    current: current_column,
                    target: target_column,
                }),
                None => Some(IdentityTransition::Replace {
                    released,
                    retained: find_target(target, released),
                    target: target_column,
                }),
            }
        }
    };

    Ok(transition)
}

impl<'a> Reconciler<'a> {
    pub fn new(db: &'a mut dyn DbManagement) -> Self {
        Self {
            db,
            journal: Vec::new(),
        }
    }

    /// 1つのバージョンをトラックへ適用
    ///
    /// # Arguments
    ///
    /// * `state` - `version` のステップを保持した State
    /// * `version` - 宣言バージョン
    /// * `track` - 台帳のトラック
    /// * `drop_columns` - 宣言に無いカラムを削除するかどうか
    ///
    /// # Returns
    ///
    /// 発行したDDL。台帳のバージョンが同じか新しい場合は空
    pub async fn ensure_state(
        &mut self,
        state: &State,
        version: &str,
        track: Track,
        drop_columns: bool,
    ) -> Result<Vec<String>, ReconcileError> {
        let stored = self
            .db
            .get_version(track, LEDGER_VALUE, INITIAL_VERSION)
            .await?;

        if !is_newer(version, &stored)? {
            debug!(%track, version, stored = %stored, "version already applied");
            return Ok(Vec::new());
        }

        info!(%track, version, stored = %stored, "applying schema version");

        for step in state.steps(version) {
            match step {
                Step::Statement(statement) => self.ensure_statement(statement, version).await?,
                Step::Table(table) => self.ensure_table(table, drop_columns).await?,
            }
        }

        self.db.set_version(track, LEDGER_VALUE, version).await?;
        Ok(std::mem::take(&mut self.journal))
    }

    async fn run(&mut self, statements: Vec<String>) -> Result<(), ReconcileError> {
        for sql in statements {
            self.db.execute(&sql).await?;
            self.journal.push(sql);
        }
        Ok(())
    }

    /// dry-run の出力へ注釈を追加
    fn annotate(&mut self, comment: String) {
        if self.db.is_dry_run() {
            self.db.annotate(&comment);
            self.journal.push(format!("/*{}*/", comment));
        }
    }

    /// 個別ステートメントを1度だけ実行
    async fn ensure_statement(
        &mut self,
        statement: &Statement,
        version: &str,
    ) -> Result<(), ReconcileError> {
        let hash = statement.name();
        if self.db.statement_completed(&hash, version).await? {
            debug!(hash = %hash, version, "statement already completed");
            return Ok(());
        }

        self.run(vec![statement.sql().to_string()]).await?;
        self.db.set_version(Track::Statement, &hash, version).await?;
        Ok(())
    }

    /// テーブルを宣言どおりに収束させる
    pub async fn ensure_table(
        &mut self,
        table: &Table,
        drop_columns: bool,
    ) -> Result<(), ReconcileError> {
        let target = convert_table(self.db.dialect(), table, self.db.table_defaults());
        let name = target.name().to_string();

        if !self.db.table_exists(&name).await? {
            info!(table = %name, "creating table");
            return self.run(target.create_statements()).await;
        }

        let current_comment = self.db.table_comment(&name).await?;
        if current_comment != target.comment() {
            debug!(table = %name, "updating table comment");
            self.run(target.comment_statements()).await?;
        }

        let current = self.db.columns(&name).await?;
        let members = self.ensure_columns(target.as_ref(), &current).await?;
        self.ensure_identity(target.as_ref(), &current, &members).await?;
        self.ensure_indices(target.as_ref()).await?;
        self.ensure_foreign_keys(target.as_ref()).await?;

        if drop_columns {
            self.drop_undeclared_columns(target.as_ref(), &current).await?;
        }
        Ok(())
    }

    /// カラムの追加と更新
    ///
    /// 主キー所属が変わるカラムはここでは更新せず、主キー再作成で扱うため返します。
    async fn ensure_columns<'c>(
        &mut self,
        target: &'c dyn TableManagement,
        current: &'c [Box<dyn ColumnManagement>],
    ) -> Result<Vec<PrimaryKeyMember<'c>>, ReconcileError> {
        let table = target.name();

        // インデックスが参照する前にカラムを揃える
        for column in target.columns() {
            if column.is_identity() || find_current(current, column.as_ref()).is_some() {
                continue;
            }
            debug!(table, column = column.new_name(), "adding column");
            self.run(column.add_statements(table)).await?;
        }

        let mut members = Vec::new();
        for column in target.columns() {
            let Some(existing) = find_current(current, column.as_ref()) else {
                continue;
            };
            if existing.is_identity() || column.is_identity() {
                continue;
            }
            if !needs_update(existing, column.as_ref()) {
                continue;
            }

            if not_identical(existing, column.as_ref()) & DIFF_PRIMARY != 0 {
                members.push(PrimaryKeyMember {
                    current: existing,
                    target: column.as_ref(),
                });
                continue;
            }
            debug!(table, column = column.new_name(), "updating column");
            self.run(column.update_statements(table, existing)).await?;
        }
        Ok(members)
    }

    /// identity 遷移、または主キーの再作成
    async fn ensure_identity(
        &mut self,
        target: &dyn TableManagement,
        current: &[Box<dyn ColumnManagement>],
        members: &[PrimaryKeyMember<'_>],
    ) -> Result<(), ReconcileError> {
        let table = target.name();
        let transition = classify_identity_transition(table, current, target.columns())?;

        match transition {
            Some(transition) => {
                info!(table, transition = transition.kind(), "identity transition");
                self.annotate(format!("{}: {}", table, transition.kind()));
                let pk_name = self.db.primary_key_name(table).await?;
                self.run(target.identity_transition_statements(&pk_name, &transition, members))
                    .await
            }
            None => self.ensure_primary_keys(target, current, members).await,
        }
    }

    /// 主キーのカラム集合が異なる場合だけ再作成
    ///
    /// 所属が変わるカラムの更新は、主キーの削除と追加の間に挟みます。
    async fn ensure_primary_keys(
        &mut self,
        target: &dyn TableManagement,
        current: &[Box<dyn ColumnManagement>],
        members: &[PrimaryKeyMember<'_>],
    ) -> Result<(), ReconcileError> {
        let table = target.name();

        let renames: HashMap<String, String> = target
            .columns()
            .iter()
            .filter_map(|column| {
                find_current(current, column.as_ref())
                    .map(|c| (c.name().to_lowercase(), column.new_name().to_string()))
            })
            .collect();

        let mut current_pk: Vec<String> = self
            .db
            .primary_key_columns(table)
            .await?
            .into_iter()
            .map(|c| {
                renames
                    .get(&c.to_lowercase())
                    .cloned()
                    .unwrap_or(c)
                    .to_lowercase()
            })
            .collect();
        let mut target_pk: Vec<String> = target
            .primary_key_columns()
            .into_iter()
            .map(|c| c.to_lowercase())
            .collect();
        current_pk.sort();
        target_pk.sort();

        if current_pk == target_pk {
            for member in members {
                debug!(table, column = member.target.new_name(), "updating column");
                self.run(member.target.update_statements(table, member.current))
                    .await?;
            }
            return Ok(());
        }

        info!(table, members = members.len(), "recreating primary key");
        let pk_name = self.db.primary_key_name(table).await?;
        self.run(target.primary_key_statements(&pk_name, members))
            .await
    }

    /// インデックスの削除・再作成・追加
    async fn ensure_indices(&mut self, target: &dyn TableManagement) -> Result<(), ReconcileError> {
        let table = target.name();
        let current = self.db.indices(table).await?;

        for index in &current {
            if !target.indices().iter().any(|t| same_name(t.name(), index.name())) {
                debug!(table, index = index.name(), "dropping index");
                self.run(index.drop_statements(table)).await?;
            }
        }

        for index in target.indices() {
            match current.iter().find(|c| same_name(c.name(), index.name())) {
                Some(existing) if index.differs_from(existing.as_ref()) => {
                    debug!(table, index = index.name(), "recreating index");
                    self.run(existing.drop_statements(table)).await?;
                    self.run(index.add_statements(table)).await?;
                }
                Some(_) => {}
                None => {
                    debug!(table, index = index.name(), "adding index");
                    self.run(index.add_statements(table)).await?;
                }
            }
        }
        Ok(())
    }

    /// 外部キーの削除・追加（ソースカラム単位で比較）
    async fn ensure_foreign_keys(
        &mut self,
        target: &dyn TableManagement,
    ) -> Result<(), ReconcileError> {
        let table = target.name();
        let current = self.db.foreign_keys(table).await?;

        for foreign_key in &current {
            let declared = target
                .foreign_keys()
                .iter()
                .find(|t| same_name(t.column(), foreign_key.column()));
            match declared {
                Some(declared) if declared.spec().same_reference(foreign_key.spec()) => {}
                Some(declared) => {
                    self.annotate(format!(
                        "{}: replace foreign key {}",
                        table,
                        foreign_key.spec().name
                    ));
                    self.run(foreign_key.drop_statements(table)).await?;
                    self.run(declared.add_statements(table)).await?;
                }
                None => {
                    self.annotate(format!(
                        "{}: drop foreign key {}",
                        table,
                        foreign_key.spec().name
                    ));
                    self.run(foreign_key.drop_statements(table)).await?;
                }
            }
        }

        for foreign_key in target.foreign_keys() {
            if current.iter().any(|c| same_name(c.column(), foreign_key.column())) {
                continue;
            }
            self.annotate(format!(
                "{}: add foreign key {}",
                table,
                foreign_key.spec().name
            ));
            self.run(foreign_key.add_statements(table)).await?;
        }
        Ok(())
    }

    /// 宣言に無いカラムを削除
    ///
    /// identity 遷移で削除済みのカラムは対象外です。
    async fn drop_undeclared_columns(
        &mut self,
        target: &dyn TableManagement,
        current: &[Box<dyn ColumnManagement>],
    ) -> Result<(), ReconcileError> {
        let table = target.name();
        for column in current {
            if column.is_identity() || find_target(target.columns(), column.as_ref()).is_some() {
                continue;
            }
            debug!(table, column = column.name(), "dropping column");
            self.run(column.drop_statements(table)).await?;
        }
        Ok(())
    }
}
