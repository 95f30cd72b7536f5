// スキーマセットアップサービス
//
// フレームワークスキーマとアプリケーションスキーマの全バージョンを
// 順に Reconciler へ渡し、発行したDDLをバージョン見出し付きで返します。

use crate::adapters::db_management::DbManagement;
use crate::core::error::{DatabaseError, ReconcileError};
use crate::core::naming::{Track, INITIAL_VERSION, LEDGER_VALUE};
use crate::core::schema::{SchemaSource, State};
use crate::services::reconciler::Reconciler;
use tracing::info;

/// フレームワークとアプリケーションの出力を区切る行
pub const SEPARATOR: &str =
    "/* -------------------------------------------------------------------------------- */";

/// 台帳に記録された両トラックのバージョン
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaVersions {
    pub framework: String,
    pub application: String,
}

/// スキーマセットアップサービス
#[derive(Debug, Clone, Default)]
pub struct SchemaSetupService;

impl SchemaSetupService {
    pub fn new() -> Self {
        Self
    }

    /// 両トラックを最新バージョンまで適用
    ///
    /// フレームワークスキーマはカラム削除なし、アプリケーションスキーマは
    /// カラム削除ありで調整します。
    ///
    /// # Arguments
    ///
    /// * `db` - 接続済みの DbManagement
    /// * `framework` - フレームワークスキーマ
    /// * `application` - アプリケーションスキーマ
    ///
    /// # Returns
    ///
    /// 見出し付きのDDL行。適用済みのバージョンは出力しません。
    ///
    /// # Errors
    ///
    /// DDLの実行、イントロスペクション、宣言の読み込みに失敗した場合。
    /// 失敗したバージョンの台帳は更新されません。
    pub async fn run(
        &self,
        db: &mut dyn DbManagement,
        framework: &dyn SchemaSource,
        application: &dyn SchemaSource,
    ) -> Result<Vec<String>, ReconcileError> {
        let mut output = Vec::new();

        for version in framework.versions() {
            let statements =
                Self::ensure_version(db, framework, &version, Track::Framework, false).await?;
            if !statements.is_empty() {
                output.push(format!(
                    "/* Changes for Framework Schema Version: {} */",
                    version
                ));
                output.extend(statements.into_iter().map(terminate));
            }
        }

        for version in application.versions() {
            let statements =
                Self::ensure_version(db, application, &version, Track::Application, true).await?;
            if !statements.is_empty() {
                if !output.is_empty() {
                    output.push(SEPARATOR.to_string());
                }
                output.push(format!(
                    "/* Changes for Application Schema Version: {} */",
                    version
                ));
                output.extend(statements.into_iter().map(terminate));
            }
        }

        info!(lines = output.len(), "schema setup finished");
        Ok(output)
    }

    /// 未適用の変更を dry-run で取得
    ///
    /// 空であればスキーマは最新です。dry-run の状態は呼び出し前に戻します。
    pub async fn pending_changes(
        &self,
        db: &mut dyn DbManagement,
        framework: &dyn SchemaSource,
        application: &dyn SchemaSource,
    ) -> Result<Vec<String>, ReconcileError> {
        let previous = db.is_dry_run();
        db.set_dry_run(true);
        let result = self.run(db, framework, application).await;
        db.take_dry_run_statements();
        db.set_dry_run(previous);
        result
    }

    /// 両トラックの台帳バージョンを取得
    pub async fn current_versions(
        &self,
        db: &dyn DbManagement,
    ) -> Result<SchemaVersions, DatabaseError> {
        Ok(SchemaVersions {
            framework: db
                .get_version(Track::Framework, LEDGER_VALUE, INITIAL_VERSION)
                .await?,
            application: db
                .get_version(Track::Application, LEDGER_VALUE, INITIAL_VERSION)
                .await?,
        })
    }

    async fn ensure_version(
        db: &mut dyn DbManagement,
        source: &dyn SchemaSource,
        version: &str,
        track: Track,
        drop_columns: bool,
    ) -> Result<Vec<String>, ReconcileError> {
        let mut state = State::new();
        source.populate(&mut state, version)?;
        Reconciler::new(db)
            .ensure_state(&state, version, track, drop_columns)
            .await
    }
}

/// 出力行の終端（コメント行はそのまま）
fn terminate(statement: String) -> String {
    if statement.starts_with("/*") {
        statement
    } else {
        format!("{};", statement)
    }
}
