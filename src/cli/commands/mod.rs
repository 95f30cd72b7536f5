// コマンドハンドラー層
// 各CLIコマンドの実装

pub mod dump;
pub mod migrate;
pub mod status;

use crate::adapters::db_management::DbManagement;
use anyhow::{anyhow, Context, Result};

/// サーバーへ接続し、対象データベースが存在すれば選択する
///
/// # Returns
///
/// データベースを選択できた場合は true、存在しない場合は false
pub(crate) async fn connect_existing(db: &mut dyn DbManagement) -> Result<bool> {
    db.connect()
        .await
        .with_context(|| "Failed to connect to database server")?;

    if !db
        .database_exists()
        .await
        .with_context(|| "Failed to check database existence")?
    {
        return Ok(false);
    }

    db.select_database()
        .await
        .with_context(|| "Failed to select database")?;
    Ok(true)
}

/// 対象データベースが存在しない場合のエラー
pub(crate) fn missing_database(name: &str) -> anyhow::Error {
    anyhow!(
        "Database '{}' does not exist. Run `migrate` to create it.",
        name
    )
}
