// Adapters
// データベース接続、方言ごとのDDL生成、ライブスキーマの管理を抽象化

pub mod connection_string;
pub mod database;
pub mod db_management;
pub mod dialect;
pub mod sql_quote;
