// Services Layer
// スキーマ宣言の読み込み、調整、セットアップ、ダンプを行うサービス層

pub mod base_schema;
pub mod config_loader;
pub mod database_config_resolver;
pub mod dto;
pub mod reconciler;
pub mod schema_dump;
pub mod schema_loader;
pub mod setup;
