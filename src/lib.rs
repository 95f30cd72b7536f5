// Bedrockライブラリのエントリーポイント
//
// モジュール構造:
// - cli: CLIレイヤー（ユーザー入力の受付とコマンドルーティング）
// - core: コアドメインロジック（スキーマモデル、型、バージョン、設定、エラー）
// - adapters: データベース接続、方言ごとのDDL生成、ライブスキーマの管理
// - services: スキーマの読み込み、調整、セットアップ、ダンプ

pub mod adapters;
pub mod cli;
pub mod core;
pub mod services;
