// Core Domain
// スキーマモデル、型、デフォルト値の正規化、バージョン比較、設定とエラーの純粋なロジック

pub mod column_type;
pub mod config;
pub mod default_value;
pub mod error;
pub mod naming;
pub mod schema;
pub mod version;
