// SchemaSetupServiceの統合テスト

mod common;

use bedrock::adapters::db_management::DbManagement;
use bedrock::core::config::UserTableConfig;
use bedrock::core::naming::{Track, LEDGER_VALUE};
use bedrock::services::base_schema::BaseSchema;
use bedrock::services::schema_loader::YamlSchemaSource;
use bedrock::services::setup::{SchemaSetupService, SEPARATOR};
use common::FakeDatabase;

const APPLICATION: &str = r#"
versions:
  - version: "1.0.0"
    steps:
      - table:
          name: widgets
          columns:
            - name: id
              type: int
              primary: true
              identity: true
            - name: name
              type: varchar
              length: 64
"#;

fn framework() -> BaseSchema {
    BaseSchema::new("bs_schema", UserTableConfig::default())
}

fn application() -> YamlSchemaSource {
    APPLICATION.parse().unwrap()
}

#[tokio::test]
async fn test_run_prints_headers_per_version() {
    let mut db = FakeDatabase::new();
    let service = SchemaSetupService::new();

    let output = service
        .run(&mut db, &framework(), &application())
        .await
        .unwrap();

    let framework_header = output
        .iter()
        .position(|l| l == "/* Changes for Framework Schema Version: 1.0.0 */")
        .unwrap();
    let separator = output.iter().position(|l| l == SEPARATOR).unwrap();
    let application_header = output
        .iter()
        .position(|l| l == "/* Changes for Application Schema Version: 1.0.0 */")
        .unwrap();

    assert_eq!(framework_header, 0);
    assert!(separator < application_header);
    assert!(output[1].starts_with("CREATE TABLE `bs_schema`"));
    assert!(output[1].ends_with(';'));
    assert!(output
        .contains(&"/* Changes for Framework Schema Version: 1.0.2 */".to_string()));

    assert_eq!(db.stored_version(Track::Framework, LEDGER_VALUE), Some("1.0.2"));
    assert_eq!(
        db.stored_version(Track::Application, LEDGER_VALUE),
        Some("1.0.0")
    );
}

#[tokio::test]
async fn test_run_is_silent_when_up_to_date() {
    let mut db = FakeDatabase::new()
        .with_version(Track::Framework, LEDGER_VALUE, "1.0.2")
        .with_version(Track::Application, LEDGER_VALUE, "1.0.0");
    let service = SchemaSetupService::new();

    let output = service
        .run(&mut db, &framework(), &application())
        .await
        .unwrap();

    assert!(output.is_empty());
    assert!(db.executed().is_empty());
}

#[tokio::test]
async fn test_application_output_has_no_separator_when_framework_is_current() {
    let mut db = FakeDatabase::new().with_version(Track::Framework, LEDGER_VALUE, "1.0.2");
    let service = SchemaSetupService::new();

    let output = service
        .run(&mut db, &framework(), &application())
        .await
        .unwrap();

    assert_eq!(
        output[0],
        "/* Changes for Application Schema Version: 1.0.0 */"
    );
    assert!(!output.iter().any(|l| l == SEPARATOR));
}

#[tokio::test]
async fn test_pending_changes_do_not_touch_ledger() {
    let mut db = FakeDatabase::new();
    let service = SchemaSetupService::new();

    let pending = service
        .pending_changes(&mut db, &framework(), &application())
        .await
        .unwrap();

    assert!(!pending.is_empty());
    assert!(db.executed().is_empty());
    assert!(!db.is_dry_run());
    assert!(db.take_dry_run_statements().is_empty());
    assert_eq!(db.stored_version(Track::Framework, LEDGER_VALUE), None);

    let versions = service.current_versions(&db).await.unwrap();
    assert_eq!(versions.framework, "v0.0.0");
    assert_eq!(versions.application, "v0.0.0");
}

#[tokio::test]
async fn test_current_versions_reads_both_tracks() {
    let db = FakeDatabase::new()
        .with_version(Track::Framework, LEDGER_VALUE, "1.0.1")
        .with_version(Track::Application, LEDGER_VALUE, "2.3.0");

    let versions = SchemaSetupService::new().current_versions(&db).await.unwrap();

    assert_eq!(versions.framework, "1.0.1");
    assert_eq!(versions.application, "2.3.0");
}
