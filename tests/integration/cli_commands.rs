//! CLI commands run through the route table against a temporary workspace.

use record_hooks::cli::{map_error, Commands, OutputFormat, RunContext};
use record_hooks::config::HooksConfig;
use record_hooks::query::ColumnSet;
use record_hooks::store::RecordStore;
use record_hooks::{HooksError, Record};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tempfile::TempDir;
use uuid::Uuid;

struct Workspace {
    temp: TempDir,
    ctx: RunContext,
}

impl Workspace {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let ctx = RunContext::with_config(temp.path().to_path_buf(), HooksConfig::default()).unwrap();
        Self { temp, ctx }
    }

    fn file(&self, name: &str, body: &str) -> PathBuf {
        let path = self.temp.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn run(&self, command: Commands) -> Result<String, HooksError> {
        self.ctx.execute(&command)
    }
}

#[test]
fn test_put_updates_existing_record() {
    let ws = Workspace::new();
    let id = Uuid::from_u128(42);
    let create = ws.file(
        "product.json",
        &format!(
            r#"{{"type_name": "product", "id": "{}", "attributes": {{"name": {{"Text": "Anvil"}}, "weight": {{"Decimal": "2.5"}}}}}}"#,
            id
        ),
    );
    assert_eq!(
        ws.run(Commands::Put { file: create }).unwrap(),
        format!("Created product {}", id)
    );

    let update = ws.file(
        "product-weight.json",
        &format!(
            r#"{{"type_name": "product", "id": "{}", "attributes": {{"weight": {{"Decimal": "3"}}}}}}"#,
            id
        ),
    );
    assert_eq!(
        ws.run(Commands::Put { file: update }).unwrap(),
        format!("Updated product {}", id)
    );

    let json = ws
        .run(Commands::Get {
            type_name: "product".to_string(),
            id,
            format: OutputFormat::Json,
        })
        .unwrap();
    let record: Record = serde_json::from_str(&json).unwrap();
    assert_eq!(record.require::<String>("name").unwrap(), "Anvil");
    assert_eq!(record.require::<Decimal>("weight").unwrap(), Decimal::from(3));
}

#[test]
fn test_query_with_fetch_file() {
    let ws = Workspace::new();
    for (name, city) in [("Contoso", "Oslo"), ("Fabrikam", "Bergen"), ("Tailspin", "Oslo")] {
        ws.ctx
            .store()
            .create(&Record::new("account").with("name", name).with("address1_city", city))
            .unwrap();
    }
    let fetch = ws.file(
        "oslo.xml",
        r#"<fetch><entity name="account"><attribute name="name"/><filter><condition attribute="address1_city" operator="eq" value="oslo"/></filter><order attribute="name"/></entity></fetch>"#,
    );
    let json = ws
        .run(Commands::Query {
            type_name: "account".to_string(),
            conditions: vec![],
            fetch: Some(fetch),
            columns: vec![],
            format: OutputFormat::Json,
        })
        .unwrap();
    let records: Vec<Record> = serde_json::from_str(&json).unwrap();
    let names: Vec<String> = records.iter().map(|r| r.require("name").unwrap()).collect();
    assert_eq!(names, vec!["Contoso", "Tailspin"]);
    assert!(records.iter().all(|r| !r.contains("address1_city")));
}

#[test]
fn test_dispatch_account_create_event() {
    let ws = Workspace::new();
    let id = ws
        .ctx
        .store()
        .create(&Record::new("account").with("name", "Barbara Liskov"))
        .unwrap();
    let event = ws.file(
        "event.json",
        &format!(
            r#"{{
  "message": "Create",
  "primary_entity": "account",
  "input": {{"Target": {{"Record": {{"type_name": "account", "attributes": {{"name": {{"Text": "Barbara Liskov"}}}}}}}}}},
  "output": {{"id": {{"Value": {{"Guid": "{}"}}}}}}
}}"#,
            id
        ),
    );
    let out = ws
        .run(Commands::Dispatch {
            file: event,
            format: OutputFormat::Text,
        })
        .unwrap();
    assert!(out.starts_with("Handlers run: contact_mirror.create"));
    assert!(out.contains("Entered contact_mirror.create"));

    let account = ws.ctx.store().retrieve("account", id, &ColumnSet::All).unwrap();
    assert!(account.contains("primarycontactid"));
}

#[test]
fn test_dispatch_rejection_surfaces_handler_trace() {
    let ws = Workspace::new();
    ws.ctx
        .store()
        .create(&Record::new("contact").with("firstname", "Ada").with("lastname", "Lovelace"))
        .unwrap();
    let event = ws.file(
        "duplicate.json",
        r#"{
  "message": "Create",
  "primary_entity": "contact",
  "stage": "pre_validation",
  "input": {"Target": {"Record": {"type_name": "contact", "attributes": {"firstname": {"Text": "Ada"}, "lastname": {"Text": "Lovelace"}}}}}
}"#,
    );
    let err = ws
        .run(Commands::Dispatch {
            file: event,
            format: OutputFormat::Json,
        })
        .unwrap_err();
    let shown = map_error(&err);
    assert!(shown.contains("A contact with the name 'Ada Lovelace' already exists."));
    assert!(shown.contains("\nTrace:\n  Entered duplicate_guard"));
}

#[test]
fn test_get_missing_record_and_bad_input() {
    let ws = Workspace::new();
    let err = ws
        .run(Commands::Get {
            type_name: "account".to_string(),
            id: Uuid::from_u128(7),
            format: OutputFormat::Text,
        })
        .unwrap_err();
    assert!(matches!(err, HooksError::Store(_)));

    let broken = ws.file("broken.json", "{\"type_name\": ");
    let err = ws.run(Commands::Put { file: broken }).unwrap_err();
    assert!(matches!(err, HooksError::InvalidInput(_)));
}
