//! End-to-end dispatch through the built-in handler registry.

use record_hooks::config::HooksConfig;
use record_hooks::context::{OUTPUT_ID, PRE_IMAGE};
use record_hooks::event::Stage;
use record_hooks::handlers::contact_mirror::PRIMARY_CONTACT;
use record_hooks::query::{ColumnSet, Condition, QueryExpression, QuerySpec};
use record_hooks::store::{InMemoryRecordStore, RecordStore, StoreProvider};
use record_hooks::{ContextError, DispatchError, EntityReference, PluginEvent, Record};
use std::sync::Arc;

fn provider(store: &Arc<InMemoryRecordStore>) -> Arc<dyn StoreProvider> {
    Arc::new(Arc::clone(store))
}

fn contacts_named(store: &InMemoryRecordStore, last: &str) -> Vec<Record> {
    let query = QueryExpression::new("contact").with_condition(Condition::equal("lastname", last));
    store
        .retrieve_multiple(&QuerySpec::from(query))
        .unwrap()
        .records
}

#[test]
fn test_account_lifecycle_mirrors_contact() {
    let store = InMemoryRecordStore::shared();
    let dispatcher = HooksConfig::default().dispatcher();

    let account = Record::new("account")
        .with("name", "Grace Hopper")
        .with("emailaddress1", "grace@example.com");
    let id = store.create(&account).unwrap();
    let event = PluginEvent::new("Create", "account")
        .with_target(account)
        .with_output(OUTPUT_ID, id);
    let report = dispatcher.dispatch(event, provider(&store)).unwrap();
    assert_eq!(report.handlers_run, vec!["contact_mirror.create"]);
    assert_eq!(contacts_named(&store, "Hopper").len(), 1);

    let stored = store.retrieve("account", id, &ColumnSet::All).unwrap();
    let contact: EntityReference = stored.require(PRIMARY_CONTACT).unwrap();
    let event = PluginEvent::new("Delete", "account")
        .with_target_reference(stored.to_reference())
        .with_pre_image(PRE_IMAGE, stored);
    dispatcher.dispatch(event, provider(&store)).unwrap();
    assert!(store.retrieve("contact", contact.id, &ColumnSet::All).is_err());
}

#[test]
fn test_duplicate_contact_is_blocked_before_validation_completes() {
    let store = InMemoryRecordStore::shared();
    store
        .create(&Record::new("contact").with("firstname", "Alan").with("lastname", "Turing"))
        .unwrap();
    let dispatcher = HooksConfig::default().dispatcher();

    let incoming = Record::new("contact").with("firstname", "alan").with("lastname", "TURING");
    let event = PluginEvent::new("Create", "contact")
        .with_stage(Stage::PreValidation)
        .with_target(incoming);
    match dispatcher.dispatch(event, provider(&store)).unwrap_err() {
        DispatchError::HandlerFailed {
            handler,
            message,
            source,
            trace,
        } => {
            assert_eq!(handler, "duplicate_guard");
            assert!(message.starts_with("A contact with the name 'alan TURING' already exists."));
            assert!(matches!(source, ContextError::Rejected(_)));
            assert_eq!(trace.first().map(String::as_str), Some("Entered duplicate_guard"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_post_operation_delete_needs_lazy_target() {
    let store = InMemoryRecordStore::shared();
    let account = Record::new("account").with("name", "Ada Lovelace");
    let id = store.create(&account).unwrap();
    let image = store.retrieve("account", id, &ColumnSet::All).unwrap();
    store.delete("account", id).unwrap();

    let event = || {
        PluginEvent::new("Delete", "account")
            .with_target_reference(image.to_reference())
            .with_pre_image(PRE_IMAGE, image.clone())
    };

    let eager = HooksConfig::default().dispatcher();
    assert!(matches!(
        eager.dispatch(event(), provider(&store)),
        Err(DispatchError::ContextUnavailable { .. })
    ));

    let mut config = HooksConfig::default();
    config.dispatch.resolve_target_eagerly = false;
    let lazy = config.dispatcher();
    let report = lazy.dispatch(event(), provider(&store)).unwrap();
    assert_eq!(report.handlers_run, vec!["contact_mirror.delete"]);
}

#[test]
fn test_disabled_group_does_not_run() {
    let store = InMemoryRecordStore::shared();
    let mut config = HooksConfig::default();
    config.handlers.disabled = vec!["contact_mirror".to_string()];
    let dispatcher = config.dispatcher();
    let account = Record::new("account").with("name", "Edsger Dijkstra");
    let id = store.create(&account).unwrap();
    let event = PluginEvent::new("Create", "account")
        .with_target(account)
        .with_output(OUTPUT_ID, id);
    let report = dispatcher.dispatch(event, provider(&store)).unwrap();
    assert!(report.handlers_run.is_empty());
    assert!(contacts_named(&store, "Dijkstra").is_empty());
}
