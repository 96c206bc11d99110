//! Paged retrieval against a store that counts page requests.

use super::test_utils::CountingStore;
use record_hooks::context::{ContextSettings, ExecutionContext};
use record_hooks::query::{ColumnSet, Condition, QueryExpression, QuerySpec};
use record_hooks::store::{RecordStore, StoreProvider};
use record_hooks::types::EntityReference;
use record_hooks::{ContextError, PluginEvent, Record, StoreError};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

fn seeded_store(lines: usize, order: Uuid) -> Arc<CountingStore> {
    let store = Arc::new(CountingStore::new());
    for i in 0..lines {
        store
            .create(
                &Record::new("order_line")
                    .with("line_number", i as i64)
                    .with("total_weight", Decimal::ONE)
                    .with("order_ref", EntityReference::new("order", order)),
            )
            .unwrap();
    }
    store
}

fn context(store: &Arc<CountingStore>) -> ExecutionContext {
    let provider: Arc<dyn StoreProvider> = Arc::new(Arc::clone(store));
    let event = PluginEvent::new("Update", "order").with_target(Record::with_id("order", Uuid::new_v4()));
    ExecutionContext::new(event, provider, ContextSettings::default()).unwrap()
}

#[test]
fn test_three_pages_fetch_every_record_in_three_calls() {
    let order = Uuid::new_v4();
    let store = seeded_store(11_234, order);
    let ctx = context(&store);
    let query = QueryExpression::new("order_line")
        .with_columns(ColumnSet::of(&["line_number", "total_weight"]))
        .with_condition(Condition::equal("order_ref", order))
        .with_order("line_number", true);

    let records = ctx.retrieve_all(&QuerySpec::from(query)).unwrap();
    assert_eq!(records.len(), 11_234);
    assert_eq!(store.calls(), 3);

    // Page order is kept: descending line numbers straight across page boundaries.
    let line_numbers: Vec<i64> = records
        .iter()
        .map(|r| r.try_get::<i64>("line_number").unwrap().unwrap())
        .collect();
    let expected: Vec<i64> = (0..11_234).rev().collect();
    assert_eq!(line_numbers, expected);
    assert_eq!(line_numbers[4_999], 6_234);
    assert_eq!(line_numbers[5_000], 6_233);
}

#[test]
fn test_failure_on_second_page_reports_page_and_stops() {
    let store = seeded_store(6_000, Uuid::new_v4());
    store.fail_on(2);
    let ctx = context(&store);
    let err = ctx
        .retrieve_all(&QuerySpec::from(QueryExpression::new("order_line")))
        .unwrap_err();
    match err {
        ContextError::QueryFailed { page, source } => {
            assert_eq!(page, 2);
            assert_eq!(source, StoreError::Io("connection reset".to_string()));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.calls(), 2);
}

#[test]
fn test_fetch_template_pages_carry_page_number_and_cookie() {
    let store = seeded_store(7, Uuid::new_v4());
    let provider: Arc<dyn StoreProvider> = Arc::new(Arc::clone(&store));
    let event = PluginEvent::new("Update", "order").with_target(Record::with_id("order", Uuid::new_v4()));
    let settings = ContextSettings {
        page_size: 3,
        ..ContextSettings::default()
    };
    let ctx = ExecutionContext::new(event, provider, settings).unwrap();

    let fetch = r#"<fetch><entity name="order_line"><attribute name="line_number" /></entity></fetch>"#;
    let records = ctx.retrieve_all(&QuerySpec::fetch(fetch)).unwrap();
    assert_eq!(records.len(), 7);
    assert_eq!(store.calls(), 3);

    let queries = store.queries.lock();
    let QuerySpec::Fetch(third) = &queries[2] else {
        panic!("expected fetch query");
    };
    assert!(third.markup.contains(r#"page="3""#));
    assert!(third.markup.contains(r#"count="3""#));
    assert!(third.markup.contains("paging-cookie=\"&lt;cookie page=&quot;2&quot;"));
}

#[test]
fn test_empty_result_is_one_call() {
    let store = seeded_store(0, Uuid::new_v4());
    let ctx = context(&store);
    let first = ctx
        .retrieve_first(&QuerySpec::from(QueryExpression::new("order_line")))
        .unwrap();
    assert!(first.is_empty());
    assert_eq!(store.calls(), 1);
}
