//! Handlers running against the durable sled store.

use parking_lot::Mutex;
use record_hooks::config::HooksConfig;
use record_hooks::context::{ContextSettings, OUTPUT_ID};
use record_hooks::dispatch::DispatchSettings;
use record_hooks::query::{ColumnSet, Condition, QueryExpression, QuerySpec};
use record_hooks::store::{RecordStore, RetrieveRecordCount, SledRecordStore, StoreProvider, WhoAmI};
use record_hooks::{Dispatcher, EntityReference, PluginEvent, Record};
use rust_decimal::Decimal;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

fn provider(store: &Arc<SledRecordStore>) -> Arc<dyn StoreProvider> {
    Arc::new(Arc::clone(store))
}

#[test]
fn test_context_requests_see_caller_and_counts() {
    let temp = TempDir::new().unwrap();
    let store = SledRecordStore::shared(temp.path().join("store")).unwrap();
    for n in 0..3 {
        store.create(&Record::new("task").with("subject", format!("task {}", n))).unwrap();
    }

    let seen = Arc::new(Mutex::new(None));
    let captured = Arc::clone(&seen);
    let mut dispatcher = Dispatcher::default();
    dispatcher.register("inspect", "Create", "task", move |ctx| {
        let caller = ctx.execute(&WhoAmI)?;
        let count = ctx.execute(&RetrieveRecordCount::new("task"))?;
        *captured.lock() = Some((caller, count));
        Ok(())
    });

    let user = Uuid::new_v4();
    let event = PluginEvent::new("Create", "task")
        .with_target(Record::new("task"))
        .with_user(user);
    dispatcher.dispatch(event, provider(&store)).unwrap();
    assert_eq!(*seen.lock(), Some((user, 3)));
}

#[test]
fn test_retrieve_all_pages_through_sled() {
    let temp = TempDir::new().unwrap();
    let store = SledRecordStore::shared(temp.path().join("store")).unwrap();
    for n in 0..12 {
        let status = if n % 3 == 0 { "closed" } else { "open" };
        store
            .create(&Record::new("task").with("status", status).with("rank", n as i64))
            .unwrap();
    }

    let found = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&found);
    let mut dispatcher = Dispatcher::new(
        DispatchSettings::default(),
        ContextSettings {
            page_size: 5,
            ..ContextSettings::default()
        },
    );
    dispatcher.register("collect", "Update", "task", move |ctx| {
        let query = QueryExpression::new("task")
            .with_columns(ColumnSet::of(&["rank"]))
            .with_condition(Condition::equal("status", "OPEN"))
            .with_order("rank", false);
        *captured.lock() = ctx.retrieve_all(&QuerySpec::from(query))?;
        Ok(())
    });

    let event = PluginEvent::new("Update", "task").with_target(Record::new("task"));
    dispatcher.dispatch(event, provider(&store)).unwrap();
    let ranks: Vec<i64> = found
        .lock()
        .iter()
        .map(|r| r.require::<i64>("rank").unwrap())
        .collect();
    assert_eq!(ranks, vec![1, 2, 4, 5, 7, 8, 10, 11]);
}

#[test]
fn test_associations_persist_across_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store");
    let (team, members) = {
        let store = SledRecordStore::shared(&path).unwrap();
        let team = EntityReference::new("team", store.create(&Record::new("team")).unwrap());
        let members: Vec<EntityReference> = (0..2)
            .map(|_| EntityReference::new("user", store.create(&Record::new("user")).unwrap()))
            .collect();

        let mut dispatcher = Dispatcher::default();
        let linked = members.clone();
        dispatcher.register("link", "Create", "team", move |ctx| {
            let team = ctx.reference()?.clone();
            ctx.associate(&team, "teammembership", &linked)
        });
        let event = PluginEvent::new("Create", "team")
            .with_target(Record::new("team"))
            .with_output(OUTPUT_ID, team.id);
        dispatcher.dispatch(event, provider(&store)).unwrap();
        store.flush().unwrap();
        (team, members)
    };

    let store = SledRecordStore::open(&path).unwrap();
    let mut related = store.related(&team, "teammembership").unwrap();
    let mut expected = members;
    related.sort_by_key(|r| r.id);
    expected.sort_by_key(|r| r.id);
    assert_eq!(related, expected);
    assert!(store.related(&team, "owner").unwrap().is_empty());
}

#[test]
fn test_weight_totals_over_sled() {
    let temp = TempDir::new().unwrap();
    let store = SledRecordStore::shared(temp.path().join("store")).unwrap();
    let dispatcher = HooksConfig::default().dispatcher();

    let order = store.create(&Record::new("order")).unwrap();
    let product = store
        .create(&Record::new("product").with("weight", Decimal::new(25, 1)))
        .unwrap();
    for quantity in [2_i64, 4] {
        let line = Record::new("order_line")
            .with("product_ref", EntityReference::new("product", product))
            .with("order_ref", EntityReference::new("order", order))
            .with("quantity", Decimal::from(quantity));
        let id = store.create(&line).unwrap();
        let event = PluginEvent::new("Create", "order_line")
            .with_target(line)
            .with_output(OUTPUT_ID, id);
        dispatcher.dispatch(event, provider(&store)).unwrap();
    }

    let total: Decimal = store
        .retrieve("order", order, &ColumnSet::of(&["total_weight"]))
        .unwrap()
        .require("total_weight")
        .unwrap();
    assert_eq!(total, Decimal::from(15));
}

#[test]
fn test_concurrent_updates_to_one_record_all_land() {
    let temp = TempDir::new().unwrap();
    let store = SledRecordStore::shared(temp.path().join("store")).unwrap();

    for round in 0..20 {
        let id = store.create(&Record::new("order").with("name", format!("SO-{}", round))).unwrap();
        let writers: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let change = Record::with_id("order", id).with(format!("a{}", t), t as i64);
                    store.update(&change).unwrap();
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let stored = store.retrieve("order", id, &ColumnSet::All).unwrap();
        let missing: Vec<String> = (0..8)
            .map(|t| format!("a{}", t))
            .filter(|name| !stored.contains(name))
            .collect();
        assert!(missing.is_empty(), "round {} lost {:?}", round, missing);
        assert!(stored.contains("name"));
    }
}
