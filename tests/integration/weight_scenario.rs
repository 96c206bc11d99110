//! Order weight propagation through the configured dispatcher.

use record_hooks::config::HooksConfig;
use record_hooks::context::{OUTPUT_ID, PRE_IMAGE};
use record_hooks::query::ColumnSet;
use record_hooks::store::{InMemoryRecordStore, RecordStore, StoreProvider};
use record_hooks::{Dispatcher, EntityReference, PluginEvent, Record};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

struct Shop {
    store: Arc<InMemoryRecordStore>,
    dispatcher: Dispatcher,
    order: Uuid,
}

impl Shop {
    fn new(config: &HooksConfig) -> Self {
        let store = InMemoryRecordStore::shared();
        let order = store.create(&Record::new("order").with("name", "SO-100")).unwrap();
        Self {
            store,
            dispatcher: config.dispatcher(),
            order,
        }
    }

    fn provider(&self) -> Arc<dyn StoreProvider> {
        Arc::new(Arc::clone(&self.store))
    }

    fn product(&self, weight: Decimal) -> EntityReference {
        let id = self.store.create(&Record::new("product").with("weight", weight)).unwrap();
        EntityReference::new("product", id)
    }

    /// Store the line, then raise its post-create event.
    fn add_line(&self, product: &EntityReference, quantity: i64) -> Uuid {
        let line = Record::new("order_line")
            .with("product_ref", product.clone())
            .with("order_ref", EntityReference::new("order", self.order))
            .with("quantity", Decimal::from(quantity));
        let id = self.store.create(&line).unwrap();
        let event = PluginEvent::new("Create", "order_line")
            .with_target(line)
            .with_output(OUTPUT_ID, id);
        self.dispatcher.dispatch(event, self.provider()).unwrap();
        id
    }

    fn line(&self, id: Uuid) -> Record {
        self.store.retrieve("order_line", id, &ColumnSet::All).unwrap()
    }

    fn order_total(&self) -> Decimal {
        self.store
            .retrieve("order", self.order, &ColumnSet::All)
            .unwrap()
            .get_or_default("total_weight", Decimal::ZERO)
            .unwrap()
    }
}

#[test]
fn test_create_update_delete_keep_order_total_in_step() {
    let shop = Shop::new(&HooksConfig::default());
    let bolts = shop.product(Decimal::new(5, 1));
    let plates = shop.product(Decimal::from(12));

    let first = shop.add_line(&bolts, 10);
    let second = shop.add_line(&plates, 2);
    assert_eq!(shop.line(first).try_get::<Decimal>("total_weight").unwrap(), Some(Decimal::from(5)));
    assert_eq!(shop.order_total(), Decimal::from(29));

    // Quantity change only; product and order come from the pre-image.
    let before = shop.line(second);
    let change = Record::with_id("order_line", second).with("quantity", Decimal::from(3));
    shop.store.update(&change).unwrap();
    let event = PluginEvent::new("Update", "order_line")
        .with_target(change)
        .with_pre_image(PRE_IMAGE, before);
    shop.dispatcher.dispatch(event, shop.provider()).unwrap();
    assert_eq!(shop.line(second).try_get::<Decimal>("total_weight").unwrap(), Some(Decimal::from(36)));
    assert_eq!(shop.order_total(), Decimal::from(41));

    // Pre-operation delete: the line still exists while handlers run.
    let doomed = shop.line(first);
    let event = PluginEvent::new("Delete", "order_line")
        .with_target_reference(doomed.to_reference())
        .with_pre_image(PRE_IMAGE, doomed);
    shop.dispatcher.dispatch(event, shop.provider()).unwrap();
    shop.store.delete("order_line", first).unwrap();
    assert_eq!(shop.order_total(), Decimal::from(36));
}

#[test]
fn test_quantity_five_of_weight_ten_gives_fifty() {
    let shop = Shop::new(&HooksConfig::default());
    let p1 = shop.product(Decimal::from(10));

    let line = shop.line(shop.add_line(&p1, 5));
    assert_eq!(line.try_get::<Decimal>("quantity_weight").unwrap(), Some(Decimal::from(10)));
    assert_eq!(line.try_get::<Decimal>("total_weight").unwrap(), Some(Decimal::from(50)));
    assert_eq!(shop.order_total(), Decimal::from(50));

    // A sibling line on the same order is summed into the parent total.
    shop.add_line(&p1, 2);
    assert_eq!(shop.order_total(), Decimal::from(70));
}

#[test]
fn test_renamed_schema_is_honoured() {
    let mut config = HooksConfig::default();
    config.handlers.weight.line_entity = "salesorderdetail".to_string();
    config.handlers.weight.order_total_attribute = "final_weight".to_string();
    let shop = Shop::new(&config);
    let product = shop.product(Decimal::from(2));

    let line = Record::new("salesorderdetail")
        .with("product_ref", product)
        .with("order_ref", EntityReference::new("order", shop.order))
        .with("quantity", Decimal::from(4));
    let id = shop.store.create(&line).unwrap();
    let event = PluginEvent::new("Create", "salesorderdetail")
        .with_target(line)
        .with_output(OUTPUT_ID, id);
    let report = shop.dispatcher.dispatch(event, shop.provider()).unwrap();
    assert_eq!(report.handlers_run, vec!["weight.create"]);

    let order = shop.store.retrieve("order", shop.order, &ColumnSet::All).unwrap();
    assert_eq!(order.try_get::<Decimal>("final_weight").unwrap(), Some(Decimal::from(8)));
    assert!(!order.contains("total_weight"));
}

#[test]
fn test_trace_records_weights() {
    let shop = Shop::new(&HooksConfig::default());
    let product = shop.product(Decimal::from(3));
    let line = Record::new("order_line")
        .with("product_ref", product)
        .with("order_ref", EntityReference::new("order", shop.order))
        .with("quantity", Decimal::from(2));
    let id = shop.store.create(&line).unwrap();
    let event = PluginEvent::new("Create", "order_line")
        .with_target(line)
        .with_output(OUTPUT_ID, id);
    let report = shop.dispatcher.dispatch(event, shop.provider()).unwrap();
    assert!(report.trace.contains(&"Quantity Weight: 3".to_string()));
    assert!(report.trace.contains(&"Total Weight: 6".to_string()));
    assert!(report.trace.contains(&"Net weight: 6".to_string()));
}
