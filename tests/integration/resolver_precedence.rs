//! Current-over-previous resolution through a real context.

use record_hooks::context::{ContextSettings, ExecutionContext, PRE_IMAGE};
use record_hooks::store::InMemoryRecordStore;
use record_hooks::{ContextError, EntityReference, PluginEvent, Record, Value};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

fn update_context(target: Record, pre_image: Option<Record>) -> ExecutionContext {
    let mut event = PluginEvent::new("Update", target.type_name.clone()).with_target(target);
    if let Some(image) = pre_image {
        event = event.with_pre_image(PRE_IMAGE, image);
    }
    ExecutionContext::new(event, Arc::new(InMemoryRecordStore::shared()), ContextSettings::default()).unwrap()
}

#[test]
fn test_changed_value_wins_and_unchanged_falls_back() {
    let id = Uuid::new_v4();
    let product = EntityReference::new("product", Uuid::new_v4());
    let ctx = update_context(
        Record::with_id("order_line", id).with("quantity", Decimal::from(9)),
        Some(
            Record::with_id("order_line", id)
                .with("quantity", Decimal::from(2))
                .with("product_ref", product.clone()),
        ),
    );
    let view = ctx.dual_source(PRE_IMAGE).unwrap();
    assert_eq!(view.resolve::<Decimal>("quantity").unwrap(), Decimal::from(9));
    assert_eq!(view.resolve::<EntityReference>("product_ref").unwrap(), product);
}

#[test]
fn test_cleared_value_does_not_fall_back() {
    let id = Uuid::new_v4();
    let ctx = update_context(
        Record::with_id("account", id).with("fax", Value::Null),
        Some(Record::with_id("account", id).with("fax", "555-0101")),
    );
    let view = ctx.dual_source(PRE_IMAGE).unwrap();
    assert_eq!(view.try_resolve::<String>("fax").unwrap(), None);
    assert_eq!(view.resolve_or_default("fax", String::from("n/a")).unwrap(), "n/a");
}

#[test]
fn test_missing_pre_image_behaves_as_empty() {
    let id = Uuid::new_v4();
    let ctx = update_context(Record::with_id("account", id).with("name", "Contoso"), None);
    assert!(ctx.pre_image(PRE_IMAGE).is_empty());
    let view = ctx.dual_source(PRE_IMAGE).unwrap();
    assert_eq!(view.resolve::<String>("name").unwrap(), "Contoso");
    assert!(matches!(
        view.resolve::<String>("telephone1"),
        Err(ContextError::NotFound(_))
    ));
}

#[test]
fn test_wrong_kind_is_type_mismatch_not_default() {
    let id = Uuid::new_v4();
    let ctx = update_context(
        Record::with_id("order_line", id),
        Some(Record::with_id("order_line", id).with("quantity", "lots")),
    );
    let view = ctx.dual_source(PRE_IMAGE).unwrap();
    match view.resolve_or_default("quantity", Decimal::ZERO) {
        Err(ContextError::TypeMismatch {
            attribute,
            expected,
            actual,
        }) => {
            assert_eq!(attribute, "quantity");
            assert_eq!(expected, "decimal");
            assert_eq!(actual, "text");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
