//! Order-line weight propagation.
//!
//! A line's weight columns are derived from its product's unit weight and its quantity. The
//! parent order carries the sum of its lines' total weights.

use crate::context::{ExecutionContext, PRE_IMAGE};
use crate::dispatch::Dispatcher;
use crate::error::ContextError;
use crate::event::MessageName;
use crate::query::{ColumnSet, Condition, QueryExpression, QuerySpec};
use crate::record::Record;
use crate::types::EntityReference;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Entity and attribute names the weight handlers read and write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightSchema {
    pub line_entity: String,
    pub product_attribute: String,
    pub quantity_attribute: String,
    pub product_entity: String,
    pub weight_attribute: String,
    pub quantity_weight_attribute: String,
    pub line_total_attribute: String,
    pub order_attribute: String,
    pub order_entity: String,
    pub order_total_attribute: String,
}

impl Default for WeightSchema {
    fn default() -> Self {
        Self {
            line_entity: "order_line".to_string(),
            product_attribute: "product_ref".to_string(),
            quantity_attribute: "quantity".to_string(),
            product_entity: "product".to_string(),
            weight_attribute: "weight".to_string(),
            quantity_weight_attribute: "quantity_weight".to_string(),
            line_total_attribute: "total_weight".to_string(),
            order_attribute: "order_ref".to_string(),
            order_entity: "order".to_string(),
            order_total_attribute: "total_weight".to_string(),
        }
    }
}

impl WeightSchema {
    /// Names that must not be empty, paired with their config keys.
    pub(crate) fn fields(&self) -> [(&'static str, &str); 10] {
        [
            ("line_entity", &self.line_entity),
            ("product_attribute", &self.product_attribute),
            ("quantity_attribute", &self.quantity_attribute),
            ("product_entity", &self.product_entity),
            ("weight_attribute", &self.weight_attribute),
            ("quantity_weight_attribute", &self.quantity_weight_attribute),
            ("line_total_attribute", &self.line_total_attribute),
            ("order_attribute", &self.order_attribute),
            ("order_entity", &self.order_entity),
            ("order_total_attribute", &self.order_total_attribute),
        ]
    }
}

/// Create and update only react to user-initiated changes; the write-back to the line would
/// otherwise re-enter them.
pub fn register(dispatcher: &mut Dispatcher, schema: &WeightSchema) {
    let entity = schema.line_entity.clone();

    let create = schema.clone();
    dispatcher
        .register("weight.create", MessageName::Create, entity.clone(), move |ctx| {
            on_create(ctx, &create)
        })
        .max_depth(1);

    let update = schema.clone();
    dispatcher
        .register("weight.update", MessageName::Update, entity.clone(), move |ctx| {
            on_update(ctx, &update)
        })
        .max_depth(1);

    let delete = schema.clone();
    dispatcher.register("weight.delete", MessageName::Delete, entity, move |ctx| {
        on_delete(ctx, &delete)
    });
}

fn on_create(ctx: &ExecutionContext, schema: &WeightSchema) -> Result<(), ContextError> {
    let target = ctx.target()?;
    let product = match target.try_get::<EntityReference>(&schema.product_attribute)? {
        Some(product) if !product.id.is_nil() => product,
        _ => {
            ctx.trace("Line has no product");
            return Ok(());
        }
    };
    let product = ctx.retrieve(&product, &[schema.weight_attribute.as_str()])?;
    if !product.contains(&schema.weight_attribute) {
        ctx.trace("Product has no weight");
        return Ok(());
    }
    let weight = ctx.get_or_default(&product, &schema.weight_attribute, Decimal::ZERO)?;
    let quantity = ctx.get_or_default(target, &schema.quantity_attribute, Decimal::ZERO)?;
    write_line_weights(ctx, schema, weight, quantity)?;

    match target.try_get::<EntityReference>(&schema.order_attribute)? {
        Some(order) => recompute_order_total(ctx, schema, &order),
        None => {
            ctx.trace("Line has no order");
            Ok(())
        }
    }
}

fn on_update(ctx: &ExecutionContext, schema: &WeightSchema) -> Result<(), ContextError> {
    let view = ctx.dual_source(PRE_IMAGE)?;
    let product: EntityReference = view.resolve(&schema.product_attribute)?;
    let product = ctx.retrieve(&product, &[schema.weight_attribute.as_str()])?;
    let weight = ctx.get_or_default(&product, &schema.weight_attribute, Decimal::ZERO)?;
    let quantity = view.resolve_or_default(&schema.quantity_attribute, Decimal::ZERO)?;
    write_line_weights(ctx, schema, weight, quantity)?;

    match view.try_resolve::<EntityReference>(&schema.order_attribute)? {
        Some(order) => recompute_order_total(ctx, schema, &order),
        None => {
            ctx.trace("Line has no order");
            Ok(())
        }
    }
}

/// The deleted line is read from the pre-image when one was registered, else from the target.
fn on_delete(ctx: &ExecutionContext, schema: &WeightSchema) -> Result<(), ContextError> {
    let line = match ctx.try_pre_image(PRE_IMAGE) {
        Some(image) => image,
        None => ctx.target()?,
    };
    let line_total = ctx.get_or_default(line, &schema.line_total_attribute, Decimal::ZERO)?;
    let Some(order) = line.try_get::<EntityReference>(&schema.order_attribute)? else {
        ctx.trace("Line has no order");
        return Ok(());
    };
    let order = EntityReference::new(schema.order_entity.clone(), order.id);
    let current = ctx.retrieve(&order, &[schema.order_total_attribute.as_str()])?;
    let total = ctx.get_or_default(&current, &schema.order_total_attribute, Decimal::ZERO)?;
    ctx.trace(format!("Total Weight: {}", total));
    let net = total - line_total;
    ctx.trace(format!("Net Weight: {}", net));
    ctx.update(&Record::identity_only(&order).with(schema.order_total_attribute.clone(), net))
}

fn write_line_weights(
    ctx: &ExecutionContext,
    schema: &WeightSchema,
    weight: Decimal,
    quantity: Decimal,
) -> Result<(), ContextError> {
    let total = weight * quantity;
    ctx.trace(format!("Quantity Weight: {}", weight));
    ctx.trace(format!("Total Weight: {}", total));
    let line = Record::identity_only(ctx.reference()?)
        .with(schema.quantity_weight_attribute.clone(), weight)
        .with(schema.line_total_attribute.clone(), total);
    ctx.update(&line)
}

/// Set the order's total to the sum over all of its lines, fetched page by page.
fn recompute_order_total(
    ctx: &ExecutionContext,
    schema: &WeightSchema,
    order: &EntityReference,
) -> Result<(), ContextError> {
    let query = QueryExpression::new(schema.line_entity.clone())
        .with_columns(ColumnSet::of(&[schema.line_total_attribute.as_str()]))
        .with_condition(Condition::equal(schema.order_attribute.clone(), order.id));
    let lines = ctx.retrieve_all(&QuerySpec::from(query))?;
    ctx.trace(format!("Order lines: {}", lines.len()));

    let mut net = Decimal::ZERO;
    for line in &lines {
        net += ctx.get_or_default(line, &schema.line_total_attribute, Decimal::ZERO)?;
    }
    ctx.trace(format!("Net weight: {}", net));
    let order = EntityReference::new(schema.order_entity.clone(), order.id);
    ctx.update(&Record::identity_only(&order).with(schema.order_total_attribute.clone(), net))
}
