//! Maintains a linked copy of a source record.
//!
//! Creating a source record creates its copy and stores a reference to it on the source.
//! Renaming the source renames the copy.

use crate::context::{ExecutionContext, PRE_IMAGE};
use crate::dispatch::Dispatcher;
use crate::error::ContextError;
use crate::event::MessageName;
use crate::record::Record;
use crate::types::{EntityReference, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkedCopySchema {
    pub source_entity: String,
    pub copy_entity: String,
    /// Name attribute, shared by source and copy.
    pub name_attribute: String,
    /// Parent reference on the source.
    pub parent_attribute: String,
    /// Parent reference on the copy.
    pub copy_parent_attribute: String,
    pub parent_entity: String,
    /// Reference to the copy, kept on the source.
    pub copy_link_attribute: String,
}

impl Default for LinkedCopySchema {
    fn default() -> Self {
        Self {
            source_entity: "source_record".to_string(),
            copy_entity: "linked_copy".to_string(),
            name_attribute: "name".to_string(),
            parent_attribute: "parent_ref".to_string(),
            copy_parent_attribute: "parent_ref".to_string(),
            parent_entity: "parent".to_string(),
            copy_link_attribute: "linked_copy_ref".to_string(),
        }
    }
}

impl LinkedCopySchema {
    pub(crate) fn fields(&self) -> [(&'static str, &str); 7] {
        [
            ("source_entity", &self.source_entity),
            ("copy_entity", &self.copy_entity),
            ("name_attribute", &self.name_attribute),
            ("parent_attribute", &self.parent_attribute),
            ("copy_parent_attribute", &self.copy_parent_attribute),
            ("parent_entity", &self.parent_entity),
            ("copy_link_attribute", &self.copy_link_attribute),
        ]
    }
}

pub fn register(dispatcher: &mut Dispatcher, schema: &LinkedCopySchema) {
    let create = schema.clone();
    dispatcher.register(
        "linked_copy.create",
        MessageName::Create,
        schema.source_entity.clone(),
        move |ctx| on_create(ctx, &create),
    );
    let update = schema.clone();
    dispatcher.register(
        "linked_copy.update",
        MessageName::Update,
        schema.source_entity.clone(),
        move |ctx| on_update(ctx, &update),
    );
}

fn on_create(ctx: &ExecutionContext, schema: &LinkedCopySchema) -> Result<(), ContextError> {
    let source = ctx.target()?;
    let mut copy = Record::new(schema.copy_entity.clone());
    let name = source.raw(&schema.name_attribute).map(Value::unaliased).cloned();
    copy.set(schema.name_attribute.clone(), name.unwrap_or(Value::Null));
    if let Some(parent) = source.try_get::<EntityReference>(&schema.parent_attribute)? {
        copy.set(
            schema.copy_parent_attribute.clone(),
            EntityReference::new(schema.parent_entity.clone(), parent.id),
        );
    }
    let copy_id = ctx.create(&copy)?;
    ctx.trace(format!("Created {} {}", schema.copy_entity, copy_id));
    let link = Record::identity_only(ctx.reference()?).with(
        schema.copy_link_attribute.clone(),
        EntityReference::new(schema.copy_entity.clone(), copy_id),
    );
    ctx.update(&link)
}

fn on_update(ctx: &ExecutionContext, schema: &LinkedCopySchema) -> Result<(), ContextError> {
    let Some(link) = ctx
        .pre_image(PRE_IMAGE)
        .try_get::<EntityReference>(&schema.copy_link_attribute)?
    else {
        return Err(ContextError::rejected(format!(
            "{} has no linked {}",
            schema.source_entity, schema.copy_entity
        )));
    };
    ctx.trace(format!("Linked copy: {}", link.id));
    let view = ctx.dual_source(PRE_IMAGE)?;
    let mut copy = ctx.retrieve(&link, &[schema.name_attribute.as_str()])?;
    let name = view.raw(&schema.name_attribute).map(Value::unaliased).cloned();
    copy.set(schema.name_attribute.clone(), name.unwrap_or(Value::Null));
    ctx.update(&copy)
}
