//! Refuses to create a contact whose first and last name are already taken.

use crate::context::ExecutionContext;
use crate::dispatch::Dispatcher;
use crate::error::ContextError;
use crate::event::{MessageName, Stage};
use crate::query::{ColumnSet, Condition, ConditionOperator, QueryExpression, QuerySpec};
use crate::types::Value;

use super::contact_mirror::CONTACT;

pub fn register(dispatcher: &mut Dispatcher) {
    dispatcher
        .register("duplicate_guard", MessageName::Create, CONTACT, check_duplicate)
        .stage(Stage::PreValidation);
}

fn check_duplicate(ctx: &ExecutionContext) -> Result<(), ContextError> {
    let contact = ctx.target()?;
    let (Some(first), Some(last)) = (
        contact.try_get::<String>("firstname")?,
        contact.try_get::<String>("lastname")?,
    ) else {
        return Ok(());
    };

    let mut query = QueryExpression::new(CONTACT)
        .with_columns(ColumnSet::none())
        .with_condition(Condition::equal("firstname", first.as_str()))
        .with_condition(Condition::equal("lastname", last.as_str()));
    if !contact.id.is_nil() {
        query = query.with_condition(Condition::new(
            format!("{}id", CONTACT),
            ConditionOperator::NotEqual,
            vec![Value::Guid(contact.id)],
        ));
    }
    if ctx.retrieve_first(&QuerySpec::from(query))?.is_valid() {
        ctx.trace(format!(
            "Contact with the name '{} {}' already exists. Cannot create a duplicate contact.",
            first, last
        ));
        return Err(ContextError::rejected(format!(
            "A contact with the name '{} {}' already exists. Cannot create a duplicate contact.",
            first, last
        )));
    }
    Ok(())
}
