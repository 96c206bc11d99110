//! Keeps a primary contact in step with its account.

use crate::context::{DualSource, ExecutionContext, PRE_IMAGE};
use crate::dispatch::Dispatcher;
use crate::error::ContextError;
use crate::event::MessageName;
use crate::record::Record;
use crate::types::{EntityReference, Value};

pub const ACCOUNT: &str = "account";
pub const CONTACT: &str = "contact";
pub const PRIMARY_CONTACT: &str = "primarycontactid";
pub const JOB_TITLE: &str = "CRM";

/// Account attribute and the contact attribute it is copied to.
const MIRRORED: [(&str, &str); 4] = [
    ("telephone1", "mobilephone"),
    ("fax", "fax"),
    ("emailaddress1", "emailaddress1"),
    ("websiteurl", "websiteurl"),
];

pub fn register(dispatcher: &mut Dispatcher) {
    dispatcher.register("contact_mirror.create", MessageName::Create, ACCOUNT, on_create);
    dispatcher.register("contact_mirror.update", MessageName::Update, ACCOUNT, on_update);
    dispatcher.register("contact_mirror.delete", MessageName::Delete, ACCOUNT, on_delete);
}

/// Split an account name into first and last name.
///
/// The first word is the first name and the remaining words form the last name. A single
/// word is used as the last name alone.
pub fn split_name(name: &str) -> Result<(Option<String>, String), ContextError> {
    let mut words = name.split_whitespace();
    let first = words
        .next()
        .ok_or_else(|| ContextError::rejected("Account name is required to mirror its contact"))?;
    let rest: Vec<&str> = words.collect();
    if rest.is_empty() {
        Ok((None, first.to_string()))
    } else {
        Ok((Some(first.to_string()), rest.join(" ")))
    }
}

fn apply_name(contact: &mut Record, name: &str) -> Result<(), ContextError> {
    let (first, last) = split_name(name)?;
    contact.set("firstname", first);
    contact.set("lastname", last);
    Ok(())
}

fn on_create(ctx: &ExecutionContext) -> Result<(), ContextError> {
    let account = ctx.target()?;
    let name: String = account.get_or_default("name", String::new())?;
    let mut contact = Record::new(CONTACT);
    apply_name(&mut contact, &name)?;
    for (from, to) in MIRRORED.iter().chain([("createdon", "createdon")].iter()) {
        if let Some(value) = account.raw(from).filter(|v| !v.is_null()) {
            contact.set(*to, value.unaliased().clone());
        }
    }
    contact.set("jobtitle", JOB_TITLE);

    let contact_id = ctx.create(&contact)?;
    ctx.trace(format!("Created contact {}", contact_id));
    let link = Record::identity_only(ctx.reference()?)
        .with(PRIMARY_CONTACT, EntityReference::new(CONTACT, contact_id));
    ctx.update(&link)
}

fn on_update(ctx: &ExecutionContext) -> Result<(), ContextError> {
    let Some(contact_ref) = ctx.pre_image(PRE_IMAGE).try_get::<EntityReference>(PRIMARY_CONTACT)? else {
        ctx.trace("Account has no primary contact");
        return Ok(());
    };
    let view: DualSource<'_> = ctx.dual_source(PRE_IMAGE)?;
    let mut contact = ctx.retrieve(&contact_ref, &["fax"])?;
    let name: String = view.resolve_or_default("name", String::new())?;
    apply_name(&mut contact, &name)?;
    for (from, to) in MIRRORED {
        let value = view.raw(from).map(Value::unaliased).cloned().unwrap_or(Value::Null);
        contact.set(to, value);
    }
    contact.set("jobtitle", JOB_TITLE);
    ctx.update(&contact)
}

fn on_delete(ctx: &ExecutionContext) -> Result<(), ContextError> {
    match ctx.pre_image(PRE_IMAGE).try_get::<EntityReference>(PRIMARY_CONTACT)? {
        Some(contact) => {
            ctx.trace(format!("Deleting contact {}", contact.id));
            ctx.delete(&contact)
        }
        None => Ok(()),
    }
}
