//! Platform events delivered to handlers.
//!
//! An event names the triggering message and primary entity, and carries input/output
//! parameter bags plus named pre- and post-operation images.

use crate::error::ContextError;
use crate::record::accessor::decode;
use crate::record::{FromValue, Record};
use crate::types::{EntityReference, Value};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Triggering operation. Unknown names are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageName {
    Create,
    Update,
    Delete,
    Associate,
    Disassociate,
    SetState,
    Other(String),
}

impl MessageName {
    pub fn as_str(&self) -> &str {
        match self {
            MessageName::Create => "Create",
            MessageName::Update => "Update",
            MessageName::Delete => "Delete",
            MessageName::Associate => "Associate",
            MessageName::Disassociate => "Disassociate",
            MessageName::SetState => "SetState",
            MessageName::Other(name) => name,
        }
    }
}

impl From<&str> for MessageName {
    fn from(name: &str) -> Self {
        match name {
            "Create" => MessageName::Create,
            "Update" => MessageName::Update,
            "Delete" => MessageName::Delete,
            "Associate" => MessageName::Associate,
            "Disassociate" => MessageName::Disassociate,
            "SetState" => MessageName::SetState,
            other => MessageName::Other(other.to_string()),
        }
    }
}

impl From<String> for MessageName {
    fn from(name: String) -> Self {
        MessageName::from(name.as_str())
    }
}

impl From<MessageName> for String {
    fn from(name: MessageName) -> Self {
        name.as_str().to_string()
    }
}

impl fmt::Display for MessageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage the event was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PreValidation,
    PreOperation,
    #[default]
    PostOperation,
}

/// Which parameter bag to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterDirection {
    Input,
    Output,
}

/// One named parameter: a plain value, a full record, or a list of references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Parameter {
    Value(Value),
    Record(Record),
    References(Vec<EntityReference>),
}

impl Parameter {
    pub fn is_null(&self) -> bool {
        matches!(self, Parameter::Value(Value::Null))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Parameter::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Parameter::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_references(&self) -> Option<&[EntityReference]> {
        match self {
            Parameter::References(r) => Some(r),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Parameter::Value(v) => v.kind().as_str(),
            Parameter::Record(_) => "record",
            Parameter::References(_) => "reference list",
        }
    }
}

macro_rules! value_parameter {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Parameter {
                fn from(value: $ty) -> Self {
                    Parameter::Value(value.into())
                }
            }
        )*
    };
}

value_parameter!(Value, EntityReference, &str, String, i64, i32, Decimal, bool, Uuid);

impl From<Record> for Parameter {
    fn from(record: Record) -> Self {
        Parameter::Record(record)
    }
}

impl From<Vec<EntityReference>> for Parameter {
    fn from(references: Vec<EntityReference>) -> Self {
        Parameter::References(references)
    }
}

/// Named parameters. A null value counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterBag(HashMap<String, Parameter>);

impl ParameterBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, parameter: impl Into<Parameter>) -> Self {
        self.insert(name, parameter);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, parameter: impl Into<Parameter>) {
        self.0.insert(name.into(), parameter.into());
    }

    /// Present and not null.
    pub fn has(&self, name: &str) -> bool {
        self.0.get(name).is_some_and(|p| !p.is_null())
    }

    /// Present and not null.
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.0.get(name).filter(|p| !p.is_null())
    }

    /// Typed read of a plain-value parameter.
    pub fn value<T: FromValue>(&self, name: &str) -> Result<Option<T>, ContextError> {
        match self.get(name) {
            None => Ok(None),
            Some(Parameter::Value(value)) => decode(name, value).map(Some),
            Some(other) => Err(ContextError::TypeMismatch {
                attribute: name.to_string(),
                expected: T::KIND,
                actual: other.kind(),
            }),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.0.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything the platform hands a handler for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginEvent {
    pub message: MessageName,
    pub primary_entity: String,
    #[serde(default)]
    pub stage: Stage,
    /// Call nesting depth; 1 for a user-initiated operation.
    #[serde(default = "default_depth")]
    pub depth: u32,
    #[serde(default)]
    pub user_id: Uuid,
    #[serde(default)]
    pub input: ParameterBag,
    #[serde(default)]
    pub output: ParameterBag,
    #[serde(default)]
    pub pre_images: HashMap<String, Record>,
    #[serde(default)]
    pub post_images: HashMap<String, Record>,
}

fn default_depth() -> u32 {
    1
}

impl PluginEvent {
    pub fn new(message: impl Into<MessageName>, primary_entity: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            primary_entity: primary_entity.into(),
            stage: Stage::default(),
            depth: default_depth(),
            user_id: Uuid::nil(),
            input: ParameterBag::new(),
            output: ParameterBag::new(),
            pre_images: HashMap::new(),
            post_images: HashMap::new(),
        }
    }

    /// Full target record as input `Target`.
    pub fn with_target(mut self, record: Record) -> Self {
        self.input.insert(crate::context::TARGET, record);
        self
    }

    /// Target given only by reference, as delete and associate events carry it.
    pub fn with_target_reference(mut self, reference: EntityReference) -> Self {
        self.input.insert(crate::context::TARGET, reference);
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, parameter: impl Into<Parameter>) -> Self {
        self.input.insert(name, parameter);
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, parameter: impl Into<Parameter>) -> Self {
        self.output.insert(name, parameter);
        self
    }

    pub fn with_pre_image(mut self, name: impl Into<String>, image: Record) -> Self {
        self.pre_images.insert(name.into(), image);
        self
    }

    pub fn with_post_image(mut self, name: impl Into<String>, image: Record) -> Self {
        self.post_images.insert(name.into(), image);
        self
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn from_json(text: &str) -> Result<Self, ContextError> {
        serde_json::from_str(text).map_err(|e| ContextError::configuration(format!("invalid event: {}", e)))
    }
}
