//! Execution context: everything a handler sees for one event.
//!
//! The context wraps the raw event and a store provider. Store handle, target record, and
//! target reference are resolved on first use and memoized, failures included. Data access
//! goes through the context so every handler gets paging, typed reads, and error mapping the
//! same way.

pub mod memo;
pub mod resolver;
pub mod trace;
pub mod views;

pub use memo::{Memo, MemoState};
pub use resolver::DualSource;
pub use trace::TraceLog;

use crate::error::{ContextError, StoreError};
use crate::event::{MessageName, Parameter, ParameterBag, ParameterDirection, PluginEvent, Stage};
use crate::query::fetch::by_attribute_markup;
use crate::query::{ColumnSet, PagedQueryExecutor, QuerySpec, DEFAULT_PAGE_SIZE};
use crate::record::accessor::get_with;
use crate::record::{FromValue, Record, ZeroPolicy};
use crate::store::{RecordStore, StoreMessage, StoreProvider, StoreRequest, StoreResponse};
use crate::types::{EntityReference, RecordId, Value};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Input parameter holding the record or reference the event is about.
pub const TARGET: &str = "Target";
/// Input parameter used by state-change events instead of `Target`.
pub const ENTITY_MONIKER: &str = "EntityMoniker";
/// Output parameter carrying the identity assigned by a create.
pub const OUTPUT_ID: &str = "id";
pub const PRE_IMAGE: &str = "PreImage";
pub const POST_IMAGE: &str = "PostImage";

/// Tunables a context needs from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextSettings {
    pub page_size: u32,
    pub first_page_size: u32,
    pub zero_policy: ZeroPolicy,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            first_page_size: 1,
            zero_policy: ZeroPolicy::default(),
        }
    }
}

pub struct ExecutionContext {
    event: PluginEvent,
    provider: Arc<dyn StoreProvider>,
    settings: ContextSettings,
    store: Memo<Arc<dyn RecordStore>>,
    target: Memo<Record>,
    reference: Memo<EntityReference>,
    trace: TraceLog,
    empty: Record,
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("message", &self.event.message)
            .field("primary_entity", &self.event.primary_entity)
            .field("depth", &self.event.depth)
            .field("trace_lines", &self.trace.len())
            .finish()
    }
}

impl ExecutionContext {
    /// Build a context for `event`.
    ///
    /// Fails with `ConfigurationError` when the event names no primary entity, or carries
    /// neither a `Target` nor an `EntityMoniker` of the right shape. The store is not opened
    /// and the target is not fetched until first use.
    pub fn new(
        event: PluginEvent,
        provider: Arc<dyn StoreProvider>,
        settings: ContextSettings,
    ) -> Result<Self, ContextError> {
        if event.primary_entity.is_empty() {
            return Err(ContextError::configuration("event names no primary entity"));
        }
        match event.input.get(TARGET) {
            Some(Parameter::Record(_)) | Some(Parameter::Value(Value::Reference(_))) => {}
            Some(other) => {
                return Err(ContextError::configuration(format!(
                    "input '{}' must be a record or reference, found {:?}",
                    TARGET, other
                )))
            }
            None => match event.input.get(ENTITY_MONIKER) {
                Some(Parameter::Value(Value::Reference(_))) => {}
                Some(_) => {
                    return Err(ContextError::configuration(format!(
                        "input '{}' must be a reference",
                        ENTITY_MONIKER
                    )))
                }
                None => {
                    return Err(ContextError::configuration(format!(
                        "event carries neither '{}' nor '{}'",
                        TARGET, ENTITY_MONIKER
                    )))
                }
            },
        }
        Ok(Self {
            event,
            provider,
            settings,
            store: Memo::new(),
            target: Memo::new(),
            reference: Memo::new(),
            trace: TraceLog::new(),
            empty: Record::empty(),
        })
    }

    pub fn event(&self) -> &PluginEvent {
        &self.event
    }

    pub fn message_name(&self) -> &MessageName {
        &self.event.message
    }

    pub fn primary_entity(&self) -> &str {
        &self.event.primary_entity
    }

    pub fn stage(&self) -> Stage {
        self.event.stage
    }

    pub fn depth(&self) -> u32 {
        self.event.depth
    }

    pub fn user_id(&self) -> Uuid {
        self.event.user_id
    }

    pub fn settings(&self) -> &ContextSettings {
        &self.settings
    }

    /// Store handle for the calling user, opened once.
    pub fn store(&self) -> Result<Arc<dyn RecordStore>, ContextError> {
        self.store
            .get_or_resolve(|| {
                self.provider
                    .open(self.event.user_id)
                    .map_err(ContextError::store_op("open"))
            })
            .map(Arc::clone)
    }

    pub fn has_target(&self) -> bool {
        self.event.input.has(TARGET)
    }

    /// The record the event is about. A reference-only target is fetched in full, once.
    pub fn target(&self) -> Result<&Record, ContextError> {
        self.target.get_or_resolve(|| match self.event.input.get(TARGET) {
            Some(Parameter::Record(record)) => Ok(record.clone()),
            Some(Parameter::Value(Value::Reference(reference))) => self.retrieve(reference, &[]),
            _ => Err(ContextError::configuration(format!(
                "event has no '{}' record",
                TARGET
            ))),
        })
    }

    /// Identity of the record the event is about.
    ///
    /// A reference target is used as-is. A record target takes its identity from the output
    /// `id` when the platform assigned one, else from the record. State-change events use
    /// `EntityMoniker`.
    pub fn reference(&self) -> Result<&EntityReference, ContextError> {
        self.reference.get_or_resolve(|| match self.event.input.get(TARGET) {
            Some(Parameter::Value(Value::Reference(reference))) => Ok(reference.clone()),
            Some(Parameter::Record(record)) => {
                let id = self
                    .event
                    .output
                    .value::<Uuid>(OUTPUT_ID)?
                    .filter(|id| !id.is_nil())
                    .unwrap_or(record.id);
                if id.is_nil() {
                    return Err(ContextError::configuration(format!(
                        "{} target has no identity yet",
                        record.type_name
                    )));
                }
                Ok(EntityReference::new(record.type_name.clone(), id))
            }
            _ => match self.event.input.get(ENTITY_MONIKER) {
                Some(Parameter::Value(Value::Reference(reference))) => Ok(reference.clone()),
                _ => Err(ContextError::configuration("event has no resolvable target reference")),
            },
        })
    }

    /// Resolve store and target now so later accesses cannot fail on them.
    pub fn resolve_eagerly(&self) -> Result<(), ContextError> {
        self.store()?;
        if self.has_target() {
            self.target()?;
        }
        Ok(())
    }

    /// Named pre-operation image, or the empty record when the event has none.
    pub fn pre_image(&self, name: &str) -> &Record {
        self.try_pre_image(name).unwrap_or(&self.empty)
    }

    pub fn post_image(&self, name: &str) -> &Record {
        self.try_post_image(name).unwrap_or(&self.empty)
    }

    pub fn try_pre_image(&self, name: &str) -> Option<&Record> {
        self.event.pre_images.get(name)
    }

    pub fn try_post_image(&self, name: &str) -> Option<&Record> {
        self.event.post_images.get(name)
    }

    /// Target as current source, named pre-image as fallback.
    pub fn dual_source(&self, pre_image: &str) -> Result<DualSource<'_>, ContextError> {
        Ok(DualSource::new(Some(self.target()?), self.try_pre_image(pre_image)))
    }

    fn bag(&self, direction: ParameterDirection) -> &ParameterBag {
        match direction {
            ParameterDirection::Input => &self.event.input,
            ParameterDirection::Output => &self.event.output,
        }
    }

    /// Present and not null.
    pub fn has_parameter(&self, direction: ParameterDirection, name: &str) -> bool {
        self.bag(direction).has(name)
    }

    /// Untyped parameter, for record and reference-list payloads.
    pub fn raw_parameter(&self, direction: ParameterDirection, name: &str) -> Option<&Parameter> {
        self.bag(direction).get(name)
    }

    /// Typed parameter; `NotFound` when absent or null.
    pub fn parameter<T: FromValue>(&self, direction: ParameterDirection, name: &str) -> Result<T, ContextError> {
        self.try_parameter(direction, name)?
            .ok_or_else(|| ContextError::not_found(format!("{:?} parameter '{}'", direction, name)))
    }

    pub fn try_parameter<T: FromValue>(
        &self,
        direction: ParameterDirection,
        name: &str,
    ) -> Result<Option<T>, ContextError> {
        self.bag(direction).value(name)
    }

    /// Lenient typed read under the configured zero policy.
    pub fn get_or_default<T: FromValue>(&self, record: &Record, name: &str, default: T) -> Result<T, ContextError> {
        get_with(Some(record), name, default, self.settings.zero_policy)
    }

    /// One record by reference; an empty column list selects all attributes.
    pub fn retrieve(&self, reference: &EntityReference, columns: &[&str]) -> Result<Record, ContextError> {
        self.store()?
            .retrieve(&reference.type_name, reference.id, &ColumnSet::of(columns))
            .map_err(|err| match err {
                StoreError::NotFound { .. } => ContextError::not_found(reference.to_string()),
                other => ContextError::store_op("retrieve")(other),
            })
    }

    pub fn create(&self, record: &Record) -> Result<RecordId, ContextError> {
        self.store()?.create(record).map_err(ContextError::store_op("create"))
    }

    pub fn update(&self, record: &Record) -> Result<(), ContextError> {
        self.store()?.update(record).map_err(ContextError::store_op("update"))
    }

    pub fn delete(&self, reference: &EntityReference) -> Result<(), ContextError> {
        self.store()?
            .delete(&reference.type_name, reference.id)
            .map_err(ContextError::store_op("delete"))
    }

    pub fn associate(
        &self,
        record: &EntityReference,
        relationship: &str,
        related: &[EntityReference],
    ) -> Result<(), ContextError> {
        self.store()?
            .associate(record, relationship, related)
            .map_err(ContextError::store_op("associate"))
    }

    pub fn disassociate(
        &self,
        record: &EntityReference,
        relationship: &str,
        related: &[EntityReference],
    ) -> Result<(), ContextError> {
        self.store()?
            .disassociate(record, relationship, related)
            .map_err(ContextError::store_op("disassociate"))
    }

    /// Execute a typed request and decode its response.
    pub fn execute<M: StoreMessage>(&self, message: &M) -> Result<M::Response, ContextError> {
        let response = self.execute_request(&message.to_request())?;
        M::from_response(response)
    }

    pub fn execute_request(&self, request: &StoreRequest) -> Result<StoreResponse, ContextError> {
        self.store()?.execute(request).map_err(ContextError::store_op("execute"))
    }

    /// Every record matching `spec`, across as many pages as the store needs.
    pub fn retrieve_all(&self, spec: &QuerySpec) -> Result<Vec<Record>, ContextError> {
        let store = self.store()?;
        PagedQueryExecutor::new(store.as_ref(), self.settings.page_size).run_all(spec)
    }

    /// First matching record, or the empty record when nothing matches.
    pub fn retrieve_first(&self, spec: &QuerySpec) -> Result<Record, ContextError> {
        let store = self.store()?;
        PagedQueryExecutor::new(store.as_ref(), self.settings.page_size)
            .retrieve_first(spec, self.settings.first_page_size)
    }

    /// First record of `type_name` whose attributes equal all `values`.
    ///
    /// `None` columns selects all attributes. Returns the empty record when nothing matches.
    pub fn retrieve_by_attribute(
        &self,
        type_name: &str,
        columns: Option<&[&str]>,
        values: &[(&str, Value)],
    ) -> Result<Record, ContextError> {
        let markup = by_attribute_markup(type_name, columns, values);
        self.retrieve_first(&QuerySpec::fetch(markup))
    }

    /// Append a line to this invocation's trace.
    pub fn trace(&self, message: impl fmt::Display) {
        self.trace.push(message.to_string());
    }

    pub fn trace_log(&self) -> Vec<String> {
        self.trace.lines()
    }

    pub fn store_state(&self) -> MemoState<'_, Arc<dyn RecordStore>> {
        self.store.state()
    }

    pub fn target_state(&self) -> MemoState<'_, Record> {
        self.target.state()
    }
}
