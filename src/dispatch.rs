//! Event dispatch
//!
//! Handlers are registered against a (message, entity) pair and an optional stage and depth
//! limit. For each event the dispatcher builds one execution context, runs every matching
//! handler in registration order, and stops at the first failure.

use crate::context::{ContextSettings, ExecutionContext};
use crate::error::{ContextError, DispatchError};
use crate::event::{MessageName, PluginEvent, Stage};
use crate::store::StoreProvider;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Entity name that matches every primary entity.
pub const ANY_ENTITY: &str = "*";

pub type Handler = Arc<dyn Fn(&ExecutionContext) -> Result<(), ContextError> + Send + Sync>;

#[derive(Clone)]
pub struct Registration {
    name: String,
    message: MessageName,
    entity: String,
    stage: Option<Stage>,
    max_depth: Option<u32>,
    handler: Handler,
}

impl Registration {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Only run for events at or below `depth`; depth 1 means user-initiated operations only.
    pub fn max_depth(&mut self, depth: u32) -> &mut Self {
        self.max_depth = Some(depth);
        self
    }

    /// Only run for events raised in `stage`. Unrestricted by default.
    pub fn stage(&mut self, stage: Stage) -> &mut Self {
        self.stage = Some(stage);
        self
    }

    fn matches(&self, event: &PluginEvent) -> bool {
        self.message == event.message
            && (self.entity == ANY_ENTITY || self.entity == event.primary_entity)
            && self.stage.map_or(true, |stage| stage == event.stage)
            && self.max_depth.map_or(true, |max| event.depth <= max)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("message", &self.message)
            .field("entity", &self.entity)
            .field("stage", &self.stage)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Resolve store and target before the first handler runs.
    pub resolve_target_eagerly: bool,
    /// Events nested deeper than this are ignored outright.
    pub max_depth: u32,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            resolve_target_eagerly: true,
            max_depth: 8,
        }
    }
}

/// What happened for one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub handlers_run: Vec<String>,
    pub trace: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Dispatcher {
    registrations: Vec<Registration>,
    settings: DispatchSettings,
    context_settings: ContextSettings,
}

impl Dispatcher {
    pub fn new(settings: DispatchSettings, context_settings: ContextSettings) -> Self {
        Self {
            registrations: Vec::new(),
            settings,
            context_settings,
        }
    }

    /// Register `handler` for `message` on `entity` and return the registration for tuning.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        message: impl Into<MessageName>,
        entity: impl Into<String>,
        handler: F,
    ) -> &mut Registration
    where
        F: Fn(&ExecutionContext) -> Result<(), ContextError> + Send + Sync + 'static,
    {
        self.registrations.push(Registration {
            name: name.into(),
            message: message.into(),
            entity: entity.into(),
            stage: None,
            max_depth: None,
            handler: Arc::new(handler),
        });
        let last = self.registrations.len() - 1;
        &mut self.registrations[last]
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    /// Run every handler registered for `event`.
    ///
    /// Events with no matching handler, or nested deeper than the configured limit, are
    /// skipped without opening the store.
    pub fn dispatch(
        &self,
        event: PluginEvent,
        provider: Arc<dyn StoreProvider>,
    ) -> Result<DispatchReport, DispatchError> {
        if event.depth > self.settings.max_depth {
            warn!(
                message = %event.message,
                entity = %event.primary_entity,
                depth = event.depth,
                max_depth = self.settings.max_depth,
                "Event exceeds maximum depth, skipping"
            );
            return Ok(DispatchReport::default());
        }

        let matching: Vec<&Registration> = self.registrations.iter().filter(|r| r.matches(&event)).collect();
        if matching.is_empty() {
            debug!(
                message = %event.message,
                entity = %event.primary_entity,
                "No handlers registered"
            );
            return Ok(DispatchReport::default());
        }

        let message = event.message.to_string();
        let entity = event.primary_entity.clone();
        let unavailable = |source: ContextError| DispatchError::ContextUnavailable {
            message: message.clone(),
            entity: entity.clone(),
            source,
        };
        let ctx = ExecutionContext::new(event, provider, self.context_settings).map_err(unavailable)?;
        if self.settings.resolve_target_eagerly {
            ctx.resolve_eagerly().map_err(unavailable)?;
        }

        let mut report = DispatchReport::default();
        for registration in matching {
            info!(
                handler = %registration.name,
                message = %message,
                entity = %entity,
                depth = ctx.depth(),
                "Running handler"
            );
            ctx.trace(format!("Entered {}", registration.name));
            if let Err(err) = (registration.handler)(&ctx) {
                ctx.trace(format!("Exception: {}", err));
                warn!(handler = %registration.name, error = %err, "Handler failed");
                return Err(DispatchError::HandlerFailed {
                    handler: registration.name.clone(),
                    message: err.to_string(),
                    source: err,
                    trace: ctx.trace_log(),
                });
            }
            ctx.trace(format!("Exiting {}", registration.name));
            report.handlers_run.push(registration.name.clone());
        }
        report.trace = ctx.trace_log();
        Ok(report)
    }
}
