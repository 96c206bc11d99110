//! Built-in business handlers
//!
//! Each group registers its handlers on a [`Dispatcher`]. Groups are enabled unless listed in
//! `handlers.disabled`.

pub mod contact_mirror;
pub mod duplicate_guard;
pub mod linked_copy;
pub mod weight;

pub use linked_copy::LinkedCopySchema;
pub use weight::WeightSchema;

use crate::dispatch::Dispatcher;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const WEIGHT: &str = "weight";
pub const CONTACT_MIRROR: &str = "contact_mirror";
pub const DUPLICATE_GUARD: &str = "duplicate_guard";
pub const LINKED_COPY: &str = "linked_copy";

/// Every handler group, in registration order.
pub const HANDLER_GROUPS: [&str; 4] = [DUPLICATE_GUARD, WEIGHT, CONTACT_MIRROR, LINKED_COPY];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlersConfig {
    pub weight: WeightSchema,
    pub linked_copy: LinkedCopySchema,
    /// Handler groups to leave unregistered.
    pub disabled: Vec<String>,
}

impl HandlersConfig {
    pub fn is_enabled(&self, group: &str) -> bool {
        !self.disabled.iter().any(|d| d == group)
    }
}

/// Register every enabled handler group.
pub fn register_builtin(dispatcher: &mut Dispatcher, config: &HandlersConfig) {
    for group in HANDLER_GROUPS {
        if !config.is_enabled(group) {
            debug!(group, "Handler group disabled");
            continue;
        }
        match group {
            DUPLICATE_GUARD => duplicate_guard::register(dispatcher),
            WEIGHT => weight::register(dispatcher, &config.weight),
            CONTACT_MIRROR => contact_mirror::register(dispatcher),
            LINKED_COPY => linked_copy::register(dispatcher, &config.linked_copy),
            _ => {}
        }
    }
}
