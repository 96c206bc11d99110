//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Later sources override these key by key; tables are merged, not replaced.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("store.path", ".record-hooks/store")?
        .set_default("query.page_size", 5000)?
        .set_default("query.first_page_size", 1)?
        .set_default("accessor.zero_is_missing", true)?
        .set_default("dispatch.resolve_target_eagerly", true)?
        .set_default("dispatch.max_depth", 8)
}
