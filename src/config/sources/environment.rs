//! Environment source: RECORD_HOOKS_<SECTION>__<KEY>, e.g. RECORD_HOOKS_QUERY__PAGE_SIZE=1000

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub const PREFIX: &str = "RECORD_HOOKS";

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}
