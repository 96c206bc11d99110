//! CLI route: single route table and run context.

use crate::cli::output;
use crate::cli::parse::{Commands, OutputFormat};
use crate::config::{ConfigLoader, HooksConfig};
use crate::error::{HooksError, StoreError};
use crate::event::PluginEvent;
use crate::query::{ColumnSet, Condition, PagedQueryExecutor, QueryExpression, QuerySpec};
use crate::record::Record;
use crate::store::{RecordStore, SledRecordStore, StoreProvider};
use crate::types::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

/// Runtime context for CLI execution: workspace, loaded config, and the opened store.
pub struct RunContext {
    workspace_root: PathBuf,
    config: HooksConfig,
    store: Arc<SledRecordStore>,
}

impl RunContext {
    /// Load and validate configuration, then open the store it names.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, HooksError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Self::with_config(workspace_root, config)
    }

    pub fn with_config(workspace_root: PathBuf, config: HooksConfig) -> Result<Self, HooksError> {
        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            HooksError::Config(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;

        let store_path = config.store.resolve(&workspace_root);
        std::fs::create_dir_all(&store_path)?;
        let store = SledRecordStore::shared(&store_path)?;
        info!(store = %store_path.display(), "Store opened");

        Ok(Self {
            workspace_root,
            config,
            store,
        })
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config(&self) -> &HooksConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SledRecordStore> {
        &self.store
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, HooksError> {
        let started = Instant::now();
        let result = match command {
            Commands::Put { file } => self.put(file),
            Commands::Get {
                type_name,
                id,
                format,
            } => self.get(type_name, *id, *format),
            Commands::Query {
                type_name,
                conditions,
                fetch,
                columns,
                format,
            } => self.query(type_name, conditions, fetch.as_deref(), columns, *format),
            Commands::Dispatch { file, format } => self.dispatch(file, *format),
            Commands::Config => toml::to_string_pretty(&self.config)
                .map_err(|e| HooksError::Config(e.to_string())),
        };
        info!(
            command = command.name(),
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        // Flush even after a failed command; the command's own error wins.
        let flushed = self.store.flush();
        let output = result?;
        flushed?;
        Ok(output)
    }

    fn put(&self, file: &Path) -> Result<String, HooksError> {
        let text = std::fs::read_to_string(file)?;
        let record: Record = serde_json::from_str(&text)
            .map_err(|e| HooksError::InvalidInput(format!("{}: {}", file.display(), e)))?;
        upsert(self.store.as_ref(), &record)
    }

    fn get(&self, type_name: &str, id: Uuid, format: OutputFormat) -> Result<String, HooksError> {
        let record = self.store.retrieve(type_name, id, &ColumnSet::All)?;
        match format {
            OutputFormat::Text => Ok(output::record_text(&record)),
            OutputFormat::Json => serde_json::to_string_pretty(&record)
                .map_err(|e| HooksError::InvalidInput(e.to_string())),
        }
    }

    fn query(
        &self,
        type_name: &str,
        conditions: &[String],
        fetch: Option<&Path>,
        columns: &[String],
        format: OutputFormat,
    ) -> Result<String, HooksError> {
        let spec = match fetch {
            Some(path) => QuerySpec::fetch(std::fs::read_to_string(path)?),
            None => {
                let names: Vec<&str> = columns.iter().map(String::as_str).collect();
                let mut query = QueryExpression::new(type_name).with_columns(ColumnSet::of(&names));
                for condition in conditions {
                    let (attribute, value) = parse_condition(condition)?;
                    query = query.with_condition(Condition::equal(attribute, value));
                }
                QuerySpec::from(query)
            }
        };
        let store: &dyn RecordStore = self.store.as_ref();
        let records = PagedQueryExecutor::new(store, self.config.query.page_size).run_all(&spec)?;
        match format {
            OutputFormat::Text => Ok(output::records_table(&records, columns)),
            OutputFormat::Json => output::records_json(&records),
        }
    }

    fn dispatch(&self, file: &Path, format: OutputFormat) -> Result<String, HooksError> {
        let event = PluginEvent::from_json(&std::fs::read_to_string(file)?)?;
        let provider: Arc<dyn StoreProvider> = Arc::new(Arc::clone(&self.store));
        let report = self.config.dispatcher().dispatch(event, provider)?;
        match format {
            OutputFormat::Text => Ok(output::dispatch_text(&report)),
            OutputFormat::Json => output::dispatch_json(&report),
        }
    }
}

/// Update when a record with this identity is stored, create otherwise.
fn upsert(store: &dyn RecordStore, record: &Record) -> Result<String, HooksError> {
    let exists = !record.id.is_nil()
        && match store.retrieve(&record.type_name, record.id, &ColumnSet::none()) {
            Ok(_) => true,
            Err(StoreError::NotFound { .. }) => false,
            Err(e) => return Err(e.into()),
        };
    if exists {
        store.update(record)?;
        Ok(format!("Updated {} {}", record.type_name, record.id))
    } else {
        let id = store.create(record)?;
        Ok(format!("Created {} {}", record.type_name, id))
    }
}

/// `attr=value`; the value is compared loosely against the stored kind.
fn parse_condition(condition: &str) -> Result<(&str, Value), HooksError> {
    match condition.split_once('=') {
        Some((attribute, value)) if !attribute.trim().is_empty() => {
            Ok((attribute.trim(), Value::from(value.trim())))
        }
        _ => Err(HooksError::InvalidInput(format!(
            "expected ATTR=VALUE, got '{}'",
            condition
        ))),
    }
}
