//! Configuration System
//!
//! Layered configuration: built-in defaults, the global file, workspace files, then
//! `RECORD_HOOKS_*` environment variables. Validation reports every problem at once.

use crate::context::ContextSettings;
use crate::dispatch::{DispatchSettings, Dispatcher};
use crate::handlers::{self, HandlersConfig, HANDLER_GROUPS};
use crate::logging::LoggingConfig;
use crate::query::DEFAULT_PAGE_SIZE;
use crate::record::ZeroPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HooksConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub accessor: AccessorConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub handlers: HandlersConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Sled database directory, relative to the workspace root unless absolute
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".record-hooks/store")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl StoreConfig {
    pub fn resolve(&self, workspace_root: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            workspace_root.join(&self.path)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Records requested per page, 1..=5000
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Page size used by first-match lookups
    #[serde(default = "default_first_page_size")]
    pub first_page_size: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_first_page_size() -> u32 {
    1
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            first_page_size: default_first_page_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessorConfig {
    /// Treat zero-valued attributes as missing in lenient reads
    #[serde(default = "default_true")]
    pub zero_is_missing: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AccessorConfig {
    fn default() -> Self {
        Self {
            zero_is_missing: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_true")]
    pub resolve_target_eagerly: bool,

    /// Events nested deeper than this are skipped
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
}

fn default_max_depth() -> u32 {
    DispatchSettings::default().max_depth
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            resolve_target_eagerly: true,
            max_depth: default_max_depth(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Store(String),
    Query(String),
    Dispatch(String),
    Handler(String, String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Store(msg) => write!(f, "Store: {}", msg),
            ValidationError::Query(msg) => write!(f, "Query: {}", msg),
            ValidationError::Dispatch(msg) => write!(f, "Dispatch: {}", msg),
            ValidationError::Handler(name, msg) => write!(f, "Handler '{}': {}", name, msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl HooksConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.store.path.as_os_str().is_empty() {
            errors.push(ValidationError::Store("Store path cannot be empty".to_string()));
        }

        let max_page = DEFAULT_PAGE_SIZE;
        if !(1..=max_page).contains(&self.query.page_size) {
            errors.push(ValidationError::Query(format!(
                "page_size must be between 1 and {}, got {}",
                max_page, self.query.page_size
            )));
        }
        if !(1..=max_page).contains(&self.query.first_page_size) {
            errors.push(ValidationError::Query(format!(
                "first_page_size must be between 1 and {}, got {}",
                max_page, self.query.first_page_size
            )));
        }

        if self.dispatch.max_depth == 0 {
            errors.push(ValidationError::Dispatch(
                "max_depth must be at least 1".to_string(),
            ));
        }

        for (key, value) in self.handlers.weight.fields() {
            if value.trim().is_empty() {
                errors.push(ValidationError::Handler(
                    handlers::WEIGHT.to_string(),
                    format!("{} cannot be empty", key),
                ));
            }
        }
        for (key, value) in self.handlers.linked_copy.fields() {
            if value.trim().is_empty() {
                errors.push(ValidationError::Handler(
                    handlers::LINKED_COPY.to_string(),
                    format!("{} cannot be empty", key),
                ));
            }
        }
        for name in &self.handlers.disabled {
            if !HANDLER_GROUPS.contains(&name.as_str()) {
                errors.push(ValidationError::Handler(
                    name.clone(),
                    format!("unknown handler group (expected one of {})", HANDLER_GROUPS.join(", ")),
                ));
            }
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn context_settings(&self) -> ContextSettings {
        ContextSettings {
            page_size: self.query.page_size,
            first_page_size: self.query.first_page_size,
            zero_policy: if self.accessor.zero_is_missing {
                ZeroPolicy::ZeroIsMissing
            } else {
                ZeroPolicy::Strict
            },
        }
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            resolve_target_eagerly: self.dispatch.resolve_target_eagerly,
            max_depth: self.dispatch.max_depth,
        }
    }

    /// Dispatcher with every enabled built-in handler registered.
    pub fn dispatcher(&self) -> Dispatcher {
        let mut dispatcher = Dispatcher::new(self.dispatch_settings(), self.context_settings());
        handlers::register_builtin(&mut dispatcher, &self.handlers);
        dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Serializes tests that touch HOME or RECORD_HOOKS_* variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn with_home<T>(home: &Path, f: impl FnOnce() -> T) -> T {
        let original = std::env::var("HOME").ok();
        std::env::set_var("HOME", home);
        let result = f();
        match original {
            Some(home) => std::env::set_var("HOME", home),
            None => std::env::remove_var("HOME"),
        }
        result
    }

    #[test]
    fn test_default_config() {
        let config = HooksConfig::default();
        assert_eq!(config.store.path, PathBuf::from(".record-hooks/store"));
        assert_eq!(config.query.page_size, 5000);
        assert_eq!(config.query.first_page_size, 1);
        assert!(config.accessor.zero_is_missing);
        assert_eq!(config.dispatch.max_depth, 8);
        assert_eq!(config.handlers.weight.line_entity, "order_line");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_collects_every_error() {
        let mut config = HooksConfig::default();
        config.query.page_size = 6000;
        config.query.first_page_size = 0;
        config.dispatch.max_depth = 0;
        config.handlers.weight.order_entity = String::new();
        config.handlers.disabled.push("discounts".to_string());
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors
            .iter()
            .any(|e| e.to_string() == "Handler 'weight': order_entity cannot be empty"));
    }

    #[test]
    fn test_settings_follow_config() {
        let mut config = HooksConfig::default();
        config.accessor.zero_is_missing = false;
        config.query.page_size = 250;
        let settings = config.context_settings();
        assert_eq!(settings.zero_policy, ZeroPolicy::Strict);
        assert_eq!(settings.page_size, 250);
        assert!(!config.dispatcher().registrations().is_empty());
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("hooks.toml");
        std::fs::write(
            &config_file,
            r#"
[store]
path = "/var/lib/record-hooks"

[query]
page_size = 1000

[handlers]
disabled = ["linked_copy"]

[handlers.weight]
product_attribute = "productid"
"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&config_file).unwrap();
        assert_eq!(config.store.path, PathBuf::from("/var/lib/record-hooks"));
        assert_eq!(config.query.page_size, 1000);
        assert_eq!(config.query.first_page_size, 1);
        assert_eq!(config.handlers.weight.product_attribute, "productid");
        assert_eq!(config.handlers.weight.quantity_attribute, "quantity");
        assert!(!config.handlers.is_enabled("linked_copy"));
    }

    #[test]
    fn test_workspace_config_overrides_global_config() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let temp_dir = TempDir::new().unwrap();
        let home = temp_dir.path().join("home");
        let global_dir = home.join(".config").join("record-hooks");
        std::fs::create_dir_all(&global_dir).unwrap();
        std::fs::write(
            global_dir.join("config.toml"),
            "[query]\npage_size = 100\nfirst_page_size = 3\n",
        )
        .unwrap();

        let workspace = temp_dir.path().join("workspace");
        std::fs::create_dir_all(workspace.join("config")).unwrap();
        std::fs::write(
            workspace.join("config").join("config.toml"),
            "[query]\npage_size = 200\n",
        )
        .unwrap();

        let config = with_home(&home, || ConfigLoader::load(&workspace)).unwrap();
        assert_eq!(config.query.page_size, 200);
        assert_eq!(config.query.first_page_size, 3);
    }

    #[test]
    fn test_environment_overrides_files() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let temp_dir = TempDir::new().unwrap();
        std::env::set_var("RECORD_HOOKS_DISPATCH__MAX_DEPTH", "3");
        let config = with_home(temp_dir.path(), || ConfigLoader::load(temp_dir.path()));
        std::env::remove_var("RECORD_HOOKS_DISPATCH__MAX_DEPTH");
        let config = config.unwrap();
        assert_eq!(config.dispatch.max_depth, 3);
        assert!(config.dispatch.resolve_target_eagerly);
    }
}
