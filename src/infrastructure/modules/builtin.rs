//! Modules compiled into the host and looked up by file path

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use super::ModuleLoader;
use crate::application::errors::{panic_message, ModuleError};
use crate::domain::entities::Value;

/// Extension of built-in module marker files
pub const DEFAULT_EXTENSION: &str = "mod";

/// Produces a module's primary export
pub type ModuleFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// Table of in-process modules.
///
/// The file on disk only marks where the module lives in the plugin
/// layout; its export comes from the registered factory.
#[derive(Clone)]
pub struct BuiltinModules {
    extension: String,
    modules: HashMap<PathBuf, ModuleFactory>,
}

impl BuiltinModules {
    pub fn new() -> Self {
        Self::with_extension(DEFAULT_EXTENSION)
    }

    pub fn with_extension(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            modules: HashMap::new(),
        }
    }

    /// Register the factory for the module file at `path`
    pub fn register<F>(&mut self, path: impl AsRef<Path>, factory: F)
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        let path = path.as_ref();
        let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        self.modules.insert(key, Arc::new(factory));
    }

    pub fn with_module<F>(mut self, path: impl AsRef<Path>, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.register(path, factory);
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for BuiltinModules {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModuleLoader for BuiltinModules {
    fn extension(&self) -> &str {
        &self.extension
    }

    async fn import(&self, path: &Path) -> Result<Value, ModuleError> {
        let factory = self
            .modules
            .get(path)
            .ok_or_else(|| ModuleError::NotRegistered(path.to_path_buf()))?;

        panic::catch_unwind(AssertUnwindSafe(|| factory())).map_err(|payload| ModuleError::Panicked {
            path: path.to_path_buf(),
            message: panic_message(payload),
        })
    }
}
