use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{
    ExtensionKind, ExtensionProvider, FetchScope, LIBRARY_CONFIG_KEY, Snapshot, collect_library_configs,
};
use crate::error::ExtensionError;
use crate::library::{LibraryCatalog, LibraryHandle};

/// Per-library reading position columns and options. There are no global
/// plugin prefs for this one, only `library_config`.
pub struct ReadingPosition {
    namespace: String,
    columns_key: String,
    options_key: String,
}

impl ReadingPosition {
    pub fn new(namespace: &str, columns_key: &str, options_key: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            columns_key: columns_key.to_string(),
            options_key: options_key.to_string(),
        }
    }

    async fn library_value(&self, handle: &dyn LibraryHandle, key: &str) -> Result<Value, ExtensionError> {
        Ok(handle
            .namespaced_pref(&self.namespace, key)
            .await?
            .unwrap_or_else(|| Value::Object(Map::new())))
    }
}

#[async_trait]
impl ExtensionProvider for ReadingPosition {
    fn kind(&self) -> ExtensionKind {
        ExtensionKind::ReadingPosition
    }

    async fn fetch_global(&self, _scope: FetchScope, libraries: &LibraryCatalog) -> Result<Snapshot, ExtensionError> {
        let configs = collect_library_configs(self, libraries).await?;
        let mut block = Snapshot::new();
        block.insert(LIBRARY_CONFIG_KEY.to_string(), Value::Object(configs));
        Ok(block)
    }

    async fn fetch_for_library(&self, handle: &dyn LibraryHandle) -> Result<Value, ExtensionError> {
        let options = self.library_value(handle, &self.options_key).await?;
        let columns = self.library_value(handle, &self.columns_key).await?;

        let mut config = Map::new();
        config.insert(self.columns_key.clone(), columns);
        config.insert(self.options_key.clone(), options);
        Ok(Value::Object(config))
    }
}
