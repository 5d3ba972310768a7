use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::{
    ExtensionKind, ExtensionProvider, FetchScope, LIBRARY_CONFIG_KEY, Snapshot, collect_library_configs,
    plugin_prefs_block,
};
use crate::config::CountPagesSettings;
use crate::error::ExtensionError;
use crate::library::{LibraryCatalog, LibraryHandle};
use crate::prefs::PreferenceStore;
use crate::redact::{RedactionRule, redact};

pub struct CountPages {
    prefs: Arc<dyn PreferenceStore>,
    redact: Vec<RedactionRule>,
    namespace: String,
    key: String,
    defaults: Value,
}

impl CountPages {
    pub fn new(prefs: Arc<dyn PreferenceStore>, settings: &CountPagesSettings) -> Self {
        Self {
            prefs,
            redact: settings.redact.clone(),
            namespace: settings.library_namespace.clone(),
            key: settings.library_key.clone(),
            defaults: settings.library_defaults.clone(),
        }
    }
}

#[async_trait]
impl ExtensionProvider for CountPages {
    fn kind(&self) -> ExtensionKind {
        ExtensionKind::CountPages
    }

    async fn fetch_global(&self, scope: FetchScope, libraries: &LibraryCatalog) -> Result<Snapshot, ExtensionError> {
        let mut prefs = self.prefs.snapshot().await?;
        redact(&mut prefs, &self.redact);
        let mut block = plugin_prefs_block(prefs);

        if scope == FetchScope::AllLibraries {
            let configs = collect_library_configs(self, libraries).await?;
            block.insert(LIBRARY_CONFIG_KEY.to_string(), Value::Object(configs));
        }
        Ok(block)
    }

    async fn fetch_for_library(&self, handle: &dyn LibraryHandle) -> Result<Value, ExtensionError> {
        let config = handle
            .namespaced_pref(&self.namespace, &self.key)
            .await?
            .unwrap_or_else(|| self.defaults.clone());
        Ok(config)
    }
}
