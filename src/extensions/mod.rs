//! Extension Providers
//!
//! Each installed extension is represented by an [`ExtensionProvider`] in the
//! [`ExtensionRegistry`]. The registry is filled once at startup with whatever
//! is actually installed, so aggregation code never has to check for missing
//! extensions: an absent provider is simply an absent response key.
//!
//! Providers only read. Preference stores hand out snapshots, library handles
//! expose lookups, and nothing here writes back to either.

mod count_pages;
mod goodreads_sync;
mod reader_helper;
mod reading_position;

pub use count_pages::CountPages;
pub use goodreads_sync::GoodreadsSync;
pub use reader_helper::ReaderHelper;
pub use reading_position::ReadingPosition;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::error::ExtensionError;
use crate::library::{LibraryCatalog, LibraryHandle, library_name};
use crate::prefs::JsonPreferenceStore;

pub type Snapshot = Map<String, Value>;

pub const PLUGIN_PREFS_KEY: &str = "plugin_prefs";
pub const LIBRARY_CONFIG_KEY: &str = "library_config";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExtensionKind {
    ReaderHelper,
    CountPages,
    GoodreadsSync,
    ReadingPosition,
}

impl ExtensionKind {
    /// Response order of `/dshelper/configuration`.
    pub const ALL: [ExtensionKind; 4] = [
        ExtensionKind::ReaderHelper,
        ExtensionKind::CountPages,
        ExtensionKind::GoodreadsSync,
        ExtensionKind::ReadingPosition,
    ];

    pub fn response_key(self) -> &'static str {
        match self {
            ExtensionKind::ReaderHelper => "dsreader_helper_prefs",
            ExtensionKind::CountPages => "count_pages_prefs",
            ExtensionKind::GoodreadsSync => "goodreads_sync_prefs",
            ExtensionKind::ReadingPosition => "reading_position_prefs",
        }
    }
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtensionKind::ReaderHelper => "dsreader_helper",
            ExtensionKind::CountPages => "count_pages",
            ExtensionKind::GoodreadsSync => "goodreads_sync",
            ExtensionKind::ReadingPosition => "reading_position",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchScope {
    /// Plugin prefs plus configuration gathered from every known library.
    AllLibraries,
    PluginPrefsOnly,
}

#[async_trait]
pub trait ExtensionProvider: Send + Sync {
    fn kind(&self) -> ExtensionKind;

    async fn fetch_global(&self, scope: FetchScope, libraries: &LibraryCatalog) -> Result<Snapshot, ExtensionError>;

    async fn fetch_for_library(&self, _handle: &dyn LibraryHandle) -> Result<Value, ExtensionError> {
        Err(ExtensionError::Unsupported(self.kind()))
    }
}

pub fn plugin_prefs_block(prefs: Value) -> Snapshot {
    let mut block = Map::new();
    block.insert(PLUGIN_PREFS_KEY.to_string(), prefs);
    block
}

/// Runs `provider.fetch_for_library` against every known library, keyed by
/// library name.
///
/// A library that fails to open or to load is logged and left out; the rest
/// are still returned. Every opened handle is closed before the next library
/// is touched, whether or not its fetch succeeded.
pub async fn collect_library_configs(
    provider: &dyn ExtensionProvider,
    libraries: &LibraryCatalog,
) -> Result<Map<String, Value>, ExtensionError> {
    let mut configs = Map::new();

    for path in libraries.known_libraries().await? {
        let name = library_name(&path);
        let handle = match libraries.open(&path).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(
                    extension = %provider.kind(),
                    library = ?path,
                    "failed to open library: {}",
                    crate::unpack_error(&e)
                );
                continue;
            }
        };

        let result = provider.fetch_for_library(handle.as_ref()).await;
        if let Err(e) = &result {
            tracing::warn!(
                extension = %provider.kind(),
                library = ?handle.path(),
                "failed to load library config: {}",
                crate::unpack_error(e)
            );
        }
        handle.close().await;

        if let Ok(config) = result {
            tracing::debug!(extension = %provider.kind(), library = %name, "library_config {}", config);
            if configs.insert(name.clone(), config).is_some() {
                tracing::warn!(library = %name, "two known libraries share the name {}, keeping the last", name);
            }
        }
    }

    Ok(configs)
}

#[derive(Default)]
pub struct ExtensionRegistry {
    providers: BTreeMap<ExtensionKind, Arc<dyn ExtensionProvider>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn ExtensionProvider>) {
        self.providers.insert(provider.kind(), provider);
    }

    pub fn get(&self, kind: ExtensionKind) -> Result<&Arc<dyn ExtensionProvider>, ExtensionError> {
        self.providers
            .get(&kind)
            .ok_or(ExtensionError::Unavailable(kind))
    }

    pub fn installed(&self) -> impl Iterator<Item = ExtensionKind> + '_ {
        self.providers.keys().copied()
    }

    /// Registers the extensions installed in the host's plugins directory.
    pub fn discover(cfg: &Config) -> Self {
        let plugins_dir = cfg.calibre.plugins_dir();
        let prefs_for = |plugin: &str| Arc::new(JsonPreferenceStore::new(plugins_dir.join(format!("{}.json", plugin))));
        let mut registry = ExtensionRegistry::new();

        let helper = &cfg.extensions.dsreader_helper;
        if is_installed(&plugins_dir, &helper.plugin_name, helper.enabled) {
            registry.register(Arc::new(ReaderHelper::new(prefs_for(&helper.plugin_name), helper.redact.clone())));
            // reading positions are kept by the reader helper plugin
            registry.register(Arc::new(ReadingPosition::new(
                &helper.library_namespace,
                &helper.columns_key,
                &helper.options_key,
            )));
        }

        let pages = &cfg.extensions.count_pages;
        if is_installed(&plugins_dir, &pages.plugin_name, pages.enabled) {
            registry.register(Arc::new(CountPages::new(prefs_for(&pages.plugin_name), pages)));
        }

        let goodreads = &cfg.extensions.goodreads_sync;
        if is_installed(&plugins_dir, &goodreads.plugin_name, goodreads.enabled) {
            registry.register(Arc::new(GoodreadsSync::new(
                prefs_for(&goodreads.plugin_name),
                goodreads.extra_redact.clone(),
            )));
        }

        for kind in registry.installed() {
            tracing::info!(extension = %kind, "extension available");
        }
        registry
    }
}

fn is_installed(plugins_dir: &Path, plugin_name: &str, enabled: Option<bool>) -> bool {
    match enabled {
        Some(enabled) => enabled,
        None => plugins_dir.join(format!("{}.zip", plugin_name)).exists(),
    }
}
