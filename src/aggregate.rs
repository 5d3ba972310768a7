//! Merges extension preferences into one configuration response.
//!
//! Every extension is fetched on its own; a missing or failing extension only
//! costs its own key. Nothing in here returns an error to the caller.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ExtensionError;
use crate::extensions::{ExtensionKind, ExtensionRegistry, FetchScope, LIBRARY_CONFIG_KEY, Snapshot};
use crate::library::LibraryCatalog;
use crate::unpack_error;

/// Library id that asks for global configuration instead of a single library.
pub const GLOBAL_LIBRARY_ID: &str = "_";

/// Extensions served for [`GLOBAL_LIBRARY_ID`]. Reading positions are left out.
const GLOBAL_V1: [(ExtensionKind, FetchScope); 3] = [
    (ExtensionKind::ReaderHelper, FetchScope::AllLibraries),
    (ExtensionKind::CountPages, FetchScope::PluginPrefsOnly),
    (ExtensionKind::GoodreadsSync, FetchScope::AllLibraries),
];

#[derive(Debug, Default, Serialize, PartialEq)]
#[serde(transparent)]
pub struct ConfigurationResponse(BTreeMap<&'static str, Snapshot>);

impl ConfigurationResponse {
    pub fn insert(&mut self, key: &'static str, snapshot: Snapshot) {
        self.0.insert(key, snapshot);
    }

    pub fn get(&self, key: &str) -> Option<&Snapshot> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub struct Aggregator {
    registry: Arc<ExtensionRegistry>,
    libraries: Arc<LibraryCatalog>,
}

impl Aggregator {
    pub fn new(registry: Arc<ExtensionRegistry>, libraries: Arc<LibraryCatalog>) -> Self {
        Self { registry, libraries }
    }

    /// All four extensions, with library-scoped configuration gathered from
    /// every known library.
    pub async fn configuration(&self) -> ConfigurationResponse {
        let mut response = ConfigurationResponse::default();
        for kind in ExtensionKind::ALL {
            self.collect(&mut response, kind, FetchScope::AllLibraries).await;
        }
        response
    }

    pub async fn configuration_for_library(&self, library_id: &str) -> ConfigurationResponse {
        let mut response = ConfigurationResponse::default();

        if library_id == GLOBAL_LIBRARY_ID {
            for (kind, scope) in GLOBAL_V1 {
                self.collect(&mut response, kind, scope).await;
            }
            return response;
        }

        match self.library_config(library_id).await {
            Ok(snapshot) => response.insert(ExtensionKind::CountPages.response_key(), snapshot),
            Err(e) => tracing::error!(
                library_id = %library_id,
                "failed to load library configuration: {}",
                unpack_error(&e)
            ),
        }
        response
    }

    async fn collect(&self, response: &mut ConfigurationResponse, kind: ExtensionKind, scope: FetchScope) {
        let provider = match self.registry.get(kind) {
            Ok(provider) => provider,
            Err(_) => {
                tracing::debug!(extension = %kind, "extension not installed, skipping");
                return;
            }
        };

        match provider.fetch_global(scope, &self.libraries).await {
            Ok(snapshot) => response.insert(kind.response_key(), snapshot),
            Err(e) => tracing::error!(extension = %kind, "failed to fetch preferences: {}", unpack_error(&e)),
        }
    }

    /// `{"library_config": {<library_id>: <config>}}` for one library.
    async fn library_config(&self, library_id: &str) -> Result<Snapshot, ExtensionError> {
        let provider = self.registry.get(ExtensionKind::CountPages)?;
        let handle = self.libraries.open_by_id(library_id).await?;
        tracing::debug!(library_id = %library_id, path = ?handle.path(), "opened library");
        let result = provider.fetch_for_library(handle.as_ref()).await;
        handle.close().await;
        let config = result?;
        tracing::debug!(library_id = %library_id, "library_config {}", config);

        let mut by_library = Map::new();
        by_library.insert(library_id.to_string(), config);
        let mut snapshot = Snapshot::new();
        snapshot.insert(LIBRARY_CONFIG_KEY.to_string(), Value::Object(by_library));
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CountPagesSettings, GoodreadsSyncSettings};
    use crate::error::PrefsError;
    use crate::extensions::{CountPages, GoodreadsSync, ReaderHelper, ReadingPosition};
    use crate::prefs::{MemoryPreferenceStore, PreferenceStore};
    use crate::testing::FakeLibraries;
    use async_trait::async_trait;
    use serde_json::json;

    struct BrokenStore;

    #[async_trait]
    impl PreferenceStore for BrokenStore {
        async fn snapshot(&self) -> Result<Value, PrefsError> {
            Err(PrefsError::LockPoisoned)
        }
    }

    fn fake_libraries() -> Arc<FakeLibraries> {
        Arc::new(
            FakeLibraries::new()
                .with_library(
                    "/books/Calibre Library",
                    &[
                        ("CountPagesPlugin:settings", json!({"pages_column": "#pages"})),
                        ("DSReaderHelper:readingPositionColumns", json!({"position": "#pos"})),
                    ],
                )
                .with_broken_library("/books/Broken"),
        )
    }

    fn full_registry() -> ExtensionRegistry {
        let mut registry = ExtensionRegistry::new();
        registry.register(Arc::new(ReaderHelper::new(
            Arc::new(MemoryPreferenceStore::new(json!({"Options": {"fontSize": 12}}))),
            vec![],
        )));
        registry.register(Arc::new(CountPages::new(
            Arc::new(MemoryPreferenceStore::new(json!({"algorithm": 1}))),
            &CountPagesSettings::default(),
        )));
        registry.register(Arc::new(GoodreadsSync::new(
            Arc::new(MemoryPreferenceStore::new(json!({
                "Goodreads": {"devkeyToken": "t"},
                "Users": {"me": {"userSecret": "s"}}
            }))),
            GoodreadsSyncSettings::default().extra_redact,
        )));
        registry.register(Arc::new(ReadingPosition::new(
            "DSReaderHelper",
            "readingPositionColumns",
            "readingPositionOptions",
        )));
        registry
    }

    fn aggregator(registry: ExtensionRegistry, fakes: &Arc<FakeLibraries>) -> Aggregator {
        Aggregator::new(Arc::new(registry), Arc::new(fakes.catalog()))
    }

    #[tokio::test]
    async fn test_configuration_with_every_extension() {
        let fakes = fake_libraries();
        let response = aggregator(full_registry(), &fakes).configuration().await;

        let keys: Vec<_> = response.keys().collect();
        assert_eq!(
            keys,
            vec![
                "count_pages_prefs",
                "dsreader_helper_prefs",
                "goodreads_sync_prefs",
                "reading_position_prefs"
            ]
        );

        let goodreads = &response.get("goodreads_sync_prefs").unwrap()["plugin_prefs"];
        assert_eq!(goodreads, &json!({"Goodreads": {}, "Users": {"me": {}}}));

        let positions = &response.get("reading_position_prefs").unwrap()["library_config"];
        assert_eq!(positions["Calibre Library"]["readingPositionColumns"], json!({"position": "#pos"}));
        assert!(positions.get("Broken").is_none());

        // two libraries, two library-scoped extensions
        assert_eq!(fakes.opened(), 4);
        assert_eq!(fakes.closed(), 4);
    }

    #[tokio::test]
    async fn test_missing_extensions_are_omitted() {
        let fakes = fake_libraries();
        let mut registry = ExtensionRegistry::new();
        registry.register(Arc::new(CountPages::new(
            Arc::new(MemoryPreferenceStore::new(json!({}))),
            &CountPagesSettings::default(),
        )));

        let response = aggregator(registry, &fakes).configuration().await;
        let keys: Vec<_> = response.keys().collect();
        assert_eq!(keys, vec!["count_pages_prefs"]);
    }

    #[tokio::test]
    async fn test_failing_extension_is_omitted() {
        let fakes = fake_libraries();
        let mut registry = full_registry();
        registry.register(Arc::new(GoodreadsSync::new(Arc::new(BrokenStore), vec![])));

        let response = aggregator(registry, &fakes).configuration().await;
        assert!(response.get("goodreads_sync_prefs").is_none());
        assert!(response.get("dsreader_helper_prefs").is_some());
        assert_eq!(response.keys().count(), 3);
    }

    #[tokio::test]
    async fn test_no_extensions_gives_empty_response() {
        let fakes = fake_libraries();
        let response = aggregator(ExtensionRegistry::new(), &fakes).configuration().await;
        assert!(response.is_empty());
        assert_eq!(serde_json::to_value(&response).unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_global_library_id_excludes_reading_position() {
        let fakes = fake_libraries();
        let response = aggregator(full_registry(), &fakes)
            .configuration_for_library(GLOBAL_LIBRARY_ID)
            .await;

        let keys: Vec<_> = response.keys().collect();
        assert_eq!(
            keys,
            vec!["count_pages_prefs", "dsreader_helper_prefs", "goodreads_sync_prefs"]
        );
        assert_eq!(
            serde_json::to_value(response.get("count_pages_prefs").unwrap()).unwrap(),
            json!({"plugin_prefs": {"algorithm": 1}})
        );
        assert_eq!(fakes.opened(), 0);
    }

    #[tokio::test]
    async fn test_single_library_config() {
        let fakes = fake_libraries();
        let response = aggregator(full_registry(), &fakes)
            .configuration_for_library("Calibre_Library")
            .await;

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"count_pages_prefs": {"library_config": {"Calibre_Library": {"pages_column": "#pages"}}}})
        );
        assert_eq!(fakes.closed(), 1);
    }

    #[tokio::test]
    async fn test_single_library_failures_give_empty_response() {
        let fakes = fake_libraries();
        let agg = aggregator(full_registry(), &fakes);

        assert!(agg.configuration_for_library("Unknown").await.is_empty());
        assert!(agg.configuration_for_library("").await.is_empty());

        // opened, fails to parse, still closed
        assert!(agg.configuration_for_library("Broken").await.is_empty());
        assert_eq!(fakes.opened(), 1);
        assert_eq!(fakes.closed(), 1);

        let without_pages = aggregator(ExtensionRegistry::new(), &fakes);
        assert!(without_pages.configuration_for_library("Calibre_Library").await.is_empty());
    }

    #[tokio::test]
    async fn test_live_store_untouched_by_redaction() {
        let fakes = fake_libraries();
        let store = MemoryPreferenceStore::new(json!({"Goodreads": {"devkeySecret": "k"}}));
        let mut registry = ExtensionRegistry::new();
        registry.register(Arc::new(GoodreadsSync::new(
            Arc::new(store.clone()),
            GoodreadsSyncSettings::default().extra_redact,
        )));

        let agg = aggregator(registry, &fakes);
        let _ = agg.configuration().await;
        let _ = agg.configuration_for_library(GLOBAL_LIBRARY_ID).await;

        assert_eq!(store.live().read().unwrap()["Goodreads"]["devkeySecret"], "k");
    }
}
