use async_trait::async_trait;
use std::sync::Arc;

use super::{ExtensionKind, ExtensionProvider, FetchScope, Snapshot, plugin_prefs_block};
use crate::error::ExtensionError;
use crate::library::LibraryCatalog;
use crate::prefs::PreferenceStore;
use crate::redact::{RedactionRule, redact};

/// The reader helper's own prefs, minus the dictionary viewer list the
/// client keeps for itself.
pub struct ReaderHelper {
    prefs: Arc<dyn PreferenceStore>,
    trims: Vec<RedactionRule>,
}

impl ReaderHelper {
    pub fn new(prefs: Arc<dyn PreferenceStore>, trims: Vec<RedactionRule>) -> Self {
        Self { prefs, trims }
    }
}

#[async_trait]
impl ExtensionProvider for ReaderHelper {
    fn kind(&self) -> ExtensionKind {
        ExtensionKind::ReaderHelper
    }

    async fn fetch_global(&self, _scope: FetchScope, _libraries: &LibraryCatalog) -> Result<Snapshot, ExtensionError> {
        let mut prefs = self.prefs.snapshot().await?;
        redact(&mut prefs, &self.trims);
        Ok(plugin_prefs_block(prefs))
    }
}
