use async_trait::async_trait;
use std::sync::Arc;

use super::{ExtensionKind, ExtensionProvider, FetchScope, Snapshot, plugin_prefs_block};
use crate::error::ExtensionError;
use crate::library::LibraryCatalog;
use crate::prefs::PreferenceStore;
use crate::redact::{RedactionRule, redact};

/// Reviews-sync prefs with developer keys and user credentials stripped.
pub struct GoodreadsSync {
    prefs: Arc<dyn PreferenceStore>,
    secrets: Vec<RedactionRule>,
}

impl GoodreadsSync {
    /// `extra` rules run after the built-in credential rules.
    pub fn new(prefs: Arc<dyn PreferenceStore>, extra: Vec<RedactionRule>) -> Self {
        let mut secrets = Self::credential_rules();
        secrets.extend(extra);
        Self { prefs, secrets }
    }

    /// Developer keys and per-profile user credentials.
    pub fn credential_rules() -> Vec<RedactionRule> {
        vec![
            RedactionRule::fields("Goodreads", &["devkeySecret", "devkeyToken"]),
            RedactionRule::per_entry("Users", &["userId", "userSecret", "userToken"]),
        ]
    }
}

#[async_trait]
impl ExtensionProvider for GoodreadsSync {
    fn kind(&self) -> ExtensionKind {
        ExtensionKind::GoodreadsSync
    }

    async fn fetch_global(&self, _scope: FetchScope, _libraries: &LibraryCatalog) -> Result<Snapshot, ExtensionError> {
        let mut prefs = self.prefs.snapshot().await?;
        redact(&mut prefs, &self.secrets);
        Ok(plugin_prefs_block(prefs))
    }
}
