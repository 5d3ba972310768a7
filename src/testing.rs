//! Test doubles shared by unit tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::LibraryError;
use crate::library::{LibraryAccessor, LibraryCatalog, LibraryHandle};

#[derive(Clone)]
struct FakeLibrary {
    prefs: HashMap<String, Value>,
    broken: bool,
}

/// In-memory libraries that count every open and close.
#[derive(Default)]
pub struct FakeLibraries {
    libraries: Vec<(PathBuf, FakeLibrary)>,
    /// Known to the catalog but failing to open.
    missing: Vec<PathBuf>,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl FakeLibraries {
    pub fn new() -> Self {
        Self::default()
    }

    /// `prefs` keys are `"<namespace>:<key>"`.
    pub fn with_library(mut self, path: &str, prefs: &[(&str, Value)]) -> Self {
        let prefs = prefs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        self.libraries.push((PathBuf::from(path), FakeLibrary { prefs, broken: false }));
        self
    }

    pub fn with_broken_library(mut self, path: &str) -> Self {
        self.libraries.push((
            PathBuf::from(path),
            FakeLibrary {
                prefs: HashMap::new(),
                broken: true,
            },
        ));
        self
    }

    pub fn with_missing_library(mut self, path: &str) -> Self {
        self.missing.push(PathBuf::from(path));
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn catalog(self: &Arc<Self>) -> LibraryCatalog {
        let mut known: Vec<PathBuf> = self.libraries.iter().map(|(p, _)| p.clone()).collect();
        known.extend(self.missing.iter().cloned());
        LibraryCatalog::new(self.clone(), "/nonexistent/gui.json", known)
    }
}

#[async_trait]
impl LibraryAccessor for FakeLibraries {
    async fn open(&self, path: &Path) -> Result<Box<dyn LibraryHandle>, LibraryError> {
        let library = self
            .libraries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, lib)| lib.clone())
            .ok_or_else(|| LibraryError::NotFound(path.display().to_string()))?;

        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeHandle {
            path: path.to_path_buf(),
            library,
            closed: self.closed.clone(),
        }))
    }
}

struct FakeHandle {
    path: PathBuf,
    library: FakeLibrary,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl LibraryHandle for FakeHandle {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn namespaced_pref(&self, namespace: &str, key: &str) -> Result<Option<Value>, LibraryError> {
        if self.library.broken {
            let err = serde_json::from_str::<Value>("{broken").unwrap_err();
            return Err(LibraryError::Json(err));
        }
        Ok(self.library.prefs.get(&format!("{}:{}", namespace, key)).cloned())
    }

    async fn close(self: Box<Self>) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
