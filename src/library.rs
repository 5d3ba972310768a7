use async_trait::async_trait;
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::LibraryError;

pub const METADATA_DB: &str = "metadata.db";

/// An open library backend. Callers must `close` it when done.
#[async_trait]
pub trait LibraryHandle: Send + Sync {
    fn path(&self) -> &Path;

    /// Reads a namespaced library preference, `None` when it was never set.
    async fn namespaced_pref(&self, namespace: &str, key: &str) -> Result<Option<Value>, LibraryError>;

    async fn close(self: Box<Self>);
}

#[async_trait]
pub trait LibraryAccessor: Send + Sync {
    async fn open(&self, path: &Path) -> Result<Box<dyn LibraryHandle>, LibraryError>;
}

pub struct LibraryDatabase {
    path: PathBuf,
    db: LibsqlDatabase,
    conn: Connection,
}

impl LibraryDatabase {
    pub async fn open(path: &Path) -> Result<Self, LibraryError> {
        let db_path = path.join(METADATA_DB);
        // Builder::new_local creates missing files, which must never happen to a library
        if !tokio::fs::try_exists(&db_path).await? {
            return Err(LibraryError::NotFound(db_path.display().to_string()));
        }

        let db = Builder::new_local(&db_path).build().await?;
        let conn = db.connect()?;
        tracing::debug!("[library] opened {:?}", db_path);

        Ok(LibraryDatabase {
            path: path.to_path_buf(),
            db,
            conn,
        })
    }

    fn namespaced_key(namespace: &str, key: &str) -> String {
        format!("namespaced:{}:{}", namespace, key)
    }

    pub async fn preference(&self, key: &str) -> Result<Option<Value>, LibraryError> {
        let query = "SELECT val FROM preferences WHERE key = ?";
        let mut rows = self.conn.query(query, libsql::params![key]).await?;

        match rows.next().await? {
            Some(row) => {
                let raw: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl LibraryHandle for LibraryDatabase {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn namespaced_pref(&self, namespace: &str, key: &str) -> Result<Option<Value>, LibraryError> {
        self.preference(&Self::namespaced_key(namespace, key)).await
    }

    async fn close(self: Box<Self>) {
        let LibraryDatabase { path, db, conn } = *self;
        drop(conn);
        drop(db);
        tracing::debug!("[library] closed {:?}", path);
    }
}

/// Opens libraries straight from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskLibraryAccessor;

#[async_trait]
impl LibraryAccessor for DiskLibraryAccessor {
    async fn open(&self, path: &Path) -> Result<Box<dyn LibraryHandle>, LibraryError> {
        Ok(Box::new(LibraryDatabase::open(path).await?))
    }
}

/// Base name of a library path, used to key per-library results.
pub fn library_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Identifier clients use in URLs for the library at `path`.
pub fn library_id(path: &Path) -> String {
    library_name(path).replace(' ', "_")
}

/// Every library the host knows about: the host's usage statistics plus any
/// libraries listed in our own config.
pub struct LibraryCatalog {
    accessor: Arc<dyn LibraryAccessor>,
    gui_prefs: PathBuf,
    extra: Vec<PathBuf>,
}

impl LibraryCatalog {
    pub fn new(accessor: Arc<dyn LibraryAccessor>, gui_prefs: impl Into<PathBuf>, extra: Vec<PathBuf>) -> Self {
        Self {
            accessor,
            gui_prefs: gui_prefs.into(),
            extra,
        }
    }

    async fn usage_stats(&self) -> Result<Vec<PathBuf>, LibraryError> {
        let raw = match tokio::fs::read_to_string(&self.gui_prefs).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("[library] no gui prefs at {:?}", self.gui_prefs);
                return Ok(vec![]);
            }
            Err(e) => return Err(e.into()),
        };

        let prefs: Value = serde_json::from_str(&raw)?;
        let paths = prefs
            .get("library_usage_stats")
            .and_then(Value::as_object)
            .map(|stats| stats.keys().map(PathBuf::from).collect())
            .unwrap_or_default();
        Ok(paths)
    }

    pub async fn known_libraries(&self) -> Result<Vec<PathBuf>, LibraryError> {
        let mut libraries = self.usage_stats().await?;
        for path in &self.extra {
            if !libraries.contains(path) {
                libraries.push(path.clone());
            }
        }
        Ok(libraries)
    }

    /// Finds the known library whose id is exactly `library_id`.
    pub async fn resolve(&self, library_id: &str) -> Result<PathBuf, LibraryError> {
        self.known_libraries()
            .await?
            .into_iter()
            .find(|path| self::library_id(path) == library_id)
            .ok_or_else(|| LibraryError::UnknownLibrary(library_id.to_string()))
    }

    pub async fn open(&self, path: &Path) -> Result<Box<dyn LibraryHandle>, LibraryError> {
        self.accessor.open(path).await
    }

    pub async fn open_by_id(&self, library_id: &str) -> Result<Box<dyn LibraryHandle>, LibraryError> {
        let path = self.resolve(library_id).await?;
        self.open(&path).await
    }
}
