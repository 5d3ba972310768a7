use std::error::Error;

pub mod aggregate;
pub mod auth;
pub mod config;
pub mod dshelper;
pub mod error;
pub mod extensions;
pub mod handler;
pub mod jobs;
pub mod library;
pub mod prefs;
pub mod redact;

#[cfg(test)]
mod testing;

pub fn unpack_error(err: &(dyn Error)) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExtensionError, LibraryError};

    #[test]
    fn test_unpack_error_walks_sources() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ExtensionError::Library(LibraryError::Json(json_err));
        let unpacked = unpack_error(&err);
        assert!(unpacked.starts_with("LibraryError: JsonError: "));
        assert!(unpacked.matches(": ").count() >= 3);
    }
}
