//! Strips sensitive fields out of preference snapshots before they leave the
//! process. The field lists are plain data (see [`RedactionRule`]) so new
//! credential fields only need a config change.

use serde::Deserialize;
use serde_json::Value;

/// Removes `fields` from the object stored under `section`.
///
/// With `per_entry` set, `section` is treated as a map of objects (e.g. user
/// profiles) and the fields are removed from every entry instead.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RedactionRule {
    pub section: String,
    pub fields: Vec<String>,
    #[serde(default)]
    pub per_entry: bool,
}

impl RedactionRule {
    pub fn fields(section: &str, fields: &[&str]) -> Self {
        RedactionRule {
            section: section.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            per_entry: false,
        }
    }

    pub fn per_entry(section: &str, fields: &[&str]) -> Self {
        RedactionRule {
            per_entry: true,
            ..RedactionRule::fields(section, fields)
        }
    }

    fn apply(&self, prefs: &mut Value) {
        let Some(section) = prefs.get_mut(&self.section) else {
            return;
        };

        if self.per_entry {
            if let Some(entries) = section.as_object_mut() {
                for entry in entries.values_mut() {
                    self.strip(entry);
                }
            }
        } else {
            self.strip(section);
        }
    }

    fn strip(&self, target: &mut Value) {
        if let Some(obj) = target.as_object_mut() {
            for field in &self.fields {
                obj.remove(field);
            }
        }
    }
}

/// Applies every rule to `prefs` in place. Absent sections and fields are
/// skipped silently.
pub fn redact(prefs: &mut Value, rules: &[RedactionRule]) {
    for rule in rules {
        rule.apply(prefs);
    }
}
