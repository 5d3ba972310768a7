use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use serde_json::Value;
use serde_yaml;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::redact::RedactionRule;

#[derive(Parser, Debug)]
#[command(name = "dshelper")]
#[command(about = "Serves job status and extension configuration to reader clients", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dshelper")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

fn default_calibre_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("calibre")
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    #[serde(default = "default_port")]
    port: u16,
    /// username -> password. Empty turns authentication off.
    #[serde(default)]
    pub users: BTreeMap<String, String>,
}

fn default_port() -> u16 {
    8080
}

impl Default for App {
    fn default() -> Self {
        App {
            port: default_port(),
            users: BTreeMap::new(),
        }
    }
}

impl App {
    pub fn get_port(&self) -> u16 {
        return self.port;
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Calibre {
    #[serde(default = "default_calibre_dir")]
    pub config_dir: PathBuf,
    #[serde(default)]
    pub libraries: Vec<PathBuf>,
}

impl Default for Calibre {
    fn default() -> Self {
        Calibre {
            config_dir: default_calibre_dir(),
            libraries: vec![],
        }
    }
}

impl Calibre {
    pub fn plugins_dir(&self) -> PathBuf {
        self.config_dir.join("plugins")
    }

    pub fn gui_prefs_path(&self) -> PathBuf {
        self.config_dir.join("gui.json")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReaderHelperSettings {
    #[serde(default = "ReaderHelperSettings::default_plugin_name")]
    pub plugin_name: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default = "ReaderHelperSettings::default_redact")]
    pub redact: Vec<RedactionRule>,
    #[serde(default = "ReaderHelperSettings::default_namespace")]
    pub library_namespace: String,
    #[serde(default = "ReaderHelperSettings::default_columns_key")]
    pub columns_key: String,
    #[serde(default = "ReaderHelperSettings::default_options_key")]
    pub options_key: String,
}

impl ReaderHelperSettings {
    fn default_plugin_name() -> String {
        "DSReader Helper".to_string()
    }

    fn default_redact() -> Vec<RedactionRule> {
        vec![RedactionRule::fields("Options", &["dictViewerOrderedList"])]
    }

    fn default_namespace() -> String {
        "DSReaderHelper".to_string()
    }

    fn default_columns_key() -> String {
        "readingPositionColumns".to_string()
    }

    fn default_options_key() -> String {
        "readingPositionOptions".to_string()
    }
}

impl Default for ReaderHelperSettings {
    fn default() -> Self {
        ReaderHelperSettings {
            plugin_name: Self::default_plugin_name(),
            enabled: None,
            redact: Self::default_redact(),
            library_namespace: Self::default_namespace(),
            columns_key: Self::default_columns_key(),
            options_key: Self::default_options_key(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CountPagesSettings {
    #[serde(default = "CountPagesSettings::default_plugin_name")]
    pub plugin_name: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub redact: Vec<RedactionRule>,
    #[serde(default = "CountPagesSettings::default_namespace")]
    pub library_namespace: String,
    #[serde(default = "CountPagesSettings::default_key")]
    pub library_key: String,
    /// Returned for libraries that never saved their own settings.
    #[serde(default = "empty_object")]
    pub library_defaults: Value,
}

impl CountPagesSettings {
    fn default_plugin_name() -> String {
        "Count Pages".to_string()
    }

    fn default_namespace() -> String {
        "CountPagesPlugin".to_string()
    }

    fn default_key() -> String {
        "settings".to_string()
    }
}

impl Default for CountPagesSettings {
    fn default() -> Self {
        CountPagesSettings {
            plugin_name: Self::default_plugin_name(),
            enabled: None,
            redact: vec![],
            library_namespace: Self::default_namespace(),
            library_key: Self::default_key(),
            library_defaults: empty_object(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GoodreadsSyncSettings {
    #[serde(default = "GoodreadsSyncSettings::default_plugin_name")]
    pub plugin_name: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Applied on top of the built-in credential rules, never instead of them.
    #[serde(default)]
    pub extra_redact: Vec<RedactionRule>,
}

impl GoodreadsSyncSettings {
    fn default_plugin_name() -> String {
        "Goodreads Sync".to_string()
    }
}

impl Default for GoodreadsSyncSettings {
    fn default() -> Self {
        GoodreadsSyncSettings {
            plugin_name: Self::default_plugin_name(),
            enabled: None,
            extra_redact: vec![],
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Extensions {
    #[serde(default)]
    pub dsreader_helper: ReaderHelperSettings,
    #[serde(default)]
    pub count_pages: CountPagesSettings,
    #[serde(default)]
    pub goodreads_sync: GoodreadsSyncSettings,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub calibre: Calibre,
    #[serde(default)]
    pub extensions: Extensions,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        Ok(cfg)
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path)?;
        Config::from_yaml(&yaml_str)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Config> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str)?;
        // serde_yaml rejects an empty document, an empty file means "all defaults"
        if yaml_with_env.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            if let Some(end) = result[actual_start..].find("}") {
                let var_name = &result[actual_start + 2..actual_start + end];

                // ${VAR:-default}
                let env_value = if let Some(default_start) = var_name.find(":-") {
                    let actual_var = &var_name[..default_start];
                    let default_val = &var_name[default_start + 2..];
                    env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
                } else {
                    env::var(var_name).unwrap_or_else(|_| {
                        tracing::warn!("environment variable '{}' not found", var_name);
                        String::new()
                    })
                };

                result.replace_range(actual_start..actual_start + end + 1, &env_value);
                offset = actual_start + env_value.len();
            } else {
                break;
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = Config::from_yaml("").unwrap();
        assert_eq!(cfg.app.get_port(), 8080);
        assert!(cfg.app.users.is_empty());
        assert_eq!(cfg.extensions.count_pages.plugin_name, "Count Pages");
        assert!(cfg.extensions.goodreads_sync.extra_redact.is_empty());
        assert_eq!(cfg.extensions.count_pages.library_defaults, serde_json::json!({}));
    }

    #[test]
    fn test_env_default_substitution() {
        let yaml = r##"
app:
  port: ${DSHELPER_TEST_UNSET_PORT:-9123}
  users:
    reader: ${DSHELPER_TEST_UNSET_PASSWORD:-hunter2}
calibre:
  config_dir: /srv/calibre
  libraries:
    - /srv/books/Main Library
extensions:
  goodreads_sync:
    enabled: false
    extra_redact:
      - section: Users
        fields: [userToken]
        per_entry: true
  count_pages:
    library_defaults:
      pages_column: "#pages"
"##;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.app.get_port(), 9123);
        assert_eq!(cfg.app.users.get("reader").map(String::as_str), Some("hunter2"));
        assert_eq!(cfg.calibre.gui_prefs_path(), PathBuf::from("/srv/calibre/gui.json"));
        assert_eq!(cfg.calibre.libraries, vec![PathBuf::from("/srv/books/Main Library")]);
        assert_eq!(cfg.extensions.goodreads_sync.enabled, Some(false));
        assert_eq!(
            cfg.extensions.goodreads_sync.extra_redact,
            vec![RedactionRule::per_entry("Users", &["userToken"])]
        );
        assert_eq!(
            cfg.extensions.count_pages.library_defaults,
            serde_json::json!({"pages_column": "#pages"})
        );
        assert_eq!(cfg.extensions.dsreader_helper.plugin_name, "DSReader Helper");
    }
}
