use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Top-level run configuration, loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Root directory holding the dated input folders.
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    /// Directory the CSV exports are written under.
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
    /// Providers keyed by name; absent providers are treated as disabled.
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderSettings>,
    /// Unified account names with the labels each source uses for them.
    #[serde(default)]
    pub accounts: Vec<AccountMapping>,
    #[serde(default)]
    pub validation: ValidationSettings,
}

impl Settings {
    /// Names of the providers enabled for this run, in name order.
    pub fn enabled_providers(&self) -> Vec<String> {
        self.providers
            .iter()
            .filter(|(_, p)| p.enabled)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Builds the unified-name to alias-list table the resolver consumes.
    pub fn alias_table(&self) -> BTreeMap<String, Vec<String>> {
        self.accounts
            .iter()
            .map(|m| (m.name.clone(), m.aliases.clone()))
            .collect()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            input_dir: default_input_dir(),
            export_dir: default_export_dir(),
            providers: BTreeMap::new(),
            accounts: Vec::new(),
            validation: ValidationSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Glob patterns locating each input file, keyed by record kind
    /// ("cash", "positions", "transactions").
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    /// Restrict ledger entries to the collection month.
    #[serde(default)]
    pub recent_month_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountMapping {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Relative-difference bands for the cross-source total check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSettings {
    #[serde(default = "default_warn_threshold")]
    pub warn_threshold: f64,
    #[serde(default = "default_error_threshold")]
    pub error_threshold: f64,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        ValidationSettings {
            warn_threshold: default_warn_threshold(),
            error_threshold: default_error_threshold(),
        }
    }
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("data/input")
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("data/export")
}

fn default_true() -> bool {
    true
}

fn default_warn_threshold() -> f64 {
    0.05
}

fn default_error_threshold() -> f64 {
    0.20
}
