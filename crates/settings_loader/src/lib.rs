//! # Settings Loader
//!
//! Centralized settings loading for the collection pipeline. Settings live
//! in a YAML file, by default `settings.yaml` in the working directory,
//! holding the input/export directories, the enabled providers with their
//! file patterns, the account alias table, and the validation thresholds.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use models::Settings;

/// Loads settings from a YAML file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Reading settings file: {}", path.display()))?;
    let settings: Settings = serde_yaml::from_str(&raw)
        .with_context(|| format!("Parsing settings YAML in {}", path.display()))?;
    Ok(settings)
}

/// Loads settings from the default location (settings.yaml in the current directory)
pub fn load_default_settings() -> Result<Settings> {
    load_settings("settings.yaml")
}

/// Loads settings from an optional path, returning None if no path is provided
pub fn load_optional_settings(path: Option<&PathBuf>) -> Result<Option<Settings>> {
    match path {
        Some(settings_path) => Ok(Some(load_settings(settings_path)?)),
        None => Ok(None),
    }
}

/// Tries the provided path first, then the default location. Falls back to
/// built-in defaults only when no settings file is found anywhere.
pub fn load_settings_or_default(path: Option<&PathBuf>) -> Result<Settings> {
    if let Some(settings_path) = path {
        return load_settings(settings_path);
    }
    if settings_file_exists("settings.yaml") {
        return load_default_settings();
    }
    Ok(Settings::default())
}

/// Checks if a settings file exists at the given path
pub fn settings_file_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists() && path.as_ref().is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
input_dir: data/input
export_dir: data/export
providers:
  snapshot:
    enabled: true
    files:
      cash: "snapshot*.mhtml"
      positions: "snapshot*.mhtml"
      transactions: "snapshot*.mhtml"
  workbook:
    enabled: false
accounts:
  - name: KB Checking
    aliases: ["KB국민 입출금", "kb_checking"]
validation:
  warn_threshold: 0.10
"#;

    #[test]
    fn loads_yaml_settings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let settings = load_settings(file.path()).unwrap();
        assert_eq!(settings.enabled_providers(), vec!["snapshot".to_string()]);
        assert_eq!(
            settings.providers["snapshot"].files["cash"],
            "snapshot*.mhtml"
        );
        assert_eq!(settings.alias_table()["KB Checking"].len(), 2);
        assert_eq!(settings.validation.warn_threshold, 0.10);
        // Unspecified threshold keeps its default.
        assert_eq!(settings.validation.error_threshold, 0.20);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_settings("/no/such/settings.yaml").is_err());
    }

    #[test]
    fn optional_none_is_ok() {
        assert!(load_optional_settings(None).unwrap().is_none());
    }
}
