//! Configuration file reading and parsing.
//!
//! This module handles locating, reading, and parsing INI-format configuration files,
//! with support for layered overrides.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use thiserror::Error;

use super::{CacheConfig, Config, S3Config, S3Settings, StorageConfig};
use crate::storage::{StorageOptions, default_cache_root};

// =============================================================================
// Constants
// =============================================================================

const ENV_CONFIG_FILE: &str = "STOWAGE_CONFIG_FILE";
const DEFAULT_CONFIG_FILENAME: &str = ".stowage";

/// Keys accepted in [storage] and [storage.NAME] sections.
const STORAGE_OPTION_KEYS: &[&str] = &[
    "base_path",
    "create_missing_directories",
    "directory_mode",
    "access_policy",
    "storage_class",
    "search_paths",
];

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid value '{value}' for key '{key}': {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },

    #[error("invalid boolean '{value}' for key '{key}'")]
    InvalidBoolean { key: String, value: String },

    #[error("invalid override key '{key}': {message}")]
    InvalidOverrideKey { key: String, message: String },

    #[error("missing required field '{field}' in section '{section}'")]
    MissingRequiredField { section: String, field: String },
}

/// Result type for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// =============================================================================
// ConfigSource
// =============================================================================

/// Specifies how to locate and layer configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    /// Explicit config file path from CLI. If specified and doesn't exist, error.
    /// If None, fall back to STOWAGE_CONFIG_FILE env var, then ~/.stowage.
    pub config_file: Option<PathBuf>,

    /// Additional override config file (layered on top of base config).
    pub override_file: Option<PathBuf>,

    /// Individual key=value overrides (applied last).
    /// Keys use dot-notation: "cache.path", "storage.media.url"
    pub overrides: Vec<(String, String)>,
}

// =============================================================================
// Value Parsing
// =============================================================================

fn parse_bool_value(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBoolean {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Parse permission bits written in octal, with or without a leading `0o`.
fn parse_mode_value(key: &str, value: &str) -> Result<u32> {
    let digits = value.trim();
    let digits = digits.strip_prefix("0o").unwrap_or(digits);
    u32::from_str_radix(digits, 8).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        message: e.to_string(),
    })
}

/// Parse a comma-separated string into a Vec of trimmed strings.
fn parse_comma_separated(s: &str) -> Vec<String> {
    s.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn invalid_value(key: &str, value: &str, message: String) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        message,
    }
}

/// Set one engine option. Returns false if `key` is not an engine option.
fn apply_storage_option(
    options: &mut StorageOptions,
    key: &str,
    value: &str,
) -> Result<bool> {
    match key {
        "base_path" => options.base_path = Some(PathBuf::from(value)),
        "create_missing_directories" => {
            options.create_missing_directories = Some(parse_bool_value(key, value)?)
        }
        "directory_mode" => options.directory_mode = Some(parse_mode_value(key, value)?),
        "access_policy" => {
            options.access_policy =
                Some(value.parse().map_err(|e| invalid_value(key, value, e))?)
        }
        "storage_class" => {
            options.storage_class =
                Some(value.parse().map_err(|e| invalid_value(key, value, e))?)
        }
        "search_paths" => {
            options.search_paths = Some(
                parse_comma_separated(value)
                    .into_iter()
                    .map(PathBuf::from)
                    .collect(),
            )
        }
        _ => return Ok(false),
    }
    Ok(true)
}

/// Set one S3 setting. Returns false if `key` is not an S3 setting.
fn apply_s3_setting(settings: &mut S3Settings, key: &str, value: &str) -> bool {
    let slot = match key {
        "endpoint_url" => &mut settings.endpoint_url,
        "region" => &mut settings.region,
        "access_key_id" => &mut settings.access_key_id,
        "secret_access_key" => &mut settings.secret_access_key,
        _ => return false,
    };
    *slot = Some(value.to_string());
    true
}

// =============================================================================
// Config File Resolution
// =============================================================================

/// Information about how the config file was resolved.
#[derive(Debug)]
pub struct ResolvedConfigFile {
    /// The path to the config file, if one was found.
    pub path: Option<PathBuf>,
    /// Warning message if env var pointed to nonexistent file.
    pub warning: Option<String>,
}

/// Resolve which config file to use based on the ConfigSource and environment.
fn resolve_config_file(source: &ConfigSource) -> Result<ResolvedConfigFile> {
    // If explicit path provided, it must exist
    if let Some(ref path) = source.config_file {
        if path.exists() {
            return Ok(ResolvedConfigFile {
                path: Some(path.clone()),
                warning: None,
            });
        } else {
            return Err(ConfigError::FileNotFound(path.clone()));
        }
    }

    // Check environment variable
    if let Ok(env_path) = env::var(ENV_CONFIG_FILE) {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(ResolvedConfigFile {
                path: Some(path),
                warning: None,
            });
        } else {
            // Warn but continue with defaults
            return Ok(ResolvedConfigFile {
                path: None,
                warning: Some(format!(
                    "config file specified by {} does not exist: {}",
                    ENV_CONFIG_FILE, env_path
                )),
            });
        }
    }

    // Check ~/.stowage
    if let Some(home) = home_dir() {
        let default_path = home.join(DEFAULT_CONFIG_FILENAME);
        if default_path.exists() {
            return Ok(ResolvedConfigFile {
                path: Some(default_path),
                warning: None,
            });
        }
    }

    Ok(ResolvedConfigFile {
        path: None,
        warning: None,
    })
}

/// Get the user's home directory.
fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}

// =============================================================================
// Default Config
// =============================================================================

/// Create a Config with all default values.
///
/// Engine option defaults are applied by the engines themselves, so the
/// [storage] section starts out empty.
fn default_config() -> Config {
    Config {
        cache: CacheConfig {
            path: default_cache_root(),
        },
        s3: S3Config::default(),
        storage: StorageOptions::new(),
        storages: HashMap::new(),
    }
}

// =============================================================================
// INI Parsing
// =============================================================================

/// Apply the engine options present in an INI section.
fn apply_storage_section(ini: &Ini, section: &str, options: &mut StorageOptions) -> Result<()> {
    for key in STORAGE_OPTION_KEYS {
        if let Some(value) = ini.get(section, key) {
            apply_storage_option(options, key, &value)?;
        }
    }
    Ok(())
}

/// Apply the S3 settings present in an INI section.
fn apply_s3_section(ini: &Ini, section: &str, settings: &mut S3Settings) {
    for key in ["endpoint_url", "region", "access_key_id", "secret_access_key"] {
        if let Some(value) = ini.get(section, key) {
            apply_s3_setting(settings, key, &value);
        }
    }
}

/// Apply an INI file's contents to a Config, layering on top of existing values.
fn apply_ini_to_config(config: &mut Config, ini: &Ini) -> Result<()> {
    // [cache] section
    if let Some(path) = ini.get("cache", "path") {
        config.cache.path = PathBuf::from(path);
    }

    // [s3] section
    apply_s3_section(ini, "s3", &mut config.s3.settings);

    // [storage] section
    apply_storage_section(ini, "storage", &mut config.storage)?;

    // [storage.*] sections
    for section_name in ini.sections() {
        let Some(storage_name) = section_name.strip_prefix("storage.") else {
            continue;
        };

        let url = ini
            .get(&section_name, "url")
            .ok_or_else(|| ConfigError::MissingRequiredField {
                section: section_name.clone(),
                field: "url".to_string(),
            })?;

        let mut storage_config = StorageConfig {
            url,
            ..StorageConfig::default()
        };
        apply_storage_section(ini, &section_name, &mut storage_config.options)?;
        apply_s3_section(ini, &section_name, &mut storage_config.settings);

        config
            .storages
            .insert(storage_name.to_string(), storage_config);
    }

    Ok(())
}

/// Load and parse an INI file.
fn load_ini(path: &Path) -> Result<Ini> {
    let mut ini = Ini::new();
    ini.load(path).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e,
    })?;
    Ok(ini)
}

// =============================================================================
// Override Application
// =============================================================================

/// Apply a single key=value override to the config.
fn apply_override(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = key.splitn(3, '.').collect();

    let recognized = match parts.as_slice() {
        // cache.path
        ["cache", "path"] => {
            config.cache.path = PathBuf::from(value);
            true
        }

        // s3.endpoint_url, s3.region, ...
        ["s3", param] => apply_s3_setting(&mut config.s3.settings, param, value),

        // storage.directory_mode, storage.access_policy, ...
        ["storage", param] => apply_storage_option(&mut config.storage, param, value)?,

        // storage.name.param
        ["storage", name, param] => apply_named_storage_override(config, name, param, value)?,

        _ => {
            return Err(ConfigError::InvalidOverrideKey {
                key: key.to_string(),
                message: "unrecognized key format".to_string(),
            });
        }
    };

    if recognized {
        Ok(())
    } else {
        Err(ConfigError::InvalidOverrideKey {
            key: key.to_string(),
            message: "unknown parameter".to_string(),
        })
    }
}

fn apply_named_storage_override(
    config: &mut Config,
    name: &str,
    param: &str,
    value: &str,
) -> Result<bool> {
    let storage = config.storages.entry(name.to_string()).or_default();

    if param == "url" {
        storage.url = value.to_string();
        return Ok(true);
    }
    if apply_s3_setting(&mut storage.settings, param, value) {
        return Ok(true);
    }
    apply_storage_option(&mut storage.options, param, value)
}

// =============================================================================
// Main Entry Point
// =============================================================================

/// Result of reading configuration, including any warnings.
#[derive(Debug)]
pub struct ConfigResult {
    /// The parsed configuration.
    pub config: Config,
    /// Any warnings generated during config loading.
    pub warnings: Vec<String>,
}

/// Read and parse configuration from the specified sources.
///
/// Configuration is layered in this order:
/// 1. Built-in defaults
/// 2. Base config file (from CLI, env var, or ~/.stowage)
/// 3. Override config file (if specified)
/// 4. Individual overrides (applied last)
pub fn read_config(source: &ConfigSource) -> Result<ConfigResult> {
    let mut warnings = Vec::new();

    let mut config = default_config();

    let resolved = resolve_config_file(source)?;
    if let Some(warning) = resolved.warning {
        warnings.push(warning);
    }
    if let Some(ref path) = resolved.path {
        let ini = load_ini(path)?;
        apply_ini_to_config(&mut config, &ini)?;
    }

    if let Some(ref override_path) = source.override_file {
        if !override_path.exists() {
            return Err(ConfigError::FileNotFound(override_path.clone()));
        }
        let ini = load_ini(override_path)?;
        apply_ini_to_config(&mut config, &ini)?;
    }

    for (key, value) in &source.overrides {
        apply_override(&mut config, key, value)?;
    }

    Ok(ConfigResult { config, warnings })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::{AccessPolicy, StorageClass};
    use tempfile::TempDir;

    fn parse_ini(text: &str) -> Ini {
        let mut ini = Ini::new();
        ini.read(text.to_string()).unwrap();
        ini
    }

    #[test]
    fn test_default_config() {
        let config = default_config();
        assert_eq!(config.cache.path, default_cache_root());
        assert_eq!(config.storage, StorageOptions::new());
        assert!(config.storages.is_empty());
    }

    #[test]
    fn test_parse_mode_value() {
        assert_eq!(parse_mode_value("m", "755").unwrap(), 0o755);
        assert_eq!(parse_mode_value("m", "0o700").unwrap(), 0o700);
        assert_eq!(parse_mode_value("m", "0777").unwrap(), 0o777);
        assert!(matches!(
            parse_mode_value("m", "799"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_parse_ini_config() {
        let ini = parse_ini(
            r#"
[cache]
path = /custom/cache

[s3]
endpoint_url = http://localhost:9000
region = us-east-1

[storage]
directory_mode = 750
access_policy = private
search_paths = /opt/shared, /usr/share/stowage

[storage.media]
url = s3://media-bucket/assets
storage_class = reduced_redundancy
region = eu-west-1
"#,
        );

        let mut config = default_config();
        apply_ini_to_config(&mut config, &ini).unwrap();

        assert_eq!(config.cache.path, PathBuf::from("/custom/cache"));
        assert_eq!(
            config.s3.settings.endpoint_url.as_deref(),
            Some("http://localhost:9000")
        );
        assert_eq!(config.storage.directory_mode, Some(0o750));
        assert_eq!(config.storage.access_policy, Some(AccessPolicy::Private));
        assert_eq!(
            config.storage.search_paths,
            Some(vec![
                PathBuf::from("/opt/shared"),
                PathBuf::from("/usr/share/stowage")
            ])
        );

        let media = config.storages.get("media").unwrap();
        assert_eq!(media.url, "s3://media-bucket/assets");
        assert_eq!(
            media.options.storage_class,
            Some(StorageClass::ReducedRedundancy)
        );
        assert_eq!(media.settings.region.as_deref(), Some("eu-west-1"));
        assert_eq!(media.options.directory_mode, None);
    }

    #[test]
    fn test_named_storage_requires_url() {
        let ini = parse_ini("[storage.broken]\nregion = us-east-1\n");
        let mut config = default_config();
        assert!(matches!(
            apply_ini_to_config(&mut config, &ini),
            Err(ConfigError::MissingRequiredField { .. })
        ));
    }

    #[test]
    fn test_invalid_option_values() {
        let mut config = default_config();
        let ini = parse_ini("[storage]\naccess_policy = everyone\n");
        assert!(matches!(
            apply_ini_to_config(&mut config, &ini),
            Err(ConfigError::InvalidValue { .. })
        ));

        let ini = parse_ini("[storage]\ncreate_missing_directories = maybe\n");
        assert!(matches!(
            apply_ini_to_config(&mut config, &ini),
            Err(ConfigError::InvalidBoolean { .. })
        ));
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = default_config();
        apply_override(&mut config, "cache.path", "/custom/path").unwrap();
        apply_override(&mut config, "s3.region", "us-west-2").unwrap();
        apply_override(&mut config, "storage.create_missing_directories", "no").unwrap();
        apply_override(&mut config, "storage.docs.url", "file:///srv/docs").unwrap();
        apply_override(&mut config, "storage.docs.directory_mode", "700").unwrap();

        assert_eq!(config.cache.path, PathBuf::from("/custom/path"));
        assert_eq!(config.s3.settings.region.as_deref(), Some("us-west-2"));
        assert_eq!(config.storage.create_missing_directories, Some(false));

        let docs = config.storages.get("docs").unwrap();
        assert_eq!(docs.url, "file:///srv/docs");
        assert_eq!(docs.options.directory_mode, Some(0o700));
    }

    #[test]
    fn test_apply_override_errors() {
        let mut config = default_config();
        assert!(matches!(
            apply_override(&mut config, "memory.max", "1GB"),
            Err(ConfigError::InvalidOverrideKey { .. })
        ));
        assert!(matches!(
            apply_override(&mut config, "s3.bucket_name", "x"),
            Err(ConfigError::InvalidOverrideKey { .. })
        ));
        assert!(matches!(
            apply_override(&mut config, "storage.docs.colour", "blue"),
            Err(ConfigError::InvalidOverrideKey { .. })
        ));
    }

    #[test]
    fn test_read_config_layers() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("base.ini");
        let overrides = temp.path().join("overrides.ini");
        std::fs::write(
            &base,
            "[storage]\ndirectory_mode = 755\n\n[storage.docs]\nurl = file:///srv/docs\n",
        )
        .unwrap();
        std::fs::write(&overrides, "[storage]\ndirectory_mode = 700\n").unwrap();

        let source = ConfigSource {
            config_file: Some(base),
            override_file: Some(overrides),
            overrides: vec![("cache.path".to_string(), "/cache".to_string())],
        };
        let result = read_config(&source).unwrap();

        assert!(result.warnings.is_empty());
        assert_eq!(result.config.storage.directory_mode, Some(0o700));
        assert_eq!(result.config.cache.path, PathBuf::from("/cache"));
        assert!(result.config.storages.contains_key("docs"));
    }

    #[test]
    fn test_read_config_missing_files() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.ini");

        let source = ConfigSource {
            config_file: Some(missing.clone()),
            ..ConfigSource::default()
        };
        assert!(matches!(
            read_config(&source),
            Err(ConfigError::FileNotFound(path)) if path == missing
        ));
    }
}
