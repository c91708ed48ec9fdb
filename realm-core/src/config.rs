//! Per-realm configuration persistence.
//!
//! # Storage layout
//!
//! ```text
//! <realm>/
//!   package.json           (package descriptor; marks the directory as a realm)
//!   .realm/
//!     config.json|yaml     (artifact groups + task declarations)
//!     dev.json|yaml        (build units + defaultTask + merge linkage)
//! ```
//!
//! A missing config or dev file loads as the empty configuration. A missing
//! package descriptor is [`RealmError::NotARealm`].

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{io_err, RealmError};
use crate::types::{DevConfig, PackageDescriptor, RealmConfig};

pub const CONFIG_DIR: &str = ".realm";
pub const PACKAGE_FILE: &str = "package.json";
pub const CONFIG_STEM: &str = "config";
pub const DEV_STEM: &str = "dev";

/// On-disk encoding of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    #[default]
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Probe order when looking for an existing file.
    const PROBE: [(&'static str, ConfigFormat); 3] = [
        ("json", ConfigFormat::Json),
        ("yaml", ConfigFormat::Yaml),
        ("yml", ConfigFormat::Yaml),
    ];

    pub fn extension(self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            ConfigFormat::Yaml => "yaml",
        }
    }

    /// Parse an extension as given by callers (`".yaml"`, `"yml"`, `"json"`).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "json" => Some(ConfigFormat::Json),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<cwd>/.realm/`
pub fn config_dir_at(cwd: &Path) -> PathBuf {
    cwd.join(CONFIG_DIR)
}

/// `<cwd>/package.json`
pub fn package_path_at(cwd: &Path) -> PathBuf {
    cwd.join(PACKAGE_FILE)
}

/// `<cwd>/.realm/<stem>.<ext>`; no I/O.
pub fn config_file_path_at(cwd: &Path, stem: &str, format: ConfigFormat) -> PathBuf {
    config_dir_at(cwd).join(format!("{stem}.{}", format.extension()))
}

/// First existing `<cwd>/.realm/<stem>.{json,yaml,yml}`.
pub fn find_config_file(cwd: &Path, stem: &str) -> Option<(PathBuf, ConfigFormat)> {
    let dir = config_dir_at(cwd);
    ConfigFormat::PROBE.iter().find_map(|(ext, format)| {
        let path = dir.join(format!("{stem}.{ext}"));
        path.is_file().then_some((path, *format))
    })
}

/// `true` if `cwd` holds a package descriptor.
pub fn is_realm_dir(cwd: &Path) -> bool {
    package_path_at(cwd).is_file()
}

// ---------------------------------------------------------------------------
// 2. Codec
// ---------------------------------------------------------------------------

/// Read and decode a config file.
pub fn read_file<T: DeserializeOwned>(path: &Path, format: ConfigFormat) -> Result<T, RealmError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    decode(path, &contents, format)
}

fn decode<T: DeserializeOwned>(
    path: &Path,
    contents: &str,
    format: ConfigFormat,
) -> Result<T, RealmError> {
    match format {
        ConfigFormat::Json => serde_json::from_str(contents).map_err(|source| {
            RealmError::ParseJson {
                path: path.to_path_buf(),
                source,
            }
        }),
        ConfigFormat::Yaml => {
            // An empty YAML document is a null; treat it as an empty mapping.
            if contents.trim().is_empty() {
                return serde_json::from_value(Value::Object(Default::default()))
                    .map_err(RealmError::Json);
            }
            serde_yaml::from_str(contents).map_err(|source| RealmError::ParseYaml {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

/// Encode `value` in `format`.
pub fn encode<T: Serialize>(value: &T, format: ConfigFormat) -> Result<String, RealmError> {
    Ok(match format {
        ConfigFormat::Json => {
            let mut s = serde_json::to_string_pretty(value)?;
            s.push('\n');
            s
        }
        ConfigFormat::Yaml => serde_yaml::to_string(value)?,
    })
}

/// Atomically write `value` to `path`.
///
/// Write flow: serialize → `<file>.tmp` sibling → `rename`. The `.tmp` is
/// always in the target directory, so the rename never crosses filesystems.
pub fn write_file<T: Serialize>(
    path: &Path,
    value: &T,
    format: ConfigFormat,
) -> Result<(), RealmError> {
    let contents = encode(value, format)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("{file_name}.tmp"));
    std::fs::write(&tmp, contents).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 3. Load
// ---------------------------------------------------------------------------

fn load_or_default<T: DeserializeOwned + Default>(cwd: &Path, stem: &str) -> Result<T, RealmError> {
    match find_config_file(cwd, stem) {
        Some((path, format)) => {
            tracing::debug!(path = %path.display(), "loading realm {stem} file");
            read_file(&path, format)
        }
        None => Ok(T::default()),
    }
}

/// Load `<cwd>/.realm/config.*`; absent ⇒ empty config.
pub fn load_realm_config_at(cwd: &Path) -> Result<RealmConfig, RealmError> {
    load_or_default(cwd, CONFIG_STEM)
}

/// Load `<cwd>/.realm/dev.*`; absent ⇒ empty config.
pub fn load_dev_config_at(cwd: &Path) -> Result<DevConfig, RealmError> {
    load_or_default(cwd, DEV_STEM)
}

/// Load `<cwd>/package.json`.
///
/// Returns [`RealmError::NotARealm`] if absent.
pub fn load_package_at(cwd: &Path) -> Result<PackageDescriptor, RealmError> {
    let path = package_path_at(cwd);
    if !path.is_file() {
        return Err(RealmError::NotARealm {
            path: cwd.to_path_buf(),
        });
    }
    read_file(&path, ConfigFormat::Json)
}

// ---------------------------------------------------------------------------
// 4. Save
// ---------------------------------------------------------------------------

/// Write `<cwd>/package.json`.
pub fn save_package_at(cwd: &Path, package: &PackageDescriptor) -> Result<(), RealmError> {
    write_file(&package_path_at(cwd), package, ConfigFormat::Json)
}

/// Merge `fields` into the dev file, preserving every other key.
///
/// Writes to the existing dev file in its own format, or creates
/// `.realm/dev.json` if there is none.
pub fn update_dev_config_at(
    cwd: &Path,
    fields: serde_json::Map<String, Value>,
) -> Result<PathBuf, RealmError> {
    let (path, format) = find_config_file(cwd, DEV_STEM)
        .unwrap_or_else(|| (config_file_path_at(cwd, DEV_STEM, ConfigFormat::Json), ConfigFormat::Json));

    let mut raw = if path.is_file() {
        read_file::<Value>(&path, format)?
    } else {
        Value::Object(Default::default())
    };
    let map = match raw.as_object_mut() {
        Some(map) => map,
        None => {
            return Err(RealmError::NotValid(format!(
                "dev configuration at {} is not a mapping",
                path.display()
            )))
        }
    };
    map.extend(fields);
    write_file(&path, &raw, format)?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
