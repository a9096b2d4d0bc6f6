// Configuration: where the registry lives, where the project keeps its
// extension metadata, and the small JSON file helpers shared by the
// modules that read or write project files.

use crate::error::FileError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Registry used when `EGO_URL` is not set.
pub const DEFAULT_REGISTRY_URL: &str = "https://extensions.gnome.org";

/// Environment variable holding the account name.
pub const USERNAME_VAR: &str = "EGO_USERNAME";

/// Environment variable holding the account password.
pub const PASSWORD_VAR: &str = "EGO_PASSWORD";

/// Runtime settings for talking to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base URL of the registry site, without a trailing slash.
    pub registry_url: String,
}

impl Settings {
    /// Read settings from `EGO_URL`, falling back to extensions.gnome.org.
    pub fn from_env() -> Self {
        let registry_url =
            std::env::var("EGO_URL").unwrap_or_else(|_| DEFAULT_REGISTRY_URL.into());
        Self::new(registry_url)
    }

    pub fn new(registry_url: impl Into<String>) -> Self {
        let registry_url = registry_url.into().trim_end_matches('/').to_string();
        Self { registry_url }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_URL)
    }
}

#[derive(Deserialize, Default)]
struct PackageJson {
    #[serde(default)]
    gsebuild: Option<ToolSection>,
}

#[derive(Deserialize, Default)]
struct ToolSection {
    #[serde(default)]
    extension: Option<ExtensionSection>,
}

#[derive(Deserialize, Default)]
struct ExtensionSection {
    #[serde(rename = "metadata-file")]
    metadata_file: Option<PathBuf>,
}

/// The parts of the project layout the publish workflow needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub root: PathBuf,
    pub metadata_file: PathBuf,
}

impl ProjectConfig {
    /// Layout with every value defaulted, for projects without a manifest.
    pub fn with_defaults(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let metadata_file = root.join("metadata.json");
        Self {
            root,
            metadata_file,
        }
    }

    /// Load the `gsebuild` section of `package.json` in `root`.
    ///
    /// A project without `package.json` uses the defaults. Relative paths in
    /// the manifest resolve against `root`.
    pub fn load(root: &Path) -> Result<Self, FileError> {
        let manifest = root.join("package.json");
        if !manifest.exists() {
            return Ok(Self::with_defaults(root));
        }
        let package: PackageJson = read_json(&manifest)?;
        let metadata_file = package
            .gsebuild
            .and_then(|tool| tool.extension)
            .and_then(|extension| extension.metadata_file)
            .map(|file| root.join(file))
            .unwrap_or_else(|| root.join("metadata.json"));
        Ok(Self {
            root: root.to_path_buf(),
            metadata_file,
        })
    }
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, FileError> {
    let text = std::fs::read_to_string(path).map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| FileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize `value` as pretty-printed JSON into `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), FileError> {
    let write_error = |source| FileError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut text = serde_json::to_string_pretty(value)
        .map_err(|err| write_error(std::io::Error::new(std::io::ErrorKind::InvalidData, err)))?;
    text.push('\n');
    std::fs::write(path, text).map_err(write_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_strip_trailing_slash() {
        let settings = Settings::new("http://localhost:8000/");
        assert_eq!(settings.registry_url, "http://localhost:8000");
        assert_eq!(Settings::default().registry_url, DEFAULT_REGISTRY_URL);
    }

    #[test]
    fn missing_manifest_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.metadata_file, dir.path().join("metadata.json"));
        assert_eq!(config.root, dir.path());
    }

    #[test]
    fn manifest_overrides_metadata_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"name": "x", "gsebuild": {"extension": {"metadata-file": "src/metadata.json"}}}"#,
        )
        .unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.metadata_file, dir.path().join("src/metadata.json"));
    }

    #[test]
    fn manifest_without_tool_section_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"name": "x"}"#).unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.metadata_file, dir.path().join("metadata.json"));
    }

    #[test]
    fn broken_manifest_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "{").unwrap();
        let err = ProjectConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, FileError::Parse { .. }));
    }
}
