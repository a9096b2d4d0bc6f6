// Extension metadata as declared in `metadata.json`. Only the fields the
// tool needs are modelled; anything else in the file is ignored.

use crate::config::read_json;
use crate::error::FileError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub uuid: String,
}

impl Metadata {
    pub fn read(path: &Path) -> Result<Self, FileError> {
        read_json(path)
    }

    /// Where the packing step leaves the ZIP artifact for this extension.
    pub fn default_artifact(&self, project_root: &Path) -> PathBuf {
        project_root
            .join("dist")
            .join(format!("{}.shell-extension.zip", self.uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_uuid_and_derives_artifact_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("metadata.json");
        std::fs::write(
            &file,
            r#"{"uuid": "my-ext@example", "name": "My Ext", "description": "Demo", "shell-version": ["47"]}"#,
        )
        .unwrap();

        let metadata = Metadata::read(&file).unwrap();
        assert_eq!(metadata.uuid, "my-ext@example");
        assert_eq!(
            metadata.default_artifact(dir.path()),
            dir.path().join("dist/my-ext@example.shell-extension.zip")
        );
    }

    #[test]
    fn uuid_alone_is_enough() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("metadata.json");
        std::fs::write(&file, r#"{"uuid": "bare@example"}"#).unwrap();

        let metadata = Metadata::read(&file).unwrap();
        assert_eq!(metadata.uuid, "bare@example");
    }

    #[test]
    fn missing_uuid_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("metadata.json");
        std::fs::write(&file, r#"{"name": "No Id", "description": "Demo"}"#).unwrap();

        assert!(matches!(Metadata::read(&file), Err(FileError::Parse { .. })));
    }
}
