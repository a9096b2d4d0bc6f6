// The packed extension ZIP, read once before anything talks to the network.

use crate::error::PublishError;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    /// File base name, sent as the upload's file name.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn read(path: &Path) -> Result<Self, PublishError> {
        let bytes = std::fs::read(path).map_err(|source| PublishError::Artifact {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "extension.zip".to_string());
        Ok(Artifact {
            path: path.to_path_buf(),
            name,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_bytes_and_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my-ext@example.shell-extension.zip");
        std::fs::write(&path, b"PK\x03\x04").unwrap();

        let artifact = Artifact::read(&path).unwrap();
        assert_eq!(artifact.name, "my-ext@example.shell-extension.zip");
        assert_eq!(artifact.bytes, b"PK\x03\x04");
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.zip");
        match Artifact::read(&path).unwrap_err() {
            PublishError::Artifact { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
