// Error module: every failure the publish workflow can end in, and the
// mapping from failure kind to process exit code. The library returns
// these typed errors; only the binary turns them into text and exit codes.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// A failed request to the registry, before stage context is attached.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("API request failed with status {status}: {}", .detail.as_deref().unwrap_or("n/a"))]
    Status { status: u16, detail: Option<String> },

    #[error("request could not be sent")]
    Transport(#[source] reqwest::Error),

    #[error("response body is not the expected JSON")]
    Decode(#[source] serde_json::Error),

    #[error("failed to find confirmation prompt for field {0}")]
    MissingPrompt(&'static str),
}

/// The registry call a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Login,
    Logout,
    FetchPrompts,
    Upload,
    QueryExtension,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Login => "Login failed",
            Stage::Logout => "Logout failed",
            Stage::FetchPrompts => "Failed to fetch confirmation prompts",
            Stage::Upload => "Upload failed",
            Stage::QueryExtension => "Failed to query extension metadata",
        })
    }
}

/// A registry failure wrapped with the stage it happened in. The underlying
/// [`ApiError`] stays reachable through `source()`.
#[derive(Debug, thiserror::Error)]
#[error("{stage}")]
pub struct RegistryError {
    pub stage: Stage,
    #[source]
    pub source: ApiError,
}

impl RegistryError {
    pub fn new(stage: Stage, source: ApiError) -> Self {
        Self { stage, source }
    }

    /// The HTTP status the registry answered with, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match &self.source {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Reading or writing one of the JSON files the tool works with.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything `upload` and `confirm-upload` can fail with.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Missing username; pass --username or set $EGO_USERNAME")]
    MissingUsername,

    #[error("Missing password; set $EGO_PASSWORD")]
    MissingPassword,

    #[error("You must accept the license and terms of service for extensions.gnome.org")]
    ConfirmationMissing,

    #[error("Upload cancelled")]
    UploadCancelled,

    #[error("Interrupted")]
    Interrupted,

    #[error("failed to read artifact {}", .path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to load project configuration")]
    Project(#[source] FileError),

    #[error("failed to load confirmations")]
    Confirmations(#[source] FileError),

    #[error("failed to save confirmations")]
    SaveConfirmations(#[source] FileError),

    #[error("terminal prompt failed")]
    Prompt(#[source] io::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl PublishError {
    /// Translate a failed terminal prompt. A closed or interrupted input
    /// stream means the user walked away, not that something broke.
    pub fn from_prompt(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::Interrupted | io::ErrorKind::UnexpectedEof => PublishError::Interrupted,
            _ => PublishError::Prompt(err),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            PublishError::MissingUsername
            | PublishError::MissingPassword
            | PublishError::Artifact { .. }
            | PublishError::Project(_)
            | PublishError::Confirmations(_) => FailureKind::Configuration,
            PublishError::ConfirmationMissing => FailureKind::ConfirmationMissing,
            PublishError::UploadCancelled => FailureKind::Cancelled,
            PublishError::Interrupted => FailureKind::Interrupted,
            PublishError::Registry(_) => FailureKind::Registry,
            PublishError::SaveConfirmations(_) | PublishError::Prompt(_) => FailureKind::Internal,
        }
    }
}

/// Coarse classification of a [`PublishError`], one per exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Configuration,
    ConfirmationMissing,
    Cancelled,
    Interrupted,
    Registry,
    Internal,
}

impl FailureKind {
    pub fn exit_code(self) -> u8 {
        match self {
            FailureKind::Registry | FailureKind::Internal => 1,
            FailureKind::Configuration => 2,
            FailureKind::ConfirmationMissing => 3,
            FailureKind::Cancelled => 4,
            FailureKind::Interrupted => 130,
        }
    }
}
