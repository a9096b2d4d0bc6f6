// Publish orchestration: the `upload` and `confirm-upload` commands.
//
// Upload runs strictly in order: read the artifact, resolve credentials,
// log in, resolve consent, confirm, upload, look up the extension page and
// report. Nothing is retried; the first failure ends the run and the session
// is logged out on the way out.

use crate::api::{extension_url, Registry};
use crate::artifact::Artifact;
use crate::config::{write_json, ProjectConfig, Settings};
use crate::consent::{self, PreconfirmedPrompts};
use crate::credentials;
use crate::error::PublishError;
use crate::metadata::Metadata;
use crate::session::{with_session, ShutdownHooks};
use crate::ui::Console;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Options of the `upload` command.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Artifact to upload; defaults to the packed ZIP in `dist/`.
    pub artifact: Option<PathBuf>,
    pub username: Option<String>,
    /// Whether the user may be prompted.
    pub interactive: bool,
    /// Confirmations recorded ahead of time with `confirm-upload`.
    pub confirmations: Option<PathBuf>,
}

/// A successfully published extension version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub uuid: String,
    pub version: u64,
    pub url: String,
}

impl fmt::Display for Published {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Successfully uploaded extension {} version {} to {}",
            self.uuid, self.version, self.url
        )
    }
}

type EnvLookup<'a> = Box<dyn Fn(&str) -> Option<String> + 'a>;

pub struct Publisher<'a> {
    registry: Arc<dyn Registry>,
    console: &'a dyn Console,
    hooks: ShutdownHooks,
    settings: Settings,
    project_dir: PathBuf,
    env: EnvLookup<'a>,
}

impl<'a> Publisher<'a> {
    pub fn new(
        registry: Arc<dyn Registry>,
        console: &'a dyn Console,
        hooks: ShutdownHooks,
        settings: Settings,
        project_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            console,
            hooks,
            settings,
            project_dir: project_dir.into(),
            env: Box::new(|key: &str| std::env::var(key).ok()),
        }
    }

    /// Replace the process environment for credential lookup.
    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String> + 'a) -> Self {
        self.env = Box::new(env);
        self
    }

    fn artifact_path(&self, options: &UploadOptions) -> Result<PathBuf, PublishError> {
        if let Some(path) = &options.artifact {
            return Ok(path.clone());
        }
        let project = ProjectConfig::load(&self.project_dir).map_err(PublishError::Project)?;
        let metadata = Metadata::read(&project.metadata_file).map_err(PublishError::Project)?;
        Ok(metadata.default_artifact(&project.root))
    }

    /// Upload an extension.
    pub fn upload(&self, options: &UploadOptions) -> Result<Published, PublishError> {
        // Read the artifact first to fail before any prompt or request.
        let artifact = Artifact::read(&self.artifact_path(options)?)?;
        debug!(artifact = %artifact.path.display(), size = artifact.bytes.len(), "read artifact");

        let credentials = credentials::resolve(
            options.username.as_deref(),
            &*self.env,
            self.console,
            options.interactive,
        )?;

        self.console.progress("Logging in...");
        let outcome = with_session(&self.registry, &self.hooks, &credentials, |session| {
            let registry = session.registry();

            self.console.progress("Fetching confirmation prompts...");
            let confirmations = consent::resolve(
                registry,
                self.console,
                options.interactive,
                options.confirmations.as_deref(),
            )?;

            // Without interaction the consent gate above is the only check.
            if options.interactive {
                let proceed = self
                    .console
                    .confirm(&format!("Upload {}?", artifact.path.display()))
                    .map_err(PublishError::from_prompt)?;
                if !proceed {
                    return Err(PublishError::UploadCancelled);
                }
            }

            self.console.progress(&format!("Uploading {}...", artifact.name));
            let token = session.token().ok_or(PublishError::Interrupted)?;
            let uploaded = registry.upload(token, &confirmations, &artifact)?;
            debug!(uuid = %uploaded.extension, version = uploaded.version, "upload accepted");

            let token = session.token().ok_or(PublishError::Interrupted)?;
            let metadata = registry.query_extension(token, &uploaded.extension)?;
            Ok(Published {
                uuid: uploaded.extension,
                version: uploaded.version,
                url: extension_url(&self.settings.registry_url, metadata.id),
            })
        });
        self.console.clear_progress();

        let finished = outcome?;
        if let Err(err) = &finished.logout {
            // The upload already happened; only report the unrevoked token.
            warn!(error = %err, cause = %err.source, "logout failed after upload");
            self.console.warn(&format!("{}: {}", err, err.source));
        }
        let published = finished.value;
        info!(uuid = %published.uuid, version = published.version, url = %published.url, "published");
        Ok(published)
    }

    /// Ask every consent prompt now and save the answers to `target` for a
    /// later unattended upload.
    pub fn confirm_upload(&self, target: &Path) -> Result<PreconfirmedPrompts, PublishError> {
        self.console.progress("Fetching confirmation prompts...");
        let answers = consent::confirm_ahead(self.registry.as_ref(), self.console);
        self.console.clear_progress();

        let answers = answers?;
        write_json(target, &answers).map_err(PublishError::SaveConfirmations)?;
        info!(target = %target.display(), "saved confirmations");
        Ok(answers)
    }
}
