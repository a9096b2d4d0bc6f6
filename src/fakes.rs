// In-memory fakes for the registry and the console, used by the tests.
// `FakeRegistry` records every call and answers like extensions.gnome.org
// would; `ScriptedConsole` replays a fixed list of answers.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;

use crate::api::{ExtensionMetadata, Registry, UploadedExtension};
use crate::artifact::Artifact;
use crate::consent::{ConsentPrompts, Confirmations};
use crate::credentials::Credentials;
use crate::error::{ApiError, RegistryError, Stage};
use crate::ui::Console;

// ---------------------------------------------------------------------------
// FakeRegistry
// ---------------------------------------------------------------------------

/// A call the fake registry received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Login { username: String },
    Logout { token: String },
    FetchPrompts,
    Upload {
        token: String,
        confirmations: Confirmations,
        artifact: String,
        size: usize,
    },
    Query { token: String, uuid: String },
}

#[derive(Debug)]
pub struct FakeRegistry {
    token: String,
    prompts: ConsentPrompts,
    uploaded: UploadedExtension,
    extension_id: u64,
    login_failure: Option<(u16, String)>,
    logout_failure: Option<u16>,
    upload_failure: Option<(u16, String)>,
    calls: Mutex<Vec<Call>>,
}

impl Default for FakeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn status(stage: Stage, status: u16, detail: Option<&str>) -> RegistryError {
    RegistryError::new(
        stage,
        ApiError::Status {
            status,
            detail: detail.map(str::to_owned),
        },
    )
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self {
            token: "tkn1".into(),
            prompts: Self::default_prompts(),
            uploaded: UploadedExtension {
                extension: "my-ext@example".into(),
                version: 7,
            },
            extension_id: 42,
            login_failure: None,
            logout_failure: None,
            upload_failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn default_prompts() -> ConsentPrompts {
        ConsentPrompts {
            shell_license_compliant: "This extension is licensed under GPL-2.0-or-later or a compatible license".into(),
            tos_compliant: "I agree to the extensions.gnome.org terms of service".into(),
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = token.into();
        self
    }

    pub fn with_prompts(mut self, prompts: ConsentPrompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_upload(mut self, uuid: &str, version: u64, id: u64) -> Self {
        self.uploaded = UploadedExtension {
            extension: uuid.into(),
            version,
        };
        self.extension_id = id;
        self
    }

    pub fn failing_login(mut self, status: u16, detail: &str) -> Self {
        self.login_failure = Some((status, detail.into()));
        self
    }

    pub fn failing_logout(mut self, status: u16) -> Self {
        self.logout_failure = Some(status);
        self
    }

    pub fn failing_upload(mut self, status: u16, detail: &str) -> Self {
        self.upload_failure = Some((status, detail.into()));
        self
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Tokens passed to `logout`, in order.
    pub fn logouts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Logout { token } => Some(token),
                _ => None,
            })
            .collect()
    }

    pub fn uploads(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Upload { .. }))
            .collect()
    }
}

impl Registry for FakeRegistry {
    fn login(&self, credentials: &Credentials) -> Result<String, RegistryError> {
        self.record(Call::Login {
            username: credentials.username.clone(),
        });
        match &self.login_failure {
            Some((code, detail)) => Err(status(Stage::Login, *code, Some(detail))),
            None => Ok(self.token.clone()),
        }
    }

    fn logout(&self, token: &str) -> Result<(), RegistryError> {
        self.record(Call::Logout {
            token: token.into(),
        });
        match self.logout_failure {
            Some(code) => Err(status(Stage::Logout, code, None)),
            None => Ok(()),
        }
    }

    fn fetch_confirmation_prompts(&self) -> Result<ConsentPrompts, RegistryError> {
        self.record(Call::FetchPrompts);
        Ok(self.prompts.clone())
    }

    fn upload(
        &self,
        token: &str,
        confirmations: &Confirmations,
        artifact: &Artifact,
    ) -> Result<UploadedExtension, RegistryError> {
        self.record(Call::Upload {
            token: token.into(),
            confirmations: confirmations.clone(),
            artifact: artifact.name.clone(),
            size: artifact.bytes.len(),
        });
        match &self.upload_failure {
            Some((code, detail)) => Err(status(Stage::Upload, *code, Some(detail))),
            None => Ok(self.uploaded.clone()),
        }
    }

    fn query_extension(&self, token: &str, uuid: &str) -> Result<ExtensionMetadata, RegistryError> {
        self.record(Call::Query {
            token: token.into(),
            uuid: uuid.into(),
        });
        Ok(ExtensionMetadata {
            id: self.extension_id,
            uuid: uuid.into(),
        })
    }
}

// ---------------------------------------------------------------------------
// ScriptedConsole
// ---------------------------------------------------------------------------

/// A scripted reply to the next prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Text(String),
    /// The user pressed Ctrl-C.
    Interrupt,
}

/// Console that answers prompts from a script and records what it saw.
/// Running out of answers behaves like a closed input stream.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    answers: RefCell<VecDeque<Answer>>,
    prompts: RefCell<Vec<String>>,
    warnings: RefCell<Vec<String>>,
    progress: RefCell<Vec<String>>,
}

impl ScriptedConsole {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: RefCell::new(answers.into()),
            ..Self::default()
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }

    pub fn progress_messages(&self) -> Vec<String> {
        self.progress.borrow().clone()
    }

    fn next(&self, prompt: &str) -> io::Result<Answer> {
        self.prompts.borrow_mut().push(prompt.to_string());
        match self.answers.borrow_mut().pop_front() {
            Some(Answer::Interrupt) => Err(io::Error::new(io::ErrorKind::Interrupted, "read interrupted")),
            Some(answer) => Ok(answer),
            None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed")),
        }
    }

    fn text(&self, prompt: &str) -> io::Result<String> {
        match self.next(prompt)? {
            Answer::Text(text) => Ok(text),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("expected text for {prompt:?}, script has {other:?}"),
            )),
        }
    }
}

impl Console for ScriptedConsole {
    fn input(&self, prompt: &str) -> io::Result<String> {
        self.text(prompt)
    }

    fn password(&self, prompt: &str) -> io::Result<String> {
        self.text(prompt)
    }

    fn confirm(&self, prompt: &str) -> io::Result<bool> {
        match self.next(prompt)? {
            Answer::Yes => Ok(true),
            Answer::No => Ok(false),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("expected yes/no for {prompt:?}, script has {other:?}"),
            )),
        }
    }

    fn warn(&self, message: &str) {
        self.warnings.borrow_mut().push(message.to_string());
    }

    fn progress(&self, message: &str) {
        self.progress.borrow_mut().push(message.to_string());
    }

    fn clear_progress(&self) {}
}
