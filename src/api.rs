// API client module: the extensions.gnome.org registry as a trait, and a
// small blocking HTTP implementation of it. Each call is one request in and
// one typed result out; the client holds no session state of its own.
//
// See https://extensions.gnome.org/api/docs/ for the upstream API.

use crate::artifact::Artifact;
use crate::config::Settings;
use crate::consent::{ConsentPrompts, Confirmations, PerField};
use crate::credentials::Credentials;
use crate::error::{ApiError, RegistryError, Stage};
use reqwest::blocking::{multipart, Client, RequestBuilder};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// The registry operations the publish workflow relies on.
///
/// Implementations must be shareable across threads: the interrupt watcher
/// revokes a live token from its own thread.
pub trait Registry: Send + Sync {
    /// Log in and return the API token for further requests.
    fn login(&self, credentials: &Credentials) -> Result<String, RegistryError>;

    /// Revoke `token`.
    fn logout(&self, token: &str) -> Result<(), RegistryError>;

    /// Fetch the text of every consent prompt as currently published.
    fn fetch_confirmation_prompts(&self) -> Result<ConsentPrompts, RegistryError>;

    fn upload(
        &self,
        token: &str,
        confirmations: &Confirmations,
        artifact: &Artifact,
    ) -> Result<UploadedExtension, RegistryError>;

    fn query_extension(&self, token: &str, uuid: &str) -> Result<ExtensionMetadata, RegistryError>;
}

/// Login request payload.
#[derive(Serialize, Debug)]
struct LoginRequest<'a> {
    login: &'a str,
    password: &'a str,
}

#[derive(Deserialize, Debug)]
struct ApiToken {
    token: String,
}

#[derive(Deserialize, Debug)]
struct LoginResponse {
    token: ApiToken,
}

#[derive(Serialize, Debug)]
struct LogoutRequest {
    revoke_token: bool,
}

#[derive(Deserialize, Debug, Default)]
struct DetailResponse {
    #[serde(default)]
    detail: Option<String>,
}

/// An accepted upload.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UploadedExtension {
    /// The extension UUID.
    pub extension: String,
    /// The version number the registry assigned to this upload.
    pub version: u64,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExtensionMetadata {
    pub id: u64,
    pub uuid: String,
}

/// Check the status of a response; on failure pull the `detail` message out
/// of the body if it has one.
pub fn check_status(status: u16, body: &str) -> Result<(), ApiError> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    let detail = serde_json::from_str::<DetailResponse>(body)
        .ok()
        .and_then(|response| response.detail);
    Err(ApiError::Status { status, detail })
}

/// Decode a response body into `T` after checking its status.
pub fn read_api_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ApiError> {
    check_status(status, body)?;
    serde_json::from_str(body).map_err(ApiError::Decode)
}

/// Extract consent prompt texts from the registry's API schema.
///
/// The prompts are the titles of the upload form fields. A missing title
/// means the registry no longer matches what this client expects.
pub fn prompts_from_schema(schema: &Value) -> Result<ConsentPrompts, ApiError> {
    PerField::try_from_fn(|field| {
        let pointer = format!(
            "/components/schemas/ExtensionUpload/properties/{}/title",
            field.name()
        );
        schema
            .pointer(&pointer)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(ApiError::MissingPrompt(field.name()))
    })
}

/// Human-facing page of the extension with registry id `id`.
pub fn extension_url(registry_url: &str, id: u64) -> String {
    format!("{}/extension/{}/", registry_url.trim_end_matches('/'), id)
}

/// Blocking HTTP client for the registry.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(settings: &Settings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(ApiClient {
            client,
            base_url: settings.registry_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request.header(AUTHORIZATION, format!("Token {}", token))
    }

    /// Send a request and return status and body text.
    fn send(&self, request: RequestBuilder) -> Result<(u16, String), ApiError> {
        let response = request
            .header(ACCEPT, "application/json")
            .send()
            .map_err(ApiError::Transport)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(ApiError::Transport)?;
        debug!(status, "registry responded");
        Ok((status, body))
    }

    fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let (status, body) = self.send(request)?;
        read_api_response(status, &body)
    }
}

impl Registry for ApiClient {
    fn login(&self, credentials: &Credentials) -> Result<String, RegistryError> {
        debug!(username = %credentials.username, "logging in");
        let request = self
            .client
            .post(self.url("/api/v1/accounts/login/"))
            .json(&LoginRequest {
                login: &credentials.username,
                password: credentials.password(),
            });
        self.send_json::<LoginResponse>(request)
            .map(|response| response.token.token)
            .map_err(|err| RegistryError::new(Stage::Login, err))
    }

    fn logout(&self, token: &str) -> Result<(), RegistryError> {
        debug!("revoking token");
        let request = self
            .authorized(self.client.post(self.url("/api/v1/accounts/logout/")), token)
            .json(&LogoutRequest { revoke_token: true });
        self.send(request)
            .and_then(|(status, body)| check_status(status, &body))
            .map_err(|err| RegistryError::new(Stage::Logout, err))
    }

    fn fetch_confirmation_prompts(&self) -> Result<ConsentPrompts, RegistryError> {
        let request = self.client.get(self.url("/api/schema/"));
        self.send_json::<Value>(request)
            .and_then(|schema| prompts_from_schema(&schema))
            .map_err(|err| RegistryError::new(Stage::FetchPrompts, err))
    }

    fn upload(
        &self,
        token: &str,
        confirmations: &Confirmations,
        artifact: &Artifact,
    ) -> Result<UploadedExtension, RegistryError> {
        debug!(artifact = %artifact.name, size = artifact.bytes.len(), "uploading");
        let upload = || -> Result<UploadedExtension, ApiError> {
            let source = multipart::Part::bytes(artifact.bytes.clone())
                .file_name(artifact.name.clone())
                .mime_str("application/zip")
                .map_err(ApiError::Transport)?;
            let form = multipart::Form::new()
                .text(
                    "shell_license_compliant",
                    confirmations.shell_license_compliant.to_string(),
                )
                .text("tos_compliant", confirmations.tos_compliant.to_string())
                .part("source", source);
            let request = self
                .authorized(self.client.post(self.url("/api/v1/extensions")), token)
                .multipart(form);
            self.send_json::<UploadedExtension>(request)
        };
        upload().map_err(|err| RegistryError::new(Stage::Upload, err))
    }

    fn query_extension(&self, token: &str, uuid: &str) -> Result<ExtensionMetadata, RegistryError> {
        let request = self.authorized(
            self.client
                .get(self.url(&format!("/api/v1/extensions/{}/", uuid))),
            token,
        );
        self.send_json(request)
            .map_err(|err| RegistryError::new(Stage::QueryExtension, err))
    }
}
