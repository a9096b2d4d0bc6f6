// Credential resolution. The username comes from the command line, the
// environment or a prompt, in that order; the password never comes from the
// command line.

use crate::config::{PASSWORD_VAR, USERNAME_VAR};
use crate::error::PublishError;
use crate::ui::Console;
use std::fmt;

/// Account credentials for one session. Held in memory only.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// Resolve the username: explicit option, then `$EGO_USERNAME`, then a
/// prompt if `interactive`.
pub fn resolve_username(
    option: Option<&str>,
    env: &dyn Fn(&str) -> Option<String>,
    console: &dyn Console,
    interactive: bool,
) -> Result<String, PublishError> {
    if let Some(username) = present(option.map(str::to_owned)).or_else(|| present(env(USERNAME_VAR))) {
        return Ok(username);
    }
    if !interactive {
        return Err(PublishError::MissingUsername);
    }
    console
        .input("Your e.g.o username")
        .map_err(PublishError::from_prompt)
}

/// Resolve the password: `$EGO_PASSWORD`, then a prompt if `interactive`.
pub fn resolve_password(
    env: &dyn Fn(&str) -> Option<String>,
    console: &dyn Console,
    interactive: bool,
) -> Result<String, PublishError> {
    if let Some(password) = present(env(PASSWORD_VAR)) {
        return Ok(password);
    }
    if !interactive {
        return Err(PublishError::MissingPassword);
    }
    console
        .password("Your e.g.o password")
        .map_err(PublishError::from_prompt)
}

pub fn resolve(
    username: Option<&str>,
    env: &dyn Fn(&str) -> Option<String>,
    console: &dyn Console,
    interactive: bool,
) -> Result<Credentials, PublishError> {
    let username = resolve_username(username, env, console, interactive)?;
    let password = resolve_password(env, console, interactive)?;
    Ok(Credentials::new(username, password))
}
