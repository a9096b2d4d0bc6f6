// Consent resolution: the registry asks the uploader to confirm a fixed set
// of statements before it accepts an extension. The wording of those
// statements can change, so answers recorded ahead of time are pinned to
// the exact text they were given for.

use crate::api::Registry;
use crate::config::read_json;
use crate::error::PublishError;
use crate::ui::Console;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// The statements the registry requires before an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConsentField {
    ShellLicenseCompliant,
    TosCompliant,
}

impl ConsentField {
    pub const ALL: [ConsentField; 2] = [ConsentField::ShellLicenseCompliant, ConsentField::TosCompliant];

    /// Field name used by the registry API and the confirmations file.
    pub fn name(self) -> &'static str {
        match self {
            ConsentField::ShellLicenseCompliant => "shell_license_compliant",
            ConsentField::TosCompliant => "tos_compliant",
        }
    }
}

/// One value per [`ConsentField`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerField<T> {
    pub shell_license_compliant: T,
    pub tos_compliant: T,
}

impl<T> PerField<T> {
    pub fn from_fn(mut f: impl FnMut(ConsentField) -> T) -> Self {
        Self {
            shell_license_compliant: f(ConsentField::ShellLicenseCompliant),
            tos_compliant: f(ConsentField::TosCompliant),
        }
    }

    pub fn try_from_fn<E>(mut f: impl FnMut(ConsentField) -> Result<T, E>) -> Result<Self, E> {
        Ok(Self {
            shell_license_compliant: f(ConsentField::ShellLicenseCompliant)?,
            tos_compliant: f(ConsentField::TosCompliant)?,
        })
    }

    pub fn get(&self, field: ConsentField) -> &T {
        match field {
            ConsentField::ShellLicenseCompliant => &self.shell_license_compliant,
            ConsentField::TosCompliant => &self.tos_compliant,
        }
    }
}

/// Current prompt text per field, as published by the registry.
pub type ConsentPrompts = PerField<String>;

/// Final answer per field; gates the upload.
pub type Confirmations = PerField<bool>;

impl Confirmations {
    pub fn all_granted(&self) -> bool {
        ConsentField::ALL.iter().all(|field| *self.get(*field))
    }
}

/// An answer recorded ahead of time, with the prompt text it answered.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PreconfirmedPrompt {
    pub confirmed: bool,
    pub text: String,
}

/// Contents of a confirmations file, keyed by field name.
pub type PreconfirmedPrompts = BTreeMap<String, PreconfirmedPrompt>;

/// Keep only the recorded answers whose text still matches the current
/// prompt. Every other field stays unanswered.
pub fn pinned_answers(
    prompts: &ConsentPrompts,
    preconfirmed: &PreconfirmedPrompts,
    console: &dyn Console,
) -> PerField<Option<bool>> {
    PerField::from_fn(|field| match preconfirmed.get(field.name()) {
        Some(recorded) if recorded.text == *prompts.get(field) => Some(recorded.confirmed),
        Some(_) => {
            console.warn(&format!(
                "Ignoring confirmation for {}; prompt text changed!",
                field.name()
            ));
            None
        }
        None => {
            console.warn(&format!("No confirmation recorded for {}", field.name()));
            None
        }
    })
}

/// Ask for every unanswered field, showing the current prompt text.
pub fn ask_missing(
    prompts: &ConsentPrompts,
    known: &PerField<Option<bool>>,
    console: &dyn Console,
) -> Result<Confirmations, PublishError> {
    PerField::try_from_fn(|field| match known.get(field) {
        Some(answer) => Ok(*answer),
        None => console
            .confirm(prompts.get(field))
            .map_err(PublishError::from_prompt),
    })
}

/// Work out the final consent for this run.
///
/// Prompts are fetched fresh every time. Answers from the confirmations file
/// count only where their text matches; what remains is asked interactively,
/// or treated as declined when interaction is off. Unless every field ends up
/// granted this fails with [`PublishError::ConfirmationMissing`].
pub fn resolve(
    registry: &dyn Registry,
    console: &dyn Console,
    interactive: bool,
    preconfirmed: Option<&Path>,
) -> Result<Confirmations, PublishError> {
    let prompts = registry.fetch_confirmation_prompts()?;

    let known = match preconfirmed {
        Some(path) => {
            debug!(path = %path.display(), "loading confirmations");
            let recorded: PreconfirmedPrompts =
                read_json(path).map_err(PublishError::Confirmations)?;
            pinned_answers(&prompts, &recorded, console)
        }
        None => PerField::default(),
    };

    let confirmations = if interactive {
        ask_missing(&prompts, &known, console)?
    } else {
        PerField::from_fn(|field| (*known.get(field)).unwrap_or(false))
    };

    if !confirmations.all_granted() {
        return Err(PublishError::ConfirmationMissing);
    }
    Ok(confirmations)
}

/// Ask every prompt now and pin each answer to the text it was given for.
pub fn confirm_ahead(
    registry: &dyn Registry,
    console: &dyn Console,
) -> Result<PreconfirmedPrompts, PublishError> {
    let prompts = registry.fetch_confirmation_prompts()?;
    let answers = ask_missing(&prompts, &PerField::default(), console)?;
    Ok(ConsentField::ALL
        .iter()
        .map(|field| {
            (
                field.name().to_string(),
                PreconfirmedPrompt {
                    confirmed: *answers.get(*field),
                    text: prompts.get(*field).clone(),
                },
            )
        })
        .collect())
}
