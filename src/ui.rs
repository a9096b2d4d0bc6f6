// UI layer: the `Console` seam the workflow talks through, and its terminal
// implementation on top of `dialoguer` prompts and an `indicatif` spinner.

use dialoguer::{Confirm, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::io;
use std::time::Duration;
use tracing::debug;

/// Everything the workflow needs from the person running it.
///
/// Prompt methods return the raw I/O error; an `Interrupted` or
/// `UnexpectedEof` error means the input went away mid-prompt.
pub trait Console {
    fn input(&self, prompt: &str) -> io::Result<String>;

    /// Like `input`, without echoing what is typed.
    fn password(&self, prompt: &str) -> io::Result<String>;

    fn confirm(&self, prompt: &str) -> io::Result<bool>;

    fn warn(&self, message: &str);

    /// Show what the workflow is waiting on.
    fn progress(&self, message: &str);

    fn clear_progress(&self);
}

/// Interactive terminal console.
#[derive(Default)]
pub struct Terminal {
    spinner: RefCell<Option<ProgressBar>>,
}

impl Terminal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Console for Terminal {
    fn input(&self, prompt: &str) -> io::Result<String> {
        self.clear_progress();
        Input::<String>::new().with_prompt(prompt).interact_text()
    }

    fn password(&self, prompt: &str) -> io::Result<String> {
        self.clear_progress();
        // `Password` hides input in the terminal.
        Password::new().with_prompt(prompt).interact()
    }

    fn confirm(&self, prompt: &str) -> io::Result<bool> {
        self.clear_progress();
        Confirm::new().with_prompt(prompt).default(false).interact()
    }

    fn warn(&self, message: &str) {
        self.clear_progress();
        eprintln!("warning: {}", message);
    }

    fn progress(&self, message: &str) {
        let mut slot = self.spinner.borrow_mut();
        let spinner = slot.get_or_insert_with(|| {
            let spinner = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
                spinner.set_style(style);
            }
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner
        });
        spinner.set_message(message.to_string());
    }

    fn clear_progress(&self) {
        if let Some(spinner) = self.spinner.borrow_mut().take() {
            spinner.finish_and_clear();
        }
    }
}

/// Line settings of the controlling terminal, captured before any prompt.
///
/// A password prompt turns echo off until it returns. An interrupt that ends
/// the process mid-prompt never lets it return, so the watcher puts these
/// settings back before exiting.
#[derive(Default)]
pub struct TerminalState {
    #[cfg(unix)]
    saved: Option<nix::sys::termios::Termios>,
}

#[cfg(unix)]
impl TerminalState {
    /// Capture the settings of stdin. Not a terminal: nothing to restore.
    pub fn capture() -> Self {
        Self {
            saved: nix::sys::termios::tcgetattr(io::stdin()).ok(),
        }
    }

    pub fn is_captured(&self) -> bool {
        self.saved.is_some()
    }

    pub fn restore(&self) {
        use nix::sys::termios::{tcsetattr, SetArg};

        if let Some(saved) = &self.saved {
            if let Err(err) = tcsetattr(io::stdin(), SetArg::TCSANOW, saved) {
                debug!(error = %err, "failed to restore terminal settings");
            }
        }
    }
}

#[cfg(not(unix))]
impl TerminalState {
    pub fn capture() -> Self {
        Self::default()
    }

    pub fn is_captured(&self) -> bool {
        false
    }

    pub fn restore(&self) {
        debug!("no terminal settings to restore");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::IsTerminal;

    #[test]
    fn capture_matches_whether_stdin_is_a_terminal() {
        let state = TerminalState::capture();
        if !io::stdin().is_terminal() {
            assert!(!state.is_captured());
        }
        // Restoring what was just captured leaves the terminal as it is.
        state.restore();
        state.restore();
    }

    #[test]
    fn empty_state_restores_nothing() {
        let state = TerminalState::default();
        assert!(!state.is_captured());
        state.restore();
    }
}
