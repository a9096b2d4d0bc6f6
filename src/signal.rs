// Interrupt watcher: on Ctrl-C, put the terminal back the way it was, run
// the shutdown hooks (which revoke a live API token) and exit with the
// "interrupted" code. The main thread may be blocked in a prompt or a request
// at that point and never unwind.

use crate::error::FailureKind;
use crate::session::ShutdownHooks;
use crate::ui::TerminalState;
use std::io;
use tracing::warn;

/// Start the watcher thread. Call once, early in `main` and before any
/// prompt, so the terminal settings it captures are the user's own.
pub fn watch_interrupts(hooks: ShutdownHooks) -> io::Result<()> {
    let terminal = TerminalState::capture();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("interrupt-watcher".into())
        .spawn(move || {
            let interrupted = runtime.block_on(tokio::signal::ctrl_c());
            // Hooks make blocking requests; they must not run on the runtime.
            drop(runtime);
            match interrupted {
                Ok(()) => {
                    shut_down(&hooks, &terminal);
                    std::process::exit(i32::from(FailureKind::Interrupted.exit_code()));
                }
                Err(err) => warn!(error = %err, "unable to listen for interrupts"),
            }
        })?;
    Ok(())
}

/// Everything that has to happen before the process exits on an interrupt.
fn shut_down(hooks: &ShutdownHooks, terminal: &TerminalState) {
    terminal.restore();
    warn!("interrupted; revoking API token");
    hooks.fire();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn shut_down_runs_every_hook_once() {
        let hooks = ShutdownHooks::new();
        let ran = Arc::new(Mutex::new(0));
        for _ in 0..2 {
            let counter = Arc::clone(&ran);
            hooks.register(move || *counter.lock().unwrap() += 1);
        }

        shut_down(&hooks, &TerminalState::default());
        shut_down(&hooks, &TerminalState::default());

        assert_eq!(*ran.lock().unwrap(), 2);
        assert!(hooks.is_empty());
    }
}
