// Session management: one API token, revoked exactly once.
//
// The token lives in a `TokenCell`. Whoever takes it out first revokes it:
// the ordinary end of `with_session`, the `Drop` of a `Session` unwinding
// from a panic, or a shutdown hook fired by the interrupt watcher. Taking is
// the single-fire guard, so the three paths never revoke twice.

use crate::api::Registry;
use crate::credentials::Credentials;
use crate::error::{PublishError, RegistryError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds the live token until someone takes it for revocation.
#[derive(Debug, Default)]
pub struct TokenCell {
    token: Mutex<Option<String>>,
}

impl TokenCell {
    pub fn new(token: String) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }

    /// Take the token out. Returns `None` once it has been taken.
    pub fn take(&self) -> Option<String> {
        lock(&self.token).take()
    }

    pub fn is_live(&self) -> bool {
        lock(&self.token).is_some()
    }
}

/// Identifies a registered shutdown hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookId(u64);

type Hook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct HookTable {
    next_id: u64,
    hooks: Vec<(HookId, Hook)>,
}

/// Last-resort cleanups to run when the process is torn down early.
///
/// Clones share the same table; the interrupt watcher holds one clone and
/// the workflow the other.
#[derive(Clone, Default)]
pub struct ShutdownHooks {
    table: Arc<Mutex<HookTable>>,
}

impl ShutdownHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, hook: impl FnOnce() + Send + 'static) -> HookId {
        let mut table = lock(&self.table);
        let id = HookId(table.next_id);
        table.next_id += 1;
        table.hooks.push((id, Box::new(hook)));
        id
    }

    pub fn unregister(&self, id: HookId) {
        lock(&self.table).hooks.retain(|(hook_id, _)| *hook_id != id);
    }

    pub fn len(&self) -> usize {
        lock(&self.table).hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run and drop every registered hook. Hooks run outside the lock, so a
    /// hook may itself touch the table.
    pub fn fire(&self) {
        let hooks = std::mem::take(&mut lock(&self.table).hooks);
        for (_, hook) in hooks {
            hook();
        }
    }
}

fn revoke(registry: &dyn Registry, token: &str, context: &str) {
    if let Err(err) = registry.logout(token) {
        warn!(error = %err, cause = %err.source, context, "failed to revoke API token");
    }
}

/// An authenticated session with the registry.
///
/// Lifecycle: `Session::login` (authenticated), then `invalidate` or drop
/// (invalidated). An invalidated session cannot be revived.
pub struct Session {
    registry: Arc<dyn Registry>,
    token: String,
    cell: Arc<TokenCell>,
    hooks: ShutdownHooks,
    hook: HookId,
}

impl Session {
    /// Log in and arm the last-resort revocation hook.
    pub fn login(
        registry: Arc<dyn Registry>,
        hooks: &ShutdownHooks,
        credentials: &Credentials,
    ) -> Result<Self, RegistryError> {
        let token = registry.login(credentials)?;
        debug!(username = %credentials.username, "logged in");

        let cell = Arc::new(TokenCell::new(token.clone()));
        let hook = {
            let cell = Arc::clone(&cell);
            let registry = Arc::clone(&registry);
            hooks.register(move || {
                if let Some(token) = cell.take() {
                    revoke(registry.as_ref(), &token, "shutdown");
                }
            })
        };

        Ok(Session {
            registry,
            token,
            cell,
            hooks: hooks.clone(),
            hook,
        })
    }

    /// The API token, or `None` once the session has been revoked.
    pub fn token(&self) -> Option<&str> {
        self.cell.is_live().then_some(self.token.as_str())
    }

    pub fn registry(&self) -> &dyn Registry {
        self.registry.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.cell.is_live()
    }

    /// Revoke the token unless another path already did. A failed logout is
    /// returned to the caller.
    pub fn invalidate(&self) -> Result<(), RegistryError> {
        self.hooks.unregister(self.hook);
        match self.cell.take() {
            Some(token) => {
                debug!("logging out");
                self.registry.logout(&token)
            }
            None => Ok(()),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.hooks.unregister(self.hook);
        if let Some(token) = self.cell.take() {
            revoke(self.registry.as_ref(), &token, "drop");
        }
    }
}

/// What `body` returned, together with how the logout went.
#[derive(Debug)]
pub struct Finished<T> {
    pub value: T,
    pub logout: Result<(), RegistryError>,
}

/// Log in, run `body` with the session, and log out again.
///
/// Logout is attempted exactly once whichever way `body` ends. If `body`
/// succeeds its value is returned alongside the logout outcome, so a failed
/// logout never hides completed work. If `body` fails its error wins and the
/// logout failure is only logged.
pub fn with_session<T>(
    registry: &Arc<dyn Registry>,
    hooks: &ShutdownHooks,
    credentials: &Credentials,
    body: impl FnOnce(&Session) -> Result<T, PublishError>,
) -> Result<Finished<T>, PublishError> {
    let session = Session::login(Arc::clone(registry), hooks, credentials)?;
    let outcome = body(&session);
    let logout = session.invalidate();
    match outcome {
        Ok(value) => Ok(Finished { value, logout }),
        Err(err) => {
            if let Err(logout_err) = logout {
                warn!(error = %logout_err, cause = %logout_err.source, "logout failed after error");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, Stage};
    use crate::fakes::FakeRegistry;

    fn setup() -> (Arc<FakeRegistry>, Arc<dyn Registry>, ShutdownHooks, Credentials) {
        let fake = Arc::new(FakeRegistry::new().with_token("tkn1"));
        let registry: Arc<dyn Registry> = fake.clone();
        (fake, registry, ShutdownHooks::new(), Credentials::new("alice", "secret"))
    }

    #[test]
    fn normal_exit_logs_out_exactly_once() {
        let (fake, registry, hooks, credentials) = setup();
        let finished = with_session(&registry, &hooks, &credentials, |session| {
            assert!(session.is_live());
            Ok(session.token().map(str::to_owned))
        })
        .unwrap();

        assert_eq!(finished.value.as_deref(), Some("tkn1"));
        assert!(finished.logout.is_ok());
        assert_eq!(fake.logouts(), vec!["tkn1".to_string()]);
        assert!(hooks.is_empty());
    }

    #[test]
    fn failing_body_still_logs_out_once() {
        let (fake, registry, hooks, credentials) = setup();
        let err = with_session(&registry, &hooks, &credentials, |_| {
            Err::<(), _>(PublishError::UploadCancelled)
        })
        .unwrap_err();

        assert!(matches!(err, PublishError::UploadCancelled));
        assert_eq!(fake.logouts(), vec!["tkn1".to_string()]);
    }

    #[test]
    fn simulated_interrupt_logs_out_once() {
        let (fake, registry, hooks, credentials) = setup();
        let watcher = hooks.clone();
        let err = with_session(&registry, &hooks, &credentials, |session| {
            watcher.fire();
            assert!(!session.is_live());
            Err::<(), _>(PublishError::Interrupted)
        })
        .unwrap_err();

        assert!(matches!(err, PublishError::Interrupted));
        assert_eq!(fake.logouts(), vec!["tkn1".to_string()]);
    }

    #[test]
    fn firing_after_normal_exit_does_nothing() {
        let (fake, registry, hooks, credentials) = setup();
        with_session(&registry, &hooks, &credentials, |_| Ok(())).unwrap();
        hooks.fire();
        assert_eq!(fake.logouts().len(), 1);
    }

    #[test]
    fn panicking_body_logs_out_on_unwind() {
        let (fake, registry, hooks, credentials) = setup();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = with_session(&registry, &hooks, &credentials, |_| -> Result<(), PublishError> {
                panic!("boom")
            });
        }));

        assert!(result.is_err());
        assert_eq!(fake.logouts(), vec!["tkn1".to_string()]);
        assert!(hooks.is_empty());
    }

    #[test]
    fn failed_login_never_logs_out() {
        let fake = Arc::new(FakeRegistry::new().failing_login(401, "Invalid credentials"));
        let registry: Arc<dyn Registry> = fake.clone();
        let hooks = ShutdownHooks::new();
        let err = with_session(&registry, &hooks, &Credentials::new("a", "b"), |_| Ok(()))
            .unwrap_err();

        match err {
            PublishError::Registry(err) => {
                assert_eq!(err.stage, Stage::Login);
                assert_eq!(err.status(), Some(401));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(fake.logouts().is_empty());
        assert!(hooks.is_empty());
    }

    #[test]
    fn logout_failure_is_reported_beside_the_value() {
        let fake = Arc::new(FakeRegistry::new().failing_logout(500));
        let registry: Arc<dyn Registry> = fake.clone();
        let hooks = ShutdownHooks::new();
        let finished =
            with_session(&registry, &hooks, &Credentials::new("a", "b"), |_| Ok("uploaded"))
                .unwrap();

        assert_eq!(finished.value, "uploaded");
        let err = finished.logout.unwrap_err();
        assert_eq!(err.stage, Stage::Logout);
        assert_eq!(err.status(), Some(500));
        assert_eq!(fake.logouts().len(), 1);
    }

    #[test]
    fn logout_failure_does_not_mask_body_error() {
        let fake = Arc::new(FakeRegistry::new().failing_logout(500));
        let registry: Arc<dyn Registry> = fake.clone();
        let hooks = ShutdownHooks::new();
        let err = with_session(&registry, &hooks, &Credentials::new("a", "b"), |_| {
            Err::<(), _>(PublishError::ConfirmationMissing)
        })
        .unwrap_err();

        assert!(matches!(err, PublishError::ConfirmationMissing));
        assert_eq!(fake.logouts().len(), 1);
    }

    #[test]
    fn hook_swallows_logout_failure() {
        let fake = Arc::new(FakeRegistry::new().failing_logout(503));
        let registry: Arc<dyn Registry> = fake.clone();
        let hooks = ShutdownHooks::new();
        let session = Session::login(registry, &hooks, &Credentials::new("a", "b")).unwrap();

        hooks.fire();
        assert!(!session.is_live());
        assert!(session.invalidate().is_ok());
        drop(session);
        assert_eq!(fake.logouts().len(), 1);
    }

    #[test]
    fn revoked_session_hands_out_no_token() {
        let (_, registry, hooks, credentials) = setup();
        let session = Session::login(Arc::clone(&registry), &hooks, &credentials).unwrap();
        assert_eq!(session.token(), Some("tkn1"));

        hooks.fire();
        assert_eq!(session.token(), None);

        let other = Session::login(registry, &hooks, &credentials).unwrap();
        other.invalidate().unwrap();
        assert_eq!(other.token(), None);
    }

    #[test]
    fn token_cell_fires_once() {
        let cell = TokenCell::new("t".into());
        assert_eq!(cell.take().as_deref(), Some("t"));
        assert_eq!(cell.take(), None);
        assert!(!cell.is_live());
    }

    #[test]
    fn unregistered_hook_does_not_run() {
        let hooks = ShutdownHooks::new();
        let ran = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&ran);
        let id = hooks.register(move || *counter.lock().unwrap() += 1);
        hooks.unregister(id);
        hooks.fire();
        assert_eq!(*ran.lock().unwrap(), 0);
    }

    #[test]
    fn api_error_is_kept_under_logout_stage() {
        let err = RegistryError::new(
            Stage::Logout,
            ApiError::Status {
                status: 500,
                detail: None,
            },
        );
        assert_eq!(PublishError::from(err).kind(), crate::error::FailureKind::Registry);
    }
}
