//! Session synchronizer: one local session mirrored from the identity service.
//!
//! ARCHITECTURE
//! ============
//! The session lives in a `tokio::sync::watch` channel. The synchronizer is
//! the only sender; consumers read the latest value or await changes through
//! receivers. At construction exactly one change listener is registered with
//! the identity service, and it is released exactly once on dispose or drop.
//!
//! WRITERS
//! =======
//! - `is_resolving` is derived: true while the initial lookup has not
//!   settled or any auth operation is awaiting the service.
//! - `identity` is written by the change listener, with two exceptions: the
//!   initial lookup, and successful logout, which clears it immediately so
//!   consumers never observe a stale principal after sign-out returns.
//!
//! Login and signup never assign `identity` themselves; the service's
//! `SIGNED_IN` push does. An `INITIAL_SESSION` snapshot delivered during
//! registration is ignored until the initial lookup settles.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{Session, SessionError};
use crate::identity::{Identity, IdentityEvent, IdentityService, SignUpProfile, Subscription};

// =============================================================================
// CORE
// =============================================================================

struct SessionCore {
    service: Option<Arc<dyn IdentityService>>,
    state: watch::Sender<Session>,
    disposed: AtomicBool,
    /// Bumped on every applied push; lets the initial lookup detect that a
    /// newer notification already resolved the session.
    push_epoch: AtomicU64,
    /// Auth operations currently awaiting the service.
    in_flight: AtomicUsize,
    /// Set until the initial lookup or an identity push settles the session.
    awaiting_initial: AtomicBool,
}

impl SessionCore {
    fn service(&self) -> Result<&Arc<dyn IdentityService>, SessionError> {
        self.service.as_ref().ok_or(SessionError::Configuration)
    }

    fn current(&self) -> Session {
        self.state.borrow().clone()
    }

    fn resolving(&self) -> bool {
        self.awaiting_initial.load(Ordering::SeqCst) || self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Apply `change` under the channel lock and recompute `is_resolving`.
    /// Receivers are notified only when the session actually changed.
    fn publish(&self, change: impl FnOnce(&mut Session)) {
        self.state.send_if_modified(|s| {
            let before = s.clone();
            change(s);
            s.is_resolving = self.resolving();
            *s != before
        });
    }

    fn settle(&self, session: &mut Session, identity: Option<Identity>) {
        self.awaiting_initial.store(false, Ordering::SeqCst);
        session.identity = identity;
    }

    fn begin(&self) -> InFlight<'_> {
        self.publish(|_| {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
        });
        InFlight { core: self, done: false }
    }

    fn finish(&self, change: impl FnOnce(&mut Session)) {
        self.publish(|s| {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            change(s);
        });
    }

    fn apply_push(&self, event: IdentityEvent, identity: Option<Identity>) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        // Registration-time snapshot; the initial lookup is authoritative.
        if event == IdentityEvent::InitialSession && self.awaiting_initial.load(Ordering::SeqCst) {
            debug!(authenticated = identity.is_some(), "session: initial snapshot deferred to lookup");
            return;
        }
        self.push_epoch.fetch_add(1, Ordering::SeqCst);
        debug!(event = event.as_str(), authenticated = identity.is_some(), "session: identity change");
        self.publish(|s| self.settle(s, identity));
    }

    async fn initialize(&self) -> Result<(), SessionError> {
        let service = self.service()?;
        let op = self.begin();
        let epoch = self.push_epoch.load(Ordering::SeqCst);
        let lookup = service.current_identity().await;
        let superseded = self.push_epoch.load(Ordering::SeqCst) != epoch || self.disposed.load(Ordering::SeqCst);

        let (identity, result) = match lookup {
            Ok(identity) => {
                info!(authenticated = identity.is_some(), superseded, "session: initial identity resolved");
                (identity, Ok(()))
            }
            Err(e) => {
                warn!(error = %e, "session: initial identity lookup failed; treating as anonymous");
                (None, Err(e.into()))
            }
        };

        op.finish(|s| {
            if !superseded {
                self.settle(s, identity);
            }
        });
        result
    }

    async fn login(&self, email: &str, password: &str) -> Result<(), SessionError> {
        let service = self.service()?;
        require_credentials(email, password)?;

        let op = self.begin();
        let result = service.sign_in(email, password).await;
        drop(op);

        if let Err(e) = result {
            warn!(error = %e, "session: sign-in rejected");
            return Err(e.into());
        }
        info!("session: sign-in accepted");
        Ok(())
    }

    async fn signup(&self, email: &str, password: &str, display_name: &str) -> Result<(), SessionError> {
        let service = self.service()?;
        require_credentials(email, password)?;

        let profile = SignUpProfile { display_name: display_name.to_owned() };
        let op = self.begin();
        let result = service.sign_up(email, password, &profile).await;
        drop(op);

        if let Err(e) = result {
            warn!(error = %e, "session: sign-up rejected");
            return Err(e.into());
        }
        info!("session: sign-up accepted");
        Ok(())
    }

    async fn logout(&self) -> Result<(), SessionError> {
        let service = self.service()?;

        let op = self.begin();
        if let Err(e) = service.sign_out().await {
            drop(op);
            warn!(error = %e, "session: sign-out rejected");
            return Err(e.into());
        }

        // Fast path: clear locally without waiting for SIGNED_OUT.
        op.finish(|s| s.identity = None);
        info!("session: signed out");
        Ok(())
    }
}

/// One auth operation counted in `in_flight`. Dropping it, including when
/// the operation's future is cancelled, releases the count.
struct InFlight<'a> {
    core: &'a SessionCore,
    done: bool,
}

impl InFlight<'_> {
    fn finish(mut self, change: impl FnOnce(&mut Session)) {
        self.done = true;
        self.core.finish(change);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.core.finish(|_| {});
        }
    }
}

fn require_credentials(email: &str, password: &str) -> Result<(), SessionError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(SessionError::authentication("email and password are required"));
    }
    Ok(())
}

// =============================================================================
// SYNCHRONIZER
// =============================================================================

/// Owner of the process-wide session. Dropping it releases the listener.
pub struct SessionSynchronizer {
    core: Arc<SessionCore>,
    subscription: Option<Subscription>,
}

impl SessionSynchronizer {
    /// Create the synchronizer and register its change listener.
    ///
    /// With a service the session starts pending until [`Self::initialize`]
    /// or the first push resolves it. Without one the session is empty and
    /// settled, and every operation fails with [`SessionError::Configuration`].
    #[must_use]
    pub fn new(service: Option<Arc<dyn IdentityService>>) -> Self {
        let configured = service.is_some();
        let initial = if configured { Session::pending() } else { Session::empty() };
        let (state, _) = watch::channel(initial);
        let core = Arc::new(SessionCore {
            service,
            state,
            disposed: AtomicBool::new(false),
            push_epoch: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            awaiting_initial: AtomicBool::new(configured),
        });

        let subscription = match &core.service {
            Some(service) => {
                let weak: Weak<SessionCore> = Arc::downgrade(&core);
                Some(service.on_identity_change(Arc::new(move |event: IdentityEvent, identity: Option<Identity>| {
                    if let Some(core) = weak.upgrade() {
                        core.apply_push(event, identity);
                    }
                })))
            }
            None => {
                warn!("session: identity service not configured; auth operations disabled");
                None
            }
        };

        Self { core, subscription }
    }

    /// Create the synchronizer and run the initial lookup. Lookup failures
    /// are logged and leave an anonymous session.
    pub async fn connect(service: Option<Arc<dyn IdentityService>>) -> Self {
        let synchronizer = Self::new(service);
        if let Err(e) = synchronizer.initialize().await {
            debug!(error = %e, "session: connected without initial identity");
        }
        synchronizer
    }

    /// Resolve the session from the service's current identity. A push that
    /// lands while the lookup is in flight wins over the lookup result.
    ///
    /// # Errors
    ///
    /// [`SessionError::Configuration`] without a service; the lookup failure
    /// otherwise (the session is still settled as anonymous).
    pub async fn initialize(&self) -> Result<(), SessionError> {
        self.core.initialize().await
    }

    /// Latest published session. Never blocks.
    #[must_use]
    pub fn current_session(&self) -> Session {
        self.core.current()
    }

    /// Receiver notified on every publication.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<Session> {
        self.core.state.subscribe()
    }

    /// Cloneable consumer handle that does not keep the synchronizer alive.
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        SessionHandle { core: Arc::downgrade(&self.core) }
    }

    /// # Errors
    ///
    /// See [`SessionHandle::login`].
    pub async fn login(&self, email: &str, password: &str) -> Result<(), SessionError> {
        self.core.login(email, password).await
    }

    /// # Errors
    ///
    /// See [`SessionHandle::signup`].
    pub async fn signup(&self, email: &str, password: &str, display_name: &str) -> Result<(), SessionError> {
        self.core.signup(email, password, display_name).await
    }

    /// # Errors
    ///
    /// See [`SessionHandle::logout`].
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.core.logout().await
    }

    /// Tear down the change listener. Equivalent to dropping.
    pub fn dispose(self) {}

    fn release(&mut self) {
        if self.core.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
            info!(listener = subscription.id(), "session: identity listener released");
        }
    }
}

impl Drop for SessionSynchronizer {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for SessionSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSynchronizer")
            .field("session", &self.core.current())
            .field("configured", &self.core.service.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Consumer view of a [`SessionSynchronizer`].
///
/// Every call fails with [`SessionError::IllegalUse`] once the owning
/// synchronizer has been disposed.
#[derive(Clone)]
pub struct SessionHandle {
    core: Weak<SessionCore>,
}

impl SessionHandle {
    fn core(&self) -> Result<Arc<SessionCore>, SessionError> {
        self.core
            .upgrade()
            .filter(|core| !core.disposed.load(Ordering::SeqCst))
            .ok_or(SessionError::IllegalUse)
    }

    /// # Errors
    ///
    /// [`SessionError::IllegalUse`] after disposal.
    pub fn current_session(&self) -> Result<Session, SessionError> {
        Ok(self.core()?.current())
    }

    /// # Errors
    ///
    /// [`SessionError::IllegalUse`] after disposal.
    pub fn changes(&self) -> Result<watch::Receiver<Session>, SessionError> {
        Ok(self.core()?.state.subscribe())
    }

    /// Sign in with email + password. The resulting identity arrives via the
    /// service's change notification, not from this call.
    ///
    /// # Errors
    ///
    /// [`SessionError::Configuration`] without a service,
    /// [`SessionError::Authentication`] when credentials are empty or the
    /// service rejects them, [`SessionError::IllegalUse`] after disposal.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), SessionError> {
        self.core()?.login(email, password).await
    }

    /// Create an account, forwarding `display_name` as profile metadata.
    ///
    /// # Errors
    ///
    /// Same as [`SessionHandle::login`].
    pub async fn signup(&self, email: &str, password: &str, display_name: &str) -> Result<(), SessionError> {
        self.core()?.signup(email, password, display_name).await
    }

    /// Sign out. On success the published identity is cleared before this
    /// returns.
    ///
    /// # Errors
    ///
    /// [`SessionError::Configuration`], [`SessionError::Authentication`], or
    /// [`SessionError::IllegalUse`]; on failure the identity is unchanged.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.core()?.logout().await
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("live", &self.core().is_ok())
            .finish()
    }
}

#[cfg(test)]
#[path = "synchronizer_test.rs"]
mod tests;
