//! Session state store
//!
//! The store owns the client's belief about who is signed in. State changes
//! only through [`SessionEvent`]s, and the backend's session cookie is the
//! authority: the store re-asks after every action that could change it.

use common::{ClientError, ClientResult};
use tracing::{debug, info, warn};

use crate::backend::SessionBackend;
use crate::models::{LoginRequest, Registration, User};
use crate::validation;

/// Error recorded when the session check fails
pub const UNAUTHENTICATED_MESSAGE: &str = "User is not authenticated";

/// Snapshot of the session
///
/// `loading` and `error` are never set together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    user: Option<User>,
    loading: bool,
    error: Option<String>,
}

/// Closed set of session transitions
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    CheckStarted,
    CheckSucceeded(User),
    CheckFailed(String),
    LoggedOut,
}

/// Coarse session phase, derived from the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Loading,
    Authenticated,
    Unauthenticated,
}

impl Session {
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.loading {
            SessionPhase::Loading
        } else if self.user.is_some() {
            SessionPhase::Authenticated
        } else if self.error.is_some() {
            SessionPhase::Unauthenticated
        } else {
            SessionPhase::Idle
        }
    }

    /// Apply one transition
    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::CheckStarted => {
                self.loading = true;
                self.error = None;
            }
            SessionEvent::CheckSucceeded(user) => {
                self.user = Some(user);
                self.loading = false;
                self.error = None;
            }
            SessionEvent::CheckFailed(message) => {
                self.user = None;
                self.loading = false;
                self.error = Some(message);
            }
            SessionEvent::LoggedOut => *self = Session::default(),
        }
    }
}

/// Result of a successful registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationOutcome {
    /// University accounts stay inactive until an administrator approves them
    pub requires_approval: bool,
}

/// Owner of the session state
pub struct SessionStore<B> {
    backend: B,
    session: Session,
    mounted: bool,
}

impl<B: SessionBackend> SessionStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            session: Session::default(),
            mounted: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Initial session check; runs once per store
    pub async fn mount(&mut self) -> &Session {
        if !self.mounted {
            self.mounted = true;
            self.check_session().await;
        }
        &self.session
    }

    /// Ask the backend who is signed in
    pub async fn check_session(&mut self) -> &Session {
        self.dispatch(SessionEvent::CheckStarted);

        match self.backend.current_user().await {
            Ok(user) => {
                info!("Session active for user: {}", user.username);
                self.dispatch(SessionEvent::CheckSucceeded(user));
            }
            Err(e) => {
                debug!("Session check failed: {}", e);
                self.dispatch(SessionEvent::CheckFailed(UNAUTHENTICATED_MESSAGE.to_string()));
            }
        }

        &self.session
    }

    /// Sign in, then adopt whatever identity the backend now reports
    pub async fn login(&mut self, username: &str, password: &str) -> ClientResult<&User> {
        validation::validate_credentials(username, password).map_err(ClientError::Validation)?;

        let credentials = LoginRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
        };
        self.backend.login(&credentials).await?;

        self.check_session().await;
        self.session
            .user
            .as_ref()
            .ok_or_else(|| ClientError::Authentication(UNAUTHENTICATED_MESSAGE.to_string()))
    }

    /// Create an account; the session is untouched
    pub async fn register(&self, registration: &Registration) -> ClientResult<RegistrationOutcome> {
        validation::validate_username(&registration.username).map_err(ClientError::Validation)?;
        validation::validate_email(&registration.email).map_err(ClientError::Validation)?;
        validation::validate_national_id(&registration.national_id)
            .map_err(ClientError::Validation)?;
        validation::validate_password(&registration.password).map_err(ClientError::Validation)?;

        self.backend.register(registration).await?;

        Ok(RegistrationOutcome {
            requires_approval: registration.is_udp_affiliated,
        })
    }

    /// Sign out locally, then tell the backend
    ///
    /// The local state and cookies are cleared whatever the backend answers;
    /// a backend failure is still returned so it can be reported.
    pub async fn logout(&mut self) -> ClientResult<()> {
        self.dispatch(SessionEvent::LoggedOut);

        let result = self.backend.logout().await;
        self.backend.clear_credentials();

        match &result {
            Ok(()) => info!("Logged out"),
            Err(e) => warn!("Backend logout failed, local session cleared anyway: {}", e),
        }
        result
    }

    /// Re-check the session after a successful mutation
    ///
    /// The mutation's own result is passed through untouched.
    pub async fn after_mutation<T>(&mut self, outcome: ClientResult<T>) -> ClientResult<T> {
        if outcome.is_ok() {
            self.check_session().await;
        }
        outcome
    }

    /// The signed-in user, or an authentication error
    pub fn require_user(&self) -> ClientResult<&User> {
        if self.session.loading {
            return Err(ClientError::Authentication(
                "Session check still in progress".to_string(),
            ));
        }
        self.session
            .user
            .as_ref()
            .ok_or_else(|| ClientError::Authentication("Please log in first".to_string()))
    }

    /// The signed-in user, who must be a university account
    pub fn require_udp(&self) -> ClientResult<&User> {
        let user = self.require_user()?;
        if !user.is_udp_affiliated {
            return Err(ClientError::Authentication(
                "Only university (UDP) accounts can do this".to_string(),
            ));
        }
        Ok(user)
    }

    fn dispatch(&mut self, event: SessionEvent) {
        debug!("Session event: {:?}", event);
        self.session.apply(event);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::Id;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    pub(crate) fn user(id: u64, username: &str, udp: bool) -> User {
        User {
            id: Id::from(id),
            username: username.to_string(),
            email: format!("{}@mail.udp.cl", username),
            is_udp_affiliated: udp,
            national_id: "11.111.111-1".to_string(),
            current_band: None,
        }
    }

    #[derive(Default)]
    struct Calls {
        current_user: VecDeque<ClientResult<User>>,
        login: VecDeque<ClientResult<()>>,
        logout: VecDeque<ClientResult<()>>,
        checks: usize,
        logins: usize,
        registrations: usize,
        cleared: usize,
    }

    /// Scripted session backend; an empty script answers "not authenticated"
    #[derive(Clone, Default)]
    struct FakeSessionBackend {
        calls: Arc<Mutex<Calls>>,
    }

    impl FakeSessionBackend {
        fn answer_user(&self, result: ClientResult<User>) {
            self.calls.lock().unwrap().current_user.push_back(result);
        }

        fn answer_login(&self, result: ClientResult<()>) {
            self.calls.lock().unwrap().login.push_back(result);
        }

        fn answer_logout(&self, result: ClientResult<()>) {
            self.calls.lock().unwrap().logout.push_back(result);
        }

        fn checks(&self) -> usize {
            self.calls.lock().unwrap().checks
        }
    }

    fn unauthorized() -> ClientError {
        ClientError::from_response(403, r#"{"detail": "Authentication credentials were not provided."}"#)
    }

    impl SessionBackend for FakeSessionBackend {
        async fn current_user(&self) -> ClientResult<User> {
            let mut calls = self.calls.lock().unwrap();
            calls.checks += 1;
            calls.current_user.pop_front().unwrap_or_else(|| Err(unauthorized()))
        }

        async fn login(&self, _credentials: &LoginRequest) -> ClientResult<()> {
            let mut calls = self.calls.lock().unwrap();
            calls.logins += 1;
            calls.login.pop_front().unwrap_or(Ok(()))
        }

        async fn register(&self, _registration: &Registration) -> ClientResult<()> {
            self.calls.lock().unwrap().registrations += 1;
            Ok(())
        }

        async fn logout(&self) -> ClientResult<()> {
            self.calls.lock().unwrap().logout.pop_front().unwrap_or(Ok(()))
        }

        fn clear_credentials(&self) {
            self.calls.lock().unwrap().cleared += 1;
        }
    }

    #[test]
    fn test_transitions() {
        let mut session = Session::default();
        assert_eq!(session.phase(), SessionPhase::Idle);

        session.apply(SessionEvent::CheckStarted);
        assert_eq!(session.phase(), SessionPhase::Loading);
        assert!(session.error().is_none());

        session.apply(SessionEvent::CheckFailed(UNAUTHENTICATED_MESSAGE.to_string()));
        assert_eq!(session.phase(), SessionPhase::Unauthenticated);

        // a new check clears the stale error while loading
        session.apply(SessionEvent::CheckStarted);
        assert!(session.is_loading());
        assert!(session.error().is_none());

        session.apply(SessionEvent::CheckSucceeded(user(1, "jorge", true)));
        assert_eq!(session.phase(), SessionPhase::Authenticated);

        session.apply(SessionEvent::LoggedOut);
        assert_eq!(session, Session::default());
    }

    #[tokio::test]
    async fn test_failed_check_then_successful_check() {
        let backend = FakeSessionBackend::default();
        backend.answer_user(Err(unauthorized()));
        backend.answer_user(Ok(user(1, "jorge", true)));
        let mut store = SessionStore::new(backend);

        let session = store.check_session().await;
        assert!(session.user().is_none());
        assert_eq!(session.error(), Some(UNAUTHENTICATED_MESSAGE));
        assert!(!session.is_loading());

        let session = store.check_session().await;
        assert!(session.error().is_none());
        assert_eq!(session.user().map(|u| u.username.as_str()), Some("jorge"));
    }

    #[tokio::test]
    async fn test_mount_checks_once() {
        let backend = FakeSessionBackend::default();
        backend.answer_user(Ok(user(1, "jorge", true)));
        let mut store = SessionStore::new(backend.clone());

        store.mount().await;
        store.mount().await;
        assert_eq!(backend.checks(), 1);
        assert_eq!(store.session().phase(), SessionPhase::Authenticated);

        // explicit re-checks are still allowed
        store.check_session().await;
        assert_eq!(backend.checks(), 2);
    }

    #[tokio::test]
    async fn test_logout_resets_even_when_backend_fails() {
        let backend = FakeSessionBackend::default();
        backend.answer_user(Ok(user(1, "jorge", true)));
        backend.answer_logout(Err(ClientError::from_response(500, "")));
        let mut store = SessionStore::new(backend.clone());
        store.mount().await;

        let result = store.logout().await;
        assert!(result.is_err());
        assert_eq!(store.session(), &Session::default());
        assert_eq!(backend.calls.lock().unwrap().cleared, 1);
    }

    #[tokio::test]
    async fn test_login_adopts_backend_identity() {
        let backend = FakeSessionBackend::default();
        backend.answer_user(Ok(user(2, "claudio", false)));
        let mut store = SessionStore::new(backend.clone());

        let logged_in = store.login(" claudio ", "secret123").await.unwrap();
        assert_eq!(logged_in.username, "claudio");
        assert_eq!(backend.checks(), 1);
    }

    #[tokio::test]
    async fn test_login_rejections() {
        let backend = FakeSessionBackend::default();
        let mut store = SessionStore::new(backend.clone());

        let err = store.login("claudio", "").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(backend.calls.lock().unwrap().logins, 0);

        backend.answer_login(Err(ClientError::Authentication(
            crate::api::INVALID_CREDENTIALS.to_string(),
        )));
        let err = store.login("claudio", "wrong").await.unwrap_err();
        assert!(matches!(err, ClientError::Authentication(_)));
        assert_eq!(backend.checks(), 0);

        // accepted credentials but no session cookie came back
        let err = store.login("claudio", "secret123").await.unwrap_err();
        assert!(matches!(err, ClientError::Authentication(_)));
        assert_eq!(store.session().error(), Some(UNAUTHENTICATED_MESSAGE));
    }

    #[tokio::test]
    async fn test_after_mutation_rechecks_only_on_success() {
        let backend = FakeSessionBackend::default();
        let mut store = SessionStore::new(backend.clone());

        let failed: ClientResult<()> = Err(ClientError::from_response(400, "[\"taken\"]"));
        assert!(store.after_mutation(failed).await.is_err());
        assert_eq!(backend.checks(), 0);

        backend.answer_user(Ok(user(1, "jorge", true)));
        assert_eq!(store.after_mutation(Ok(7)).await.unwrap(), 7);
        assert_eq!(backend.checks(), 1);
        assert!(store.session().user().is_some());
    }

    #[tokio::test]
    async fn test_register_validates_before_sending() {
        let backend = FakeSessionBackend::default();
        let store = SessionStore::new(backend.clone());

        let short_password = Registration::new("ana", "ana@mail.udp.cl", "12.345.678-5", "short");
        assert!(matches!(
            store.register(&short_password).await,
            Err(ClientError::Validation(_))
        ));
        assert_eq!(backend.calls.lock().unwrap().registrations, 0);

        let udp = Registration::new("ana", "ana@mail.udp.cl", "12.345.678-5", "guitarra1");
        assert!(store.register(&udp).await.unwrap().requires_approval);

        let external = Registration::new("beto", "beto@example.org", "9.876.543-K", "guitarra1");
        assert!(!store.register(&external).await.unwrap().requires_approval);
        assert_eq!(backend.calls.lock().unwrap().registrations, 2);
    }

    #[tokio::test]
    async fn test_guards() {
        let backend = FakeSessionBackend::default();
        backend.answer_user(Ok(user(2, "claudio", false)));
        let mut store = SessionStore::new(backend);

        assert!(store.require_user().is_err());
        store.mount().await;
        assert!(store.require_user().is_ok());
        assert!(matches!(
            store.require_udp(),
            Err(ClientError::Authentication(_))
        ));
    }
}
