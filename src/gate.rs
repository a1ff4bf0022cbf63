//! Session gate: decides whether a chat sees the login prompt or the
//! authenticated menu, and keeps that decision current while it is mounted.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use crate::{
    backend::{Auth, Session, SessionListener, Subscription},
    login::Theme,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    LoggedOut { theme: Theme },
    Authenticated { display_name: String },
}

#[derive(Debug, Default)]
struct GateState {
    session: Option<Session>,
    notified: bool,
}

#[derive(Debug, Default)]
struct Shared {
    mounted: AtomicBool,
    state: Mutex<GateState>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
pub struct SessionGate<A: Auth> {
    auth: A,
    theme: Theme,
    shared: Arc<Shared>,
    subscription: Option<Subscription>,
}

impl<A: Auth> SessionGate<A> {
    /// Subscribes to session changes, then fetches the current session once.
    /// A notification that lands before the fetch resolves takes precedence.
    pub async fn mount(auth: A, theme: Theme) -> Self {
        let shared = Arc::new(Shared::default());
        shared.mounted.store(true, Ordering::SeqCst);

        let target = Arc::clone(&shared);
        let listener: SessionListener = Arc::new(move |session| {
            if !target.mounted.load(Ordering::SeqCst) {
                return;
            }
            let mut state = target.state();
            state.session = session;
            state.notified = true;
        });
        let subscription = auth.on_session_change(listener);

        match auth.get_session().await {
            Ok(session) => {
                let mut state = shared.state();
                if !state.notified {
                    state.session = session;
                }
            }
            Err(e) => tracing::warn!("Failed to fetch session: {}", e),
        }

        Self {
            auth,
            theme,
            shared,
            subscription: Some(subscription),
        }
    }

    pub fn session(&self) -> Option<Session> {
        self.shared.state().session.clone()
    }

    pub fn render(&self) -> View {
        match self.session() {
            Some(session) => View::Authenticated {
                display_name: session.user.display_name,
            },
            None => View::LoggedOut { theme: self.theme },
        }
    }

    pub fn auth(&self) -> &A {
        &self.auth
    }

    /// Failures are logged, never returned.
    pub async fn sign_out(&self) {
        if let Err(e) = self.auth.sign_out().await {
            tracing::error!("Error signing out: {}", e);
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn teardown(&mut self) {
        self.shared.mounted.store(false, Ordering::SeqCst);
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl<A: Auth> Drop for SessionGate<A> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::{backend::User, error::BackendError, sessions::SessionStore};

    fn ada() -> User {
        User {
            id: "1".into(),
            display_name: "Ada".into(),
        }
    }

    /// Auth double that hands out a scripted session and lets the test fire
    /// notifications by hand, including after unsubscribe.
    #[derive(Default)]
    struct ScriptedAuth {
        initial: Option<Session>,
        during_fetch: Option<Session>,
        fail_fetch: bool,
        fail_sign_out: bool,
        listeners: Arc<Mutex<Vec<SessionListener>>>,
        sign_outs: Arc<Mutex<u32>>,
    }

    impl ScriptedAuth {
        fn emit(&self, session: Option<Session>) {
            let listeners = self.listeners.lock().unwrap().clone();
            for listener in listeners {
                listener(session.clone());
            }
        }
    }

    impl Auth for ScriptedAuth {
        async fn get_session(&self) -> Result<Option<Session>, BackendError> {
            if let Some(session) = &self.during_fetch {
                self.emit(Some(session.clone()));
            }
            if self.fail_fetch {
                return Err(BackendError::new("network down"));
            }
            Ok(self.initial.clone())
        }

        fn on_session_change(&self, listener: SessionListener) -> Subscription {
            // Keeps the listener registered so late deliveries still reach it.
            self.listeners.lock().unwrap().push(listener);
            Subscription::new(|| {})
        }

        async fn sign_out(&self) -> Result<(), BackendError> {
            *self.sign_outs.lock().unwrap() += 1;
            if self.fail_sign_out {
                return Err(BackendError::new("already signed out"));
            }
            Ok(())
        }

        async fn get_current_user(&self) -> Result<Option<User>, BackendError> {
            Ok(self.initial.clone().map(|s| s.user))
        }
    }

    fn session_for(user: User) -> Session {
        Session {
            access_token: "token".into(),
            user,
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn notifications_switch_render_path() {
        let store = Arc::new(SessionStore::new(Duration::hours(1)));
        let gate = SessionGate::mount(store.client(10), Theme::Emoji).await;
        assert_eq!(gate.render(), View::LoggedOut { theme: Theme::Emoji });

        store.sign_in(10, ada());
        assert_eq!(
            gate.render(),
            View::Authenticated {
                display_name: "Ada".into()
            }
        );

        store.sign_out(10);
        assert_eq!(gate.render(), View::LoggedOut { theme: Theme::Emoji });
    }

    #[tokio::test]
    async fn existing_session_is_picked_up_on_mount() {
        let store = Arc::new(SessionStore::new(Duration::hours(1)));
        store.sign_in(11, ada());

        let gate = SessionGate::mount(store.client(11), Theme::Plain).await;

        assert_eq!(gate.session().map(|s| s.user), Some(ada()));
    }

    #[tokio::test]
    async fn notification_during_fetch_beats_fetched_session() {
        let auth = ScriptedAuth {
            initial: None,
            during_fetch: Some(session_for(ada())),
            ..Default::default()
        };

        let gate = SessionGate::mount(auth, Theme::Emoji).await;

        assert_eq!(
            gate.render(),
            View::Authenticated {
                display_name: "Ada".into()
            }
        );
    }

    #[tokio::test]
    async fn torn_down_gate_ignores_late_notifications() {
        let auth = ScriptedAuth::default();
        let listeners = Arc::clone(&auth.listeners);
        let mut gate = SessionGate::mount(auth, Theme::Emoji).await;

        gate.teardown();
        assert!(!gate.is_mounted());

        let late = listeners.lock().unwrap().clone();
        for listener in late {
            listener(Some(session_for(ada())));
        }
        gate.auth().emit(Some(session_for(ada())));

        assert_eq!(gate.session(), None);
    }

    #[tokio::test]
    async fn teardown_detaches_from_store() {
        let store = Arc::new(SessionStore::new(Duration::hours(1)));
        let mut gate = SessionGate::mount(store.client(12), Theme::Emoji).await;
        assert_eq!(store.listener_count(12), 1);

        gate.teardown();
        gate.teardown();

        assert_eq!(store.listener_count(12), 0);
        store.sign_in(12, ada());
        assert_eq!(gate.session(), None);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_gate_logged_out() {
        let auth = ScriptedAuth {
            initial: Some(session_for(ada())),
            fail_fetch: true,
            ..Default::default()
        };

        let gate = SessionGate::mount(auth, Theme::Emoji).await;

        assert_eq!(gate.render(), View::LoggedOut { theme: Theme::Emoji });
    }

    #[tokio::test]
    async fn sign_out_failure_is_swallowed() {
        let auth = ScriptedAuth {
            fail_sign_out: true,
            ..Default::default()
        };
        let sign_outs = Arc::clone(&auth.sign_outs);
        let gate = SessionGate::mount(auth, Theme::Emoji).await;

        gate.sign_out().await;

        assert_eq!(*sign_outs.lock().unwrap(), 1);
    }
}
