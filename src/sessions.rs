//! In-process auth service: sessions per account plus the listeners that want
//! to hear about them.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    backend::{Auth, Session, SessionListener, Subscription, User},
    error::BackendError,
};

/// Telegram chat id of the account owning a session.
pub type Account = i64;

#[derive(Default)]
struct Registry {
    sessions: HashMap<Account, Session>,
    listeners: HashMap<Account, Vec<(u64, SessionListener)>>,
    next_listener: u64,
}

pub struct SessionStore {
    ttl: Duration,
    registry: Mutex<Registry>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").field("ttl", &self.ttl).finish()
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            registry: Mutex::new(Registry::default()),
        }
    }

    pub fn client(self: &Arc<Self>, account: Account) -> AuthClient {
        AuthClient {
            store: Arc::clone(self),
            account,
        }
    }

    /// Also sweeps expired sessions of other accounts.
    pub fn sign_in(&self, account: Account, user: User) -> Session {
        let now = Utc::now();
        let session = Session {
            access_token: Uuid::new_v4().to_string(),
            user,
            expires_at: now + self.ttl,
        };
        tracing::info!(account, user = %session.user.id, "session created");

        let expired: Vec<Account> = {
            let mut registry = self.registry();
            let expired = registry
                .sessions
                .iter()
                .filter(|(other, s)| **other != account && s.is_expired(now))
                .map(|(other, _)| *other)
                .collect::<Vec<_>>();
            for other in &expired {
                registry.sessions.remove(other);
            }
            registry.sessions.insert(account, session.clone());
            expired
        };

        for other in expired {
            tracing::info!(account = other, "session expired");
            self.notify(other, None);
        }
        self.notify(account, Some(session.clone()));
        session
    }

    pub fn sign_out(&self, account: Account) -> bool {
        let removed = self.registry().sessions.remove(&account).is_some();
        if removed {
            tracing::info!(account, "session cleared");
            self.notify(account, None);
        }
        removed
    }

    pub fn session(&self, account: Account) -> Option<Session> {
        {
            let mut registry = self.registry();
            match registry.sessions.get(&account) {
                None => return None,
                Some(session) if !session.is_expired(Utc::now()) => return Some(session.clone()),
                Some(_) => {}
            }
            registry.sessions.remove(&account);
        }
        tracing::info!(account, "session expired");
        self.notify(account, None);
        None
    }

    pub fn subscribe(self: &Arc<Self>, account: Account, listener: SessionListener) -> Subscription {
        let id = {
            let mut registry = self.registry();
            let id = registry.next_listener;
            registry.next_listener += 1;
            registry
                .listeners
                .entry(account)
                .or_default()
                .push((id, listener));
            id
        };

        let store = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(store) = store.upgrade() {
                store.unsubscribe(account, id);
            }
        })
    }

    pub fn session_count(&self) -> usize {
        self.registry().sessions.len()
    }

    pub fn listener_count(&self, account: Account) -> usize {
        self.registry()
            .listeners
            .get(&account)
            .map_or(0, Vec::len)
    }

    fn unsubscribe(&self, account: Account, id: u64) {
        let mut guard = self.registry();
        let registry = &mut *guard;
        if let Some(listeners) = registry.listeners.get_mut(&account) {
            listeners.retain(|(listener, _)| *listener != id);
            if listeners.is_empty() {
                registry.listeners.remove(&account);
            }
        }
    }

    fn notify(&self, account: Account, session: Option<Session>) {
        let listeners: Vec<SessionListener> = self
            .registry()
            .listeners
            .get(&account)
            .map(|l| l.iter().map(|(_, listener)| Arc::clone(listener)).collect())
            .unwrap_or_default();

        for listener in listeners {
            listener(session.clone());
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// [`Auth`] view of the store for a single account.
#[derive(Debug, Clone)]
pub struct AuthClient {
    store: Arc<SessionStore>,
    account: Account,
}

impl AuthClient {
    pub fn account(&self) -> Account {
        self.account
    }
}

impl Auth for AuthClient {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        Ok(self.store.session(self.account))
    }

    fn on_session_change(&self, listener: SessionListener) -> Subscription {
        self.store.subscribe(self.account, listener)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.store.sign_out(self.account);
        Ok(())
    }

    async fn get_current_user(&self) -> Result<Option<User>, BackendError> {
        Ok(self.store.session(self.account).map(|s| s.user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "42".into(),
            display_name: "Ada Lovelace".into(),
        }
    }

    fn recorder() -> (SessionListener, Arc<Mutex<Vec<Option<String>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: SessionListener = Arc::new(move |session: Option<Session>| {
            sink.lock().unwrap().push(session.map(|s| s.user.display_name));
        });
        (listener, seen)
    }

    #[tokio::test]
    async fn sign_in_and_out_notify_listeners() {
        let store = Arc::new(SessionStore::new(Duration::hours(1)));
        let client = store.client(7);
        let (listener, seen) = recorder();
        let _subscription = client.on_session_change(listener);

        store.sign_in(7, user());
        assert_eq!(client.get_current_user().await.unwrap(), Some(user()));

        client.sign_out().await.unwrap();
        assert_eq!(client.get_session().await.unwrap(), None);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some("Ada Lovelace".to_owned()), None]
        );
    }

    #[tokio::test]
    async fn sessions_are_per_account() {
        let store = Arc::new(SessionStore::new(Duration::hours(1)));
        let (listener, seen) = recorder();
        let _subscription = store.client(1).on_session_change(listener);

        store.sign_in(2, user());

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(store.client(1).get_session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_session_is_absent_and_announced() {
        let store = Arc::new(SessionStore::new(Duration::zero()));
        let (listener, seen) = recorder();
        let _subscription = store.client(3).on_session_change(listener);

        store.sign_in(3, user());

        assert_eq!(store.client(3).get_session().await.unwrap(), None);
        assert_eq!(*seen.lock().unwrap().last().unwrap(), None);
    }

    #[test]
    fn sign_in_sweeps_expired_sessions_of_other_accounts() {
        let store = Arc::new(SessionStore::new(Duration::zero()));
        let (listener, seen) = recorder();
        let _subscription = store.subscribe(20, listener);

        store.sign_in(20, user());
        store.sign_in(21, user());

        assert_eq!(store.session_count(), 1);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some("Ada Lovelace".to_owned()), None]
        );
    }

    #[test]
    fn sign_in_keeps_live_sessions_of_other_accounts() {
        let store = Arc::new(SessionStore::new(Duration::hours(1)));

        store.sign_in(30, user());
        store.sign_in(31, user());

        assert_eq!(store.session_count(), 2);
        assert!(store.session(30).is_some());
    }

    #[test]
    fn dropping_subscription_detaches_listener() {
        let store = Arc::new(SessionStore::new(Duration::hours(1)));
        let (listener, seen) = recorder();

        let subscription = store.subscribe(5, listener);
        assert_eq!(store.listener_count(5), 1);
        drop(subscription);
        assert_eq!(store.listener_count(5), 0);

        store.sign_in(5, user());
        assert!(seen.lock().unwrap().is_empty());
    }
}
