//! Capability groups of the hosted backend. Everything that talks to auth or
//! storage receives one of these traits instead of reaching for a global client.

use std::{fmt, future::Future, sync::Arc};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    database::subject::{NewSubject, Subject},
    draft::QuizSubmission,
    error::BackendError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

pub type SessionListener = Arc<dyn Fn(Option<Session>) + Send + Sync>;

/// Handle returned by [`Auth::on_session_change`]. The listener is detached
/// exactly once, either by [`Subscription::unsubscribe`] or on drop.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(detach: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.detach_now();
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

pub trait Auth: Send + Sync {
    fn get_session(
        &self,
    ) -> impl Future<Output = Result<Option<Session>, BackendError>> + Send;

    fn on_session_change(&self, listener: SessionListener) -> Subscription;

    fn sign_out(&self) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn get_current_user(&self) -> impl Future<Output = Result<Option<User>, BackendError>> + Send;
}

#[cfg_attr(test, mockall::automock)]
pub trait CreateSubject: Send + Sync {
    fn create_subject(
        &self,
        subject: NewSubject,
    ) -> impl Future<Output = Result<Subject, BackendError>> + Send;
}

/// Persistence hand-off for a submitted quiz draft.
#[cfg_attr(test, mockall::automock)]
pub trait CreateQuiz: Send + Sync {
    fn create_quiz(
        &self,
        user_id: String,
        quiz: QuizSubmission,
    ) -> impl Future<Output = Result<Uuid, BackendError>> + Send;
}
