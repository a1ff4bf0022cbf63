use std::{str::FromStr, sync::Arc};

use teloxide::types::{KeyboardButton, KeyboardMarkup};

use crate::{
    backend::{Session, User},
    sessions::{Account, SessionStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Emoji,
    Plain,
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "emoji" => Ok(Self::Emoji),
            "plain" => Ok(Self::Plain),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

/// Login capability handed to the session gate's logged-out path. Signing in
/// goes through the store, which reports success to session listeners.
#[derive(Debug, Clone)]
pub struct LoginWidget {
    store: Arc<SessionStore>,
    theme: Theme,
}

impl LoginWidget {
    pub fn new(store: Arc<SessionStore>, theme: Theme) -> Self {
        Self { store, theme }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn button_label(&self) -> &'static str {
        match self.theme {
            Theme::Emoji => "Sign in🔑",
            Theme::Plain => "Sign in",
        }
    }

    pub fn prompt(&self) -> &'static str {
        "You are not signed in. Press the button below to sign in with your Telegram account."
    }

    pub fn keyboard(&self) -> KeyboardMarkup {
        KeyboardMarkup::new(vec![vec![KeyboardButton::new(self.button_label())]])
    }

    pub fn accepts(&self, text: &str) -> bool {
        text == self.button_label() || text.eq_ignore_ascii_case("sign in")
    }

    pub fn complete(&self, account: Account, user: User) -> Session {
        self.store.sign_in(account, user)
    }
}
