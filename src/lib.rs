use state::AuthorState;
use teloxide::{dispatching::dialogue::InMemStorage, prelude::Dialogue};

pub mod backend;
pub mod commands;
pub mod config;
pub mod constructor;
pub mod database;
pub mod draft;
pub mod error;
pub mod gate;
pub mod keyboard;
pub mod login;
pub mod schema;
pub mod sessions;
pub mod state;
pub mod subject;
pub mod subjects;

type UserDialogue = Dialogue<AuthorState, InMemStorage<AuthorState>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;
