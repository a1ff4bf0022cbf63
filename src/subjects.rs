use std::sync::Arc;

use teloxide::{payloads::SendMessageSetters, prelude::Requester, types::Message, Bot};
use tracing::instrument;

use crate::{
    backend::{CreateSubject, User},
    error::AppError,
    keyboard::action_keyboard,
    login::LoginWidget,
    sessions::SessionStore,
    state::AuthorState,
    subject::SubjectForm,
    HandlerResult, UserDialogue,
};

/// Identity of a private chat as the auth service sees it.
pub(crate) fn chat_user(msg: &Message) -> User {
    let chat = &msg.chat;
    let full_name = match (chat.first_name(), chat.last_name()) {
        (Some(first), Some(last)) => format!("{first} {last}"),
        (Some(first), None) => first.to_owned(),
        (None, Some(last)) => last.to_owned(),
        (None, None) => chat.username().unwrap_or("anonymous").to_owned(),
    };
    User {
        id: chat.id.0.to_string(),
        display_name: full_name,
    }
}

#[instrument(level = "info", skip(bot, dialogue, login))]
pub(crate) async fn receive_login(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    login: LoginWidget,
) -> HandlerResult {
    match msg.text() {
        Some(text) if login.accepts(text) => {
            let session = login.complete(msg.chat.id.0, chat_user(&msg));
            tracing::info!("{} signed in", session.user.id);
            bot.send_message(
                msg.chat.id,
                format!("Welcome {}! What do you want to do?", session.user.display_name),
            )
            .reply_markup(action_keyboard())
            .await?;
            dialogue.update(AuthorState::Start).await?;
        }
        _ => {
            bot.send_message(msg.chat.id, login.prompt())
                .reply_markup(login.keyboard())
                .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, store, connection))]
pub(crate) async fn receive_subject_name<DbConnection: CreateSubject>(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    store: Arc<SessionStore>,
    connection: Arc<DbConnection>,
) -> HandlerResult {
    let Some(name) = msg.text() else {
        bot.send_message(msg.chat.id, "Please, send a name for the new subject.")
            .await?;
        return Ok(());
    };

    let auth = store.client(msg.chat.id.0);
    let mut form = SubjectForm::new();
    form.set_name(name);

    match form.submit(&auth, connection.as_ref()).await {
        Ok(_) => {
            let message = form.message().unwrap_or_default().to_owned();
            bot.send_message(msg.chat.id, format!("{message}\nWhat do you want to do next?"))
                .reply_markup(action_keyboard())
                .await?;
            dialogue.update(AuthorState::Start).await?;
        }
        Err(AppError::Authorization(_)) => {
            let error = form.error().unwrap_or_default().to_owned();
            bot.send_message(msg.chat.id, format!("{error} Use /start to sign in."))
                .await?;
            dialogue.update(AuthorState::AwaitLogin).await?;
        }
        Err(_) => {
            let error = form.error().unwrap_or_default().to_owned();
            bot.send_message(msg.chat.id, format!("{error} Try another name."))
                .await?;
        }
    }

    Ok(())
}
