use std::sync::Arc;

use teloxide::{
    payloads::SendMessageSetters,
    prelude::Requester,
    types::{Message, ReplyMarkup},
    utils::command::BotCommands,
    Bot,
};
use tracing::instrument;

use crate::{
    gate::{SessionGate, View},
    keyboard::action_keyboard,
    login::LoginWidget,
    sessions::SessionStore,
    state::AuthorState,
    HandlerResult, UserDialogue,
};

#[derive(Debug, Clone, BotCommands)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "display help.")]
    Help,
    #[command(description = "sign in or open the menu.")]
    Start,
    #[command(description = "drop the current draft and return to the menu.")]
    Cancel,
    #[command(description = "sign out.")]
    Signout,
}

pub(crate) async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

/// Shows either the login prompt or the menu, depending on the session.
pub(crate) async fn show_gate(
    bot: &Bot,
    msg: &Message,
    dialogue: &UserDialogue,
    store: &Arc<SessionStore>,
    login: &LoginWidget,
) -> HandlerResult {
    let gate = SessionGate::mount(store.client(msg.chat.id.0), login.theme()).await;
    match gate.render() {
        View::Authenticated { display_name } => {
            bot.send_message(msg.chat.id, format!("Welcome {display_name}! What do you want to do?"))
                .reply_markup(action_keyboard())
                .await?;
            dialogue.update(AuthorState::Start).await?;
        }
        View::LoggedOut { .. } => {
            bot.send_message(msg.chat.id, login.prompt())
                .reply_markup(login.keyboard())
                .await?;
            dialogue.update(AuthorState::AwaitLogin).await?;
        }
    }
    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, store, login))]
pub(crate) async fn start(
    bot: Bot,
    msg: Message,
    dialogue: UserDialogue,
    store: Arc<SessionStore>,
    login: LoginWidget,
) -> HandlerResult {
    show_gate(&bot, &msg, &dialogue, &store, &login).await
}

#[instrument(level = "info", skip(bot, dialogue, store, login))]
pub(crate) async fn cancel(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    store: Arc<SessionStore>,
    login: LoginWidget,
) -> HandlerResult {
    bot.send_message(msg.chat.id, "Cancelling dialogue")
        .reply_markup(ReplyMarkup::kb_remove())
        .await?;
    show_gate(&bot, &msg, &dialogue, &store, &login).await
}

#[instrument(level = "info", skip(bot, dialogue, store, login))]
pub(crate) async fn sign_out(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    store: Arc<SessionStore>,
    login: LoginWidget,
) -> HandlerResult {
    let gate = SessionGate::mount(store.client(msg.chat.id.0), login.theme()).await;
    gate.sign_out().await;
    tracing::info!("{} signed out", msg.chat.id.0);
    bot.send_message(msg.chat.id, "Signed out.").await?;
    show_gate(&bot, &msg, &dialogue, &store, &login).await
}
