use std::{error::Error, sync::Arc};

use teloxide::{
    dispatching::{
        dialogue::{self, InMemStorage},
        DpHandlerDescription, UpdateFilterExt, UpdateHandler,
    },
    dptree::{self, Handler},
    payloads::SendMessageSetters,
    prelude::{DependencyMap, Requester},
    types::{Message, ReplyMarkup, Update},
    Bot,
};
use tracing::instrument;

use crate::{
    commands::{self, cancel, help, show_gate, start, Command},
    constructor,
    database::connection::Connection,
    draft::QuizDraft,
    gate::{SessionGate, View},
    keyboard::{action_keyboard, ADD_SUBJECT, CREATE_QUIZ, SIGN_OUT},
    login::LoginWidget,
    sessions::SessionStore,
    state::AuthorState,
    subjects, HandlerResult, UserDialogue,
};

pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Help].endpoint(help))
        .branch(case![Command::Start].endpoint(start))
        .branch(case![Command::Cancel].endpoint(cancel))
        .branch(case![Command::Signout].endpoint(commands::sign_out));

    let handler = Update::filter_message()
        .branch(command_handler)
        .branch(case![AuthorState::AwaitLogin].endpoint(subjects::receive_login))
        .branch(case![AuthorState::Start].endpoint(choose_what_to_do))
        .branch(
            case![AuthorState::ReceiveSubjectName]
                .endpoint(subjects::receive_subject_name::<Connection>),
        )
        .branch(constructor_scheme())
        .endpoint(invalid_state);

    dialogue::enter::<Update, InMemStorage<AuthorState>, AuthorState, _>().branch(handler)
}

#[instrument(level = "info", skip(bot, dialogue, store, login))]
async fn choose_what_to_do(
    bot: Bot,
    msg: Message,
    dialogue: UserDialogue,
    store: Arc<SessionStore>,
    login: LoginWidget,
) -> HandlerResult {
    let mut gate = SessionGate::mount(store.client(msg.chat.id.0), login.theme()).await;
    if let View::LoggedOut { .. } = gate.render() {
        gate.teardown();
        return show_gate(&bot, &msg, &dialogue, &store, &login).await;
    }

    match msg.text() {
        Some(ADD_SUBJECT) => {
            tracing::info!("{} chooses to add a subject.", msg.chat.id.0);
            bot.send_message(msg.chat.id, "What's the name of the new subject?")
                .reply_markup(ReplyMarkup::kb_remove())
                .await?;
            dialogue.update(AuthorState::ReceiveSubjectName).await?;
        }
        Some(CREATE_QUIZ) => {
            tracing::info!("{} chooses to create a new quiz.", msg.chat.id.0);
            bot.send_message(
                msg.chat.id,
                "Let's start creating a new quiz! Which subject does it belong to?",
            )
            .reply_markup(ReplyMarkup::kb_remove())
            .await?;
            dialogue
                .update(AuthorState::ReceiveQuizSubject {
                    draft: QuizDraft::new(),
                })
                .await?;
        }
        Some(SIGN_OUT) => {
            gate.sign_out().await;
            gate.teardown();
            bot.send_message(msg.chat.id, "Signed out.").await?;
            return show_gate(&bot, &msg, &dialogue, &store, &login).await;
        }
        other => {
            tracing::error!("Invalid message {:?} from {}", other, msg.chat.id.0);
            bot.send_message(msg.chat.id, "Invalid input. Please try again.")
                .reply_markup(action_keyboard())
                .await?;
        }
    }

    Ok(())
}

#[instrument(level = "debug")]
fn constructor_scheme() -> Handler<
    'static,
    DependencyMap,
    Result<(), Box<(dyn Error + Send + Sync + 'static)>>,
    DpHandlerDescription,
> {
    use dptree::case;
    tracing::debug!("Building a dispatch tree for constructor");
    Update::filter_message()
        .branch(
            case![AuthorState::ReceiveQuizSubject { draft }]
                .endpoint(constructor::receive_quiz_subject),
        )
        .branch(case![AuthorState::ReceiveQuizName { draft }].endpoint(constructor::receive_quiz_name))
        .branch(
            case![AuthorState::ReceiveTimeLimit { draft }].endpoint(constructor::receive_time_limit),
        )
        .branch(
            case![AuthorState::ReceiveQuestionText { draft, question }]
                .endpoint(constructor::receive_question_text),
        )
        .branch(
            case![AuthorState::ReceiveQuestionType { draft, question }]
                .endpoint(constructor::receive_question_type),
        )
        .branch(
            case![AuthorState::ReceiveOptionText {
                draft,
                question,
                option
            }]
            .endpoint(constructor::receive_option_text),
        )
        .branch(
            case![AuthorState::ReceiveAddAnotherOption { draft, question }]
                .endpoint(constructor::receive_add_another_option),
        )
        .branch(
            case![AuthorState::ReceiveCorrectOption { draft, question }]
                .endpoint(constructor::receive_correct_option),
        )
        .branch(
            case![AuthorState::ReceiveShortAnswer { draft, question }]
                .endpoint(constructor::receive_short_answer),
        )
        .branch(
            case![AuthorState::ReceiveImage { draft, question }]
                .endpoint(constructor::receive_image),
        )
        .branch(
            case![AuthorState::ReceiveAddAnotherQuestion { draft }]
                .endpoint(constructor::receive_add_another_question::<Connection>),
        )
}

#[instrument(level = "info")]
async fn invalid_state(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(
        msg.chat.id,
        "Unable to handle the message. Enter /help to see usages.",
    )
    .await?;
    Ok(())
}
