use std::sync::Arc;

use teloxide::types::{ParseMode, ReplyMarkup};
use teloxide::{payloads::SendMessageSetters, prelude::Requester, types::Message, Bot};
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use crate::backend::{Auth, CreateQuiz};
use crate::draft::{
    DraftError, DraftField, ImageHandle, OptionId, QuestionField, QuestionId, QuestionType,
    QuizDraft, TimeLimit,
};
use crate::error::BackendError;
use crate::keyboard::{
    action_keyboard, find_option, options_keyboard, parse_question_type, question_type_keyboard,
    skip_keyboard, yes_no_keyboard, SKIP,
};
use crate::sessions::SessionStore;
use crate::state::AuthorState;
use crate::{HandlerResult, UserDialogue};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{0}")]
    Incomplete(#[from] DraftError),

    #[error("your session has expired, use /start to sign in again")]
    SignedOut,

    #[error("failed to save the quiz: {0}")]
    Backend(#[from] BackendError),
}

/// Serializes the draft and hands it to the quiz store on behalf of the
/// signed-in user.
pub async fn submit_draft<A: Auth, Q: CreateQuiz>(
    auth: &A,
    quizzes: &Q,
    draft: &QuizDraft,
) -> Result<Uuid, SubmitError> {
    let submission = draft.submit()?;
    match submission.to_json() {
        Ok(json) => tracing::debug!("Submitting quiz draft: {}", json),
        Err(e) => tracing::warn!("Failed to serialize quiz draft: {}", e),
    }

    let user = auth.get_current_user().await?.ok_or(SubmitError::SignedOut)?;
    let quiz_id = quizzes.create_quiz(user.id, submission).await?;
    Ok(quiz_id)
}

fn is_yes(text: Option<&str>) -> Option<bool> {
    match text {
        Some("Yes") | Some("Yes✔️") => Some(true),
        Some("No") | Some("No❌") => Some(false),
        _ => None,
    }
}

async fn ask_question_text(
    bot: &Bot,
    msg: &Message,
    dialogue: &UserDialogue,
    draft: QuizDraft,
    question: QuestionId,
) -> HandlerResult {
    let number = draft
        .questions()
        .iter()
        .position(|q| q.id() == question)
        .map_or(draft.questions().len(), |i| i + 1);
    bot.send_message(msg.chat.id, format!("Question #{number}. What's the question?"))
        .reply_markup(ReplyMarkup::kb_remove())
        .await?;
    dialogue
        .update(AuthorState::ReceiveQuestionText { draft, question })
        .await?;
    Ok(())
}

async fn ask_option_text(
    bot: &Bot,
    msg: &Message,
    dialogue: &UserDialogue,
    draft: QuizDraft,
    question: QuestionId,
    option: OptionId,
) -> HandlerResult {
    let number = draft
        .question(question)
        .and_then(|q| q.options().iter().position(|o| o.id() == option))
        .map_or(1, |i| i + 1);
    bot.send_message(msg.chat.id, format!("Enter option #{number}."))
        .reply_markup(ReplyMarkup::kb_remove())
        .await?;
    dialogue
        .update(AuthorState::ReceiveOptionText {
            draft,
            question,
            option,
        })
        .await?;
    Ok(())
}

async fn ask_image(
    bot: &Bot,
    msg: &Message,
    dialogue: &UserDialogue,
    draft: QuizDraft,
    question: QuestionId,
) -> HandlerResult {
    bot.send_message(
        msg.chat.id,
        "Send a picture for this question, or press Skip.",
    )
    .reply_markup(skip_keyboard())
    .await?;
    dialogue
        .update(AuthorState::ReceiveImage { draft, question })
        .await?;
    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue))]
pub(crate) async fn receive_quiz_subject(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    draft: QuizDraft,
) -> HandlerResult {
    match msg.text() {
        Some(subject) => {
            let draft = draft.set_field(DraftField::SubjectName(subject.to_owned()))?;
            bot.send_message(msg.chat.id, "OK. What's the name of the quiz?")
                .await?;
            dialogue
                .update(AuthorState::ReceiveQuizName { draft })
                .await?;
        }
        None => {
            bot.send_message(msg.chat.id, "Please, send the subject of the new quiz.")
                .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue))]
pub(crate) async fn receive_quiz_name(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    draft: QuizDraft,
) -> HandlerResult {
    match msg.text() {
        Some(name) => {
            let draft = draft.set_field(DraftField::QuizName(name.to_owned()))?;
            bot.send_message(
                msg.chat.id,
                "Time limit in minutes? Send 0 for no limit.",
            )
            .await?;
            dialogue
                .update(AuthorState::ReceiveTimeLimit { draft })
                .await?;
        }
        None => {
            bot.send_message(msg.chat.id, "Please, send a name for the new quiz.")
                .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue))]
pub(crate) async fn receive_time_limit(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    draft: QuizDraft,
) -> HandlerResult {
    let limit = TimeLimit::parse_input(msg.text().unwrap_or_default());
    let draft = draft.set_field(DraftField::TimeLimit(limit))?;
    bot.send_message(msg.chat.id, format!("Time limit set: {limit}."))
        .await?;

    match draft.questions().first().map(|q| q.id()) {
        Some(question) => ask_question_text(&bot, &msg, &dialogue, draft, question).await,
        None => {
            let (draft, question) = draft.add_question();
            ask_question_text(&bot, &msg, &dialogue, draft, question).await
        }
    }
}

#[instrument(level = "info", skip(bot, dialogue))]
pub(crate) async fn receive_question_text(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    (draft, question): (QuizDraft, QuestionId),
) -> HandlerResult {
    match msg.text() {
        Some(text) => {
            let draft =
                draft.set_field(DraftField::Question(question, QuestionField::Text(text.to_owned())))?;
            bot.send_message(msg.chat.id, "What kind of question is it?")
                .reply_markup(question_type_keyboard())
                .await?;
            dialogue
                .update(AuthorState::ReceiveQuestionType { draft, question })
                .await?;
        }
        None => {
            bot.send_message(msg.chat.id, "Please, send the question text.")
                .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue))]
pub(crate) async fn receive_question_type(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    (draft, question): (QuizDraft, QuestionId),
) -> HandlerResult {
    let Some(question_type) = msg.text().and_then(parse_question_type) else {
        bot.send_message(msg.chat.id, "Please, choose one of the question types.")
            .reply_markup(question_type_keyboard())
            .await?;
        return Ok(());
    };

    let draft = draft.set_field(DraftField::Question(question, QuestionField::Type(question_type)))?;
    match question_type {
        QuestionType::MultipleChoice => {
            let first = draft
                .question(question)
                .and_then(|q| q.options().first())
                .map(|o| o.id());
            match first {
                Some(option) => {
                    ask_option_text(&bot, &msg, &dialogue, draft, question, option).await?
                }
                None => {
                    let (draft, option) = draft.add_option(question)?;
                    ask_option_text(&bot, &msg, &dialogue, draft, question, option).await?
                }
            }
        }
        QuestionType::ShortAnswer => {
            bot.send_message(msg.chat.id, "What's the correct answer?")
                .reply_markup(ReplyMarkup::kb_remove())
                .await?;
            dialogue
                .update(AuthorState::ReceiveShortAnswer { draft, question })
                .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue))]
pub(crate) async fn receive_option_text(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    (draft, question, option): (QuizDraft, QuestionId, OptionId),
) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "Please, send the option text.")
            .await?;
        return Ok(());
    };

    let draft = draft.set_option_text(question, option, text)?;
    let next = draft.question(question).and_then(|q| q.option_after(option));
    match next {
        Some(next) => ask_option_text(&bot, &msg, &dialogue, draft, question, next).await?,
        None => {
            bot.send_message(msg.chat.id, "Do you want to add another option?(Yes/No)")
                .reply_markup(yes_no_keyboard())
                .await?;
            dialogue
                .update(AuthorState::ReceiveAddAnotherOption { draft, question })
                .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue))]
pub(crate) async fn receive_add_another_option(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    (draft, question): (QuizDraft, QuestionId),
) -> HandlerResult {
    match is_yes(msg.text()) {
        Some(true) => {
            let (draft, option) = draft.add_option(question)?;
            ask_option_text(&bot, &msg, &dialogue, draft, question, option).await?;
        }
        Some(false) => {
            let options = draft
                .question(question)
                .ok_or(DraftError::UnknownQuestion(question))?
                .options();
            bot.send_message(msg.chat.id, "Which option is correct?")
                .reply_markup(options_keyboard(options))
                .await?;
            dialogue
                .update(AuthorState::ReceiveCorrectOption { draft, question })
                .await?;
        }
        None => {
            bot.send_message(
                msg.chat.id,
                "Please enter a valid answer <b>Yes</b> or <b>No</b>",
            )
            .reply_markup(yes_no_keyboard())
            .parse_mode(ParseMode::Html)
            .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue))]
pub(crate) async fn receive_correct_option(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    (draft, question): (QuizDraft, QuestionId),
) -> HandlerResult {
    let target = draft
        .question(question)
        .ok_or(DraftError::UnknownQuestion(question))?;
    let chosen = msg
        .text()
        .and_then(|text| find_option(target.options(), text))
        .map(|o| o.id());

    match chosen {
        Some(option) => {
            let draft = draft.select_correct_option(question, option)?;
            ask_image(&bot, &msg, &dialogue, draft, question).await?;
        }
        None => {
            bot.send_message(msg.chat.id, "Please, pick one of the options.")
                .reply_markup(options_keyboard(target.options()))
                .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue))]
pub(crate) async fn receive_short_answer(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    (draft, question): (QuizDraft, QuestionId),
) -> HandlerResult {
    match msg.text() {
        Some(answer) => {
            let draft = draft.set_field(DraftField::Question(
                question,
                QuestionField::ShortAnswer(answer.to_owned()),
            ))?;
            ask_image(&bot, &msg, &dialogue, draft, question).await?;
        }
        None => {
            bot.send_message(msg.chat.id, "Please, send the correct answer.")
                .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue))]
pub(crate) async fn receive_image(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    (draft, question): (QuizDraft, QuestionId),
) -> HandlerResult {
    let image = match (msg.photo(), msg.text()) {
        (Some(sizes), _) => match sizes.last() {
            Some(largest) => Some(ImageHandle::new(largest.file.id.to_string())),
            None => None,
        },
        (None, Some(SKIP)) => None,
        _ => {
            bot.send_message(msg.chat.id, "Please, send a picture or press Skip.")
                .reply_markup(skip_keyboard())
                .await?;
            return Ok(());
        }
    };

    let draft = draft.set_field(DraftField::Question(question, QuestionField::Image(image)))?;
    bot.send_message(
        msg.chat.id,
        "Question saved. Do you want to add another question?(Yes/No)",
    )
    .reply_markup(yes_no_keyboard())
    .await?;
    dialogue
        .update(AuthorState::ReceiveAddAnotherQuestion { draft })
        .await?;

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, store, connection))]
pub(crate) async fn receive_add_another_question<DbConnection: CreateQuiz>(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    draft: QuizDraft,
    store: Arc<SessionStore>,
    connection: Arc<DbConnection>,
) -> HandlerResult {
    match is_yes(msg.text()) {
        Some(true) => {
            let (draft, question) = draft.add_question();
            ask_question_text(&bot, &msg, &dialogue, draft, question).await?;
        }
        Some(false) => {
            let auth = store.client(msg.chat.id.0);
            match submit_draft(&auth, connection.as_ref(), &draft).await {
                Ok(quiz_id) => {
                    tracing::info!("{} saved quiz {}", msg.chat.id.0, quiz_id);
                    bot.send_message(msg.chat.id, draft.to_string()).await?;
                    bot.send_message(msg.chat.id, "Quiz saved. What do you want to do next?")
                        .reply_markup(action_keyboard())
                        .await?;
                    dialogue.update(AuthorState::Start).await?;
                }
                Err(SubmitError::Incomplete(e)) => {
                    bot.send_message(msg.chat.id, format!("The quiz is incomplete: {e}. Use /cancel to start over."))
                        .await?;
                }
                Err(e @ SubmitError::SignedOut) => {
                    bot.send_message(msg.chat.id, e.to_string()).await?;
                    dialogue.update(AuthorState::AwaitLogin).await?;
                }
                Err(e) => {
                    tracing::error!("Database error: {:?}", e);
                    bot.send_message(msg.chat.id, format!("{e}. Please try again."))
                        .reply_markup(yes_no_keyboard())
                        .await?;
                }
            }
        }
        None => {
            bot.send_message(
                msg.chat.id,
                "Please enter a valid answer <b>Yes</b> or <b>No</b>",
            )
            .reply_markup(yes_no_keyboard())
            .parse_mode(ParseMode::Html)
            .await?;
        }
    }

    Ok(())
}
