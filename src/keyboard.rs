use teloxide::types::{KeyboardButton, KeyboardMarkup};

use crate::draft::{QuestionType, QuizOption};

pub(crate) const ADD_SUBJECT: &str = "Add a subject📚";
pub(crate) const CREATE_QUIZ: &str = "Create a new quiz🏗️";
pub(crate) const SIGN_OUT: &str = "Sign out🚪";
pub(crate) const MULTIPLE_CHOICE: &str = "Multiple choice";
pub(crate) const SHORT_ANSWER: &str = "Short answer";
pub(crate) const SKIP: &str = "Skip";

pub(crate) fn yes_no_keyboard() -> KeyboardMarkup {
    let keyboard: Vec<Vec<KeyboardButton>> = vec![vec![
        KeyboardButton::new("Yes✔️"),
        KeyboardButton::new("No❌"),
    ]];

    KeyboardMarkup::new(keyboard)
}

pub(crate) fn action_keyboard() -> KeyboardMarkup {
    let keyboard = vec![
        vec![KeyboardButton::new(ADD_SUBJECT)],
        vec![KeyboardButton::new(CREATE_QUIZ)],
        vec![KeyboardButton::new(SIGN_OUT)],
    ];

    KeyboardMarkup::new(keyboard)
}

pub(crate) fn question_type_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![
        KeyboardButton::new(MULTIPLE_CHOICE),
        KeyboardButton::new(SHORT_ANSWER),
    ]])
}

pub(crate) fn parse_question_type(text: &str) -> Option<QuestionType> {
    match text {
        MULTIPLE_CHOICE => Some(QuestionType::MultipleChoice),
        SHORT_ANSWER => Some(QuestionType::ShortAnswer),
        _ => None,
    }
}

pub(crate) fn skip_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(SKIP)]])
}

pub(crate) fn option_label(index: usize, option: &QuizOption) -> String {
    format!("{}. {}", index + 1, option.text())
}

pub(crate) fn options_keyboard(options: &[QuizOption]) -> KeyboardMarkup {
    let keyboard = options
        .iter()
        .enumerate()
        .map(|(i, option)| vec![KeyboardButton::new(option_label(i, option))]);

    KeyboardMarkup::new(keyboard)
}

/// Matches a pressed button (or a bare number) back to an option.
pub(crate) fn find_option<'a>(options: &'a [QuizOption], text: &str) -> Option<&'a QuizOption> {
    options
        .iter()
        .enumerate()
        .find(|(i, option)| option_label(*i, option) == text || (i + 1).to_string() == text.trim())
        .map(|(_, option)| option)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::QuizDraft;

    #[test]
    fn options_are_found_by_label_or_number() {
        let draft = QuizDraft::new();
        let q = draft.questions()[0].id();
        let second = draft.questions()[0].options()[1].id();
        let draft = draft.set_option_text(q, second, "Paris").unwrap();
        let options = draft.questions()[0].options();

        assert_eq!(find_option(options, "2. Paris").map(QuizOption::id), Some(second));
        assert_eq!(find_option(options, " 2 ").map(QuizOption::id), Some(second));
        assert!(find_option(options, "3").is_none());
    }

    #[test]
    fn question_types_round_trip_through_labels() {
        assert_eq!(parse_question_type(MULTIPLE_CHOICE), Some(QuestionType::MultipleChoice));
        assert_eq!(parse_question_type(SHORT_ANSWER), Some(QuestionType::ShortAnswer));
        assert_eq!(parse_question_type("Essay"), None);
    }
}
