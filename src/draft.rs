//! In-memory quiz draft. Every edit takes the current draft by reference and
//! returns the next one, so a dialogue state can swap drafts wholesale.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct QuestionId(Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OptionId(Uuid);

impl QuestionId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn uuid(&self) -> &Uuid {
        &self.0
    }
}

impl OptionId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[default]
    MultipleChoice,
    ShortAnswer,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::ShortAnswer => "short_answer",
        }
    }
}

/// Opaque reference to an uploaded image (a Telegram file id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImageHandle(String);

impl ImageHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Time limit in whole minutes, `0` meaning unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct TimeLimit(u32);

impl TimeLimit {
    pub const UNLIMITED: TimeLimit = TimeLimit(0);

    pub fn minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    /// Reads the leading integer of `input`. Anything without digits is 0,
    /// negative values clamp to 0 and overflow clamps to `u32::MAX`.
    pub fn parse_input(input: &str) -> Self {
        let input = input.trim_start();
        let (negative, rest) = match input.as_bytes().first() {
            Some(b'-') => (true, &input[1..]),
            Some(b'+') => (false, &input[1..]),
            _ => (false, input),
        };
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 || negative {
            return Self::UNLIMITED;
        }
        Self(rest[..digits].parse().unwrap_or(u32::MAX))
    }

    pub fn as_minutes(&self) -> u32 {
        self.0
    }

    pub fn is_unlimited(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TimeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unlimited() {
            write!(f, "no time limit")
        } else {
            write!(f, "{} min", self.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOption {
    id: OptionId,
    text: String,
    is_correct: bool,
}

impl QuizOption {
    fn new(is_correct: bool) -> Self {
        Self {
            id: OptionId::generate(),
            text: String::new(),
            is_correct,
        }
    }

    pub fn id(&self) -> OptionId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_correct(&self) -> bool {
        self.is_correct
    }
}

/// The answer branch that is active for the question's current type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer<'a> {
    MultipleChoice(&'a [QuizOption]),
    ShortAnswer(&'a str),
}

/// A question keeps both answer branches while it is edited, so switching the
/// type back and forth loses nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    question_type: QuestionType,
    image: Option<ImageHandle>,
    options: Vec<QuizOption>,
    short_answer: String,
}

impl Question {
    fn new() -> Self {
        Self {
            id: QuestionId::generate(),
            text: String::new(),
            question_type: QuestionType::MultipleChoice,
            image: None,
            options: vec![QuizOption::new(true), QuizOption::new(false)],
            short_answer: String::new(),
        }
    }

    pub fn id(&self) -> QuestionId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn question_type(&self) -> QuestionType {
        self.question_type
    }

    pub fn image(&self) -> Option<&ImageHandle> {
        self.image.as_ref()
    }

    pub fn options(&self) -> &[QuizOption] {
        &self.options
    }

    pub fn short_answer(&self) -> &str {
        &self.short_answer
    }

    pub fn answer(&self) -> Answer<'_> {
        match self.question_type {
            QuestionType::MultipleChoice => Answer::MultipleChoice(&self.options),
            QuestionType::ShortAnswer => Answer::ShortAnswer(&self.short_answer),
        }
    }

    pub fn option(&self, id: OptionId) -> Option<&QuizOption> {
        self.options.iter().find(|o| o.id == id)
    }

    pub fn correct_option(&self) -> Option<&QuizOption> {
        self.options.iter().find(|o| o.is_correct)
    }

    /// The option that follows `id` in display order.
    pub fn option_after(&self, id: OptionId) -> Option<OptionId> {
        let position = self.options.iter().position(|o| o.id == id)?;
        self.options.get(position + 1).map(QuizOption::id)
    }

    fn option_mut(&mut self, id: OptionId) -> Result<&mut QuizOption, DraftError> {
        let question = self.id;
        self.options
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(DraftError::UnknownOption(question, id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionField {
    Text(String),
    Type(QuestionType),
    Image(Option<ImageHandle>),
    ShortAnswer(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftField {
    SubjectName(String),
    QuizName(String),
    TimeLimit(TimeLimit),
    Question(QuestionId, QuestionField),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("question {0} is not part of this draft")]
    UnknownQuestion(QuestionId),

    #[error("option {1} is not part of question {0}")]
    UnknownOption(QuestionId, OptionId),

    #[error("a question needs at least one option")]
    LastOption(QuestionId),

    #[error("a quiz needs at least one question")]
    LastQuestion(QuestionId),

    #[error("{0} is required")]
    MissingField(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizDraft {
    subject_name: String,
    quiz_name: String,
    time_limit: TimeLimit,
    questions: Vec<Question>,
}

impl Default for QuizDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizDraft {
    /// A blank draft holding one default question.
    pub fn new() -> Self {
        Self {
            subject_name: String::new(),
            quiz_name: String::new(),
            time_limit: TimeLimit::UNLIMITED,
            questions: vec![Question::new()],
        }
    }

    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    pub fn quiz_name(&self) -> &str {
        &self.quiz_name
    }

    pub fn time_limit(&self) -> TimeLimit {
        self.time_limit
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn set_field(&self, field: DraftField) -> Result<Self, DraftError> {
        let mut next = self.clone();
        match field {
            DraftField::SubjectName(name) => next.subject_name = name,
            DraftField::QuizName(name) => next.quiz_name = name,
            DraftField::TimeLimit(limit) => next.time_limit = limit,
            DraftField::Question(id, field) => {
                let question = next.question_mut(id)?;
                match field {
                    QuestionField::Text(text) => question.text = text,
                    QuestionField::Type(question_type) => question.question_type = question_type,
                    QuestionField::Image(image) => question.image = image,
                    QuestionField::ShortAnswer(answer) => question.short_answer = answer,
                }
            }
        }
        Ok(next)
    }

    pub fn set_option_text(
        &self,
        question: QuestionId,
        option: OptionId,
        text: impl Into<String>,
    ) -> Result<Self, DraftError> {
        let mut next = self.clone();
        next.question_mut(question)?.option_mut(option)?.text = text.into();
        Ok(next)
    }

    /// Marks `option` as the only correct option of `question`.
    pub fn select_correct_option(
        &self,
        question: QuestionId,
        option: OptionId,
    ) -> Result<Self, DraftError> {
        let mut next = self.clone();
        let target = next.question_mut(question)?;
        target.option_mut(option)?;
        for o in target.options.iter_mut() {
            o.is_correct = o.id == option;
        }
        Ok(next)
    }

    pub fn add_question(&self) -> (Self, QuestionId) {
        let mut next = self.clone();
        let question = Question::new();
        let id = question.id;
        next.questions.push(question);
        (next, id)
    }

    pub fn remove_question(&self, question: QuestionId) -> Result<Self, DraftError> {
        let mut next = self.clone();
        let position = next
            .questions
            .iter()
            .position(|q| q.id == question)
            .ok_or(DraftError::UnknownQuestion(question))?;
        if next.questions.len() == 1 {
            return Err(DraftError::LastQuestion(question));
        }
        next.questions.remove(position);
        Ok(next)
    }

    /// Appends an incorrect, empty option.
    pub fn add_option(&self, question: QuestionId) -> Result<(Self, OptionId), DraftError> {
        let mut next = self.clone();
        let option = QuizOption::new(false);
        let id = option.id;
        next.question_mut(question)?.options.push(option);
        Ok((next, id))
    }

    /// Removing the correct option promotes the first remaining one.
    pub fn remove_option(&self, question: QuestionId, option: OptionId) -> Result<Self, DraftError> {
        let mut next = self.clone();
        let target = next.question_mut(question)?;
        let position = target
            .options
            .iter()
            .position(|o| o.id == option)
            .ok_or(DraftError::UnknownOption(question, option))?;
        if target.options.len() == 1 {
            return Err(DraftError::LastOption(question));
        }
        let removed = target.options.remove(position);
        if removed.is_correct {
            target.options[0].is_correct = true;
        }
        Ok(next)
    }

    /// Checks required fields and produces the serializable form of the draft.
    /// Every text field is submitted trimmed.
    pub fn submit(&self) -> Result<QuizSubmission, DraftError> {
        let subject_name = require(&self.subject_name, || "subject name".to_owned())?;
        let quiz_name = require(&self.quiz_name, || "quiz name".to_owned())?;
        if self.questions.is_empty() {
            return Err(DraftError::MissingField("at least one question".to_owned()));
        }

        let mut questions = Vec::with_capacity(self.questions.len());
        for (i, question) in self.questions.iter().enumerate() {
            let number = i + 1;
            let question_text = require(&question.text, || format!("text of question {number}"))?;
            let answer = match question.answer() {
                Answer::MultipleChoice(options) => {
                    let mut submitted = Vec::with_capacity(options.len());
                    for (j, option) in options.iter().enumerate() {
                        let option_text = require(&option.text, || {
                            format!("option {} of question {number}", j + 1)
                        })?;
                        submitted.push(SubmittedOption {
                            id: option.id,
                            option_text,
                            is_correct: option.is_correct,
                        });
                    }
                    SubmittedAnswer::MultipleChoice { options: submitted }
                }
                Answer::ShortAnswer(text) => {
                    SubmittedAnswer::ShortAnswer {
                        short_answer: require(text, || format!("answer of question {number}"))?,
                    }
                }
            };
            questions.push(SubmittedQuestion {
                id: question.id,
                question_text,
                image_file: question.image.clone(),
                answer,
            });
        }

        Ok(QuizSubmission {
            subject_name,
            quiz_name,
            time_limit_minutes: self.time_limit,
            questions,
        })
    }

    fn question_mut(&mut self, id: QuestionId) -> Result<&mut Question, DraftError> {
        self.questions
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or(DraftError::UnknownQuestion(id))
    }
}

fn require(value: &str, field: impl FnOnce() -> String) -> Result<String, DraftError> {
    match value.trim() {
        "" => Err(DraftError::MissingField(field())),
        trimmed => Ok(trimmed.to_owned()),
    }
}

impl fmt::Display for QuizDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.quiz_name, self.subject_name)?;
        writeln!(f, "{}", self.time_limit)?;
        for (i, question) in self.questions.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "#{} {}", i + 1, question.text)?;
            match question.answer() {
                Answer::MultipleChoice(options) => {
                    for (j, option) in options.iter().enumerate() {
                        let mark = if option.is_correct { 'V' } else { 'X' };
                        writeln!(f, "{}) {} ({})", j + 1, option.text, mark)?;
                    }
                }
                Answer::ShortAnswer(answer) => writeln!(f, "Answer: {answer}")?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizSubmission {
    pub subject_name: String,
    pub quiz_name: String,
    pub time_limit_minutes: TimeLimit,
    pub questions: Vec<SubmittedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmittedQuestion {
    pub id: QuestionId,
    pub question_text: String,
    pub image_file: Option<ImageHandle>,
    #[serde(flatten)]
    pub answer: SubmittedAnswer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "question_type", rename_all = "snake_case")]
pub enum SubmittedAnswer {
    MultipleChoice { options: Vec<SubmittedOption> },
    ShortAnswer { short_answer: String },
}

impl SubmittedAnswer {
    pub fn question_type(&self) -> QuestionType {
        match self {
            Self::MultipleChoice { .. } => QuestionType::MultipleChoice,
            Self::ShortAnswer { .. } => QuestionType::ShortAnswer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmittedOption {
    pub id: OptionId,
    pub option_text: String,
    pub is_correct: bool,
}

impl QuizSubmission {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
