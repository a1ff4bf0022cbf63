use crate::draft::{OptionId, QuestionId, QuizDraft};

#[derive(Debug, Clone, Default)]
pub enum AuthorState {
    #[default]
    Start,
    AwaitLogin,

    // PART FOR --- SUBJECTS ---
    ReceiveSubjectName,

    // PART FOR --- CREATING QUIZ ---
    ReceiveQuizSubject {
        draft: QuizDraft,
    },
    ReceiveQuizName {
        draft: QuizDraft,
    },
    ReceiveTimeLimit {
        draft: QuizDraft,
    },
    ReceiveQuestionText {
        draft: QuizDraft,
        question: QuestionId,
    },
    ReceiveQuestionType {
        draft: QuizDraft,
        question: QuestionId,
    },
    ReceiveOptionText {
        draft: QuizDraft,
        question: QuestionId,
        option: OptionId,
    },
    ReceiveAddAnotherOption {
        draft: QuizDraft,
        question: QuestionId,
    },
    ReceiveCorrectOption {
        draft: QuizDraft,
        question: QuestionId,
    },
    ReceiveShortAnswer {
        draft: QuizDraft,
        question: QuestionId,
    },
    ReceiveImage {
        draft: QuizDraft,
        question: QuestionId,
    },
    ReceiveAddAnotherQuestion {
        draft: QuizDraft,
    },
}
