use std::sync::{Arc, Mutex};

use chrono::Duration;
use quizauthorbot::backend::{CreateQuiz, CreateSubject, User};
use quizauthorbot::constructor::submit_draft;
use quizauthorbot::database::subject::{NewSubject, Subject};
use quizauthorbot::draft::{
    DraftField, QuestionField, QuestionType, QuizDraft, QuizSubmission, SubmittedAnswer, TimeLimit,
};
use quizauthorbot::error::{AppError, BackendError, UNIQUE_VIOLATION};
use quizauthorbot::gate::{SessionGate, View};
use quizauthorbot::login::{LoginWidget, Theme};
use quizauthorbot::sessions::SessionStore;
use quizauthorbot::subject::add_subject;
use uuid::Uuid;

#[derive(Default)]
struct MemoryBackend {
    subjects: Mutex<Vec<Subject>>,
    quizzes: Mutex<Vec<(String, QuizSubmission)>>,
}

impl CreateSubject for MemoryBackend {
    async fn create_subject(&self, subject: NewSubject) -> Result<Subject, BackendError> {
        let mut subjects = self.subjects.lock().unwrap();
        if subjects
            .iter()
            .any(|s| s.user_id == subject.user_id && s.name == subject.name)
        {
            return Err(BackendError::with_code(UNIQUE_VIOLATION, "duplicate key"));
        }
        let created = Subject::create(subject);
        subjects.push(created.clone());
        Ok(created)
    }
}

impl CreateQuiz for MemoryBackend {
    async fn create_quiz(&self, user_id: String, quiz: QuizSubmission) -> Result<Uuid, BackendError> {
        self.quizzes.lock().unwrap().push((user_id, quiz));
        Ok(Uuid::new_v4())
    }
}

fn grace() -> User {
    User {
        id: "77".into(),
        display_name: "Grace Hopper".into(),
    }
}

#[tokio::test]
async fn sign_in_add_subject_and_publish_quiz() {
    let store = Arc::new(SessionStore::new(Duration::hours(1)));
    let login = LoginWidget::new(Arc::clone(&store), Theme::Plain);
    let backend = MemoryBackend::default();

    let mut gate = SessionGate::mount(store.client(77), login.theme()).await;
    assert_eq!(gate.render(), View::LoggedOut { theme: Theme::Plain });

    login.complete(77, grace());
    assert_eq!(
        gate.render(),
        View::Authenticated {
            display_name: "Grace Hopper".into()
        }
    );

    let auth = store.client(77);
    let subject = add_subject(&auth, &backend, "Computing").await.unwrap();
    assert_eq!(subject.user_id, "77");
    assert_eq!(
        add_subject(&auth, &backend, "Computing").await.unwrap_err(),
        AppError::Conflict {
            name: "Computing".into()
        }
    );

    let draft = QuizDraft::new();
    let first = draft.questions()[0].id();
    let options: Vec<_> = draft.questions()[0].options().iter().map(|o| o.id()).collect();
    let draft = draft
        .set_field(DraftField::SubjectName(subject.name.clone()))
        .and_then(|d| d.set_field(DraftField::QuizName("Compilers".into())))
        .and_then(|d| d.set_field(DraftField::TimeLimit(TimeLimit::parse_input("30"))))
        .and_then(|d| d.set_field(DraftField::Question(first, QuestionField::Text("Who wrote A-0?".into()))))
        .and_then(|d| d.set_option_text(first, options[0], "Alan Turing"))
        .and_then(|d| d.set_option_text(first, options[1], "Grace Hopper"))
        .and_then(|d| d.select_correct_option(first, options[1]))
        .unwrap();

    let (draft, second) = draft.add_question();
    let draft = draft
        .set_field(DraftField::Question(second, QuestionField::Text("COBOL stands for?".into())))
        .and_then(|d| d.set_field(DraftField::Question(second, QuestionField::Type(QuestionType::ShortAnswer))))
        .and_then(|d| {
            d.set_field(DraftField::Question(
                second,
                QuestionField::ShortAnswer("Common Business-Oriented Language".into()),
            ))
        })
        .unwrap();

    submit_draft(&auth, &backend, &draft).await.unwrap();

    let quizzes = backend.quizzes.lock().unwrap();
    let (owner, quiz) = &quizzes[0];
    assert_eq!(owner, "77");
    assert_eq!(quiz.time_limit_minutes, TimeLimit::minutes(30));
    match &quiz.questions[0].answer {
        SubmittedAnswer::MultipleChoice { options } => {
            let correct: Vec<_> = options.iter().filter(|o| o.is_correct).collect();
            assert_eq!(correct.len(), 1);
            assert_eq!(correct[0].option_text, "Grace Hopper");
        }
        other => panic!("expected multiple choice, got {other:?}"),
    }
    assert_eq!(quiz.questions[1].answer.question_type(), QuestionType::ShortAnswer);

    gate.sign_out().await;
    assert_eq!(gate.render(), View::LoggedOut { theme: Theme::Plain });
    gate.teardown();
}

#[tokio::test]
async fn blank_subject_is_rejected_before_sign_in_check() {
    let store = Arc::new(SessionStore::new(Duration::hours(1)));
    let backend = MemoryBackend::default();

    let err = add_subject(&store.client(1), &backend, "   ").await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert!(backend.subjects.lock().unwrap().is_empty());
}
