use std::borrow::Cow;

use sqlx::{migrate::MigrateError, postgres::PgPool};
use uuid::Uuid;

use super::subject::{NewSubject, Subject};
use crate::{
    backend::{CreateQuiz, CreateSubject},
    draft::{QuizSubmission, SubmittedAnswer},
    error::BackendError,
};

pub struct Connection {
    pool: PgPool,
}

impl Connection {
    pub async fn connect<'a>(connection_string: Cow<'a, str>) -> Result<Self, sqlx::Error> {
        let pool = PgPool::connect(&connection_string).await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), MigrateError> {
        tracing::debug!("Running migrations");
        sqlx::migrate!().run(&self.pool).await
    }
}

impl CreateSubject for Connection {
    async fn create_subject(&self, subject: NewSubject) -> Result<Subject, BackendError> {
        tracing::debug!("Adding subject {} for user {}", subject.name, subject.user_id);
        let created = sqlx::query_as::<_, Subject>(
            "INSERT INTO subjects (id, name, user_id) VALUES ($1, $2, $3) RETURNING id, name, user_id",
        )
        .bind(Uuid::new_v4())
        .bind(&subject.name)
        .bind(&subject.user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }
}

impl CreateQuiz for Connection {
    async fn create_quiz(&self, user_id: String, quiz: QuizSubmission) -> Result<Uuid, BackendError> {
        tracing::debug!("Creating transaction");
        let mut tx = self.pool.begin().await?;

        let quiz_id = Uuid::new_v4();
        tracing::debug!("Adding quiz {} with uuid {}", quiz.quiz_name, quiz_id);
        sqlx::query(
            "INSERT INTO quizzes (id, user_id, subject_name, name, time_limit_minutes) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(quiz_id)
        .bind(&user_id)
        .bind(&quiz.subject_name)
        .bind(&quiz.quiz_name)
        .bind(i64::from(quiz.time_limit_minutes.as_minutes()))
        .execute(&mut *tx)
        .await?;

        for (position, question) in quiz.questions.iter().enumerate() {
            tracing::debug!(
                "Adding question {} with uuid {}",
                question.question_text,
                question.id
            );
            let short_answer = match &question.answer {
                SubmittedAnswer::ShortAnswer { short_answer } => Some(short_answer.as_str()),
                SubmittedAnswer::MultipleChoice { .. } => None,
            };
            sqlx::query(
                "INSERT INTO questions (id, quiz_id, position, text, question_type, image_file_id, short_answer) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(question.id.uuid())
            .bind(quiz_id)
            .bind(position as i32)
            .bind(&question.question_text)
            .bind(question.answer.question_type().as_str())
            .bind(question.image_file.as_ref().map(|i| i.as_str()))
            .bind(short_answer)
            .execute(&mut *tx)
            .await?;

            if let SubmittedAnswer::MultipleChoice { options } = &question.answer {
                for (position, option) in options.iter().enumerate() {
                    tracing::debug!(
                        "Adding option {} with uuid {}",
                        option.option_text,
                        option.id
                    );
                    sqlx::query(
                        "INSERT INTO options (id, question_id, position, text, is_correct) VALUES ($1, $2, $3, $4, $5)",
                    )
                    .bind(option.id.uuid())
                    .bind(question.id.uuid())
                    .bind(position as i32)
                    .bind(&option.option_text)
                    .bind(option.is_correct)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tracing::debug!("Closing transaction");
        tx.commit().await?;

        Ok(quiz_id)
    }
}
