use crate::{
    backend::{Auth, CreateSubject},
    database::subject::{NewSubject, Subject},
    error::AppError,
};

/// Inserts a subject owned by the signed-in user. Validation happens before
/// any backend call; duplicates are left to the backend's unique constraint.
pub async fn add_subject<A: Auth, D: CreateSubject>(
    auth: &A,
    data: &D,
    name: &str,
) -> Result<Subject, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Subject name cannot be empty.".into()));
    }

    let user = auth
        .get_current_user()
        .await?
        .ok_or_else(|| AppError::Authorization("You must be logged in to add a subject.".into()))?;

    match data.create_subject(NewSubject::new(name, user.id)).await {
        Ok(subject) => Ok(subject),
        Err(e) if e.is_unique_violation() => Err(AppError::Conflict {
            name: name.to_owned(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Input, pending flag and feedback of the "add subject" form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectForm {
    name: String,
    loading: bool,
    message: Option<String>,
    error: Option<String>,
}

struct Loading<'a>(&'a mut bool);

impl<'a> Loading<'a> {
    fn start(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

impl SubjectForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn submit<A: Auth, D: CreateSubject>(
        &mut self,
        auth: &A,
        data: &D,
    ) -> Result<Subject, AppError> {
        self.message = None;
        self.error = None;

        let name = self.name.clone();
        let result = {
            let _loading = Loading::start(&mut self.loading);
            add_subject(auth, data, &name).await
        };

        match &result {
            Ok(subject) => {
                tracing::info!(subject = %subject.name, user = %subject.user_id, "subject added");
                self.message = Some(format!("Successfully added subject: \"{}\"", subject.name));
                self.name.clear();
            }
            Err(e) => {
                tracing::error!("Error adding subject: {:?}", e);
                self.error = Some(e.to_string());
            }
        }
        result
    }
}
