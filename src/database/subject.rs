use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubject {
    pub name: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub user_id: String,
}

impl NewSubject {
    pub fn new(name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            user_id: user_id.into(),
        }
    }
}

impl Subject {
    pub fn create(subject: NewSubject) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: subject.name,
            user_id: subject.user_id,
        }
    }
}
