//! Study-planning use cases: subjects, logged study sessions and mock-exam
//! results, all scoped to the calling user.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{mock_exam::MockExam, study_session::StudySession, subject::Subject},
};

// ============================================================================
// Input Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubjectInput {
    pub name: String,
    pub color: Option<String>,
    pub exam_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSubjectInput {
    pub name: Option<String>,
    pub color: Option<String>,
    pub exam_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSessionInput {
    pub subject_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordMockExamInput {
    pub subject_id: Uuid,
    pub taken_on: NaiveDate,
    pub score: i32,
    pub max_score: i32,
}

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait SubjectRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Subject>>;
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Subject>>;
    async fn create(&self, user_id: Uuid, input: &CreateSubjectInput) -> AppResult<Subject>;
    async fn update(&self, id: Uuid, input: &UpdateSubjectInput) -> AppResult<Subject>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait StudySessionRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<StudySession>>;
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<StudySession>>;
    async fn create(&self, user_id: Uuid, input: &LogSessionInput) -> AppResult<StudySession>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait MockExamRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<MockExam>>;
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<MockExam>>;
    async fn create(&self, user_id: Uuid, input: &RecordMockExamInput) -> AppResult<MockExam>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct StudyPlanUseCases {
    subject_repo: Arc<dyn SubjectRepo>,
    session_repo: Arc<dyn StudySessionRepo>,
    exam_repo: Arc<dyn MockExamRepo>,
}

impl StudyPlanUseCases {
    pub fn new(
        subject_repo: Arc<dyn SubjectRepo>,
        session_repo: Arc<dyn StudySessionRepo>,
        exam_repo: Arc<dyn MockExamRepo>,
    ) -> Self {
        Self {
            subject_repo,
            session_repo,
            exam_repo,
        }
    }

    /// Fetch a subject and verify it belongs to the caller.
    async fn get_owned_subject(&self, user_id: Uuid, subject_id: Uuid) -> AppResult<Subject> {
        let subject = self
            .subject_repo
            .get_by_id(subject_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if subject.user_id != user_id {
            return Err(AppError::NotFound);
        }
        Ok(subject)
    }

    // ========================================================================
    // Subjects
    // ========================================================================

    pub async fn list_subjects(&self, user_id: Uuid) -> AppResult<Vec<Subject>> {
        self.subject_repo.list_by_user(user_id).await
    }

    pub async fn create_subject(
        &self,
        user_id: Uuid,
        input: &CreateSubjectInput,
    ) -> AppResult<Subject> {
        if input.name.trim().is_empty() {
            return Err(AppError::InvalidInput("Subject name is required".into()));
        }
        self.subject_repo.create(user_id, input).await
    }

    pub async fn update_subject(
        &self,
        user_id: Uuid,
        subject_id: Uuid,
        input: &UpdateSubjectInput,
    ) -> AppResult<Subject> {
        self.get_owned_subject(user_id, subject_id).await?;
        if let Some(name) = &input.name
            && name.trim().is_empty()
        {
            return Err(AppError::InvalidInput("Subject name is required".into()));
        }
        self.subject_repo.update(subject_id, input).await
    }

    pub async fn delete_subject(&self, user_id: Uuid, subject_id: Uuid) -> AppResult<()> {
        self.get_owned_subject(user_id, subject_id).await?;
        self.subject_repo.delete(subject_id).await
    }

    // ========================================================================
    // Study Sessions
    // ========================================================================

    pub async fn list_sessions(&self, user_id: Uuid) -> AppResult<Vec<StudySession>> {
        self.session_repo.list_by_user(user_id).await
    }

    pub async fn log_session(
        &self,
        user_id: Uuid,
        input: &LogSessionInput,
    ) -> AppResult<StudySession> {
        if input.duration_minutes <= 0 {
            return Err(AppError::InvalidInput(
                "Session duration must be positive".into(),
            ));
        }
        self.get_owned_subject(user_id, input.subject_id).await?;
        self.session_repo.create(user_id, input).await
    }

    pub async fn delete_session(&self, user_id: Uuid, session_id: Uuid) -> AppResult<()> {
        let session = self
            .session_repo
            .get_by_id(session_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if session.user_id != user_id {
            return Err(AppError::NotFound);
        }
        self.session_repo.delete(session_id).await
    }

    // ========================================================================
    // Mock Exams
    // ========================================================================

    pub async fn list_mock_exams(&self, user_id: Uuid) -> AppResult<Vec<MockExam>> {
        self.exam_repo.list_by_user(user_id).await
    }

    pub async fn record_mock_exam(
        &self,
        user_id: Uuid,
        input: &RecordMockExamInput,
    ) -> AppResult<MockExam> {
        if input.max_score <= 0 || input.score < 0 || input.score > input.max_score {
            return Err(AppError::InvalidInput(
                "Score must be between 0 and the maximum score".into(),
            ));
        }
        self.get_owned_subject(user_id, input.subject_id).await?;
        self.exam_repo.create(user_id, input).await
    }

    pub async fn delete_mock_exam(&self, user_id: Uuid, exam_id: Uuid) -> AppResult<()> {
        let exam = self
            .exam_repo
            .get_by_id(exam_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if exam.user_id != user_id {
            return Err(AppError::NotFound);
        }
        self.exam_repo.delete(exam_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        InMemoryMockExamRepo, InMemoryStudySessionRepo, InMemorySubjectRepo, create_test_subject,
    };

    fn use_cases() -> (StudyPlanUseCases, Arc<InMemorySubjectRepo>) {
        let subjects = Arc::new(InMemorySubjectRepo::new());
        let use_cases = StudyPlanUseCases::new(
            subjects.clone(),
            Arc::new(InMemoryStudySessionRepo::new()),
            Arc::new(InMemoryMockExamRepo::new()),
        );
        (use_cases, subjects)
    }

    #[tokio::test]
    async fn create_subject_rejects_blank_names() {
        let (use_cases, _) = use_cases();
        let input = CreateSubjectInput {
            name: "   ".to_string(),
            color: None,
            exam_date: None,
        };

        let err = use_cases
            .create_subject(Uuid::new_v4(), &input)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn delete_subject_enforces_ownership() {
        let (use_cases, subjects) = use_cases();
        let owner = Uuid::new_v4();
        let subject = create_test_subject(owner, |_| {});
        subjects.insert(subject.clone());

        let err = use_cases
            .delete_subject(Uuid::new_v4(), subject.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));

        use_cases.delete_subject(owner, subject.id).await.unwrap();
        assert!(use_cases.list_subjects(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn log_session_validates_duration_and_subject() {
        let (use_cases, subjects) = use_cases();
        let owner = Uuid::new_v4();
        let subject = create_test_subject(owner, |_| {});
        subjects.insert(subject.clone());

        let mut input = LogSessionInput {
            subject_id: subject.id,
            started_at: Utc::now(),
            duration_minutes: 0,
            notes: None,
        };
        assert!(use_cases.log_session(owner, &input).await.is_err());

        input.duration_minutes = 45;
        let session = use_cases.log_session(owner, &input).await.unwrap();
        assert_eq!(session.subject_id, subject.id);

        // Logging against someone else's subject is a not-found.
        input.subject_id = Uuid::new_v4();
        assert!(matches!(
            use_cases.log_session(owner, &input).await.unwrap_err(),
            AppError::NotFound
        ));
    }

    #[tokio::test]
    async fn record_mock_exam_validates_score_range() {
        let (use_cases, subjects) = use_cases();
        let owner = Uuid::new_v4();
        let subject = create_test_subject(owner, |_| {});
        subjects.insert(subject.clone());

        let mut input = RecordMockExamInput {
            subject_id: subject.id,
            taken_on: "2025-06-01".parse().unwrap(),
            score: 120,
            max_score: 100,
        };
        assert!(use_cases.record_mock_exam(owner, &input).await.is_err());

        input.score = 87;
        let exam = use_cases.record_mock_exam(owner, &input).await.unwrap();
        assert_eq!(exam.score, 87);
        assert_eq!(exam.max_score, 100);
    }
}
