//! In-memory mock implementations for the study-plan repository traits.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::use_cases::study_plan::{
        CreateSubjectInput, LogSessionInput, MockExamRepo, RecordMockExamInput, StudySessionRepo,
        SubjectRepo, UpdateSubjectInput,
    },
    domain::entities::{mock_exam::MockExam, study_session::StudySession, subject::Subject},
};

// ============================================================================
// InMemorySubjectRepo
// ============================================================================

#[derive(Default)]
pub struct InMemorySubjectRepo {
    pub subjects: Mutex<HashMap<Uuid, Subject>>,
}

impl InMemorySubjectRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, subject: Subject) {
        self.subjects.lock().unwrap().insert(subject.id, subject);
    }
}

#[async_trait]
impl SubjectRepo for InMemorySubjectRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Subject>> {
        Ok(self.subjects.lock().unwrap().get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Subject>> {
        let subjects = self.subjects.lock().unwrap();
        let mut result: Vec<_> = subjects
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(result)
    }

    async fn create(&self, user_id: Uuid, input: &CreateSubjectInput) -> AppResult<Subject> {
        let now = Utc::now();
        let subject = Subject {
            id: Uuid::new_v4(),
            user_id,
            name: input.name.clone(),
            color: input.color.clone().unwrap_or_else(|| "#4f46e5".to_string()),
            exam_date: input.exam_date,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.subjects
            .lock()
            .unwrap()
            .insert(subject.id, subject.clone());
        Ok(subject)
    }

    async fn update(&self, id: Uuid, input: &UpdateSubjectInput) -> AppResult<Subject> {
        let mut subjects = self.subjects.lock().unwrap();
        let subject = subjects.get_mut(&id).expect("subject exists");
        if let Some(name) = &input.name {
            subject.name = name.clone();
        }
        if let Some(color) = &input.color {
            subject.color = color.clone();
        }
        if input.exam_date.is_some() {
            subject.exam_date = input.exam_date;
        }
        subject.updated_at = Some(Utc::now());
        Ok(subject.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.subjects.lock().unwrap().remove(&id);
        Ok(())
    }
}

// ============================================================================
// InMemoryStudySessionRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryStudySessionRepo {
    pub sessions: Mutex<HashMap<Uuid, StudySession>>,
}

impl InMemoryStudySessionRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StudySessionRepo for InMemoryStudySessionRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<StudySession>> {
        Ok(self.sessions.lock().unwrap().get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<StudySession>> {
        let sessions = self.sessions.lock().unwrap();
        let mut result: Vec<_> = sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(result)
    }

    async fn create(&self, user_id: Uuid, input: &LogSessionInput) -> AppResult<StudySession> {
        let session = StudySession {
            id: Uuid::new_v4(),
            user_id,
            subject_id: input.subject_id,
            started_at: input.started_at,
            duration_minutes: input.duration_minutes,
            notes: input.notes.clone(),
            created_at: Some(Utc::now()),
        };
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.sessions.lock().unwrap().remove(&id);
        Ok(())
    }
}

// ============================================================================
// InMemoryMockExamRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryMockExamRepo {
    pub exams: Mutex<HashMap<Uuid, MockExam>>,
}

impl InMemoryMockExamRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MockExamRepo for InMemoryMockExamRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<MockExam>> {
        Ok(self.exams.lock().unwrap().get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<MockExam>> {
        let exams = self.exams.lock().unwrap();
        let mut result: Vec<_> = exams
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.taken_on.cmp(&a.taken_on));
        Ok(result)
    }

    async fn create(&self, user_id: Uuid, input: &RecordMockExamInput) -> AppResult<MockExam> {
        let exam = MockExam {
            id: Uuid::new_v4(),
            user_id,
            subject_id: input.subject_id,
            taken_on: input.taken_on,
            score: input.score,
            max_score: input.max_score,
            created_at: Some(Utc::now()),
        };
        self.exams.lock().unwrap().insert(exam.id, exam.clone());
        Ok(exam)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.exams.lock().unwrap().remove(&id);
        Ok(())
    }
}
