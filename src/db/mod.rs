// src/db/mod.rs

pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        attempt::{AttemptRow, QuestionResponse},
        course::{Course, CourseModule, Group},
        quiz::{FeedbackBand, Question, Quiz},
    },
    report::sql::SqlQuery,
};

pub use postgres::PgStore;

/// Row window for one page of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: i64,
    pub limit: i64,
}

/// Database access needed by the page handlers.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn course_module(&self, id: i64) -> Result<Option<CourseModule>, AppError>;

    async fn course(&self, id: i64) -> Result<Option<Course>, AppError>;

    async fn quiz(&self, id: i64) -> Result<Option<Quiz>, AppError>;

    /// Graded questions of the quiz, numbered, in slot order.
    async fn questions(&self, quiz_id: i64) -> Result<Vec<Question>, AppError>;

    async fn feedback_bands(&self, quiz_id: i64) -> Result<Vec<FeedbackBand>, AppError>;

    /// Ids of users enrolled as students.
    async fn enrolled_students(&self, course_id: i64) -> Result<Vec<i64>, AppError>;

    /// The user's role in the course (`student`, `teacher`, ...), `None` when not enrolled.
    async fn enrolment_role(&self, course_id: i64, user_id: i64) -> Result<Option<String>, AppError>;

    async fn course_groups(&self, course_id: i64) -> Result<Vec<Group>, AppError>;

    async fn user_groups(&self, course_id: i64, user_id: i64) -> Result<Vec<Group>, AppError>;

    async fn group_members(&self, group_id: i64) -> Result<Vec<i64>, AppError>;

    /// Non-preview attempts at the quiz, optionally only by the given users.
    async fn count_attempts(&self, quiz_id: i64, users: Option<&[i64]>) -> Result<i64, AppError>;

    async fn count_rows(&self, query: &SqlQuery) -> Result<i64, AppError>;

    async fn fetch_rows(
        &self,
        query: &SqlQuery,
        order_by: &str,
        window: Option<PageWindow>,
    ) -> Result<Vec<AttemptRow>, AppError>;

    async fn responses(&self, usage_ids: &[i64]) -> Result<Vec<QuestionResponse>, AppError>;

    /// `(attempt id, user id)` for those of the given attempts that belong to the quiz.
    async fn attempt_owners(&self, quiz_id: i64, attempt_ids: &[i64]) -> Result<Vec<(i64, i64)>, AppError>;

    /// Deletes the attempts and their question data, returning how many attempts went.
    async fn delete_attempts(&self, quiz_id: i64, attempt_ids: &[i64]) -> Result<u64, AppError>;
}
