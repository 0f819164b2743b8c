// src/db/postgres.rs

use async_trait::async_trait;
use sqlx::{Arguments, PgPool, postgres::PgArguments};

use crate::{
    error::AppError,
    models::{
        attempt::{AttemptRow, QuestionResponse},
        course::{Course, CourseModule, Group},
        quiz::{FeedbackBand, Question, Quiz, QuizSlot, significant_questions},
    },
    report::sql::{SqlParam, SqlQuery},
};

use super::{PageWindow, ReportStore};

/// `ReportStore` backed by Postgres.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn arguments(params: &[SqlParam]) -> Result<PgArguments, AppError> {
    let mut args = PgArguments::default();
    for param in params {
        let added = match param {
            SqlParam::Int(v) => args.add(*v),
            SqlParam::IntList(v) => args.add(v.clone()),
            SqlParam::Text(v) => args.add(v.clone()),
            SqlParam::TextList(v) => args.add(v.clone()),
        };
        added.map_err(|e| AppError::InternalServerError(format!("Failed to bind parameter: {}", e)))?;
    }
    Ok(args)
}

#[async_trait]
impl ReportStore for PgStore {
    async fn course_module(&self, id: i64) -> Result<Option<CourseModule>, AppError> {
        let cm = sqlx::query_as::<_, CourseModule>(
            "SELECT id, course, modname, instance, name, groupmode, visible
             FROM course_modules WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(cm)
    }

    async fn course(&self, id: i64) -> Result<Option<Course>, AppError> {
        let course = sqlx::query_as::<_, Course>(
            "SELECT id, shortname, fullname FROM courses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(course)
    }

    async fn quiz(&self, id: i64) -> Result<Option<Quiz>, AppError> {
        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            SELECT id, course, name, sumgrades, grade, grademethod, attempts,
                   decimalpoints, preferredbehaviour
            FROM quizzes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(quiz)
    }

    async fn questions(&self, quiz_id: i64) -> Result<Vec<Question>, AppError> {
        let slots = sqlx::query_as::<_, QuizSlot>(
            r#"
            SELECT s.slot, s.questionid, s.maxmark, q.qtype, q.name
            FROM quiz_slots s
            JOIN questions q ON q.id = s.questionid
            WHERE s.quizid = $1
            ORDER BY s.slot
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load quiz questions: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;
        Ok(significant_questions(slots))
    }

    async fn feedback_bands(&self, quiz_id: i64) -> Result<Vec<FeedbackBand>, AppError> {
        let bands = sqlx::query_as::<_, FeedbackBand>(
            "SELECT feedbacktext, mingrade, maxgrade FROM quiz_feedback
             WHERE quizid = $1 ORDER BY mingrade",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(bands)
    }

    async fn enrolled_students(&self, course_id: i64) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT userid FROM enrolments WHERE courseid = $1 AND role = 'student' ORDER BY userid",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn enrolment_role(&self, course_id: i64, user_id: i64) -> Result<Option<String>, AppError> {
        let role = sqlx::query_scalar::<_, String>(
            "SELECT role FROM enrolments WHERE courseid = $1 AND userid = $2",
        )
        .bind(course_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn course_groups(&self, course_id: i64) -> Result<Vec<Group>, AppError> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT id, courseid, name FROM groups WHERE courseid = $1 ORDER BY name",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn user_groups(&self, course_id: i64, user_id: i64) -> Result<Vec<Group>, AppError> {
        let groups = sqlx::query_as::<_, Group>(
            r#"
            SELECT g.id, g.courseid, g.name
            FROM groups g
            JOIN groups_members m ON m.groupid = g.id
            WHERE g.courseid = $1 AND m.userid = $2
            ORDER BY g.name
            "#,
        )
        .bind(course_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn group_members(&self, group_id: i64) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT userid FROM groups_members WHERE groupid = $1 ORDER BY userid",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn count_attempts(&self, quiz_id: i64, users: Option<&[i64]>) -> Result<i64, AppError> {
        let count = match users {
            Some(users) => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(1) FROM quiz_attempts
                     WHERE quiz = $1 AND preview = FALSE AND userid = ANY($2)",
                )
                .bind(quiz_id)
                .bind(users.to_vec())
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(1) FROM quiz_attempts WHERE quiz = $1 AND preview = FALSE",
                )
                .bind(quiz_id)
                .fetch_one(&self.pool)
                .await?
            }
        };
        Ok(count)
    }

    async fn count_rows(&self, query: &SqlQuery) -> Result<i64, AppError> {
        let sql = query.select();
        let count = sqlx::query_scalar_with::<_, i64, _>(&sql, arguments(&query.params)?)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count report rows: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;
        Ok(count)
    }

    async fn fetch_rows(
        &self,
        query: &SqlQuery,
        order_by: &str,
        window: Option<PageWindow>,
    ) -> Result<Vec<AttemptRow>, AppError> {
        let mut params = query.params.clone();
        let mut sql = format!("{} ORDER BY {}", query.select(), order_by);
        if let Some(window) = window {
            params.push(SqlParam::Int(window.limit));
            params.push(SqlParam::Int(window.offset));
            sql.push_str(&format!(" LIMIT ${} OFFSET ${}", params.len() - 1, params.len()));
        }

        let rows = sqlx::query_as_with::<_, AttemptRow, _>(&sql, arguments(&params)?)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch report rows: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;
        Ok(rows)
    }

    async fn responses(&self, usage_ids: &[i64]) -> Result<Vec<QuestionResponse>, AppError> {
        if usage_ids.is_empty() {
            return Ok(Vec::new());
        }
        let responses = sqlx::query_as::<_, QuestionResponse>(
            r#"
            SELECT questionusageid AS usageid, slot, maxmark, fraction, certainty, responsesummary
            FROM question_attempts
            WHERE questionusageid = ANY($1)
            "#,
        )
        .bind(usage_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(responses)
    }

    async fn attempt_owners(&self, quiz_id: i64, attempt_ids: &[i64]) -> Result<Vec<(i64, i64)>, AppError> {
        let owners = sqlx::query_as::<_, (i64, i64)>(
            "SELECT id, userid FROM quiz_attempts WHERE quiz = $1 AND id = ANY($2)",
        )
        .bind(quiz_id)
        .bind(attempt_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(owners)
    }

    async fn delete_attempts(&self, quiz_id: i64, attempt_ids: &[i64]) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM question_attempts
            WHERE questionusageid IN (
                SELECT uniqueid FROM quiz_attempts WHERE quiz = $1 AND id = ANY($2)
            )
            "#,
        )
        .bind(quiz_id)
        .bind(attempt_ids.to_vec())
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM quiz_attempts WHERE quiz = $1 AND id = ANY($2)")
            .bind(quiz_id)
            .bind(attempt_ids.to_vec())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted)
    }
}
