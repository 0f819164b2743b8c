// tests/common/mod.rs

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use quizreport::{
    config::Config,
    db::{PageWindow, ReportStore},
    error::AppError,
    models::{
        attempt::{AttemptRow, QuestionResponse},
        course::{Course, CourseModule, Group},
        quiz::{FeedbackBand, Question, Quiz},
    },
    report::sql::SqlQuery,
    routes,
    state::AppState,
    utils::jwt::sign_jwt,
};

pub const TEACHER_ID: i64 = 100;
pub const ASSISTANT_ID: i64 = 101;
pub const STUDENT_A: i64 = 201;
pub const STUDENT_B: i64 = 202;
pub const OUTSIDER_ID: i64 = 900;

/// In-memory `ReportStore` holding one small course. It records the report
/// queries it is asked to run so tests can inspect them.
#[derive(Default)]
pub struct MemoryStore {
    pub modules: Vec<CourseModule>,
    pub courses: Vec<Course>,
    pub quizzes: Vec<Quiz>,
    pub questions: Vec<Question>,
    pub feedback: Vec<FeedbackBand>,
    pub students: Vec<i64>,
    /// `(course id, user id, role)`
    pub enrolments: Vec<(i64, i64, &'static str)>,
    pub groups: Vec<Group>,
    pub members: HashMap<i64, Vec<i64>>,
    pub rows: Vec<AttemptRow>,
    pub responses: Vec<QuestionResponse>,
    /// `(attempt id, quiz id, user id)`
    pub attempts: Vec<(i64, i64, i64)>,
    pub last_query: Mutex<Option<SqlQuery>>,
    pub last_window: Mutex<Option<PageWindow>>,
    pub deleted: Mutex<Vec<i64>>,
}

impl MemoryStore {
    /// Course CS101 with a two-question quiz (cm 5) and a thesis (cm 6).
    pub fn sample() -> Self {
        let questions = vec![
            Question {
                slot: 1,
                id: 31,
                number: 1,
                maxmark: 1.0,
                qtype: "multichoice".into(),
                name: "Capital".into(),
            },
            Question {
                slot: 2,
                id: 32,
                number: 2,
                maxmark: 2.5,
                qtype: "shortanswer".into(),
                name: "Essay".into(),
            },
        ];

        Self {
            modules: vec![
                CourseModule {
                    id: 5,
                    course: 2,
                    modname: "quiz".into(),
                    instance: 11,
                    name: "Week 1".into(),
                    groupmode: 0,
                    visible: true,
                },
                CourseModule {
                    id: 6,
                    course: 2,
                    modname: "thesis".into(),
                    instance: 1,
                    name: "Final thesis".into(),
                    groupmode: 0,
                    visible: true,
                },
            ],
            courses: vec![Course {
                id: 2,
                shortname: "CS101".into(),
                fullname: "Introduction to Computing".into(),
            }],
            quizzes: vec![Quiz {
                id: 11,
                course: 2,
                name: "Week 1".into(),
                sumgrades: 3.5,
                grade: 10.0,
                grademethod: 1,
                attempts: 0,
                decimalpoints: 2,
                preferredbehaviour: "deferredfeedback".into(),
            }],
            questions,
            students: vec![STUDENT_A, STUDENT_B],
            enrolments: vec![
                (2, TEACHER_ID, "teacher"),
                (2, ASSISTANT_ID, "noneditingteacher"),
                (2, STUDENT_A, "student"),
                (2, STUDENT_B, "student"),
            ],
            rows: vec![
                attempt_row(STUDENT_A, 1, 501, "Ada", "Lovelace", 3.5),
                attempt_row(STUDENT_B, 2, 502, "Alan", "Turing", 1.0),
            ],
            responses: vec![
                response(501, 1, 1.0, 1.0, "Paris"),
                response(501, 2, 2.5, 1.0, "A long essay"),
                response(502, 1, 1.0, 1.0, "Paris"),
                response(502, 2, 2.5, 0.0, "Too short"),
            ],
            attempts: vec![(1, 11, STUDENT_A), (2, 11, STUDENT_B)],
            ..Default::default()
        }
    }

    pub fn last_query(&self) -> Option<SqlQuery> {
        self.last_query.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<i64> {
        self.deleted.lock().unwrap().clone()
    }
}

pub fn attempt_row(
    userid: i64,
    attempt: i64,
    usageid: i64,
    firstname: &str,
    lastname: &str,
    sumgrades: f64,
) -> AttemptRow {
    AttemptRow {
        uniqueid: format!("{}#1", userid),
        usageid: Some(usageid),
        attempt: Some(attempt),
        userid,
        idnumber: Some(format!("S{}", userid)),
        email: None,
        firstname: firstname.into(),
        lastname: lastname.into(),
        state: Some("finished".into()),
        sumgrades: Some(sumgrades),
        timestart: Some(1_700_000_000),
        timefinish: Some(1_700_000_600),
        duration: Some(600),
        gradedattempt: Some(true),
    }
}

pub fn response(usageid: i64, slot: i64, maxmark: f64, fraction: f64, summary: &str) -> QuestionResponse {
    QuestionResponse {
        usageid,
        slot,
        maxmark,
        fraction: Some(fraction),
        certainty: None,
        responsesummary: Some(summary.into()),
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn course_module(&self, id: i64) -> Result<Option<CourseModule>, AppError> {
        Ok(self.modules.iter().find(|m| m.id == id).cloned())
    }

    async fn course(&self, id: i64) -> Result<Option<Course>, AppError> {
        Ok(self.courses.iter().find(|c| c.id == id).cloned())
    }

    async fn quiz(&self, id: i64) -> Result<Option<Quiz>, AppError> {
        Ok(self.quizzes.iter().find(|q| q.id == id).cloned())
    }

    async fn questions(&self, _quiz_id: i64) -> Result<Vec<Question>, AppError> {
        Ok(self.questions.clone())
    }

    async fn feedback_bands(&self, _quiz_id: i64) -> Result<Vec<FeedbackBand>, AppError> {
        Ok(self.feedback.clone())
    }

    async fn enrolled_students(&self, _course_id: i64) -> Result<Vec<i64>, AppError> {
        Ok(self.students.clone())
    }

    async fn enrolment_role(&self, course_id: i64, user_id: i64) -> Result<Option<String>, AppError> {
        Ok(self
            .enrolments
            .iter()
            .find(|(course, user, _)| *course == course_id && *user == user_id)
            .map(|(_, _, role)| role.to_string()))
    }

    async fn course_groups(&self, course_id: i64) -> Result<Vec<Group>, AppError> {
        Ok(self
            .groups
            .iter()
            .filter(|g| g.courseid == course_id)
            .cloned()
            .collect())
    }

    async fn user_groups(&self, course_id: i64, user_id: i64) -> Result<Vec<Group>, AppError> {
        Ok(self
            .groups
            .iter()
            .filter(|g| g.courseid == course_id)
            .filter(|g| self.members.get(&g.id).is_some_and(|m| m.contains(&user_id)))
            .cloned()
            .collect())
    }

    async fn group_members(&self, group_id: i64) -> Result<Vec<i64>, AppError> {
        Ok(self.members.get(&group_id).cloned().unwrap_or_default())
    }

    async fn count_attempts(&self, quiz_id: i64, users: Option<&[i64]>) -> Result<i64, AppError> {
        Ok(self
            .attempts
            .iter()
            .filter(|(_, quiz, user)| *quiz == quiz_id && users.is_none_or(|u| u.contains(user)))
            .count() as i64)
    }

    async fn count_rows(&self, query: &SqlQuery) -> Result<i64, AppError> {
        assert!(query.fields.starts_with("COUNT("));
        Ok(self.rows.len() as i64)
    }

    async fn fetch_rows(
        &self,
        query: &SqlQuery,
        _order_by: &str,
        window: Option<PageWindow>,
    ) -> Result<Vec<AttemptRow>, AppError> {
        *self.last_query.lock().unwrap() = Some(query.clone());
        *self.last_window.lock().unwrap() = window;
        let rows = match window {
            Some(w) => self
                .rows
                .iter()
                .skip(w.offset as usize)
                .take(w.limit as usize)
                .cloned()
                .collect(),
            None => self.rows.clone(),
        };
        Ok(rows)
    }

    async fn responses(&self, usage_ids: &[i64]) -> Result<Vec<QuestionResponse>, AppError> {
        Ok(self
            .responses
            .iter()
            .filter(|r| usage_ids.contains(&r.usageid))
            .cloned()
            .collect())
    }

    async fn attempt_owners(&self, quiz_id: i64, attempt_ids: &[i64]) -> Result<Vec<(i64, i64)>, AppError> {
        Ok(self
            .attempts
            .iter()
            .filter(|(id, quiz, _)| *quiz == quiz_id && attempt_ids.contains(id))
            .map(|(id, _, user)| (*id, *user))
            .collect())
    }

    async fn delete_attempts(&self, _quiz_id: i64, attempt_ids: &[i64]) -> Result<u64, AppError> {
        self.deleted.lock().unwrap().extend_from_slice(attempt_ids);
        Ok(attempt_ids.len() as u64)
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: String::new(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        rust_log: "error".to_string(),
        wwwroot: "http://127.0.0.1".to_string(),
        listen_addr: "127.0.0.1:0".to_string(),
        default_page_size: 30,
        page_memory_limit: 1024 * 1024,
        export_memory_limit: 16 * 1024 * 1024,
        show_user_identity: vec!["idnumber".to_string()],
    }
}

pub struct TestApp {
    pub address: String,
    pub store: Arc<MemoryStore>,
    pub config: Config,
}

impl TestApp {
    pub fn token(&self, user_id: i64, role: &str) -> String {
        sign_jwt(user_id, role, &self.config.jwt_secret, 600).expect("Failed to sign token")
    }

    pub fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.address, path_and_query)
    }
}

/// Spawns the app on a random port with the given store.
pub async fn spawn_app(store: MemoryStore) -> TestApp {
    let store = Arc::new(store);
    let config = test_config();

    let state = AppState {
        store: store.clone(),
        config: config.clone(),
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        store,
        config,
    }
}
