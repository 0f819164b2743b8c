// tests/report_tests.rs

mod common;

use common::{
    ASSISTANT_ID, MemoryStore, OUTSIDER_ID, STUDENT_A, STUDENT_B, TEACHER_ID, spawn_app,
};
use quizreport::{models::course::Group, report::sql::SqlParam};

const REPORT: &str = "/mod/quiz/report?id=5&mode=responses";

#[tokio::test]
async fn report_requires_login() {
    let app = spawn_app(MemoryStore::sample()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(app.url(REPORT))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn students_cannot_view_the_report() {
    let app = spawn_app(MemoryStore::sample()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(app.url(REPORT))
        .bearer_auth(app.token(STUDENT_A, "student"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn course_role_overrides_the_token_role() {
    let app = spawn_app(MemoryStore::sample()).await;
    let client = reqwest::Client::new();
    // A teacher elsewhere who is a student in this course
    let token = app.token(STUDENT_A, "teacher");

    let response = client
        .get(app.url(REPORT))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = client
        .post(app.url(REPORT))
        .bearer_auth(&token)
        .form(&[("attemptid", "2"), ("delete", "Delete selected attempts")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
    assert!(app.store.deleted().is_empty());
    assert!(app.store.last_query().is_none());
}

#[tokio::test]
async fn teachers_outside_the_course_are_refused() {
    let app = spawn_app(MemoryStore::sample()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(app.url(REPORT))
        .bearer_auth(app.token(OUTSIDER_ID, "teacher"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn unknown_module_or_mode_is_not_found() {
    let app = spawn_app(MemoryStore::sample()).await;
    let client = reqwest::Client::new();
    let token = app.token(TEACHER_ID, "teacher");

    for path in [
        "/mod/quiz/report?id=99",
        // A thesis is not a quiz
        "/mod/quiz/report?id=6",
        "/mod/quiz/report?id=5&mode=overview",
    ] {
        let response = client
            .get(app.url(path))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 404, "{}", path);
    }
}

#[tokio::test]
async fn report_lists_attempts_with_response_columns() {
    let app = spawn_app(MemoryStore::sample()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(app.url(REPORT))
        .bearer_auth(app.token(TEACHER_ID, "teacher"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body = response.text().await.unwrap();

    assert!(body.contains("<title>CS101: Week 1</title>"));
    assert!(body.contains("<h1>Introduction to Computing</h1>"));
    assert!(body.contains("id=\"attempts\""));
    assert!(body.contains(">Response 1<"));
    assert!(body.contains(">Response 2/2.5<"));
    assert!(body.contains("Ada Lovelace"));
    assert!(body.contains("Alan Turing"));
    assert!(body.contains("Attempts: 2"));
    assert!(body.contains("id=\"preferencesform\""));
    // Teachers may delete, so the table is wrapped in a form with checkboxes
    assert!(body.contains("name=\"attemptid\" value=\"1\""));
}

#[tokio::test]
async fn enrolled_modes_restrict_rows_to_students() {
    let app = spawn_app(MemoryStore::sample()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(app.url(REPORT))
        .bearer_auth(app.token(TEACHER_ID, "teacher"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let query = app.store.last_query().expect("report rows were not fetched");
    assert!(query.where_clause.contains("u.id = ANY"));
    assert!(query.params.contains(&SqlParam::IntList(vec![STUDENT_A, STUDENT_B])));
}

#[tokio::test]
async fn download_skips_the_page_and_names_the_file() {
    let app = spawn_app(MemoryStore::sample()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(app.url(&format!("{}&download=csv", REPORT)))
        .bearer_auth(app.token(TEACHER_ID, "teacher"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let disposition = response
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert_eq!(disposition, "attachment; filename=\"responses CS101 Week 1.csv\"");

    let body = response.text().await.unwrap();
    assert!(!body.contains("<html"));
    assert!(!body.contains("preferencesform"));
    assert!(body.contains("Q1"));
    assert!(body.contains("Q2/2.5"));
    assert!(body.contains("Lovelace"));
    // Downloads fetch every row at once
    assert_eq!(*app.store.last_window.lock().unwrap(), None);
}

#[tokio::test]
async fn unknown_download_format_is_rejected() {
    let app = spawn_app(MemoryStore::sample()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(app.url(&format!("{}&download=xls", REPORT)))
        .bearer_auth(app.token(TEACHER_ID, "teacher"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn no_table_without_questions() {
    let mut store = MemoryStore::sample();
    store.questions.clear();
    let app = spawn_app(store).await;
    let client = reqwest::Client::new();

    let body = client
        .get(app.url(REPORT))
        .bearer_auth(app.token(TEACHER_ID, "teacher"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("No questions have been added yet"));
    assert!(!body.contains("id=\"attempts\""));
    assert!(app.store.last_query().is_none());
}

#[tokio::test]
async fn no_table_without_students_unless_listing_all_attempts() {
    let mut store = MemoryStore::sample();
    store.students.clear();
    let app = spawn_app(store).await;
    let client = reqwest::Client::new();
    let token = app.token(TEACHER_ID, "teacher");

    let body = client
        .get(app.url(REPORT))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("No students enrolled in this course yet"));
    assert!(!body.contains("id=\"attempts\""));

    let body = client
        .get(app.url(&format!("{}&attempts=all_with", REPORT)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("id=\"attempts\""));
    let query = app.store.last_query().expect("report rows were not fetched");
    assert!(!query.where_clause.contains("u.id = ANY"));
}

#[tokio::test]
async fn settings_form_changes_the_page_size() {
    let app = spawn_app(MemoryStore::sample()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(app.url(REPORT))
        .bearer_auth(app.token(TEACHER_ID, "teacher"))
        .form(&[
            ("attempts", "enrolled_all"),
            ("statefinished", "1"),
            ("showqdata", "1"),
            ("showresponses", "1"),
            ("pagesize", "1"),
            ("submitbutton", "Show report"),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("<div class=\"paging\">"));
    assert!(body.contains("<option value=\"enrolled_all\" selected>"));

    let window = (*app.store.last_window.lock().unwrap()).expect("page window");
    assert_eq!(window.limit, 1);
    let query = app.store.last_query().unwrap();
    assert!(query.params.contains(&SqlParam::TextList(vec!["finished".to_string()])));
}

#[tokio::test]
async fn delete_is_limited_to_the_current_group() {
    let mut store = MemoryStore::sample();
    store.modules[0].groupmode = 1;
    store.groups.push(Group {
        id: 7,
        courseid: 2,
        name: "Group A".into(),
    });
    store.members.insert(7, vec![STUDENT_A]);
    let app = spawn_app(store).await;
    let client = reqwest::Client::new();

    let response = client
        .post(app.url(&format!("{}&group=7", REPORT)))
        .bearer_auth(app.token(TEACHER_ID, "teacher"))
        .form(&[
            ("attemptid", "1"),
            ("attemptid", "2"),
            ("delete", "Delete selected attempts"),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("1 attempt(s) deleted"));
    assert_eq!(app.store.deleted(), vec![1]);
}

#[tokio::test]
async fn delete_requires_the_capability() {
    let app = spawn_app(MemoryStore::sample()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(app.url(REPORT))
        // The token role does not matter, the course role does
        .bearer_auth(app.token(ASSISTANT_ID, "teacher"))
        .form(&[("attemptid", "1"), ("delete", "Delete selected attempts")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
    assert!(app.store.deleted().is_empty());
}

#[tokio::test]
async fn hidden_quiz_is_for_admins_only() {
    let mut store = MemoryStore::sample();
    store.modules[0].visible = false;
    let app = spawn_app(store).await;
    let client = reqwest::Client::new();

    let response = client
        .get(app.url(REPORT))
        .bearer_auth(app.token(TEACHER_ID, "teacher"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = client
        .get(app.url(REPORT))
        .bearer_auth(app.token(1, "admin"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn delete_without_allowed_students_removes_nothing() {
    let mut store = MemoryStore::sample();
    // Attempts remain from users who are no longer enrolled as students
    store.students.clear();
    let app = spawn_app(store).await;
    let client = reqwest::Client::new();

    let response = client
        .post(app.url(REPORT))
        .bearer_auth(app.token(TEACHER_ID, "teacher"))
        .form(&[
            ("attemptid", "1"),
            ("attemptid", "2"),
            ("delete", "Delete selected attempts"),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("0 attempt(s) deleted"));
    assert!(app.store.deleted().is_empty());
}

#[tokio::test]
async fn delete_listing_all_attempts_is_unrestricted() {
    let mut store = MemoryStore::sample();
    store.students.clear();
    let app = spawn_app(store).await;
    let client = reqwest::Client::new();

    let response = client
        .post(app.url(&format!("{}&attempts=all_with", REPORT)))
        .bearer_auth(app.token(TEACHER_ID, "teacher"))
        .form(&[("attemptid", "2"), ("delete", "Delete selected attempts")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(app.store.deleted(), vec![2]);
}
