// src/context.rs

use std::sync::Arc;

use axum::response::Response;

use crate::{
    config::Config,
    db::ReportStore,
    error::AppError,
    models::{
        course::{Course, CourseModule},
        user::CurrentUser,
    },
    output::{OutputSink, PageMeta},
};

/// Everything a page handler needs for one request: database access, the
/// current user, configuration and the output being produced.
pub struct RequestContext {
    pub store: Arc<dyn ReportStore>,
    pub user: CurrentUser,
    pub config: Config,
    pub page: PageMeta,
    pub output: OutputSink,
}

impl RequestContext {
    pub fn new(store: Arc<dyn ReportStore>, user: CurrentUser, config: Config) -> Self {
        let output = OutputSink::new(config.page_memory_limit);
        Self {
            store,
            user,
            config,
            page: PageMeta::default(),
            output,
        }
    }

    pub fn echo(&mut self, html: &str) -> Result<(), AppError> {
        self.output.write(html)
    }

    /// One-time raise to the export ceiling before a full in-memory download.
    pub fn raise_memory_limit(&mut self) {
        self.output.raise_memory_limit(self.config.export_memory_limit);
    }

    pub fn into_response(self) -> Response {
        self.output.into_response(&self.page)
    }
}

/// Course-level login check: the user must be enrolled in the course or be
/// an administrator. Hidden modules are for administrators only.
///
/// Returns the user with the capabilities of their role in this course.
pub async fn require_course_login(
    store: &dyn ReportStore,
    user: &CurrentUser,
    course: &Course,
    cm: &CourseModule,
) -> Result<CurrentUser, AppError> {
    if user.is_admin() {
        return Ok(user.clone());
    }
    if !cm.visible {
        return Err(AppError::Forbidden("This activity is hidden".to_string()));
    }
    let role = store
        .enrolment_role(course.id, user.id)
        .await?
        .ok_or_else(|| AppError::Forbidden("You are not enrolled in this course".to_string()))?;
    Ok(user.in_course(&role))
}
