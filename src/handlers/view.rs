// src/handlers/view.rs

use axum::{
    Extension,
    extract::{Query, State},
    response::Response,
};
use serde::Deserialize;

use crate::{
    context::{RequestContext, require_course_login},
    error::AppError,
    models::user::CurrentUser,
    output::PageMeta,
    state::AppState,
};

const MODULE_NAME: &str = "thesis";

#[derive(Debug, Deserialize)]
pub struct ViewParams {
    /// Course module id.
    pub id: i64,
}

/// Handler: View page of a thesis activity.
///
/// * Method: `GET`
/// * Path: `/mod/thesis/view?id=<cmid>`
/// * Auth: Required (enrolled in the course)
///
/// Only sets up the page; there is no body yet.
pub async fn view_module(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<ViewParams>,
) -> Result<Response, AppError> {
    let store = state.store.clone();

    let cm = store
        .course_module(params.id)
        .await?
        .filter(|cm| cm.modname == MODULE_NAME)
        .ok_or_else(|| AppError::NotFound("Course module not found".to_string()))?;
    let course = store
        .course(cm.course)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

    let user = require_course_login(store.as_ref(), &user, &course, &cm).await?;

    let mut ctx = RequestContext::new(store, user, state.config.clone());
    ctx.page = PageMeta {
        url: format!("/mod/{}/view.php?id={}", MODULE_NAME, cm.id),
        title: cm.name.clone(),
        heading: course.fullname.clone(),
    };
    Ok(ctx.into_response())
}
