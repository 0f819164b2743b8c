// src/handlers/report.rs

use axum::{
    Extension, Form,
    extract::{Query, State},
    response::Response,
};

use crate::{
    context::{RequestContext, require_course_login},
    error::AppError,
    models::user::{Capability, CurrentUser},
    report::{
        attempts::GroupScopedAttempts,
        form::{AttemptActions, SettingsForm},
        options::ReportParams,
        responses::{REPORT_NAME, ReportInput, ResponsesReport},
    },
    state::AppState,
};

const MODULE_NAME: &str = "quiz";

/// Handler: Render or download the quiz responses report.
///
/// * Method: `GET`
/// * Path: `/mod/quiz/report?id=<cmid>&mode=responses`
/// * Auth: Required (ViewReports)
pub async fn show_report(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<ReportParams>,
) -> Result<Response, AppError> {
    let input = ReportInput {
        params,
        ..Default::default()
    };
    run_report(state, user, input).await
}

/// Handler: Apply the settings form or delete ticked attempts, then render.
///
/// * Method: `POST`
/// * Path: `/mod/quiz/report?id=<cmid>&mode=responses`
/// * Body: url-encoded form; `attemptid` may repeat.
pub async fn submit_report(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<ReportParams>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let input = ReportInput {
        params,
        form: SettingsForm::from_pairs(&pairs),
        actions: AttemptActions::from_pairs(&pairs),
    };
    run_report(state, user, input).await
}

async fn run_report(
    state: AppState,
    user: CurrentUser,
    input: ReportInput,
) -> Result<Response, AppError> {
    let store = state.store.clone();
    let cmid = input.params.id;

    let cm = store
        .course_module(cmid)
        .await?
        .filter(|cm| cm.modname == MODULE_NAME)
        .ok_or_else(|| AppError::NotFound("Course module not found".to_string()))?;
    let course = store
        .course(cm.course)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;
    let quiz = store
        .quiz(cm.instance)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

    let user = require_course_login(store.as_ref(), &user, &course, &cm).await?;
    user.require(Capability::ViewReports)?;

    let mode = input.params.mode.as_deref().unwrap_or(REPORT_NAME);
    if mode != REPORT_NAME {
        return Err(AppError::NotFound(format!("Report not found: {}", mode)));
    }

    let mut ctx = RequestContext::new(store, user, state.config.clone());
    ResponsesReport::new(GroupScopedAttempts)
        .display(&mut ctx, &quiz, &cm, &course, input)
        .await?;

    tracing::info!(
        cmid,
        quiz_id = quiz.id,
        user_id = ctx.user.id,
        download = ctx.output.download().is_some(),
        "Responses report rendered"
    );
    Ok(ctx.into_response())
}
