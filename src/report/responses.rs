// src/report/responses.rs

//! The quiz responses report: one row per student attempt with grading
//! statistics and, optionally, the response given to every question.

use crate::{
    context::RequestContext,
    error::AppError,
    models::{
        course::{Course, CourseModule, GroupMode},
        quiz::Quiz,
        user::Capability,
    },
    utils::html::{clean_filename, escape},
};

use super::{
    attempts::{AttemptsReport, ReportScope},
    columns::{self, ColumnListBuilder},
    form::{AttemptActions, SettingsForm, render_settings_form},
    grading,
    options::{AttemptsMode, ReportOptions, ReportParams},
    page,
    table::ReportTable,
};

pub const REPORT_NAME: &str = "responses";
const REPORT_TITLE: &str = "Responses";
const FILENAME: &str = "responses";

/// Columns whose values are computed per row and cannot be sorted in SQL.
const UNSORTABLE_COLUMNS: [&str; 9] = [
    "feedbacktext",
    "resp_num",
    "marks",
    "cbm_av",
    "cbm_avchosen",
    "accy",
    "cbm_bonus",
    "cbm_accy",
    "cbm_grade",
];

/// Everything the request supplied to the report.
#[derive(Debug, Clone, Default)]
pub struct ReportInput {
    pub params: ReportParams,
    pub form: Option<SettingsForm>,
    pub actions: AttemptActions,
}

/// `"<report> <course shortname> <quiz name>"` without characters that are
/// illegal in file names.
pub fn download_filename(report: &str, course_shortname: &str, quiz_name: &str) -> String {
    clean_filename(&format!("{} {} {}", report, course_shortname, quiz_name))
}

pub struct ResponsesReport<B> {
    base: B,
}

impl<B: AttemptsReport> ResponsesReport<B> {
    pub fn new(base: B) -> Self {
        Self { base }
    }

    pub async fn display(
        &self,
        ctx: &mut RequestContext,
        quiz: &Quiz,
        cm: &CourseModule,
        course: &Course,
        input: ReportInput,
    ) -> Result<bool, AppError> {
        let mut scope = self
            .base
            .initialize(ctx, REPORT_NAME, quiz, cm, course, input.params.group)
            .await?;

        let mut options = ReportOptions::new(REPORT_NAME, quiz, cm, &ctx.user, &ctx.config);
        options.group = scope.current_group;
        options.process_table_params(&input.params)?;
        match input.form.clone().and_then(SettingsForm::get_data) {
            Some(form) => options.process_settings_from_form(&form),
            None => options.process_settings_from_params(&input.params)?,
        }
        options.resolve_dependencies(quiz, cm, &ctx.user);
        let form_data = options.initial_form_data();

        if options.attempts == AttemptsMode::AllWith {
            // Only reachable by users who can see every group (checked in
            // resolve_dependencies), so the whole quiz is theirs to see.
            scope.allowed.clear();
        }

        let questions = ctx.store.questions(quiz.id).await?;
        let feedback = ctx.store.feedback_bands(quiz.id).await?;
        let qmsubselect = grading::qm_filter_select(quiz, "quiza");
        let url = options.url(&ctx.config.wwwroot)?;

        let mut table = ReportTable::new(
            quiz.clone(),
            options.clone(),
            questions.clone(),
            feedback.clone(),
            url.clone(),
        );
        let filename = download_filename(FILENAME, &course.shortname, &quiz.name);
        if let Some(format) = options.download {
            table.is_downloading_as(format, filename, format!("{} {}", course.shortname, quiz.name));
        }
        if table.is_downloading() {
            ctx.raise_memory_limit();
        }

        let deleted = self
            .process_actions(ctx, quiz, &scope, options.attempts, &input.actions, table.is_downloading())
            .await?;

        if !table.is_downloading() {
            page::print_header_and_tabs(ctx, cm, course, quiz, REPORT_TITLE, &url)?;
            page::print_group_menu(ctx, cm, course, &url, scope.current_group).await?;

            if let Some(summary) = page::num_attempt_summary(ctx, quiz, &scope).await? {
                ctx.echo(&format!("<div class=\"quizattemptcounts\">{}</div>\n", escape(&summary)))?;
            }
            if let Some(count) = deleted {
                ctx.echo(&page::notification(&format!("{} attempt(s) deleted", count), "success"))?;
            }
        }

        let has_questions = !questions.is_empty();
        if !table.is_downloading() {
            if !has_questions {
                ctx.echo(&page::no_questions_message(cm))?;
            } else if scope.students.is_empty() {
                ctx.echo(&page::notification("No students enrolled in this course yet", "info"))?;
            } else if scope.current_group.is_some() && scope.group_students.is_empty() {
                ctx.echo(&page::notification("No students in this group", "info"))?;
            }

            let offer_all_with = scope.current_group.is_none()
                && (cm.group_mode() != GroupMode::Separate || ctx.user.has(Capability::AccessAllGroups));
            ctx.echo(&render_settings_form(&form_data, &url, offer_all_with))?;
        }

        if !(has_questions && (scope.has_students() || options.attempts == AttemptsMode::AllWith)) {
            return Ok(true);
        }

        let base = table.base_sql(qmsubselect.as_deref(), &scope.allowed);
        table.set_count_sql(base.count());
        table.set_sql(base);

        let downloading = table.is_downloading();
        if !downloading {
            ctx.echo(&grading::highlighting_note(quiz, qmsubselect.as_deref(), options.onlygraded))?;
            let scoring = if options.showchosenrs {
                "Scores are computed on chosen responses only"
            } else {
                "Scores reflect the whole quiz"
            };
            ctx.echo(&format!(
                "<div><b>{}</b> &nbsp; <i>Confidence-based marking figures use the marks \
                 1, 2, 3 for right answers and 0, -2, -6 for wrong ones.</i></div>\n",
                scoring
            ))?;
        }

        let mut builder = ColumnListBuilder::new();
        builder.add_if(!downloading && options.checkboxcolumn, "checkbox", None);
        columns::add_user_columns(&mut builder, downloading, &ctx.config.show_user_identity);
        columns::add_time_columns(&mut builder);
        columns::add_grade_columns(&mut builder, quiz, options.usercanseegrades, !feedback.is_empty());
        columns::add_statistics_columns(&mut builder, quiz, options.usercanseegrades, options.showchosenrs);
        if options.showqdata {
            columns::add_response_columns(&mut builder, &questions, downloading, options.showresponses);
        }
        table.define_columns(builder.build());
        table.sortable(true, "uniqueid");

        for column in UNSORTABLE_COLUMNS {
            table.no_sorting(column);
        }
        table.column_class("sumgrades", "bold");
        table.set_attribute("id", "attempts");
        table.collapsible(true);

        table.out(ctx, options.pagesize).await?;
        Ok(true)
    }

    /// Deletes the attempts ticked in the table. Returns the number deleted
    /// when a delete was requested.
    ///
    /// Only attempts of `allowed` users go, except when listing every attempt.
    async fn process_actions(
        &self,
        ctx: &mut RequestContext,
        quiz: &Quiz,
        scope: &ReportScope,
        attempts: AttemptsMode,
        actions: &AttemptActions,
        downloading: bool,
    ) -> Result<Option<u64>, AppError> {
        if downloading || !actions.delete || actions.attempt_ids.is_empty() {
            return Ok(None);
        }
        ctx.user.require(Capability::DeleteAttempts)?;

        let owners = ctx.store.attempt_owners(quiz.id, &actions.attempt_ids).await?;
        let permitted: Vec<i64> = owners
            .into_iter()
            .filter(|(_, user)| attempts == AttemptsMode::AllWith || scope.allowed.contains(user))
            .map(|(attempt, _)| attempt)
            .collect();
        if permitted.is_empty() {
            return Ok(Some(0));
        }

        let deleted = ctx.store.delete_attempts(quiz.id, &permitted).await?;
        tracing::info!(
            quiz_id = quiz.id,
            user_id = ctx.user.id,
            deleted,
            "Deleted quiz attempts from report"
        );
        Ok(Some(deleted))
    }
}
