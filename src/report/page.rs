// src/report/page.rs

//! Page furniture around the attempts table: heading and tabs, group
//! selector, attempt summary and notices.

use url::Url;

use crate::{
    context::RequestContext,
    error::AppError,
    models::{
        course::{Course, CourseModule, GroupMode},
        quiz::Quiz,
        user::Capability,
    },
    output::PageMeta,
    utils::html::escape,
};

use super::attempts::{ReportScope, available_groups};

pub fn notification(message: &str, kind: &str) -> String {
    format!(
        "<div class=\"alert alert-{}\">{}</div>\n",
        kind,
        escape(message)
    )
}

/// Sets the page metadata and writes the report heading and tabs.
pub fn print_header_and_tabs(
    ctx: &mut RequestContext,
    cm: &CourseModule,
    course: &Course,
    quiz: &Quiz,
    report_title: &str,
    url: &Url,
) -> Result<(), AppError> {
    ctx.page = PageMeta {
        url: url.to_string(),
        title: format!("{}: {}", course.shortname, quiz.name),
        heading: course.fullname.clone(),
    };
    let html = format!(
        "<h2>{}</h2>\n<ul class=\"nav nav-tabs\"><li class=\"active\"><a href=\"{}\">{}</a></li></ul>\n",
        escape(&cm.name),
        escape(url.as_str()),
        escape(report_title)
    );
    ctx.echo(&html)
}

/// Group drop-down for activities in group mode.
pub async fn print_group_menu(
    ctx: &mut RequestContext,
    cm: &CourseModule,
    course: &Course,
    url: &Url,
    current_group: Option<i64>,
) -> Result<(), AppError> {
    let mode = cm.group_mode();
    if mode == GroupMode::None {
        return Ok(());
    }
    let groups = available_groups(ctx, cm, course).await?;
    let restricted = mode == GroupMode::Separate && !ctx.user.has(Capability::AccessAllGroups);

    let mut html = format!(
        "<form class=\"groupselector\" method=\"get\" action=\"{}\">\n",
        escape(url.path())
    );
    for (name, value) in url.query_pairs().filter(|(name, _)| name != "group") {
        html.push_str(&format!(
            "<input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
            escape(&name),
            escape(&value)
        ));
    }
    html.push_str(&format!(
        "<label for=\"selectgroup\">{}</label>\n<select id=\"selectgroup\" name=\"group\">\n",
        mode.label()
    ));
    if !restricted {
        html.push_str(&format!(
            "<option value=\"0\"{}>All participants</option>\n",
            if current_group.is_none() { " selected" } else { "" }
        ));
    }
    for group in &groups {
        html.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>\n",
            group.id,
            if current_group == Some(group.id) { " selected" } else { "" },
            escape(&group.name)
        ));
    }
    html.push_str("</select>\n<input type=\"submit\" value=\"Go\">\n</form>\n");
    ctx.echo(&html)
}

/// "Attempts: N", plus the count for the current group when one is selected.
pub async fn num_attempt_summary(
    ctx: &RequestContext,
    quiz: &Quiz,
    scope: &ReportScope,
) -> Result<Option<String>, AppError> {
    let total = ctx.store.count_attempts(quiz.id, None).await?;
    if total == 0 {
        return Ok(None);
    }
    if scope.current_group.is_some() {
        let in_group = ctx
            .store
            .count_attempts(quiz.id, Some(&scope.group_students))
            .await?;
        return Ok(Some(format!("Attempts: {} ({} from this group)", total, in_group)));
    }
    Ok(Some(format!("Attempts: {}", total)))
}

pub fn no_questions_message(cm: &CourseModule) -> String {
    format!(
        "<div class=\"alert alert-info\">No questions have been added yet. \
         <a href=\"/mod/quiz/edit?cmid={}\">Edit quiz</a></div>\n",
        cm.id
    )
}
