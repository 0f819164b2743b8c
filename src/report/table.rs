// src/report/table.rs

//! Sortable, paginated report table.
//!
//! The report defines columns and a SQL fragment; the table works out the
//! ordering, fetches one page (or everything when downloading) and writes
//! either HTML or an export file to the request output.

use std::collections::{HashMap, HashSet};

use chrono::DateTime;
use url::Url;

use crate::{
    context::RequestContext,
    db::PageWindow,
    error::AppError,
    models::{
        attempt::{AttemptRow, AttemptState, QuestionResponse},
        quiz::{FeedbackBand, Question, Quiz, feedback_for},
    },
    output::DownloadMeta,
    utils::html::escape,
};

use super::{
    columns::{Column, response_slot},
    export,
    options::{DownloadFormat, ReportOptions, SortSpec},
    sql::{self, SqlQuery},
    stats::{self, AttemptStats},
};

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSetup {
    pub format: DownloadFormat,
    pub filename: String,
    pub sheettitle: String,
}

/// Data for one rendered row.
struct RowData<'a> {
    row: &'a AttemptRow,
    responses: HashMap<i64, &'a QuestionResponse>,
    stats: Option<AttemptStats>,
}

pub struct ReportTable {
    quiz: Quiz,
    options: ReportOptions,
    questions: Vec<Question>,
    feedback: Vec<FeedbackBand>,
    baseurl: Url,
    columns: Vec<Column>,
    sql: Option<SqlQuery>,
    count_sql: Option<SqlQuery>,
    sortable: bool,
    default_sort: Option<String>,
    no_sorting: HashSet<String>,
    column_classes: HashMap<String, String>,
    attributes: Vec<(String, String)>,
    collapsible: bool,
    download: Option<DownloadSetup>,
}

impl ReportTable {
    pub fn new(
        quiz: Quiz,
        options: ReportOptions,
        questions: Vec<Question>,
        feedback: Vec<FeedbackBand>,
        baseurl: Url,
    ) -> Self {
        Self {
            quiz,
            options,
            questions,
            feedback,
            baseurl,
            columns: Vec::new(),
            sql: None,
            count_sql: None,
            sortable: false,
            default_sort: None,
            no_sorting: HashSet::new(),
            column_classes: HashMap::new(),
            attributes: Vec::new(),
            collapsible: false,
            download: None,
        }
    }

    /// Puts the table into downloading mode.
    pub fn is_downloading_as(&mut self, format: DownloadFormat, filename: String, sheettitle: String) {
        self.download = Some(DownloadSetup {
            format,
            filename,
            sheettitle,
        });
    }

    pub fn is_downloading(&self) -> bool {
        self.download.is_some()
    }

    pub fn download(&self) -> Option<&DownloadSetup> {
        self.download.as_ref()
    }

    pub fn base_sql(&self, qmsubselect: Option<&str>, allowed: &[i64]) -> SqlQuery {
        sql::base_sql(&self.quiz, &self.options, qmsubselect, allowed)
    }

    pub fn set_count_sql(&mut self, query: SqlQuery) {
        self.count_sql = Some(query);
    }

    pub fn set_sql(&mut self, query: SqlQuery) {
        self.sql = Some(query);
    }

    pub fn sql(&self) -> Option<&SqlQuery> {
        self.sql.as_ref()
    }

    pub fn define_columns(&mut self, columns: Vec<Column>) {
        self.columns = columns;
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.header.clone().unwrap_or_default())
            .collect()
    }

    pub fn sortable(&mut self, enabled: bool, default_column: &str) {
        self.sortable = enabled;
        self.default_sort = Some(default_column.to_string());
    }

    pub fn no_sorting(&mut self, column: &str) {
        self.no_sorting.insert(column.to_string());
    }

    pub fn is_sortable(&self, column: &str) -> bool {
        self.sortable
            && !self.no_sorting.contains(column)
            && self.columns.iter().any(|c| c.key == column)
            && sort_expression(column).is_some()
    }

    pub fn column_class(&mut self, column: &str, class: &str) {
        self.column_classes.insert(column.to_string(), class.to_string());
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.retain(|(n, _)| n != name);
        self.attributes.push((name.to_string(), value.to_string()));
    }

    pub fn collapsible(&mut self, enabled: bool) {
        self.collapsible = enabled;
    }

    /// The sort in effect: the requested column if it may be sorted,
    /// otherwise the default ascending.
    pub fn current_sort(&self) -> Option<SortSpec> {
        if let Some(sort) = &self.options.sort {
            if self.is_sortable(&sort.column) {
                return Some(sort.clone());
            }
        }
        self.default_sort.as_ref().map(|column| SortSpec {
            column: column.clone(),
            descending: false,
        })
    }

    /// ORDER BY clause for the current sort, always ending in a stable tiebreak.
    pub fn order_by(&self) -> String {
        let tiebreak = "u.id ASC, quiza.attempt ASC";
        let Some(sort) = self.current_sort() else {
            return tiebreak.to_string();
        };
        let Some(expression) = sort_expression(&sort.column) else {
            return tiebreak.to_string();
        };
        let direction = if sort.descending { "DESC" } else { "ASC" };
        let mut terms: Vec<String> = expression
            .iter()
            .map(|e| format!("{} {}", e, direction))
            .collect();
        if sort.column != "uniqueid" {
            terms.push(tiebreak.to_string());
        }
        terms.join(", ")
    }

    /// Writes the table (one page) or, when downloading, the whole export.
    pub async fn out(&self, ctx: &mut RequestContext, pagesize: u32) -> Result<(), AppError> {
        let sql = self
            .sql
            .as_ref()
            .ok_or_else(|| AppError::InternalServerError("Report table has no SQL".to_string()))?;
        let order_by = self.order_by();

        if let Some(download) = &self.download {
            let rows = ctx.store.fetch_rows(sql, &order_by, None).await?;
            let responses = load_responses(ctx, &rows).await?;
            tracing::info!(rows = rows.len(), format = download.format.as_str(), "Exporting report");

            let cells: Vec<Vec<String>> = rows
                .iter()
                .map(|row| {
                    let data = self.row_data(row, &responses);
                    self.columns.iter().map(|c| self.cell_text(&c.key, &data)).collect()
                })
                .collect();
            let body = export::render(download.format, &download.sheettitle, &self.headers(), &cells)?;

            ctx.output.begin_download(DownloadMeta {
                format: download.format,
                filename: download.filename.clone(),
            });
            return ctx.echo(&body);
        }

        let total = match &self.count_sql {
            Some(count) => ctx.store.count_rows(count).await?,
            None => ctx.store.count_rows(&sql.count()).await?,
        };
        let pagesize = i64::from(pagesize.max(1));
        let pages = (total + pagesize - 1) / pagesize;
        let page = i64::from(self.options.page).min((pages - 1).max(0));

        let rows = ctx
            .store
            .fetch_rows(
                sql,
                &order_by,
                Some(PageWindow {
                    offset: page * pagesize,
                    limit: pagesize,
                }),
            )
            .await?;
        let responses = load_responses(ctx, &rows).await?;

        let html = self.render_html(&rows, &responses, page, pages);
        ctx.echo(&html)
    }

    fn row_data<'a>(
        &self,
        row: &'a AttemptRow,
        responses: &'a HashMap<i64, Vec<QuestionResponse>>,
    ) -> RowData<'a> {
        let responses: HashMap<i64, &QuestionResponse> = row
            .usageid
            .and_then(|usage| responses.get(&usage))
            .map(|list| list.iter().map(|r| (r.slot, r)).collect())
            .unwrap_or_default();
        let stats = row
            .attempt
            .map(|_| stats::summarise(&self.questions, &responses, self.options.showchosenrs));
        RowData {
            row,
            responses,
            stats,
        }
    }

    fn sort_link(&self, column: &str) -> Url {
        let descending = match self.current_sort() {
            Some(sort) if sort.column == column => !sort.descending,
            _ => false,
        };
        let mut url = self.baseurl.clone();
        url.query_pairs_mut()
            .append_pair("tsort", column)
            .append_pair("tdir", if descending { "desc" } else { "asc" });
        url
    }

    fn page_link(&self, page: i64) -> Url {
        let mut url = self.baseurl.clone();
        {
            let mut query = url.query_pairs_mut();
            if let Some(sort) = &self.options.sort {
                query
                    .append_pair("tsort", &sort.column)
                    .append_pair("tdir", if sort.descending { "desc" } else { "asc" });
            }
            query.append_pair("page", &page.to_string());
        }
        url
    }

    fn has_checkbox(&self) -> bool {
        self.columns.iter().any(|c| c.key == "checkbox")
    }

    fn class_of(&self, column: &str) -> &str {
        self.column_classes.get(column).map(String::as_str).unwrap_or("")
    }

    fn render_html(
        &self,
        rows: &[AttemptRow],
        responses: &HashMap<i64, Vec<QuestionResponse>>,
        page: i64,
        pages: i64,
    ) -> String {
        let mut html = String::new();

        if self.has_checkbox() {
            html.push_str(&format!(
                "<form id=\"attemptsform\" method=\"post\" action=\"{}\">\n",
                escape(self.baseurl.as_str())
            ));
        }

        let mut classes = vec!["generaltable", "flexible"];
        if self.collapsible {
            classes.push("collapsible");
        }
        html.push_str(&format!("<table class=\"{}\"", classes.join(" ")));
        for (name, value) in &self.attributes {
            html.push_str(&format!(" {}=\"{}\"", escape(name), escape(value)));
        }
        html.push_str(">\n<thead><tr>");

        for (index, column) in self.columns.iter().enumerate() {
            let header = escape(column.header.as_deref().unwrap_or(""));
            let content = if self.is_sortable(&column.key) {
                format!("<a href=\"{}\">{}</a>", escape(self.sort_link(&column.key).as_str()), header)
            } else {
                header
            };
            html.push_str(&format!(
                "<th class=\"header c{} {}\" scope=\"col\">{}</th>",
                index,
                self.class_of(&column.key),
                content
            ));
        }
        html.push_str("</tr></thead>\n<tbody>\n");

        if rows.is_empty() {
            html.push_str(&format!(
                "<tr><td class=\"empty\" colspan=\"{}\">Nothing to display</td></tr>\n",
                self.columns.len()
            ));
        }

        for row in rows {
            let data = self.row_data(row, responses);
            let class = if row.gradedattempt == Some(true) { " class=\"gradedattempt\"" } else { "" };
            html.push_str(&format!("<tr{}>", class));
            for (index, column) in self.columns.iter().enumerate() {
                html.push_str(&format!(
                    "<td class=\"cell c{} {}\">{}</td>",
                    index,
                    self.class_of(&column.key),
                    self.cell_html(&column.key, &data)
                ));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody>\n</table>\n");

        if pages > 1 {
            html.push_str("<div class=\"paging\">Page:");
            for p in 0..pages {
                if p == page {
                    html.push_str(&format!(" <strong>{}</strong>", p + 1));
                } else {
                    html.push_str(&format!(
                        " <a href=\"{}\">{}</a>",
                        escape(self.page_link(p).as_str()),
                        p + 1
                    ));
                }
            }
            html.push_str("</div>\n");
        }

        if self.has_checkbox() {
            html.push_str(
                "<div id=\"commands\">\
                 <a href=\"#\" id=\"checkattempts\">Select all</a> / \
                 <a href=\"#\" id=\"uncheckattempts\">Deselect all</a> \
                 <input type=\"submit\" name=\"delete\" value=\"Delete selected attempts\">\
                 </div>\n</form>\n",
            );
        }

        html.push_str(&self.download_selector());
        html
    }

    fn download_selector(&self) -> String {
        let mut html = format!(
            "<form class=\"dataformatselector\" method=\"get\" action=\"{}{}\">\n",
            escape(&self.baseurl.origin().ascii_serialization()),
            escape(self.baseurl.path())
        );
        for (name, value) in self.baseurl.query_pairs() {
            html.push_str(&format!(
                "<input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
                escape(&name),
                escape(&value)
            ));
        }
        html.push_str("<label for=\"downloadtype_download\">Download table data as</label>\n<select id=\"downloadtype_download\" name=\"download\">\n");
        for format in DownloadFormat::ALL {
            html.push_str(&format!(
                "<option value=\"{}\">{}</option>\n",
                format.as_str(),
                format.label()
            ));
        }
        html.push_str("</select>\n<input type=\"submit\" value=\"Download\">\n</form>\n");
        html
    }

    fn grade(&self, row: &AttemptRow) -> Option<f64> {
        if row.attempt_state() != Some(AttemptState::Finished) {
            return None;
        }
        row.sumgrades.and_then(|s| self.quiz.rescale_grade(s))
    }

    /// Plain-text value of a cell, as exported.
    fn cell_text(&self, column: &str, data: &RowData<'_>) -> String {
        let row = data.row;
        let finished = row.attempt_state() == Some(AttemptState::Finished);

        match column {
            "checkbox" => row.attempt.map(|a| a.to_string()).unwrap_or_default(),
            "fullname" => row.fullname(),
            "firstname" => row.firstname.clone(),
            "lastname" => row.lastname.clone(),
            "idnumber" => row.idnumber.clone().unwrap_or_default(),
            "email" => row.email.clone().unwrap_or_default(),
            "state" => row
                .attempt_state()
                .map(|s| s.label().to_string())
                .unwrap_or_else(|| "-".to_string()),
            "timestart" => row.timestart.map(format_timestamp).unwrap_or_else(|| "-".to_string()),
            "timefinish" => match row.timefinish {
                Some(t) if finished => format_timestamp(t),
                _ => "-".to_string(),
            },
            "duration" => match row.duration {
                Some(d) if finished => format_duration(d),
                _ => "-".to_string(),
            },
            "sumgrades" => {
                if row.attempt.is_none() || !finished {
                    "-".to_string()
                } else {
                    match self.grade(row) {
                        Some(grade) => self.quiz.format_grade(grade),
                        None => "Requires grading".to_string(),
                    }
                }
            }
            "feedbacktext" => self
                .grade(row)
                .and_then(|g| feedback_for(&self.feedback, g))
                .unwrap_or_default()
                .to_string(),
            key => {
                if let Some(slot) = response_slot(key) {
                    if row.attempt.is_none() {
                        return String::new();
                    }
                    return data
                        .responses
                        .get(&slot)
                        .and_then(|r| r.responsesummary.clone())
                        .filter(|s| !s.trim().is_empty())
                        .unwrap_or_else(|| "-".to_string());
                }
                match &data.stats {
                    Some(stats) => format_stat(key, stats),
                    None => "-".to_string(),
                }
            }
        }
    }

    /// Cell markup for the on-screen table.
    fn cell_html(&self, column: &str, data: &RowData<'_>) -> String {
        let row = data.row;
        match column {
            "checkbox" => row
                .attempt
                .map(|a| format!("<input type=\"checkbox\" name=\"attemptid\" value=\"{}\">", a))
                .unwrap_or_default(),
            "fullname" => {
                let mut html = format!(
                    "<a href=\"/user/view?id={}\">{}</a>",
                    row.userid,
                    escape(&row.fullname())
                );
                if let Some(attempt) = row.attempt {
                    html.push_str(&format!(
                        "<br><a class=\"reviewlink\" href=\"/mod/quiz/review?attempt={}\">Review attempt</a>",
                        attempt
                    ));
                }
                html
            }
            key => {
                let text = escape(&self.cell_text(key, data));
                match response_slot(key).and_then(|slot| data.responses.get(&slot)) {
                    Some(response) => format!(
                        "<span class=\"{}\">{}</span>",
                        correctness_class(response),
                        text
                    ),
                    None => text,
                }
            }
        }
    }
}

/// SQL expressions to order by for a sortable column key.
fn sort_expression(column: &str) -> Option<Vec<String>> {
    let fixed = |parts: &[&str]| -> Option<Vec<String>> {
        Some(parts.iter().map(|p| p.to_string()).collect())
    };
    match column {
        "uniqueid" => fixed(&["u.id", "quiza.attempt"]),
        "fullname" => fixed(&["u.lastname", "u.firstname"]),
        "lastname" => fixed(&["u.lastname"]),
        "firstname" => fixed(&["u.firstname"]),
        "idnumber" => fixed(&["u.idnumber"]),
        "email" => fixed(&["u.email"]),
        "state" => fixed(&["quiza.state"]),
        "timestart" => fixed(&["quiza.timestart"]),
        "timefinish" => fixed(&["timefinish"]),
        "duration" => fixed(&["duration"]),
        "sumgrades" => fixed(&["quiza.sumgrades"]),
        key => response_slot(key).map(|slot| {
            vec![format!(
                "(SELECT qa.responsesummary FROM question_attempts qa \
                 WHERE qa.questionusageid = quiza.uniqueid AND qa.slot = {})",
                slot
            )]
        }),
    }
}

async fn load_responses(
    ctx: &RequestContext,
    rows: &[AttemptRow],
) -> Result<HashMap<i64, Vec<QuestionResponse>>, AppError> {
    let usage_ids: Vec<i64> = rows.iter().filter_map(|r| r.usageid).collect();
    let mut by_usage: HashMap<i64, Vec<QuestionResponse>> = HashMap::new();
    for response in ctx.store.responses(&usage_ids).await? {
        by_usage.entry(response.usageid).or_default().push(response);
    }
    Ok(by_usage)
}

fn correctness_class(response: &QuestionResponse) -> &'static str {
    if !response.is_answered() {
        return "notanswered";
    }
    match response.fraction {
        Some(f) if f >= 0.999_999 => "correct",
        Some(f) if f > 0.0 => "partiallycorrect",
        Some(_) => "incorrect",
        None => "requiresgrading",
    }
}

fn format_stat(column: &str, stats: &AttemptStats) -> String {
    match column {
        "resp_num" => stats.responses.to_string(),
        "marks" => format!("{:.2}/{:.2}", stats.marks, stats.max_marks),
        "accy" => format!("{:.1}%", stats.accuracy * 100.0),
        "cbm_av" => format!("{:.2}", stats.cbm_average),
        "cbm_avchosen" => format!("{:.2}", stats.cbm_average_chosen),
        "cbm_bonus" => format!("{:+.1}%", stats.cbm_bonus * 100.0),
        "cbm_accy" => format!("{:.1}%", stats.cbm_accuracy * 100.0),
        "cbm_grade" => format!("{:.1}%", stats.cbm_grade * 100.0),
        _ => String::new(),
    }
}

fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|t| t.format("%-d %B %Y, %-I:%M %p").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn plural(value: i64, unit: &str, units: &str) -> String {
    format!("{} {}", value, if value == 1 { unit } else { units })
}

/// Human readable duration using the two most significant units.
fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let parts = [
        (seconds / 86_400, "day", "days"),
        (seconds % 86_400 / 3_600, "hour", "hours"),
        (seconds % 3_600 / 60, "min", "mins"),
        (seconds % 60, "sec", "secs"),
    ];
    let shown: Vec<String> = parts
        .iter()
        .skip_while(|(v, _, _)| *v == 0)
        .take(2)
        .filter(|(v, _, _)| *v > 0)
        .map(|(v, unit, units)| plural(*v, unit, units))
        .collect();
    if shown.is_empty() {
        "0 secs".to_string()
    } else {
        shown.join(" ")
    }
}
