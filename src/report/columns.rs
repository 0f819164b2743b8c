// src/report/columns.rs

use crate::models::quiz::{Question, Quiz};

/// One table column: key used for sorting/styling and its header label.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub key: String,
    pub header: Option<String>,
}

/// Builds the ordered column list of the report.
#[derive(Debug, Default)]
pub struct ColumnListBuilder {
    columns: Vec<Column>,
}

impl ColumnListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, header: Option<String>) -> &mut Self {
        self.columns.push(Column {
            key: key.into(),
            header,
        });
        self
    }

    pub fn add_if(&mut self, condition: bool, key: impl Into<String>, header: Option<String>) -> &mut Self {
        if condition {
            self.add(key, header);
        }
        self
    }

    pub fn keys(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.key.as_str()).collect()
    }

    pub fn build(self) -> Vec<Column> {
        self.columns
    }
}

fn label(text: &str) -> Option<String> {
    Some(text.to_string())
}

pub fn add_user_columns(builder: &mut ColumnListBuilder, downloading: bool, identity_fields: &[String]) {
    builder
        .add_if(!downloading, "fullname", label("Name"))
        .add_if(downloading, "lastname", label("Surname"))
        .add_if(downloading, "firstname", label("First name"));

    for field in identity_fields {
        let header = match field.as_str() {
            "idnumber" => "ID number",
            "email" => "Email address",
            _ => continue,
        };
        builder.add(field.as_str(), label(header));
    }
}

pub fn add_time_columns(builder: &mut ColumnListBuilder) {
    builder
        .add("state", label("State"))
        .add("timestart", label("Started on"))
        .add("timefinish", label("Completed"))
        .add("duration", label("Time taken"));
}

pub fn add_grade_columns(
    builder: &mut ColumnListBuilder,
    quiz: &Quiz,
    usercanseegrades: bool,
    include_feedback: bool,
) {
    if !usercanseegrades {
        return;
    }
    builder
        .add("sumgrades", Some(format!("Grade/{}", quiz.format_grade(quiz.grade))))
        .add_if(include_feedback, "feedbacktext", label("Feedback"));
}

/// Response counts, marks, accuracy and, for CBM quizzes, the CBM figures.
pub fn add_statistics_columns(
    builder: &mut ColumnListBuilder,
    quiz: &Quiz,
    usercanseegrades: bool,
    showchosenrs: bool,
) {
    if !usercanseegrades {
        return;
    }
    builder
        .add("resp_num", label("Responses"))
        .add("marks", label("Marks"))
        .add("accy", label("Accuracy"));

    if quiz.uses_cbm() {
        builder
            .add("cbm_av", label("Av. CBM"))
            .add_if(showchosenrs, "cbm_avchosen", label("Av. CBM (chosen)"))
            .add("cbm_bonus", label("CBM bonus"))
            .add("cbm_accy", label("CBM accuracy"))
            .add("cbm_grade", label("CBM grade"));
    }
}

pub fn add_response_columns(
    builder: &mut ColumnListBuilder,
    questions: &[Question],
    downloading: bool,
    enabled: bool,
) {
    for question in questions {
        builder.add_if(
            enabled,
            response_key(question.slot),
            Some(response_header(question, downloading)),
        );
    }
}

pub fn response_key(slot: i64) -> String {
    format!("response{}", slot)
}

/// Slot of a `response<slot>` column key.
pub fn response_slot(key: &str) -> Option<i64> {
    key.strip_prefix("response")?.parse().ok()
}

/// `Response <n>` on screen, `Q<n>` in downloads, with `/<mark>` appended
/// when the question is not worth exactly one mark.
pub fn response_header(question: &Question, downloading: bool) -> String {
    let mut header = if downloading {
        format!("Q{}", question.number)
    } else {
        format!("Response {}", question.number)
    };
    if question.maxmark != 1.0 {
        header.push('/');
        header.push_str(&format_mark(question.maxmark));
    }
    header
}

/// Rounds to one decimal place, dropping a trailing `.0`.
pub fn format_mark(mark: f64) -> String {
    let rounded = (mark * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{:.1}", rounded)
    }
}
