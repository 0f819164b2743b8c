// src/report/options.rs

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    config::Config,
    error::AppError,
    models::{
        attempt::AttemptState,
        course::{CourseModule, GroupMode},
        quiz::Quiz,
        user::{Capability, CurrentUser},
    },
};

use super::{form::SettingsForm, grading};

/// Which users/attempts the report lists. Exactly one mode is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptsMode {
    /// Every attempt, including users no longer enrolled.
    AllWith,
    /// Enrolled users who have attempted the quiz.
    EnrolledWith,
    /// Enrolled users who have not attempted the quiz.
    EnrolledWithout,
    /// All enrolled users, with or without attempts.
    EnrolledAll,
}

impl AttemptsMode {
    pub const ALL: [AttemptsMode; 4] = [
        AttemptsMode::EnrolledWith,
        AttemptsMode::EnrolledWithout,
        AttemptsMode::EnrolledAll,
        AttemptsMode::AllWith,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all_with" => Some(AttemptsMode::AllWith),
            "enrolled_with" => Some(AttemptsMode::EnrolledWith),
            "enrolled_without" => Some(AttemptsMode::EnrolledWithout),
            "enrolled_all" => Some(AttemptsMode::EnrolledAll),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptsMode::AllWith => "all_with",
            AttemptsMode::EnrolledWith => "enrolled_with",
            AttemptsMode::EnrolledWithout => "enrolled_without",
            AttemptsMode::EnrolledAll => "enrolled_all",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttemptsMode::AllWith => "all users who have attempted the quiz",
            AttemptsMode::EnrolledWith => "enrolled users who have attempted the quiz",
            AttemptsMode::EnrolledWithout => "enrolled users who have not attempted the quiz",
            AttemptsMode::EnrolledAll => "all enrolled users",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DownloadFormat {
    Csv,
    Tsv,
    Json,
    Html,
}

impl DownloadFormat {
    pub const ALL: [DownloadFormat; 4] = [
        DownloadFormat::Csv,
        DownloadFormat::Tsv,
        DownloadFormat::Json,
        DownloadFormat::Html,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "csv" => Some(DownloadFormat::Csv),
            "tsv" => Some(DownloadFormat::Tsv),
            "json" => Some(DownloadFormat::Json),
            "html" => Some(DownloadFormat::Html),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadFormat::Csv => "csv",
            DownloadFormat::Tsv => "tsv",
            DownloadFormat::Json => "json",
            DownloadFormat::Html => "html",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DownloadFormat::Csv => "Comma separated values (.csv)",
            DownloadFormat::Tsv => "Tab separated values (.tsv)",
            DownloadFormat::Json => "Javascript Object Notation (.json)",
            DownloadFormat::Html => "HTML table",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DownloadFormat::Html => "html",
            other => other.as_str(),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            DownloadFormat::Csv => "text/csv; charset=utf-8",
            DownloadFormat::Tsv => "text/tab-separated-values; charset=utf-8",
            DownloadFormat::Json => "application/json",
            DownloadFormat::Html => "text/html; charset=utf-8",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub descending: bool,
}

/// Raw query-string parameters of the report page.
/// Flags use `0`/`1` like the links the report itself generates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportParams {
    /// Course module id.
    pub id: i64,
    pub mode: Option<String>,
    pub attempts: Option<String>,
    pub group: Option<i64>,
    pub onlygraded: Option<u8>,
    /// `-` separated attempt states.
    pub states: Option<String>,
    pub showqdata: Option<u8>,
    pub showchosenrs: Option<u8>,
    pub showresponses: Option<u8>,
    pub pagesize: Option<u32>,
    pub tsort: Option<String>,
    pub tdir: Option<String>,
    pub page: Option<u32>,
    pub download: Option<String>,
}

/// Values the settings form is pre-filled with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsFormData {
    pub attempts: AttemptsMode,
    pub onlygraded: bool,
    pub states: Vec<AttemptState>,
    pub showqdata: bool,
    pub showchosenrs: bool,
    pub showresponses: bool,
    pub pagesize: u32,
}

/// Display options of the responses report for one request.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub mode: String,
    pub cmid: i64,
    pub attempts: AttemptsMode,
    pub group: Option<i64>,
    pub onlygraded: bool,
    /// `None` means no state filter.
    pub states: Option<Vec<AttemptState>>,
    /// Per-question data columns.
    pub showqdata: bool,
    /// Score chosen responses only instead of the whole quiz.
    pub showchosenrs: bool,
    /// Response column for every question (needs `showqdata`).
    pub showresponses: bool,
    pub checkboxcolumn: bool,
    pub usercanseegrades: bool,
    pub pagesize: u32,
    pub default_pagesize: u32,
    pub sort: Option<SortSpec>,
    pub page: u32,
    pub download: Option<DownloadFormat>,
}

impl ReportOptions {
    pub fn new(mode: &str, quiz: &Quiz, cm: &CourseModule, user: &CurrentUser, config: &Config) -> Self {
        let usercanseegrades =
            quiz.grade > 0.0 && quiz.sumgrades > 0.0 && user.has(Capability::ViewGrades);

        Self {
            mode: mode.to_string(),
            cmid: cm.id,
            attempts: AttemptsMode::EnrolledWith,
            group: None,
            onlygraded: false,
            states: None,
            showqdata: true,
            showchosenrs: false,
            showresponses: true,
            checkboxcolumn: false,
            usercanseegrades,
            pagesize: config.default_page_size,
            default_pagesize: config.default_page_size,
            sort: None,
            page: 0,
            download: None,
        }
    }

    /// Sorting, paging and download come from the query string whichever way
    /// the settings arrive.
    pub fn process_table_params(&mut self, params: &ReportParams) -> Result<(), AppError> {
        self.sort = params
            .tsort
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|column| SortSpec {
                column: column.to_string(),
                descending: params.tdir.as_deref() == Some("desc"),
            });
        self.page = params.page.unwrap_or(0);
        self.download = match params.download.as_deref() {
            None | Some("") => None,
            Some(format) => Some(DownloadFormat::parse(format).ok_or_else(|| {
                AppError::BadRequest(format!("Unsupported download format '{}'", format))
            })?),
        };
        Ok(())
    }

    pub fn process_settings_from_params(&mut self, params: &ReportParams) -> Result<(), AppError> {
        if let Some(attempts) = params.attempts.as_deref().filter(|a| !a.is_empty()) {
            self.attempts = AttemptsMode::parse(attempts).ok_or_else(|| {
                AppError::BadRequest(format!("Unknown attempts filter '{}'", attempts))
            })?;
        }
        if let Some(onlygraded) = params.onlygraded {
            self.onlygraded = onlygraded != 0;
        }
        if let Some(states) = params.states.as_deref() {
            self.states = Some(
                states
                    .split('-')
                    .filter_map(AttemptState::parse)
                    .collect(),
            );
        }
        if let Some(v) = params.showqdata {
            self.showqdata = v != 0;
        }
        if let Some(v) = params.showchosenrs {
            self.showchosenrs = v != 0;
        }
        if let Some(v) = params.showresponses {
            self.showresponses = v != 0;
        }
        if let Some(pagesize) = params.pagesize {
            self.pagesize = pagesize;
        }
        Ok(())
    }

    pub fn process_settings_from_form(&mut self, form: &SettingsForm) {
        self.attempts = form.attempts_mode().unwrap_or(self.attempts);
        self.onlygraded = form.onlygraded;
        self.states = Some(form.states.clone());
        self.showqdata = form.showqdata;
        self.showchosenrs = form.showchosenrs;
        self.showresponses = form.showresponses;
        self.pagesize = form.pagesize;
    }

    /// Normalises combinations that make no sense together.
    pub fn resolve_dependencies(&mut self, quiz: &Quiz, cm: &CourseModule, user: &CurrentUser) {
        if self.pagesize < 1 {
            self.pagesize = self.default_pagesize.max(1);
        }

        if self.attempts == AttemptsMode::AllWith {
            let restricted = cm.group_mode() == GroupMode::Separate
                && !user.has(Capability::AccessAllGroups);
            if self.group.is_some() || restricted {
                self.attempts = AttemptsMode::EnrolledWith;
            }
        }

        if self.attempts == AttemptsMode::EnrolledWithout {
            self.states = None;
            self.onlygraded = false;
        }

        if !grading::can_filter_only_graded(quiz) {
            self.onlygraded = false;
        }

        if let Some(states) = &self.states {
            if states.is_empty() || AttemptState::ALL.iter().all(|s| states.contains(s)) {
                self.states = None;
            }
        }

        self.checkboxcolumn =
            user.has(Capability::DeleteAttempts) && self.attempts != AttemptsMode::EnrolledWithout;
    }

    pub fn initial_form_data(&self) -> SettingsFormData {
        SettingsFormData {
            attempts: self.attempts,
            onlygraded: self.onlygraded,
            states: self
                .states
                .clone()
                .unwrap_or_else(|| AttemptState::ALL.to_vec()),
            showqdata: self.showqdata,
            showchosenrs: self.showchosenrs,
            showresponses: self.showresponses,
            pagesize: self.pagesize,
        }
    }

    /// Report URL carrying the current options, used as base for paging,
    /// sorting and form actions.
    pub fn url(&self, wwwroot: &str) -> Result<Url, AppError> {
        // A base without a trailing slash would lose its last path segment.
        let mut url = if wwwroot.ends_with('/') {
            Url::parse(wwwroot)?
        } else {
            Url::parse(&format!("{wwwroot}/"))?
        };
        url = url.join("mod/quiz/report")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("id", &self.cmid.to_string())
                .append_pair("mode", &self.mode)
                .append_pair("attempts", self.attempts.as_str())
                .append_pair("onlygraded", flag(self.onlygraded));
            if let Some(states) = &self.states {
                let joined: Vec<&str> = states.iter().map(|s| s.as_str()).collect();
                query.append_pair("states", &joined.join("-"));
            }
            if let Some(group) = self.group {
                query.append_pair("group", &group.to_string());
            }
            query
                .append_pair("showqdata", flag(self.showqdata))
                .append_pair("showchosenrs", flag(self.showchosenrs))
                .append_pair("showresponses", flag(self.showresponses))
                .append_pair("pagesize", &self.pagesize.to_string());
        }
        Ok(url)
    }
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}
