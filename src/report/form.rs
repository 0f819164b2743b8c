// src/report/form.rs

use url::Url;
use validator::Validate;

use crate::{models::attempt::AttemptState, utils::html::escape};

use super::options::{AttemptsMode, SettingsFormData};

/// Submitted report settings.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct SettingsForm {
    #[validate(custom(function = validate_attempts))]
    pub attempts: String,
    pub onlygraded: bool,
    pub states: Vec<AttemptState>,
    pub showqdata: bool,
    pub showchosenrs: bool,
    pub showresponses: bool,
    #[validate(range(min = 1, max = 10000, message = "Page size must be between 1 and 10000."))]
    pub pagesize: u32,
}

fn validate_attempts(attempts: &str) -> Result<(), validator::ValidationError> {
    match AttemptsMode::parse(attempts) {
        Some(_) => Ok(()),
        None => Err(validator::ValidationError::new("unknown_attempts_filter")),
    }
}

fn checked(pairs: &[(String, String)], name: &str) -> bool {
    pairs.iter().any(|(k, v)| k == name && v != "0" && !v.is_empty())
}

fn value<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
}

impl SettingsForm {
    /// Reads the settings from a form body. `None` unless the settings form
    /// itself was submitted.
    pub fn from_pairs(pairs: &[(String, String)]) -> Option<Self> {
        value(pairs, "submitbutton")?;

        let states = AttemptState::ALL
            .into_iter()
            .filter(|s| checked(pairs, &format!("state{}", s.as_str())))
            .collect();

        Some(Self {
            attempts: value(pairs, "attempts").unwrap_or_default().to_string(),
            onlygraded: checked(pairs, "onlygraded"),
            states,
            showqdata: checked(pairs, "showqdata"),
            showchosenrs: checked(pairs, "showchosenrs"),
            showresponses: checked(pairs, "showresponses"),
            pagesize: value(pairs, "pagesize")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
        })
    }

    /// The form only counts as submitted data when it validates.
    pub fn get_data(self) -> Option<Self> {
        match self.validate() {
            Ok(()) => Some(self),
            Err(e) => {
                tracing::warn!("Ignoring invalid report settings: {}", e);
                None
            }
        }
    }

    pub fn attempts_mode(&self) -> Option<AttemptsMode> {
        AttemptsMode::parse(&self.attempts)
    }
}

/// Actions posted from the attempts table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttemptActions {
    pub delete: bool,
    pub attempt_ids: Vec<i64>,
}

impl AttemptActions {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            delete: value(pairs, "delete").is_some(),
            attempt_ids: pairs
                .iter()
                .filter(|(k, _)| k == "attemptid")
                .filter_map(|(_, v)| v.parse().ok())
                .collect(),
        }
    }
}

fn checkbox(name: &str, label: &str, on: bool) -> String {
    format!(
        "<label><input type=\"checkbox\" name=\"{}\" value=\"1\"{}> {}</label>\n",
        name,
        if on { " checked" } else { "" },
        label
    )
}

/// The "Preferences for this report" form.
///
/// `offer_all_with` controls whether the every-attempt mode is listed; it is
/// only offered to users who can see all groups while no group is selected.
pub fn render_settings_form(data: &SettingsFormData, action: &Url, offer_all_with: bool) -> String {
    let mut html = format!(
        "<form id=\"preferencesform\" class=\"mform\" method=\"post\" action=\"{}\">\n\
         <fieldset><legend>What to include in the report</legend>\n\
         <label for=\"id_attempts\">Attempts from</label>\n\
         <select id=\"id_attempts\" name=\"attempts\">\n",
        escape(action.as_str())
    );
    for mode in AttemptsMode::ALL {
        if mode == AttemptsMode::AllWith && !offer_all_with {
            continue;
        }
        html.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>\n",
            mode.as_str(),
            if mode == data.attempts { " selected" } else { "" },
            mode.label()
        ));
    }
    html.push_str("</select>\n<div class=\"states\">Attempts that are\n");
    for state in AttemptState::ALL {
        html.push_str(&checkbox(
            &format!("state{}", state.as_str()),
            state.label(),
            data.states.contains(&state),
        ));
    }
    html.push_str("</div>\n");
    html.push_str(&checkbox(
        "onlygraded",
        "Show at most one finished attempt per user",
        data.onlygraded,
    ));
    html.push_str("</fieldset>\n<fieldset><legend>Display options</legend>\n");
    html.push_str(&format!(
        "<label for=\"id_pagesize\">Page size</label>\n\
         <input type=\"text\" id=\"id_pagesize\" name=\"pagesize\" size=\"3\" value=\"{}\">\n",
        data.pagesize
    ));
    html.push_str(&checkbox("showqdata", "Show data for each question", data.showqdata));
    html.push_str(&checkbox("showresponses", "Response", data.showresponses));
    html.push_str(&checkbox(
        "showchosenrs",
        "Score chosen responses only",
        data.showchosenrs,
    ));
    html.push_str(
        "</fieldset>\n<input type=\"submit\" name=\"submitbutton\" value=\"Show report\">\n</form>\n",
    );
    html
}
