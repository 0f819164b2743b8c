// src/models/attempt.rs

use serde::Serialize;
use sqlx::FromRow;

/// One report row: a user joined with (at most) one of their attempts.
/// Users without an attempt have all attempt fields set to `None`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AttemptRow {
    /// `"<userid>#<attempt number or 0>"`, unique per row.
    pub uniqueid: String,
    /// Question usage id, key into 'question_attempts'.
    pub usageid: Option<i64>,
    pub attempt: Option<i64>,
    pub userid: i64,
    pub idnumber: Option<String>,
    pub email: Option<String>,
    pub firstname: String,
    pub lastname: String,
    pub state: Option<String>,
    pub sumgrades: Option<f64>,
    pub timestart: Option<i64>,
    pub timefinish: Option<i64>,
    /// Seconds between start and finish, `None` while unfinished.
    pub duration: Option<i64>,
    /// Whether this attempt is the one the grading method picks.
    pub gradedattempt: Option<bool>,
}

impl AttemptRow {
    pub fn fullname(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }

    pub fn attempt_state(&self) -> Option<AttemptState> {
        self.state.as_deref().and_then(AttemptState::parse)
    }
}

/// Represents a row of the 'question_attempts' table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuestionResponse {
    pub usageid: i64,
    pub slot: i64,
    pub maxmark: f64,
    /// Fraction of the max mark awarded, `None` when not graded yet.
    pub fraction: Option<f64>,
    /// Confidence level 1..=3 under confidence-based marking.
    pub certainty: Option<i16>,
    pub responsesummary: Option<String>,
}

impl QuestionResponse {
    pub fn is_answered(&self) -> bool {
        self.responsesummary
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptState {
    InProgress,
    Overdue,
    Finished,
    Abandoned,
}

impl AttemptState {
    pub const ALL: [AttemptState; 4] = [
        AttemptState::InProgress,
        AttemptState::Overdue,
        AttemptState::Finished,
        AttemptState::Abandoned,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "inprogress" => Some(AttemptState::InProgress),
            "overdue" => Some(AttemptState::Overdue),
            "finished" => Some(AttemptState::Finished),
            "abandoned" => Some(AttemptState::Abandoned),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptState::InProgress => "inprogress",
            AttemptState::Overdue => "overdue",
            AttemptState::Finished => "finished",
            AttemptState::Abandoned => "abandoned",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttemptState::InProgress => "In progress",
            AttemptState::Overdue => "Overdue",
            AttemptState::Finished => "Finished",
            AttemptState::Abandoned => "Never submitted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_serialise_as_their_query_names() {
        for state in AttemptState::ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.as_str()));
        }
    }
}
