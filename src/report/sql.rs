// src/report/sql.rs

//! SQL fragments handed to the report table.
//!
//! Queries are assembled as a (fields, from, where) triple with positional
//! Postgres parameters so the table can derive both the count query and the
//! paged row query from the same pieces.

use crate::models::quiz::Quiz;

use super::options::{AttemptsMode, ReportOptions};

#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    IntList(Vec<i64>),
    Text(String),
    TextList(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlQuery {
    pub fields: String,
    pub from: String,
    pub where_clause: String,
    pub params: Vec<SqlParam>,
}

impl SqlQuery {
    pub fn new(fields: impl Into<String>, from: impl Into<String>, where_clause: impl Into<String>) -> Self {
        Self {
            fields: fields.into(),
            from: from.into(),
            where_clause: where_clause.into(),
            params: Vec::new(),
        }
    }

    /// Registers a parameter and returns its placeholder (`$1`, `$2`, ...).
    pub fn bind(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    pub fn select(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE {}",
            self.fields, self.from, self.where_clause
        )
    }

    /// Same from/where and parameters, counting rows instead.
    pub fn count(&self) -> SqlQuery {
        SqlQuery {
            fields: "COUNT(1)".to_string(),
            ..self.clone()
        }
    }
}

/// Rows for the attempts report: every user (subject to the attempts mode)
/// left-joined with their attempts at this quiz.
///
/// `allowed` limits the users; for `all_with` an empty list means no limit,
/// for the enrolled modes it matches nobody.
pub fn base_sql(
    quiz: &Quiz,
    options: &ReportOptions,
    qmsubselect: Option<&str>,
    allowed: &[i64],
) -> SqlQuery {
    let mut query = SqlQuery::default();

    let graded = match qmsubselect {
        Some(select) => format!("CASE WHEN {} THEN TRUE ELSE FALSE END", select),
        None => "CAST(NULL AS BOOLEAN)".to_string(),
    };

    query.fields = format!(
        "CONCAT(u.id, '#', COALESCE(quiza.attempt, 0)) AS uniqueid, \
         quiza.uniqueid AS usageid, \
         quiza.id AS attempt, \
         u.id AS userid, \
         u.idnumber, \
         u.email, \
         u.firstname, \
         u.lastname, \
         quiza.state, \
         quiza.sumgrades, \
         quiza.timestart, \
         CASE WHEN quiza.timefinish = 0 THEN NULL ELSE quiza.timefinish END AS timefinish, \
         CASE WHEN quiza.timefinish = 0 THEN NULL \
              WHEN quiza.timefinish > quiza.timestart THEN quiza.timefinish - quiza.timestart \
              ELSE 0 END AS duration, \
         {} AS gradedattempt",
        graded
    );

    let quizid = query.bind(SqlParam::Int(quiz.id));
    query.from = format!(
        "users u LEFT JOIN quiz_attempts quiza ON quiza.userid = u.id AND quiza.quiz = {}",
        quizid
    );

    let mut conditions = vec![match options.attempts {
        AttemptsMode::AllWith | AttemptsMode::EnrolledWith => {
            "quiza.id IS NOT NULL AND quiza.preview = FALSE".to_string()
        }
        AttemptsMode::EnrolledWithout => "quiza.id IS NULL".to_string(),
        AttemptsMode::EnrolledAll => "(quiza.preview = FALSE OR quiza.id IS NULL)".to_string(),
    }];

    if options.attempts != AttemptsMode::AllWith || !allowed.is_empty() {
        let users = query.bind(SqlParam::IntList(allowed.to_vec()));
        conditions.push(format!("u.id = ANY({})", users));
    }

    if let Some(states) = &options.states {
        let states = query.bind(SqlParam::TextList(
            states.iter().map(|s| s.as_str().to_string()).collect(),
        ));
        conditions.push(format!("COALESCE(quiza.state, 'finished') = ANY({})", states));
    }

    if options.onlygraded {
        if let Some(select) = qmsubselect {
            conditions.push(format!("(quiza.state <> 'finished' OR {})", select));
        }
    }

    query.where_clause = conditions.join(" AND ");
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attempt::AttemptState;
    use crate::report::options::tests::{sample_options, sample_quiz};

    #[test]
    fn all_with_and_no_allowed_users_is_unrestricted() {
        let quiz = sample_quiz();
        let mut options = sample_options();
        options.attempts = AttemptsMode::AllWith;

        let query = base_sql(&quiz, &options, None, &[]);

        assert!(!query.where_clause.contains("u.id = ANY"));
        assert_eq!(query.params, vec![SqlParam::Int(quiz.id)]);
    }

    #[test]
    fn enrolled_modes_always_restrict_users() {
        let quiz = sample_quiz();
        let mut options = sample_options();
        options.attempts = AttemptsMode::EnrolledWithout;

        let query = base_sql(&quiz, &options, None, &[]);

        assert!(query.where_clause.starts_with("quiza.id IS NULL"));
        assert!(query.where_clause.contains("u.id = ANY($2)"));
        assert_eq!(query.params[1], SqlParam::IntList(vec![]));
    }

    #[test]
    fn state_and_graded_filters_are_appended() {
        let quiz = sample_quiz();
        let mut options = sample_options();
        options.states = Some(vec![AttemptState::Finished]);
        options.onlygraded = true;

        let query = base_sql(&quiz, &options, Some("(graded)"), &[4, 5]);

        assert_eq!(
            query.where_clause,
            "quiza.id IS NOT NULL AND quiza.preview = FALSE AND u.id = ANY($2) \
             AND COALESCE(quiza.state, 'finished') = ANY($3) \
             AND (quiza.state <> 'finished' OR (graded))"
        );
        assert!(query.fields.contains("CASE WHEN (graded) THEN TRUE ELSE FALSE END AS gradedattempt"));
        assert_eq!(
            query.params[2],
            SqlParam::TextList(vec!["finished".to_string()])
        );
    }

    #[test]
    fn count_keeps_from_where_and_params() {
        let quiz = sample_quiz();
        let query = base_sql(&quiz, &sample_options(), None, &[1]);
        let count = query.count();

        assert!(count.select().starts_with("SELECT COUNT(1) FROM users u LEFT JOIN"));
        assert_eq!(count.params, query.params);
    }
}
