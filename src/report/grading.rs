// src/report/grading.rs

use crate::models::quiz::{GradeMethod, Quiz};

/// SQL condition that is true for the one finished attempt per user that the
/// grading method counts. `None` when every attempt counts (single attempt or
/// average grading).
///
/// Under highest grade, ties go to the earliest attempt.
pub fn qm_filter_select(quiz: &Quiz, alias: &str) -> Option<String> {
    if quiz.attempts == 1 {
        return None;
    }

    let same_user = format!(
        "qa2.quiz = {alias}.quiz AND qa2.userid = {alias}.userid \
         AND qa2.state = 'finished' AND qa2.preview = FALSE"
    );

    let select = match quiz.grade_method() {
        GradeMethod::Highest => format!(
            "({alias}.state = 'finished' AND NOT EXISTS (SELECT 1 FROM quiz_attempts qa2 \
             WHERE {same_user} \
             AND (COALESCE(qa2.sumgrades, 0) > COALESCE({alias}.sumgrades, 0) \
             OR (COALESCE(qa2.sumgrades, 0) = COALESCE({alias}.sumgrades, 0) \
             AND qa2.attempt < {alias}.attempt))))"
        ),
        GradeMethod::First => format!(
            "({alias}.state = 'finished' AND {alias}.attempt = \
             (SELECT MIN(qa2.attempt) FROM quiz_attempts qa2 WHERE {same_user}))"
        ),
        GradeMethod::Last => format!(
            "({alias}.state = 'finished' AND {alias}.attempt = \
             (SELECT MAX(qa2.attempt) FROM quiz_attempts qa2 WHERE {same_user}))"
        ),
        GradeMethod::Average => return None,
    };
    Some(select)
}

pub fn can_filter_only_graded(quiz: &Quiz) -> bool {
    quiz.attempts != 1 && quiz.grade_method() != GradeMethod::Average
}

/// Note shown above the table explaining which attempts are highlighted.
pub fn highlighting_note(quiz: &Quiz, qmsubselect: Option<&str>, onlygraded: bool) -> String {
    if quiz.attempts == 1 {
        "<p>This quiz only allows one attempt per user.</p>".to_string()
    } else if qmsubselect.is_none() {
        "<p>All attempts contribute to final grade for a user.</p>".to_string()
    } else if onlygraded {
        "<p>Showing only the final graded attempt for each user.</p>".to_string()
    } else {
        format!(
            "<p>Showing graded and ungraded attempts for each user. The one attempt for each \
             user that is graded is highlighted. The grading method for this quiz is \
             <span class=\"gradedattempt\">{}</span>.</p>",
            quiz.grade_method().label()
        )
    }
}
