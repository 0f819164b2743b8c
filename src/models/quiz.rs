// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub course: i64,
    pub name: String,
    /// Sum of the slot max marks; raw attempt `sumgrades` are out of this.
    pub sumgrades: f64,
    /// Maximum grade the raw sum is rescaled to.
    pub grade: f64,
    /// See [`GradeMethod`].
    pub grademethod: i16,
    /// Attempts allowed per user, 0 means unlimited.
    pub attempts: i32,
    pub decimalpoints: i16,
    /// Question behaviour, e.g. `deferredfeedback` or `deferredcbm`.
    pub preferredbehaviour: String,
}

/// Which attempt (or combination) counts toward a user's quiz grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeMethod {
    Highest,
    Average,
    First,
    Last,
}

impl GradeMethod {
    pub fn from_db(value: i16) -> Self {
        match value {
            2 => GradeMethod::Average,
            3 => GradeMethod::First,
            4 => GradeMethod::Last,
            _ => GradeMethod::Highest,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GradeMethod::Highest => "Highest grade",
            GradeMethod::Average => "Average grade",
            GradeMethod::First => "First attempt",
            GradeMethod::Last => "Last attempt",
        }
    }
}

impl Quiz {
    pub fn grade_method(&self) -> GradeMethod {
        GradeMethod::from_db(self.grademethod)
    }

    pub fn uses_cbm(&self) -> bool {
        self.preferredbehaviour.contains("cbm")
    }

    /// Converts a raw attempt sum into the quiz grade scale.
    pub fn rescale_grade(&self, sumgrades: f64) -> Option<f64> {
        if self.sumgrades <= 0.0 {
            return None;
        }
        Some(sumgrades * self.grade / self.sumgrades)
    }

    pub fn format_grade(&self, grade: f64) -> String {
        let places = self.decimalpoints.clamp(0, 5) as usize;
        format!("{:.*}", places, grade)
    }
}

/// One row of the 'quiz_slots' table joined with its question.
#[derive(Debug, Clone, FromRow)]
pub struct QuizSlot {
    pub slot: i64,
    pub questionid: i64,
    pub maxmark: f64,
    pub qtype: String,
    pub name: String,
}

/// A question as it appears in the report, one per graded slot.
#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub slot: i64,
    pub id: i64,
    /// Number shown to students; descriptions are skipped when numbering.
    pub number: u32,
    pub maxmark: f64,
    pub qtype: String,
    pub name: String,
}

/// Keeps the slots that carry marks and numbers them in slot order.
pub fn significant_questions(mut slots: Vec<QuizSlot>) -> Vec<Question> {
    slots.sort_by_key(|s| s.slot);
    slots
        .into_iter()
        .filter(|s| s.qtype != "description")
        .enumerate()
        .map(|(index, s)| Question {
            slot: s.slot,
            id: s.questionid,
            number: index as u32 + 1,
            maxmark: s.maxmark,
            qtype: s.qtype,
            name: s.name,
        })
        .collect()
}

/// Represents the 'quiz_feedback' table: overall feedback for a grade band.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FeedbackBand {
    pub feedbacktext: String,
    /// Inclusive lower bound, on the quiz grade scale.
    pub mingrade: f64,
    /// Exclusive upper bound.
    pub maxgrade: f64,
}

pub fn feedback_for(bands: &[FeedbackBand], grade: f64) -> Option<&str> {
    bands
        .iter()
        .find(|b| b.mingrade <= grade && grade < b.maxgrade)
        .map(|b| b.feedbacktext.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(slot: i64, qtype: &str, maxmark: f64) -> QuizSlot {
        QuizSlot {
            slot,
            questionid: slot * 10,
            maxmark,
            qtype: qtype.to_string(),
            name: format!("Q{}", slot),
        }
    }

    #[test]
    fn descriptions_are_not_numbered() {
        let questions = significant_questions(vec![
            slot(3, "shortanswer", 2.0),
            slot(1, "multichoice", 1.0),
            slot(2, "description", 0.0),
        ]);

        let numbered: Vec<(i64, u32)> = questions.iter().map(|q| (q.slot, q.number)).collect();
        assert_eq!(numbered, vec![(1, 1), (3, 2)]);
    }

    #[test]
    fn feedback_band_upper_bound_is_exclusive() {
        let bands = vec![
            FeedbackBand { feedbacktext: "Low".into(), mingrade: 0.0, maxgrade: 5.0 },
            FeedbackBand { feedbacktext: "High".into(), mingrade: 5.0, maxgrade: 10.01 },
        ];
        assert_eq!(feedback_for(&bands, 4.99), Some("Low"));
        assert_eq!(feedback_for(&bands, 5.0), Some("High"));
        assert_eq!(feedback_for(&bands, 11.0), None);
    }

    #[test]
    fn rescale_uses_quiz_grade() {
        let quiz = Quiz {
            id: 1,
            course: 1,
            name: "Quiz".into(),
            sumgrades: 4.0,
            grade: 10.0,
            grademethod: 1,
            attempts: 0,
            decimalpoints: 2,
            preferredbehaviour: "deferredfeedback".into(),
        };
        assert_eq!(quiz.rescale_grade(3.0), Some(7.5));
        assert_eq!(quiz.format_grade(7.5), "7.50");
    }
}
