// src/report/stats.rs

//! Per-attempt statistics shown next to the grade: responses given, marks,
//! accuracy and the confidence-based marking (CBM) figures.

use std::collections::HashMap;

use crate::models::{attempt::QuestionResponse, quiz::Question};

/// CBM score for a right answer at certainty 1, 2, 3.
const RIGHT_SCORE: [f64; 3] = [1.0, 2.0, 3.0];
/// CBM score for a wrong answer at certainty 1, 2, 3.
const WRONG_SCORE: [f64; 3] = [0.0, -2.0, -6.0];

fn certainty_index(certainty: Option<i16>) -> usize {
    match certainty {
        Some(c) if (1..=3).contains(&c) => (c - 1) as usize,
        _ => 0,
    }
}

/// CBM mark for one question, in units of its max mark.
pub fn adjust_fraction(fraction: f64, certainty: Option<i16>) -> f64 {
    let index = certainty_index(certainty);
    if fraction <= 0.000_000_05 {
        WRONG_SCORE[index]
    } else {
        fraction * RIGHT_SCORE[index]
    }
}

/// Bonus for judging reliability well: the average CBM mark above the best
/// average achievable at this accuracy with a single certainty level.
pub fn calculate_bonus(average_cbm: f64, accuracy: f64) -> f64 {
    let expected = (0..3)
        .map(|i| accuracy * RIGHT_SCORE[i] + (1.0 - accuracy) * WRONG_SCORE[i])
        .fold(f64::MIN, f64::max);
    0.1 * (average_cbm - expected)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttemptStats {
    /// Questions with a non-empty response.
    pub responses: usize,
    pub marks: f64,
    pub max_marks: f64,
    /// marks / max_marks, 0..=1.
    pub accuracy: f64,
    /// Average CBM mark over the whole quiz.
    pub cbm_average: f64,
    /// Average CBM mark over answered questions only.
    pub cbm_average_chosen: f64,
    /// Accuracy over questions where a certainty was given.
    pub cbm_accuracy: f64,
    pub cbm_bonus: f64,
    pub cbm_grade: f64,
}

struct Totals {
    marks: f64,
    max: f64,
    cbm: f64,
}

fn totals<'a>(items: impl Iterator<Item = (f64, Option<&'a QuestionResponse>)>) -> Totals {
    let mut totals = Totals { marks: 0.0, max: 0.0, cbm: 0.0 };
    for (maxmark, response) in items {
        let fraction = response.and_then(|r| r.fraction).unwrap_or(0.0);
        let certainty = response.and_then(|r| r.certainty);
        totals.max += maxmark;
        totals.marks += fraction * maxmark;
        totals.cbm += adjust_fraction(fraction, certainty) * maxmark;
    }
    totals
}

fn ratio(value: f64, of: f64) -> f64 {
    if of > 0.0 { value / of } else { 0.0 }
}

/// Summarises one attempt. With `chosen_only` the marks, accuracy and bonus
/// only consider answered questions; otherwise every question counts.
pub fn summarise(
    questions: &[Question],
    responses: &HashMap<i64, &QuestionResponse>,
    chosen_only: bool,
) -> AttemptStats {
    let entries: Vec<(f64, Option<&QuestionResponse>)> = questions
        .iter()
        .map(|q| {
            let response = responses.get(&q.slot).copied();
            (response.map(|r| r.maxmark).unwrap_or(q.maxmark), response)
        })
        .collect();

    let answered = || entries.iter().filter(|(_, r)| r.is_some_and(|r| r.is_answered()));

    let whole = totals(entries.iter().copied());
    let chosen = totals(answered().copied());
    let with_certainty = totals(
        entries
            .iter()
            .filter(|(_, r)| r.is_some_and(|r| r.certainty.is_some()))
            .copied(),
    );

    let counted = if chosen_only { &chosen } else { &whole };
    let accuracy = ratio(counted.marks, counted.max);
    let average = ratio(counted.cbm, counted.max);
    let bonus = calculate_bonus(average, accuracy);

    AttemptStats {
        responses: answered().count(),
        marks: counted.marks,
        max_marks: counted.max,
        accuracy,
        cbm_average: ratio(whole.cbm, whole.max),
        cbm_average_chosen: ratio(chosen.cbm, chosen.max),
        cbm_accuracy: ratio(with_certainty.marks, with_certainty.max),
        cbm_bonus: bonus,
        cbm_grade: accuracy + bonus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(slot: i64, maxmark: f64) -> Question {
        Question {
            slot,
            id: slot,
            number: slot as u32,
            maxmark,
            qtype: "multichoice".into(),
            name: format!("Q{}", slot),
        }
    }

    fn response(slot: i64, fraction: f64, certainty: Option<i16>) -> QuestionResponse {
        QuestionResponse {
            usageid: 1,
            slot,
            maxmark: 1.0,
            fraction: Some(fraction),
            certainty,
            responsesummary: Some("answer".into()),
        }
    }

    #[test]
    fn wrong_answers_are_penalised_by_certainty() {
        assert_eq!(adjust_fraction(0.0, Some(1)), 0.0);
        assert_eq!(adjust_fraction(0.0, Some(2)), -2.0);
        assert_eq!(adjust_fraction(0.0, Some(3)), -6.0);
        assert_eq!(adjust_fraction(1.0, Some(3)), 3.0);
        assert_eq!(adjust_fraction(0.5, None), 0.5);
    }

    #[test]
    fn perfect_confident_attempt_has_no_bonus() {
        assert!(calculate_bonus(3.0, 1.0).abs() < 1e-9);
        assert!(calculate_bonus(1.0, 0.0) > 0.0);
    }

    #[test]
    fn chosen_only_ignores_unanswered_questions() {
        let questions = vec![question(1, 1.0), question(2, 1.0)];
        let answered = response(1, 1.0, Some(2));
        let responses: HashMap<i64, &QuestionResponse> = HashMap::from([(1, &answered)]);

        let whole = summarise(&questions, &responses, false);
        let chosen = summarise(&questions, &responses, true);

        assert_eq!(whole.responses, 1);
        assert_eq!(whole.accuracy, 0.5);
        assert_eq!(chosen.accuracy, 1.0);
        assert_eq!(whole.cbm_average, 1.0);
        assert_eq!(whole.cbm_average_chosen, 2.0);
        assert_eq!(chosen.cbm_accuracy, 1.0);
    }

    #[test]
    fn empty_attempt_is_all_zero() {
        let questions = vec![question(1, 2.0)];
        let stats = summarise(&questions, &HashMap::new(), true);
        assert_eq!(stats.responses, 0);
        assert_eq!(stats.accuracy, 0.0);
        assert_eq!(stats.cbm_average_chosen, 0.0);
    }
}
