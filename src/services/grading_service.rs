use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::models::question::{Question, QuestionType};
use crate::models::submission::StudentSubmission;
use crate::services::answer_key_codec::{AnswerKey, AnswerKeyCodec, ComponentAnswer, MixedComponent};
use crate::utils::letters::parse_letter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixedWeighting {
    /// Each correct component earns `points / component_count`.
    #[default]
    Equal,
    AllOrNothing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub case_sensitive: bool,
    /// SHORT/LONG earn `points * matched / segments` when not fully correct.
    pub partial_credit: bool,
    pub mixed_weighting: MixedWeighting,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            partial_credit: false,
            mixed_weighting: MixedWeighting::Equal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreFlag {
    /// The submitted value does not have the shape the question expects.
    ShapeMismatch { expected: usize, detail: String },
    AnswerKeyMissing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub question_id: Uuid,
    pub question_number: i32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub is_correct: bool,
    pub points_awarded: f64,
    pub max_points: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<ScoreFlag>,
}

impl ScoreResult {
    fn incorrect(question: &Question) -> Self {
        Self {
            question_id: question.id,
            question_number: question.question_number,
            question_type: question.question_type,
            is_correct: false,
            points_awarded: 0.0,
            max_points: question.points,
            flags: Vec::new(),
        }
    }

    pub fn shape_mismatch(&self) -> Option<&ScoreFlag> {
        self.flags
            .iter()
            .find(|f| matches!(f, ScoreFlag::ShapeMismatch { .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionScore {
    pub results: Vec<ScoreResult>,
    pub total_awarded: f64,
    pub max_points: i32,
    pub percentage: f64,
}

struct Outcome {
    correct: bool,
    fraction: f64,
}

type Graded = std::result::Result<Outcome, ScoreFlag>;

pub struct GradingService;

impl GradingService {
    /// Grades one answer. Never fails: wrong shapes and missing keys come back
    /// as an incorrect result carrying a flag.
    pub fn score(
        question: &Question,
        answer: Option<&JsonValue>,
        policy: &ScoringPolicy,
    ) -> ScoreResult {
        let mut result = ScoreResult::incorrect(question);
        let decoded = AnswerKeyCodec::decode(
            question.question_type,
            &question.correct_answer,
            question.options_count,
        );
        if !decoded.key.is_configured() {
            result.flags.push(ScoreFlag::AnswerKeyMissing);
            return result;
        }

        let answer = match answer {
            None | Some(JsonValue::Null) => return result,
            Some(a) => a,
        };

        let graded = match &decoded.key {
            AnswerKey::Choice(correct) => grade_choice(correct, answer),
            AnswerKey::Short(segments) | AnswerKey::Long(segments) => {
                grade_segments(segments, answer, policy)
            }
            AnswerKey::Mixed(components) => grade_mixed(components, answer, policy),
        };

        match graded {
            Ok(outcome) => {
                result.is_correct = outcome.correct;
                result.points_awarded = round_points(question.points as f64 * outcome.fraction);
            }
            Err(flag) => {
                tracing::warn!(
                    question_id = %question.id,
                    question_type = %question.question_type,
                    ?flag,
                    "Submission shape mismatch, scoring as incorrect"
                );
                result.flags.push(flag);
            }
        }
        result
    }

    pub fn grade_submission(
        questions: &[Question],
        submission: &StudentSubmission,
        policy: &ScoringPolicy,
    ) -> SubmissionScore {
        for answer in &submission.answers {
            if !questions.iter().any(|q| q.id == answer.question_id) {
                tracing::warn!(
                    question_id = %answer.question_id,
                    exam_id = %submission.exam_id,
                    "Ignoring answer for a question outside this exam"
                );
            }
        }

        let mut ordered: Vec<&Question> = questions.iter().collect();
        ordered.sort_by_key(|q| q.question_number);

        let results: Vec<ScoreResult> = ordered
            .into_iter()
            .map(|q| Self::score(q, submission.answer_for(q.id), policy))
            .collect();

        let total_awarded = round_points(results.iter().map(|r| r.points_awarded).sum());
        let max_points: i32 = results.iter().map(|r| r.max_points).sum();
        let percentage = if max_points > 0 {
            round_points(total_awarded / max_points as f64 * 100.0)
        } else {
            0.0
        };

        SubmissionScore {
            results,
            total_awarded,
            max_points,
            percentage,
        }
    }
}

fn round_points(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mismatch(expected: usize, detail: impl Into<String>) -> ScoreFlag {
    ScoreFlag::ShapeMismatch {
        expected,
        detail: detail.into(),
    }
}

/// Accepts `"B"`, `"A,C"` or `["A", "C"]`.
fn submitted_letters(answer: &JsonValue) -> Option<BTreeSet<char>> {
    match answer {
        JsonValue::String(s) => s
            .split(',')
            .filter(|t| !t.trim().is_empty())
            .map(parse_letter)
            .collect(),
        JsonValue::Array(items) => items
            .iter()
            .map(|v| v.as_str().and_then(parse_letter))
            .collect(),
        _ => None,
    }
}

fn grade_choice(correct: &[char], answer: &JsonValue) -> Graded {
    let submitted =
        submitted_letters(answer).ok_or_else(|| mismatch(1, "expected option letters"))?;
    let expected: BTreeSet<char> = correct.iter().copied().collect();
    let correct = submitted == expected;
    Ok(Outcome {
        correct,
        fraction: if correct { 1.0 } else { 0.0 },
    })
}

fn text_matches(expected: &str, submitted: &str, policy: &ScoringPolicy) -> bool {
    let (expected, submitted) = (expected.trim(), submitted.trim());
    if policy.case_sensitive {
        expected == submitted
    } else {
        expected.to_lowercase() == submitted.to_lowercase()
    }
}

fn submitted_text(value: &JsonValue) -> Option<&str> {
    match value {
        JsonValue::String(s) => Some(s),
        JsonValue::Null => Some(""),
        _ => None,
    }
}

fn grade_segments(segments: &[String], answer: &JsonValue, policy: &ScoringPolicy) -> Graded {
    let expected = segments.len();
    let submitted: Vec<&str> = match answer {
        JsonValue::Array(items) => items
            .iter()
            .map(submitted_text)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| mismatch(expected, "expected text values"))?,
        JsonValue::String(s) if expected == 1 => vec![s.as_str()],
        _ => return Err(mismatch(expected, "expected a list of text values")),
    };
    if submitted.len() != expected {
        return Err(mismatch(
            expected,
            format!("received {} values", submitted.len()),
        ));
    }

    let matched = segments
        .iter()
        .zip(&submitted)
        .filter(|(e, s)| text_matches(e, s, policy))
        .count();
    let correct = matched == expected;
    let fraction = if correct {
        1.0
    } else if policy.partial_credit {
        matched as f64 / expected as f64
    } else {
        0.0
    };
    Ok(Outcome { correct, fraction })
}

fn grade_mixed(components: &[MixedComponent], answer: &JsonValue, policy: &ScoringPolicy) -> Graded {
    let expected = components.len();
    let JsonValue::Array(items) = answer else {
        return Err(mismatch(expected, "expected one value per component"));
    };
    if items.len() != expected {
        return Err(mismatch(expected, format!("received {} values", items.len())));
    }

    let mut matched = 0usize;
    for (component, value) in components.iter().zip(items) {
        let ok = match &component.correct {
            ComponentAnswer::Choice { letters, .. } => {
                if value.is_null() {
                    false
                } else {
                    let submitted = submitted_letters(value).ok_or_else(|| {
                        mismatch(expected, format!("component {} expects letters", component.index))
                    })?;
                    submitted == letters.iter().copied().collect::<BTreeSet<_>>()
                }
            }
            ComponentAnswer::Text { text } => {
                let submitted = submitted_text(value).ok_or_else(|| {
                    mismatch(expected, format!("component {} expects text", component.index))
                })?;
                text_matches(text, submitted, policy)
            }
        };
        if ok {
            matched += 1;
        }
    }

    let correct = matched == expected;
    let fraction = match policy.mixed_weighting {
        MixedWeighting::Equal => matched as f64 / expected as f64,
        MixedWeighting::AllOrNothing if correct => 1.0,
        MixedWeighting::AllOrNothing => 0.0,
    };
    Ok(Outcome { correct, fraction })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::submission::SubmittedAnswer;
    use serde_json::json;

    fn question(question_type: QuestionType, options_count: i32, answer: &str, points: i32) -> Question {
        Question {
            id: Uuid::new_v4(),
            exam_id: Uuid::nil(),
            question_number: 1,
            question_type,
            options_count,
            correct_answer: answer.to_string(),
            points,
        }
    }

    #[test]
    fn mcq_requires_exact_letter() {
        let q = question(QuestionType::Mcq, 4, "C", 2);
        let policy = ScoringPolicy::default();
        let hit = GradingService::score(&q, Some(&json!("c")), &policy);
        assert!(hit.is_correct);
        assert_eq!(hit.points_awarded, 2.0);

        let miss = GradingService::score(&q, Some(&json!(["C", "D"])), &policy);
        assert!(!miss.is_correct);
        assert_eq!(miss.points_awarded, 0.0);
        assert!(miss.flags.is_empty());
    }

    #[test]
    fn checkbox_is_order_independent() {
        let q = question(QuestionType::Checkbox, 5, "A,C,E", 3);
        let policy = ScoringPolicy::default();
        assert!(GradingService::score(&q, Some(&json!(["E", "A", "C"])), &policy).is_correct);
        assert!(GradingService::score(&q, Some(&json!("C,E,A")), &policy).is_correct);
        assert!(!GradingService::score(&q, Some(&json!(["A", "C"])), &policy).is_correct);
    }

    #[test]
    fn short_segments_all_or_nothing_by_default() {
        let q = question(QuestionType::Short, 3, "111|111|2222", 3);
        let policy = ScoringPolicy::default();
        let full = GradingService::score(&q, Some(&json!(["111", " 111 ", "2222"])), &policy);
        assert!(full.is_correct);
        assert_eq!(full.points_awarded, 3.0);

        let partial = GradingService::score(&q, Some(&json!(["111", "111", "9"])), &policy);
        assert!(!partial.is_correct);
        assert_eq!(partial.points_awarded, 0.0);
    }

    #[test]
    fn short_partial_credit_when_enabled() {
        let q = question(QuestionType::Short, 3, "a|b|c", 3);
        let policy = ScoringPolicy {
            partial_credit: true,
            ..ScoringPolicy::default()
        };
        let result = GradingService::score(&q, Some(&json!(["a", "x", "c"])), &policy);
        assert!(!result.is_correct);
        assert_eq!(result.points_awarded, 2.0);
    }

    #[test]
    fn case_sensitivity_is_configurable() {
        let q = question(QuestionType::Long, 1, "Mitochondria", 1);
        let strict = ScoringPolicy::default();
        assert!(!GradingService::score(&q, Some(&json!("mitochondria")), &strict).is_correct);

        let relaxed = ScoringPolicy {
            case_sensitive: false,
            ..ScoringPolicy::default()
        };
        assert!(GradingService::score(&q, Some(&json!("mitochondria")), &relaxed).is_correct);
    }

    #[test]
    fn wrong_segment_count_is_flagged_not_raised() {
        let q = question(QuestionType::Short, 2, "a|b", 2);
        let result = GradingService::score(&q, Some(&json!(["a"])), &ScoringPolicy::default());
        assert!(!result.is_correct);
        assert_eq!(result.points_awarded, 0.0);
        assert!(matches!(
            result.shape_mismatch(),
            Some(ScoreFlag::ShapeMismatch { expected: 2, .. })
        ));
    }

    #[test]
    fn mixed_equal_weighting_splits_points() {
        let q = question(
            QuestionType::Mixed,
            4,
            r#"[{"type":"MCQ","answer":"B"},{"type":"SHORT","answer":"water"},{"type":"MCQ","options":["A","D"]},{"type":"SHORT","answer":"ice"}]"#,
            4,
        );
        let policy = ScoringPolicy::default();
        let result = GradingService::score(
            &q,
            Some(&json!(["B", "water", ["D", "A"], "steam"])),
            &policy,
        );
        assert!(!result.is_correct);
        assert_eq!(result.points_awarded, 3.0);

        let all_or_nothing = ScoringPolicy {
            mixed_weighting: MixedWeighting::AllOrNothing,
            ..ScoringPolicy::default()
        };
        let strict = GradingService::score(
            &q,
            Some(&json!(["B", "water", ["D", "A"], "steam"])),
            &all_or_nothing,
        );
        assert_eq!(strict.points_awarded, 0.0);
    }

    #[test]
    fn mixed_component_count_mismatch() {
        let q = question(
            QuestionType::Mixed,
            3,
            r#"[{"type":"MCQ","answer":"A"},{"type":"SHORT","answer":"x"}]"#,
            2,
        );
        let result = GradingService::score(&q, Some(&json!(["A"])), &ScoringPolicy::default());
        assert!(result.shape_mismatch().is_some());
        assert_eq!(result.points_awarded, 0.0);
    }

    #[test]
    fn unanswered_and_unconfigured_questions() {
        let q = question(QuestionType::Mcq, 4, "A", 1);
        let unanswered = GradingService::score(&q, None, &ScoringPolicy::default());
        assert!(!unanswered.is_correct);
        assert!(unanswered.flags.is_empty());

        let broken = question(QuestionType::Mixed, 4, "{not valid", 1);
        let result = GradingService::score(&broken, Some(&json!(["A"])), &ScoringPolicy::default());
        assert_eq!(result.flags, vec![ScoreFlag::AnswerKeyMissing]);
    }

    #[test]
    fn mixed_choice_with_no_valid_letters_earns_nothing() {
        // "F" falls outside four options, leaving the MCQ part without a key
        let q = question(
            QuestionType::Mixed,
            4,
            r#"[{"type":"MCQ","answer":"F"},{"type":"SHORT","answer":"x"}]"#,
            2,
        );
        for blank in [json!(["", "nope"]), json!([[], "x"])] {
            let result = GradingService::score(&q, Some(&blank), &ScoringPolicy::default());
            assert!(!result.is_correct);
            assert_eq!(result.points_awarded, 0.0);
            assert_eq!(result.flags, vec![ScoreFlag::AnswerKeyMissing]);
        }
    }

    #[test]
    fn submission_totals() {
        let mut q1 = question(QuestionType::Mcq, 4, "A", 2);
        q1.question_number = 1;
        let mut q2 = question(QuestionType::Short, 2, "x|y", 3);
        q2.question_number = 2;
        let submission = StudentSubmission {
            exam_id: Uuid::nil(),
            student_id: Uuid::new_v4(),
            answers: vec![
                SubmittedAnswer {
                    question_id: q2.id,
                    answer: json!(["x", "y"]),
                },
                SubmittedAnswer {
                    question_id: q1.id,
                    answer: json!("B"),
                },
            ],
        };
        let score =
            GradingService::grade_submission(&[q2.clone(), q1.clone()], &submission, &ScoringPolicy::default());
        assert_eq!(score.results[0].question_id, q1.id);
        assert_eq!(score.total_awarded, 3.0);
        assert_eq!(score.max_points, 5);
        assert_eq!(score.percentage, 60.0);
    }
}
