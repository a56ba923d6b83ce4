use crate::error::{Error, Result};
use crate::models::question::QuestionType;

pub const MIN_OPTIONS_COUNT: i32 = 2;
pub const MAX_OPTIONS_COUNT: i32 = 10;

pub const SHORT_DELIMITER: &str = "|";
pub const LONG_DELIMITER: &str = "|||";

/// Single place where a question's `options_count` is decided. Every save path
/// and every renderer goes through here.
pub struct OptionsCountResolver;

impl OptionsCountResolver {
    /// SHORT and LONG derive the count from their answer segments. MCQ,
    /// CHECKBOX and MIXED keep the teacher-authored value untouched.
    pub fn resolve(question_type: QuestionType, correct_answer: &str, current: i32) -> i32 {
        match question_type {
            QuestionType::Short => segment_count(correct_answer, SHORT_DELIMITER),
            QuestionType::Long => segment_count(correct_answer, LONG_DELIMITER),
            QuestionType::Mcq | QuestionType::Checkbox | QuestionType::Mixed => current,
        }
    }

    pub fn validate_requested(options_count: i32) -> Result<()> {
        if (MIN_OPTIONS_COUNT..=MAX_OPTIONS_COUNT).contains(&options_count) {
            Ok(())
        } else {
            Err(Error::OptionsCountOutOfRange(options_count))
        }
    }

    /// Resolves and checks the value that will be persisted. Derived counts
    /// may legitimately be 1 (a single blank) but never exceed the maximum.
    pub fn resolve_for_save(
        question_type: QuestionType,
        correct_answer: &str,
        current: i32,
    ) -> Result<i32> {
        let resolved = Self::resolve(question_type, correct_answer, current);
        if question_type.has_authored_options_count() {
            Self::validate_requested(resolved)?;
        } else if resolved > MAX_OPTIONS_COUNT {
            return Err(Error::OptionsCountOutOfRange(resolved));
        }
        Ok(resolved)
    }
}

fn segment_count(raw: &str, delimiter: &str) -> i32 {
    if raw.is_empty() {
        return 1;
    }
    (raw.split(delimiter).count() as i32).max(1)
}
