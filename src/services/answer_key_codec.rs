//! Conversion between a question's stored `correct_answer` string and its
//! structured answer key.
//!
//! Stored formats are persisted data and must stay stable:
//! * SHORT: segments joined with `|`
//! * LONG: segments joined with `|||`
//! * MCQ / CHECKBOX: a letter, or comma-joined letters (`A,C`)
//! * MIXED: JSON array of `{"type": "MCQ", "answer": "B"}`,
//!   `{"type": "MCQ", "options": ["A", "C"]}` or `{"type": "SHORT", "answer": "..."}`

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::question::{ComponentType, QuestionType};
use crate::services::options_count_resolver::{LONG_DELIMITER, SHORT_DELIMITER};
use crate::utils::letters::{letter_in_range, option_letters, parse_letter};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerKey {
    /// MCQ and CHECKBOX; sorted, without duplicates.
    Choice(Vec<char>),
    Short(Vec<String>),
    Long(Vec<String>),
    Mixed(Vec<MixedComponent>),
}

impl AnswerKey {
    pub fn empty_for(question_type: QuestionType) -> Self {
        match question_type {
            QuestionType::Mcq | QuestionType::Checkbox => AnswerKey::Choice(Vec::new()),
            QuestionType::Short => AnswerKey::Short(Vec::new()),
            QuestionType::Long => AnswerKey::Long(Vec::new()),
            QuestionType::Mixed => AnswerKey::Mixed(Vec::new()),
        }
    }

    /// False when there is nothing a submission could be graded against.
    pub fn is_configured(&self) -> bool {
        match self {
            AnswerKey::Choice(letters) => !letters.is_empty(),
            AnswerKey::Short(segments) | AnswerKey::Long(segments) => {
                segments.iter().any(|s| !s.trim().is_empty())
            }
            AnswerKey::Mixed(components) => {
                !components.is_empty()
                    && components.iter().all(|c| match &c.correct {
                        ComponentAnswer::Choice { letters, .. } => !letters.is_empty(),
                        ComponentAnswer::Text { .. } => true,
                    })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentAnswer {
    Choice {
        letters: Vec<char>,
        /// Stored as an `options` array rather than a single `answer`.
        multiple: bool,
    },
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixedComponent {
    pub component_type: ComponentType,
    pub index: usize,
    /// Choice labels offered by an MCQ component; always `A..` up to the
    /// question's `options_count`. Empty for SHORT components.
    pub options: Vec<char>,
    pub correct: ComponentAnswer,
}

impl MixedComponent {
    pub fn mcq(index: usize, letters: Vec<char>, multiple: bool, options_count: i32) -> Self {
        Self {
            component_type: ComponentType::Mcq,
            index,
            options: option_letters(options_count),
            correct: ComponentAnswer::Choice { letters, multiple },
        }
    }

    pub fn short(index: usize, text: impl Into<String>) -> Self {
        Self {
            component_type: ComponentType::Short,
            index,
            options: Vec::new(),
            correct: ComponentAnswer::Text { text: text.into() },
        }
    }
}

/// Recoverable problems found while decoding. They never abort a decode.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerKeyIssue {
    #[error("malformed answer key: {reason}")]
    MalformedAnswerKey { reason: String },

    #[error("answer letter {letter:?} is outside the {options_count} configured options")]
    AnswerLetterOutOfRange { letter: String, options_count: i32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub key: AnswerKey,
    pub issues: Vec<AnswerKeyIssue>,
}

impl Decoded {
    pub fn is_malformed(&self) -> bool {
        self.issues
            .iter()
            .any(|i| matches!(i, AnswerKeyIssue::MalformedAnswerKey { .. }))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredComponent {
    #[serde(rename = "type")]
    component_type: ComponentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<Vec<String>>,
}

pub struct AnswerKeyCodec;

impl AnswerKeyCodec {
    pub fn encode(key: &AnswerKey) -> String {
        match key {
            AnswerKey::Choice(letters) => join_letters(letters),
            AnswerKey::Short(segments) => segments.join(SHORT_DELIMITER),
            AnswerKey::Long(segments) => segments.join(LONG_DELIMITER),
            AnswerKey::Mixed(components) => {
                let stored: Vec<StoredComponent> = components.iter().map(to_stored).collect();
                serde_json::to_string(&stored).unwrap_or_else(|_| "[]".to_string())
            }
        }
    }

    /// The question type alone picks the format; the raw string is never
    /// inspected to guess it.
    pub fn decode(question_type: QuestionType, raw: &str, options_count: i32) -> Decoded {
        let mut issues = Vec::new();
        let key = match question_type {
            QuestionType::Mcq | QuestionType::Checkbox => {
                AnswerKey::Choice(decode_letters(raw.split(','), options_count, &mut issues))
            }
            QuestionType::Short => AnswerKey::Short(split_segments(raw, SHORT_DELIMITER)),
            QuestionType::Long => AnswerKey::Long(split_segments(raw, LONG_DELIMITER)),
            QuestionType::Mixed => match decode_mixed(raw, options_count, &mut issues) {
                Ok(components) => AnswerKey::Mixed(components),
                Err(reason) => {
                    tracing::warn!(%reason, "Malformed MIXED answer key, treating as unconfigured");
                    issues.push(AnswerKeyIssue::MalformedAnswerKey { reason });
                    AnswerKey::Mixed(Vec::new())
                }
            },
        };
        Decoded { key, issues }
    }
}

fn join_letters(letters: &[char]) -> String {
    letters
        .iter()
        .map(char::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// An empty string is an empty key, not one blank segment.
fn split_segments(raw: &str, delimiter: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(delimiter).map(str::to_string).collect()
}

fn decode_letters<'a>(
    tokens: impl IntoIterator<Item = &'a str>,
    options_count: i32,
    issues: &mut Vec<AnswerKeyIssue>,
) -> Vec<char> {
    let mut letters = BTreeSet::new();
    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match parse_letter(token) {
            Some(letter) if letter_in_range(letter, options_count) => {
                letters.insert(letter);
            }
            _ => {
                tracing::warn!(
                    letter = token,
                    options_count,
                    "Dropping answer letter outside configured options"
                );
                issues.push(AnswerKeyIssue::AnswerLetterOutOfRange {
                    letter: token.to_string(),
                    options_count,
                });
            }
        }
    }
    letters.into_iter().collect()
}

fn decode_mixed(
    raw: &str,
    options_count: i32,
    issues: &mut Vec<AnswerKeyIssue>,
) -> Result<Vec<MixedComponent>, String> {
    let stored: Vec<StoredComponent> =
        serde_json::from_str(raw).map_err(|e| format!("invalid MIXED JSON: {}", e))?;

    let mut components = Vec::with_capacity(stored.len());
    for (index, item) in stored.into_iter().enumerate() {
        let component = match item.component_type {
            ComponentType::Mcq => match (item.options, item.answer) {
                (Some(options), _) => {
                    let letters =
                        decode_letters(options.iter().map(String::as_str), options_count, issues);
                    MixedComponent::mcq(index, letters, true, options_count)
                }
                (None, Some(answer)) => {
                    let letters = decode_letters(answer.split(','), options_count, issues);
                    MixedComponent::mcq(index, letters, false, options_count)
                }
                (None, None) => {
                    return Err(format!("MCQ component {} has no answer", index));
                }
            },
            ComponentType::Short => match item.answer {
                Some(text) => MixedComponent::short(index, text),
                None => return Err(format!("SHORT component {} has no answer", index)),
            },
        };
        components.push(component);
    }
    Ok(components)
}

fn to_stored(component: &MixedComponent) -> StoredComponent {
    match &component.correct {
        ComponentAnswer::Choice {
            letters,
            multiple: true,
        } => StoredComponent {
            component_type: ComponentType::Mcq,
            answer: None,
            options: Some(letters.iter().map(char::to_string).collect()),
        },
        ComponentAnswer::Choice {
            letters,
            multiple: false,
        } => StoredComponent {
            component_type: ComponentType::Mcq,
            answer: Some(join_letters(letters)),
            options: None,
        },
        ComponentAnswer::Text { text } => StoredComponent {
            component_type: ComponentType::Short,
            answer: Some(text.clone()),
            options: None,
        },
    }
}
