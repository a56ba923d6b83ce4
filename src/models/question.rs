use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuestionType {
    Mcq,
    Checkbox,
    Short,
    Long,
    Mixed,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "MCQ",
            QuestionType::Checkbox => "CHECKBOX",
            QuestionType::Short => "SHORT",
            QuestionType::Long => "LONG",
            QuestionType::Mixed => "MIXED",
        }
    }

    /// Whether `options_count` is authored by the teacher rather than derived
    /// from the answer text.
    pub fn has_authored_options_count(&self) -> bool {
        matches!(
            self,
            QuestionType::Mcq | QuestionType::Checkbox | QuestionType::Mixed
        )
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MCQ" => Ok(QuestionType::Mcq),
            "CHECKBOX" => Ok(QuestionType::Checkbox),
            "SHORT" => Ok(QuestionType::Short),
            "LONG" => Ok(QuestionType::Long),
            "MIXED" => Ok(QuestionType::Mixed),
            other => Err(format!("unknown question type: {}", other)),
        }
    }
}

/// Sub-component kinds allowed inside a MIXED question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComponentType {
    Mcq,
    Short,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub question_number: i32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options_count: i32,
    pub correct_answer: String,
    pub points: i32,
}

/// Row shape of the `questions` table; the type column is plain text.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub question_number: i32,
    pub question_type: String,
    pub options_count: i32,
    pub correct_answer: String,
    pub points: i32,
}

impl TryFrom<QuestionRow> for Question {
    type Error = crate::error::Error;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let question_type = row
            .question_type
            .parse::<QuestionType>()
            .map_err(crate::error::Error::Internal)?;
        Ok(Self {
            id: row.id,
            exam_id: row.exam_id,
            question_number: row.question_number,
            question_type,
            options_count: row.options_count,
            correct_answer: row.correct_answer,
            points: row.points,
        })
    }
}
