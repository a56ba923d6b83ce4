use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::question::{Question, QuestionType};
use crate::services::answer_key_codec::AnswerKeyIssue;
use crate::services::question_schema::{QuestionSchema, WidgetSpec};

fn default_question_number() -> i32 {
    1
}

fn default_points() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionPayload {
    #[serde(default = "default_question_number")]
    #[validate(range(min = 1, message = "question_number starts at 1"))]
    pub question_number: i32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// Required for MCQ, CHECKBOX and MIXED; derived for SHORT and LONG.
    pub options_count: Option<i32>,
    #[serde(default)]
    #[validate(length(max = 10000))]
    pub correct_answer: String,
    #[serde(default = "default_points")]
    #[validate(range(min = 1, max = 10, message = "points must be between 1 and 10"))]
    pub points: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateQuestionPayload {
    #[validate(range(min = 1, message = "question_number starts at 1"))]
    pub question_number: Option<i32>,
    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,
    /// Omitted means "keep the stored value".
    pub options_count: Option<i32>,
    #[validate(length(max = 10000))]
    pub correct_answer: Option<String>,
    #[validate(range(min = 1, max = 10, message = "points must be between 1 and 10"))]
    pub points: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub question_number: i32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options_count: i32,
    pub points: i32,
    pub widget: WidgetSpec,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<AnswerKeyIssue>,
}

impl QuestionView {
    pub fn new(question: &Question, issues: Vec<AnswerKeyIssue>) -> Self {
        Self {
            id: question.id,
            exam_id: question.exam_id,
            question_number: question.question_number,
            question_type: question.question_type,
            options_count: question.options_count,
            points: question.points,
            widget: QuestionSchema::render_spec(question),
            issues,
        }
    }
}

/// Authoring view: the rendered widgets plus the stored answer key.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionDetailResponse {
    #[serde(flatten)]
    pub view: QuestionView,
    pub correct_answer: String,
}
