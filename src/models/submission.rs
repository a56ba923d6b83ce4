use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: Uuid,
    /// Shape depends on the question type: a letter or list of letters for
    /// MCQ/CHECKBOX, a list of strings for SHORT/LONG, a list of per-component
    /// values for MIXED.
    #[serde(default)]
    pub answer: JsonValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentSubmission {
    pub exam_id: Uuid,
    pub student_id: Uuid,
    pub answers: Vec<SubmittedAnswer>,
}

impl StudentSubmission {
    pub fn answer_for(&self, question_id: Uuid) -> Option<&JsonValue> {
        self.answers
            .iter()
            .find(|a| a.question_id == question_id)
            .map(|a| &a.answer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GradedSubmission {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub student_id: Uuid,
    pub answers: JsonValue,
    pub results: JsonValue,
    pub total_awarded: f64,
    pub max_points: i32,
    pub percentage: f64,
    pub graded_at: DateTime<Utc>,
}
