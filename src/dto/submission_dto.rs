use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::submission::SubmittedAnswer;
use crate::services::grading_service::ScoreResult;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitExamRequest {
    #[validate(length(min = 1, message = "No answers submitted"))]
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitExamResponse {
    pub submission_id: Uuid,
    pub score: f64,
    pub max_score: i32,
    pub percentage: f64,
    pub results: Vec<ScoreResult>,
}
