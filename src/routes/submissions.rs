use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::submission_dto::{SubmitExamRequest, SubmitExamResponse},
    error::{Error, Result},
    middleware::auth::Claims,
    models::submission::StudentSubmission,
    AppState,
};

#[axum::debug_handler]
pub async fn submit_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
    Json(req): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse> {
    req.validate()?;
    // existence check; students are not subject to teacher visibility
    state.exam_service.get_exam(exam_id).await?;

    let questions = state.question_service.list_for_exam(exam_id).await?;
    if questions.is_empty() {
        return Err(Error::BadRequest("Exam has no questions".to_string()));
    }

    let submission = StudentSubmission {
        exam_id,
        student_id: claims.user_id()?,
        answers: req.answers,
    };
    let (stored, score) = state
        .submission_service
        .submit(&questions, submission, &state.scoring, &state.audit_service)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitExamResponse {
            submission_id: stored.id,
            score: score.total_awarded,
            max_score: score.max_points,
            percentage: score.percentage,
            results: score.results,
        }),
    ))
}

#[axum::debug_handler]
pub async fn get_submission(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(submission_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let submission = state.submission_service.get(submission_id).await?;
    if submission.student_id != claims.user_id()? && !claims.is_admin() {
        let requester = crate::routes::exams::requester_for(&state, &claims).await?;
        state
            .exam_service
            .authorize(submission.exam_id, &requester)
            .await?;
    }
    Ok(Json(submission))
}
