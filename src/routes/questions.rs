use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::question_dto::{
        CreateQuestionPayload, QuestionDetailResponse, QuestionView, UpdateQuestionPayload,
    },
    error::{Error, Result},
    middleware::auth::Claims,
    routes::exams::requester_for,
    services::question_service::{PreparedQuestion, QuestionService},
    AppState,
};

fn detail(prepared: PreparedQuestion) -> QuestionDetailResponse {
    QuestionDetailResponse {
        view: QuestionView::new(&prepared.question, prepared.issues),
        correct_answer: prepared.question.correct_answer,
    }
}

async fn require_edit(state: &AppState, claims: &Claims, exam_id: Uuid) -> Result<()> {
    let requester = requester_for(state, claims).await?;
    let (_, access) = state.exam_service.authorize(exam_id, &requester).await?;
    if !access.can_edit {
        return Err(Error::Forbidden("view_only_access".to_string()));
    }
    Ok(())
}

#[axum::debug_handler]
pub async fn list_exam_questions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let requester = requester_for(&state, &claims).await?;
    state.exam_service.authorize(exam_id, &requester).await?;

    let questions = state.question_service.list_for_exam(exam_id).await?;
    let views: Vec<QuestionView> = questions
        .iter()
        .map(|q| QuestionView::new(q, Vec::new()))
        .collect();
    Ok(Json(views))
}

#[axum::debug_handler]
pub async fn create_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
    Json(payload): Json<CreateQuestionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    require_edit(&state, &claims, exam_id).await?;
    let prepared = state.question_service.create(exam_id, payload).await?;
    Ok((StatusCode::CREATED, Json(detail(prepared))))
}

#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<Uuid>,
    Json(payload): Json<UpdateQuestionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let existing = state.question_service.get(question_id).await?;
    require_edit(&state, &claims, existing.exam_id).await?;
    let prepared = state.question_service.update(question_id, payload).await?;
    Ok(Json(detail(prepared)))
}

#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let existing = state.question_service.get(question_id).await?;
    require_edit(&state, &claims, existing.exam_id).await?;
    state.question_service.delete(question_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Renders an unsaved question exactly as it would be stored, without
/// touching the database.
#[axum::debug_handler]
pub async fn preview_question(
    Extension(_claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let prepared = QuestionService::prepare_new(Uuid::nil(), payload)?;
    Ok(Json(detail(prepared)))
}
