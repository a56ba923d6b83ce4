use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::exam_dto::{AssignAccessPayload, CreateExamPayload, ExamListResponse, ListExamsQuery},
    error::{Error, Result},
    middleware::auth::Claims,
    models::user::Requester,
    services::{
        audit_service::{ACTION_ACCESS_ASSIGNED, ACTION_EXAM_DELETED},
        visibility_service::VisibilityService,
    },
    AppState,
};

pub(crate) async fn requester_for(state: &AppState, claims: &Claims) -> Result<Requester> {
    state
        .exam_service
        .load_requester(claims.user_id()?, claims.is_admin())
        .await
}

#[axum::debug_handler]
pub async fn list_exams(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListExamsQuery>,
) -> Result<impl IntoResponse> {
    let requester = requester_for(&state, &claims).await?;
    let scope = query.scope();
    let exams = state.exam_service.list_exams().await?;
    let items = VisibilityService::filter(exams, &requester, scope);

    tracing::debug!(requester = %requester.id, ?scope, visible = items.len(), "Listed exams");
    Ok(Json(ExamListResponse {
        total: items.len(),
        items,
        scope,
    }))
}

#[axum::debug_handler]
pub async fn create_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let exam = state.exam_service.create_exam(claims.user_id()?, payload).await?;
    Ok((StatusCode::CREATED, Json(exam)))
}

#[axum::debug_handler]
pub async fn delete_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let requester = requester_for(&state, &claims).await?;
    let (_, access) = state.exam_service.authorize(exam_id, &requester).await?;
    if !access.can_delete {
        return Err(Error::Forbidden("only the owner or an admin can delete an exam".to_string()));
    }

    state.exam_service.delete_exam(exam_id).await?;
    if let Err(e) = state
        .audit_service
        .log(Some(requester.id), ACTION_EXAM_DELETED, "exam", exam_id, None)
        .await
    {
        tracing::error!(error = ?e, %exam_id, "Failed to write audit log");
    }
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn assign_access(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
    Json(payload): Json<AssignAccessPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let requester = requester_for(&state, &claims).await?;
    let (_, access) = state.exam_service.authorize(exam_id, &requester).await?;
    if !access.can_delete {
        return Err(Error::Forbidden(
            "only the owner or an admin can change exam access".to_string(),
        ));
    }

    state
        .exam_service
        .set_access(exam_id, payload.teacher_id, payload.tier)
        .await?;
    if let Err(e) = state
        .audit_service
        .log(
            Some(requester.id),
            ACTION_ACCESS_ASSIGNED,
            "exam",
            exam_id,
            Some(json!({ "teacher_id": payload.teacher_id, "tier": payload.tier })),
        )
        .await
    {
        tracing::error!(error = ?e, %exam_id, "Failed to write audit log");
    }

    Ok(Json(json!({
        "exam_id": exam_id,
        "teacher_id": payload.teacher_id,
        "tier": payload.tier,
    })))
}
