pub mod exams;
pub mod health;
pub mod questions;
pub mod submissions;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{middleware::auth::require_bearer_auth, AppState};

/// Assembles the application router. Everything under `/api` requires a
/// bearer token.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/exams", get(exams::list_exams).post(exams::create_exam))
        .route("/api/exams/:id", delete(exams::delete_exam))
        .route("/api/exams/:id/access", put(exams::assign_access))
        .route(
            "/api/exams/:id/questions",
            get(questions::list_exam_questions).post(questions::create_question),
        )
        .route("/api/exams/:id/submissions", post(submissions::submit_exam))
        .route("/api/questions/preview", post(questions::preview_question))
        .route(
            "/api/questions/:id",
            put(questions::update_question).delete(questions::delete_question),
        )
        .route("/api/submissions/:id", get(submissions::get_submission))
        .layer(axum::middleware::from_fn(require_bearer_auth));

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
}
