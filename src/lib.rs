pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    audit_service::AuditService, exam_service::ExamService, grading_service::ScoringPolicy,
    question_service::QuestionService, submission_service::SubmissionService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub exam_service: ExamService,
    pub question_service: QuestionService,
    pub submission_service: SubmissionService,
    pub audit_service: AuditService,
    pub scoring: ScoringPolicy,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();

        Self {
            exam_service: ExamService::new(pool.clone()),
            question_service: QuestionService::new(pool.clone()),
            submission_service: SubmissionService::new(pool.clone()),
            audit_service: AuditService::new(pool.clone()),
            scoring: config.scoring.clone(),
            pool,
        }
    }
}
