use crate::error::Result;
use crate::models::audit_log::AuditLog;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

pub const ACTION_SUBMISSION_SHAPE_MISMATCH: &str = "submission_shape_mismatch";
pub const ACTION_EXAM_DELETED: &str = "exam_deleted";
pub const ACTION_ACCESS_ASSIGNED: &str = "access_assigned";

#[derive(Clone)]
pub struct AuditService {
    pool: PgPool,
}

impl AuditService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn log(
        &self,
        user_id: Option<Uuid>,
        action: &str,
        entity_type: &str,
        entity_id: Uuid,
        details: Option<JsonValue>,
    ) -> Result<AuditLog> {
        let row = sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (user_id, action, entity_type, entity_id, details)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, action, entity_type, entity_id, details, created_at
            "#,
        )
        .bind(user_id)
        .bind(action)
        .bind(entity_type)
        .bind(entity_id)
        .bind(details)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
