use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::question::Question;
use crate::models::submission::{GradedSubmission, StudentSubmission};
use crate::services::audit_service::{AuditService, ACTION_SUBMISSION_SHAPE_MISMATCH};
use crate::services::grading_service::{GradingService, ScoringPolicy, SubmissionScore};

const SUBMISSION_COLUMNS: &str =
    "id, exam_id, student_id, answers, results, total_awarded, max_points, percentage, graded_at";

#[derive(Clone)]
pub struct SubmissionService {
    pool: PgPool,
}

impl SubmissionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grades once and stores the result; stored submissions are never
    /// re-graded or updated.
    pub async fn submit(
        &self,
        questions: &[Question],
        submission: StudentSubmission,
        policy: &ScoringPolicy,
        audit: &AuditService,
    ) -> Result<(GradedSubmission, SubmissionScore)> {
        let score = GradingService::grade_submission(questions, &submission, policy);

        let mut tx = self.pool.begin().await?;
        let stored = sqlx::query_as::<_, GradedSubmission>(&format!(
            r#"
            INSERT INTO submissions (id, exam_id, student_id, answers, results, total_awarded, max_points, percentage)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {SUBMISSION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(submission.exam_id)
        .bind(submission.student_id)
        .bind(serde_json::to_value(&submission.answers)?)
        .bind(serde_json::to_value(&score.results)?)
        .bind(score.total_awarded)
        .bind(score.max_points)
        .bind(score.percentage)
        .fetch_one(&mut *tx)
        .await?;

        // one row per graded question; removed with the question it answers
        for result in &score.results {
            let answer = submission
                .answer_for(result.question_id)
                .cloned()
                .unwrap_or(JsonValue::Null);
            sqlx::query(
                r#"
                INSERT INTO submission_answers (submission_id, question_id, answer, is_correct, points_awarded)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(stored.id)
            .bind(result.question_id)
            .bind(answer)
            .bind(result.is_correct)
            .bind(result.points_awarded)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        for result in &score.results {
            if let Some(flag) = result.shape_mismatch() {
                // a failed audit write does not fail the submission
                if let Err(e) = audit
                    .log(
                        Some(submission.student_id),
                        ACTION_SUBMISSION_SHAPE_MISMATCH,
                        "question",
                        result.question_id,
                        Some(json!({
                            "submission_id": stored.id,
                            "flag": flag,
                        })),
                    )
                    .await
                {
                    tracing::error!(error = ?e, submission_id = %stored.id, "Failed to write audit log");
                }
            }
        }

        tracing::info!(
            submission_id = %stored.id,
            exam_id = %stored.exam_id,
            score = stored.total_awarded,
            max = stored.max_points,
            "Submission graded"
        );
        Ok((stored, score))
    }

    pub async fn get(&self, submission_id: Uuid) -> Result<GradedSubmission> {
        let row = sqlx::query_as::<_, GradedSubmission>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1"
        ))
        .bind(submission_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
