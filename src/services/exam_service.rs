use std::collections::{BTreeSet, HashMap};

use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::exam_dto::CreateExamPayload;
use crate::error::{Error, Result};
use crate::models::exam::{AccessTier, ClassAccessRow, Exam, ExamAccessRow, ExamClassCodeRow, ExamRow};
use crate::models::user::Requester;
use crate::services::visibility_service::{ExamAccess, VisibilityScope, VisibilityService};

#[derive(Clone)]
pub struct ExamService {
    pool: PgPool,
}

impl ExamService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Builds the requester from the authenticated identity and the teacher's
    /// class assignments.
    pub async fn load_requester(&self, user_id: Uuid, is_admin: bool) -> Result<Requester> {
        let rows = sqlx::query_as::<_, ClassAccessRow>(
            "SELECT class_code, tier FROM teacher_class_access WHERE teacher_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut class_assignments = HashMap::new();
        for row in rows {
            match row.tier.parse::<AccessTier>() {
                Ok(tier) => {
                    class_assignments.insert(row.class_code, tier);
                }
                Err(e) => tracing::warn!(teacher_id = %user_id, class_code = %row.class_code, "Skipping class assignment: {}", e),
            }
        }

        Ok(Requester {
            id: user_id,
            is_admin,
            class_assignments,
        })
    }

    pub async fn list_exams(&self) -> Result<Vec<Exam>> {
        let rows = sqlx::query_as::<_, ExamRow>(
            "SELECT id, owner_id, title, is_admin_visible, created_at FROM exams ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        self.assemble(rows, &ids).await
    }

    pub async fn get_exam(&self, exam_id: Uuid) -> Result<Exam> {
        let row = sqlx::query_as::<_, ExamRow>(
            "SELECT id, owner_id, title, is_admin_visible, created_at FROM exams WHERE id = $1",
        )
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Exam not found".to_string()))?;

        self.assemble(vec![row], &[exam_id])
            .await?
            .pop()
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))
    }

    /// Loads the exam and checks the requester can see it at all.
    pub async fn authorize(&self, exam_id: Uuid, requester: &Requester) -> Result<(Exam, ExamAccess)> {
        let exam = self.get_exam(exam_id).await?;
        match VisibilityService::evaluate(&exam, requester, VisibilityScope::All) {
            Some(access) => Ok((exam, access)),
            None => Err(Error::Forbidden("exam_not_accessible".to_string())),
        }
    }

    pub async fn create_exam(&self, owner_id: Uuid, payload: CreateExamPayload) -> Result<Exam> {
        if let Some(code) = payload.invalid_class_code() {
            return Err(Error::BadRequest(format!("Invalid class code: {:?}", code)));
        }

        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, ExamRow>(
            r#"
            INSERT INTO exams (id, owner_id, title, is_admin_visible)
            VALUES ($1, $2, $3, $4)
            RETURNING id, owner_id, title, is_admin_visible, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(payload.title.trim())
        .bind(payload.is_admin_visible)
        .fetch_one(&mut *tx)
        .await?;

        let class_codes: BTreeSet<String> = payload
            .class_codes
            .iter()
            .map(|c| c.trim().to_string())
            .collect();
        for code in &class_codes {
            sqlx::query("INSERT INTO exam_class_codes (exam_id, class_code) VALUES ($1, $2)")
                .bind(row.id)
                .bind(code)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::info!(exam_id = %row.id, owner_id = %owner_id, classes = class_codes.len(), "Exam created");
        Ok(Exam {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            class_codes,
            access_assignments: HashMap::new(),
            is_admin_visible: row.is_admin_visible,
            created_at: row.created_at,
        })
    }

    pub async fn set_access(&self, exam_id: Uuid, teacher_id: Uuid, tier: AccessTier) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO exam_access (exam_id, teacher_id, tier)
            VALUES ($1, $2, $3)
            ON CONFLICT (exam_id, teacher_id) DO UPDATE SET tier = EXCLUDED.tier
            "#,
        )
        .bind(exam_id)
        .bind(teacher_id)
        .bind(tier.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Questions and submissions go with it through `ON DELETE CASCADE`.
    pub async fn delete_exam(&self, exam_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM exams WHERE id = $1")
            .bind(exam_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Exam not found".to_string()));
        }
        Ok(())
    }

    async fn assemble(&self, rows: Vec<ExamRow>, ids: &[Uuid]) -> Result<Vec<Exam>> {
        let codes = sqlx::query_as::<_, ExamClassCodeRow>(
            "SELECT exam_id, class_code FROM exam_class_codes WHERE exam_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let grants = sqlx::query_as::<_, ExamAccessRow>(
            "SELECT exam_id, teacher_id, tier FROM exam_access WHERE exam_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut codes_by_exam: HashMap<Uuid, BTreeSet<String>> = HashMap::new();
        for c in codes {
            codes_by_exam.entry(c.exam_id).or_default().insert(c.class_code);
        }

        let mut grants_by_exam: HashMap<Uuid, HashMap<Uuid, AccessTier>> = HashMap::new();
        for g in grants {
            match g.tier.parse::<AccessTier>() {
                Ok(tier) => {
                    grants_by_exam
                        .entry(g.exam_id)
                        .or_default()
                        .insert(g.teacher_id, tier);
                }
                Err(e) => tracing::warn!(exam_id = %g.exam_id, "Skipping exam grant: {}", e),
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| Exam {
                class_codes: codes_by_exam.remove(&row.id).unwrap_or_default(),
                access_assignments: grants_by_exam.remove(&row.id).unwrap_or_default(),
                id: row.id,
                owner_id: row.owner_id,
                title: row.title,
                is_admin_visible: row.is_admin_visible,
                created_at: row.created_at,
            })
            .collect())
    }
}
