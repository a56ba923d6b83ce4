use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::dto::question_dto::{CreateQuestionPayload, UpdateQuestionPayload};
use crate::error::{Error, Result};
use crate::models::question::{Question, QuestionRow, QuestionType};
use crate::services::answer_key_codec::{AnswerKeyCodec, AnswerKeyIssue};
use crate::services::options_count_resolver::OptionsCountResolver;

const QUESTION_COLUMNS: &str =
    "id, exam_id, question_number, question_type, options_count, correct_answer, points";

/// A question ready to be written, plus whatever the codec had to drop while
/// canonicalizing its answer.
#[derive(Debug, Clone)]
pub struct PreparedQuestion {
    pub question: Question,
    pub issues: Vec<AnswerKeyIssue>,
}

#[derive(Clone)]
pub struct QuestionService {
    pool: PgPool,
}

impl QuestionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn prepare_new(exam_id: Uuid, payload: CreateQuestionPayload) -> Result<PreparedQuestion> {
        let requested = match (payload.options_count, payload.question_type.has_authored_options_count()) {
            (Some(count), _) => {
                OptionsCountResolver::validate_requested(count)?;
                count
            }
            (None, true) => {
                return Err(Error::BadRequest(format!(
                    "options_count is required for {} questions",
                    payload.question_type
                )))
            }
            (None, false) => 1,
        };

        let draft = Question {
            id: Uuid::new_v4(),
            exam_id,
            question_number: payload.question_number,
            question_type: payload.question_type,
            options_count: requested,
            correct_answer: payload.correct_answer,
            points: payload.points,
        };
        finalize(draft)
    }

    /// Merges an edit into the stored question. Fields left out keep their
    /// stored values, so a MIXED width set earlier survives later edits.
    pub fn prepare_update(existing: &Question, payload: UpdateQuestionPayload) -> Result<PreparedQuestion> {
        if let Some(count) = payload.options_count {
            OptionsCountResolver::validate_requested(count)?;
        }

        let draft = Question {
            id: existing.id,
            exam_id: existing.exam_id,
            question_number: payload.question_number.unwrap_or(existing.question_number),
            question_type: payload.question_type.unwrap_or(existing.question_type),
            options_count: payload.options_count.unwrap_or(existing.options_count),
            correct_answer: payload
                .correct_answer
                .unwrap_or_else(|| existing.correct_answer.clone()),
            points: payload.points.unwrap_or(existing.points),
        };
        finalize(draft)
    }

    pub async fn create(&self, exam_id: Uuid, payload: CreateQuestionPayload) -> Result<PreparedQuestion> {
        let prepared = Self::prepare_new(exam_id, payload)?;
        let q = &prepared.question;

        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            r#"
            INSERT INTO questions (id, exam_id, question_number, question_type, options_count, correct_answer, points)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(q.id)
        .bind(q.exam_id)
        .bind(q.question_number)
        .bind(q.question_type.as_str())
        .bind(q.options_count)
        .bind(&q.correct_answer)
        .bind(q.points)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_violation)?;
        tx.commit().await?;

        tracing::info!(
            question_id = %row.id,
            exam_id = %row.exam_id,
            question_type = %row.question_type,
            options_count = row.options_count,
            "Question created"
        );
        Ok(PreparedQuestion {
            question: Question::try_from(row)?,
            issues: prepared.issues,
        })
    }

    /// Resolve and write happen in one transaction with the row locked, so two
    /// concurrent edits cannot interleave between them.
    pub async fn update(&self, question_id: Uuid, payload: UpdateQuestionPayload) -> Result<PreparedQuestion> {
        let mut tx = self.pool.begin().await?;
        let existing = lock_question(&mut tx, question_id).await?;
        let prepared = Self::prepare_update(&existing, payload)?;
        let q = &prepared.question;

        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            r#"
            UPDATE questions
            SET question_number = $1,
                question_type = $2,
                options_count = $3,
                correct_answer = $4,
                points = $5,
                updated_at = NOW()
            WHERE id = $6
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(q.question_number)
        .bind(q.question_type.as_str())
        .bind(q.options_count)
        .bind(&q.correct_answer)
        .bind(q.points)
        .bind(q.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_violation)?;
        tx.commit().await?;

        if existing.options_count != row.options_count {
            tracing::info!(
                question_id = %row.id,
                from = existing.options_count,
                to = row.options_count,
                "options_count changed"
            );
        }
        Ok(PreparedQuestion {
            question: Question::try_from(row)?,
            issues: prepared.issues,
        })
    }

    pub async fn get(&self, question_id: Uuid) -> Result<Question> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
        ))
        .bind(question_id)
        .fetch_one(&self.pool)
        .await?;
        Question::try_from(row)
    }

    pub async fn list_for_exam(&self, exam_id: Uuid) -> Result<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY question_number"
        ))
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Question::try_from).collect()
    }

    pub async fn delete(&self, question_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(question_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Question not found".to_string()));
        }
        Ok(())
    }
}

async fn lock_question(tx: &mut Transaction<'_, Postgres>, question_id: Uuid) -> Result<Question> {
    let row = sqlx::query_as::<_, QuestionRow>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1 FOR UPDATE"
    ))
    .bind(question_id)
    .fetch_one(&mut **tx)
    .await?;
    Question::try_from(row)
}

/// Canonicalizes the answer string and settles `options_count`.
fn finalize(mut question: Question) -> Result<PreparedQuestion> {
    let mut issues = Vec::new();

    match question.question_type {
        QuestionType::Mcq | QuestionType::Checkbox => {
            let decoded = AnswerKeyCodec::decode(
                question.question_type,
                &question.correct_answer,
                question.options_count,
            );
            question.correct_answer = AnswerKeyCodec::encode(&decoded.key);
            issues = decoded.issues;
        }
        QuestionType::Mixed => {
            if question.correct_answer.trim().is_empty() {
                question.correct_answer = "[]".to_string();
            }
            let decoded = AnswerKeyCodec::decode(
                question.question_type,
                &question.correct_answer,
                question.options_count,
            );
            if let Some(issue) = decoded.issues.iter().find(|i| {
                matches!(i, AnswerKeyIssue::MalformedAnswerKey { .. })
            }) {
                return Err(Error::BadRequest(issue.to_string()));
            }
            question.correct_answer = AnswerKeyCodec::encode(&decoded.key);
            issues = decoded.issues;
        }
        // SHORT/LONG strings are already in their stored form
        QuestionType::Short | QuestionType::Long => {}
    }

    question.options_count = OptionsCountResolver::resolve_for_save(
        question.question_type,
        &question.correct_answer,
        question.options_count,
    )?;

    Ok(PreparedQuestion { question, issues })
}

fn map_unique_violation(err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return Error::BadRequest("question_number is already used in this exam".to_string());
        }
    }
    Error::from(err)
}
