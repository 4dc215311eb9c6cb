use crate::dto::admin_dto::{
    CreateQuestionPayload, CreateTestPayload, UpdateQuestionPayload, UpdateTestPayload,
};
use crate::error::{Error, Result};
use crate::models::question::{Question, QuestionType};
use crate::models::test::{Test, TestType};
use crate::utils::pagination::page_offset;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, serde::Serialize)]
pub struct PaginatedTests {
    #[serde(rename = "items")]
    pub tests: Vec<Test>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Default)]
pub struct TestFilter {
    pub is_active: Option<bool>,
    pub test_type: Option<TestType>,
    pub search: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct TestWithQuestions {
    #[serde(flatten)]
    pub test: Test,
    pub questions: Vec<Question>,
}

/// Question bank access: tests and their ordered questions.
#[derive(Clone)]
pub struct TestService {
    pool: PgPool,
}

impl TestService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_test(&self, payload: CreateTestPayload) -> Result<TestWithQuestions> {
        payload.validate()?;
        let initial = payload.questions.unwrap_or_default();
        for q in &initial {
            q.validate()?;
            check_question_shape(q.question_type, q.options.as_deref(), q.correct_answer.as_deref())?;
        }

        let mut tx = self.pool.begin().await?;
        let test = sqlx::query_as::<_, Test>(
            r#"
            INSERT INTO tests (name, test_type, description, instructions, time_limit_minutes, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(payload.name.trim())
        .bind(payload.test_type.as_str())
        .bind(payload.description)
        .bind(payload.instructions)
        .bind(payload.time_limit_minutes)
        .bind(payload.is_active.unwrap_or(true))
        .fetch_one(&mut *tx)
        .await?;

        let mut questions = Vec::with_capacity(initial.len());
        for (idx, q) in initial.into_iter().enumerate() {
            let order_index = q.order_index.unwrap_or(idx as i32 + 1);
            questions.push(insert_question(&mut tx, test.id, q, order_index).await?);
        }
        let test = recompute_total(&mut tx, test.id).await?;
        tx.commit().await?;

        questions.sort_by_key(|q| (q.order_index, q.id));
        tracing::info!(test_id = %test.id, test_type = %test.test_type, questions = questions.len(), "test created");
        Ok(TestWithQuestions { test, questions })
    }

    pub async fn find_test(&self, test_id: Uuid) -> Result<Option<Test>> {
        let test = sqlx::query_as::<_, Test>("SELECT * FROM tests WHERE id = $1")
            .bind(test_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(test)
    }

    pub async fn get_test_by_id(&self, test_id: Uuid) -> Result<Test> {
        self.find_test(test_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Test {} not found", test_id)))
    }

    pub async fn update_test(&self, test_id: Uuid, payload: UpdateTestPayload) -> Result<Test> {
        payload.validate()?;
        let test = sqlx::query_as::<_, Test>(
            r#"
            UPDATE tests
            SET
                name = COALESCE($1, name),
                test_type = COALESCE($2, test_type),
                description = COALESCE($3, description),
                instructions = COALESCE($4, instructions),
                time_limit_minutes = COALESCE($5, time_limit_minutes),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(payload.name)
        .bind(payload.test_type.map(|t| t.as_str()))
        .bind(payload.description)
        .bind(payload.instructions)
        .bind(payload.time_limit_minutes)
        .bind(payload.is_active)
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Test {} not found", test_id)))?;

        Ok(test)
    }

    pub async fn list_tests(
        &self,
        page: i64,
        per_page: i64,
        filter: TestFilter,
    ) -> Result<PaginatedTests> {
        let page = page.max(1);
        let offset = page_offset(page, per_page)?;
        let test_type = filter.test_type.map(|t| t.as_str());
        let search = filter
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM tests
            WHERE ($1::bool IS NULL OR is_active = $1)
              AND ($2::text IS NULL OR test_type = $2)
              AND ($3::text IS NULL OR (name ILIKE $3 OR description ILIKE $3))
            "#,
        )
        .bind(filter.is_active)
        .bind(test_type)
        .bind(search.clone())
        .fetch_one(&self.pool)
        .await?;

        let tests = sqlx::query_as::<_, Test>(
            r#"
            SELECT * FROM tests
            WHERE ($1::bool IS NULL OR is_active = $1)
              AND ($2::text IS NULL OR test_type = $2)
              AND ($3::text IS NULL OR (name ILIKE $3 OR description ILIKE $3))
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.is_active)
        .bind(test_type)
        .bind(search)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total_pages = if per_page > 0 {
            ((total as f64) / (per_page as f64)).ceil() as i64
        } else {
            1
        };

        Ok(PaginatedTests {
            tests,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    /// Deletes a test and its questions. Tests with recorded attempts are kept.
    pub async fn delete_test(&self, test_id: Uuid) -> Result<()> {
        let attempts: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM test_attempts WHERE test_id = $1")
                .bind(test_id)
                .fetch_one(&self.pool)
                .await?;
        if attempts > 0 {
            return Err(Error::Conflict(format!(
                "Test has {} recorded attempt(s); deactivate it instead",
                attempts
            )));
        }

        let result = sqlx::query("DELETE FROM tests WHERE id = $1")
            .bind(test_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Test {} not found", test_id)));
        }
        tracing::info!(test_id = %test_id, "test deleted");
        Ok(())
    }

    /// Questions of a test in presentation order.
    pub async fn list_questions(&self, test_id: Uuid) -> Result<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            "SELECT * FROM questions WHERE test_id = $1 ORDER BY order_index ASC, id ASC",
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    pub async fn add_question(
        &self,
        test_id: Uuid,
        payload: CreateQuestionPayload,
    ) -> Result<Question> {
        payload.validate()?;
        check_question_shape(
            payload.question_type,
            payload.options.as_deref(),
            payload.correct_answer.as_deref(),
        )?;

        let mut tx = self.pool.begin().await?;
        let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM tests WHERE id = $1 FOR UPDATE")
            .bind(test_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(Error::NotFound(format!("Test {} not found", test_id)));
        }

        let order_index = match payload.order_index {
            Some(idx) => idx,
            None => {
                let max: Option<i32> =
                    sqlx::query_scalar("SELECT MAX(order_index) FROM questions WHERE test_id = $1")
                        .bind(test_id)
                        .fetch_one(&mut *tx)
                        .await?;
                max.unwrap_or(0) + 1
            }
        };

        let question = insert_question(&mut tx, test_id, payload, order_index).await?;
        recompute_total(&mut tx, test_id).await?;
        tx.commit().await?;

        tracing::info!(test_id = %test_id, question_id = question.id, "question added");
        Ok(question)
    }

    pub async fn update_question(
        &self,
        question_id: i32,
        payload: UpdateQuestionPayload,
    ) -> Result<Question> {
        payload.validate()?;
        let current = sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = $1")
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Question {} not found", question_id)))?;

        let question_type = match payload.question_type {
            Some(t) => t,
            None => current
                .kind()
                .ok_or_else(|| Error::Internal(format!("Question {} has an unknown type", question_id)))?,
        };
        let options = payload
            .options
            .or_else(|| current.options.as_ref().map(|o| o.0.clone()));
        let correct_answer = match question_type {
            QuestionType::MultipleChoice => payload.correct_answer.or(current.correct_answer),
            QuestionType::Scale | QuestionType::YesNo => payload.correct_answer,
        };
        check_question_shape(question_type, options.as_deref(), correct_answer.as_deref())?;

        let question = sqlx::query_as::<_, Question>(
            r#"
            UPDATE questions
            SET
                question_text = COALESCE($1, question_text),
                question_type = $2,
                options = $3,
                correct_answer = $4,
                category = COALESCE($5, category),
                order_index = COALESCE($6, order_index),
                updated_at = NOW()
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(payload.question_text)
        .bind(question_type.as_str())
        .bind(options.map(Json))
        .bind(correct_answer)
        .bind(payload.category)
        .bind(payload.order_index)
        .bind(question_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(question)
    }

    pub async fn delete_question(&self, question_id: i32) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let test_id: Option<Uuid> =
            sqlx::query_scalar("DELETE FROM questions WHERE id = $1 RETURNING test_id")
                .bind(question_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(test_id) = test_id else {
            return Err(Error::NotFound(format!("Question {} not found", question_id)));
        };
        recompute_total(&mut tx, test_id).await?;
        tx.commit().await?;

        tracing::info!(test_id = %test_id, question_id, "question deleted");
        Ok(())
    }
}

async fn insert_question(
    tx: &mut Transaction<'_, Postgres>,
    test_id: Uuid,
    q: CreateQuestionPayload,
    order_index: i32,
) -> Result<Question> {
    let category = q
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    let question = sqlx::query_as::<_, Question>(
        r#"
        INSERT INTO questions (test_id, question_text, question_type, options, correct_answer, category, order_index)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(test_id)
    .bind(q.question_text.trim())
    .bind(q.question_type.as_str())
    .bind(q.options.map(Json))
    .bind(q.correct_answer)
    .bind(category)
    .bind(order_index)
    .fetch_one(&mut **tx)
    .await?;
    Ok(question)
}

async fn recompute_total(tx: &mut Transaction<'_, Postgres>, test_id: Uuid) -> Result<Test> {
    let test = sqlx::query_as::<_, Test>(
        r#"
        UPDATE tests
        SET total_questions = (SELECT COUNT(*)::int FROM questions WHERE test_id = $1),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(test_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(test)
}

/// Multiple-choice questions need options, and a correct answer (when given)
/// must be one of them. Other types carry no correct answer.
pub fn check_question_shape(
    question_type: QuestionType,
    options: Option<&[String]>,
    correct_answer: Option<&str>,
) -> Result<()> {
    match question_type {
        QuestionType::MultipleChoice => {
            let options = options.unwrap_or_default();
            if options.is_empty() {
                return Err(Error::BadRequest(
                    "multiple_choice questions require at least one option".to_string(),
                ));
            }
            if let Some(correct) = correct_answer {
                if !options.iter().any(|o| o == correct) {
                    return Err(Error::BadRequest(format!(
                        "correct_answer '{}' is not one of the options",
                        correct
                    )));
                }
            }
            Ok(())
        }
        QuestionType::Scale | QuestionType::YesNo => match correct_answer {
            Some(_) => Err(Error::BadRequest(format!(
                "{} questions cannot have a correct_answer",
                question_type.as_str()
            ))),
            None => Ok(()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn multiple_choice_requires_options() {
        assert!(check_question_shape(QuestionType::MultipleChoice, None, None).is_err());
        assert!(check_question_shape(QuestionType::MultipleChoice, Some(&[]), None).is_err());

        let options = opts(&["a", "b"]);
        assert!(check_question_shape(QuestionType::MultipleChoice, Some(&options), None).is_ok());
    }

    #[test]
    fn correct_answer_must_be_an_option() {
        let options = opts(&["red", "green"]);
        assert!(
            check_question_shape(QuestionType::MultipleChoice, Some(&options), Some("green"))
                .is_ok()
        );
        assert!(matches!(
            check_question_shape(QuestionType::MultipleChoice, Some(&options), Some("blue")),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn scale_and_yes_no_have_no_correct_answer() {
        assert!(check_question_shape(QuestionType::Scale, None, None).is_ok());
        assert!(check_question_shape(QuestionType::YesNo, None, Some("yes")).is_err());
        assert!(check_question_shape(QuestionType::Scale, None, Some("5")).is_err());
    }
}
