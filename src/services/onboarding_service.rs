use crate::error::Result;
use crate::models::onboarding_item::OnboardingItem;
use sqlx::PgPool;
use uuid::Uuid;

/// Links completed assessments back into the onboarding checklist.
#[derive(Clone)]
pub struct OnboardingService {
    pool: PgPool,
}

impl OnboardingService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Marks the checklist item done and records which attempt completed it.
    /// Returns `None` when the item does not exist.
    pub async fn link_attempt(&self, item_id: Uuid, attempt_id: Uuid) -> Result<Option<OnboardingItem>> {
        let item = sqlx::query_as::<_, OnboardingItem>(
            r#"
            UPDATE onboarding_checklist_items
            SET is_completed = TRUE,
                completed_at = COALESCE(completed_at, NOW()),
                attempt_id = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(item_id)
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    pub async fn get_item(&self, item_id: Uuid) -> Result<Option<OnboardingItem>> {
        let item = sqlx::query_as::<_, OnboardingItem>(
            "SELECT * FROM onboarding_checklist_items WHERE id = $1",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }
}
