pub mod app;
pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::services::{
    attempt_service::AttemptService, onboarding_service::OnboardingService,
    recommendation_rules::RecommendationRules, scoring_service::ScoringService,
    test_service::TestService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub test_service: TestService,
    pub attempt_service: AttemptService,
    pub scoring_service: ScoringService,
    pub onboarding_service: OnboardingService,
}

impl AppState {
    pub fn new(pool: PgPool, rules: RecommendationRules) -> Self {
        let test_service = TestService::new(pool.clone());
        let scoring_service = ScoringService::new(Arc::new(rules));
        let onboarding_service = OnboardingService::new(pool.clone());
        let attempt_service = AttemptService::new(
            pool.clone(),
            test_service.clone(),
            scoring_service.clone(),
            onboarding_service.clone(),
        );

        Self {
            pool,
            test_service,
            attempt_service,
            scoring_service,
            onboarding_service,
        }
    }
}
