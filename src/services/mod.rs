pub mod attempt_service;
pub mod export_service;
pub mod onboarding_service;
pub mod recommendation_rules;
pub mod scoring_service;
pub mod test_service;
