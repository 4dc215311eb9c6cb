//! Guidance text attached to scored attempts.
//!
//! The table is plain data: an ordered list of `(test type, score band, lines)`
//! entries. The first entry whose test type matches and whose inclusive band
//! contains the percentage score wins. HR can replace the built-in table with a
//! JSON file of the same shape (see `RECOMMENDATION_RULES_PATH`).

use crate::error::{Error, Result};
use crate::models::test::TestType;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationRule {
    pub test_type: TestType,
    pub min_score: i32,
    pub max_score: i32,
    pub lines: Vec<String>,
}

impl RecommendationRule {
    fn new(test_type: TestType, min_score: i32, max_score: i32, lines: [&str; 2]) -> Self {
        Self {
            test_type,
            min_score,
            max_score,
            lines: lines.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn matches(&self, test_type: TestType, percentage_score: i32) -> bool {
        self.test_type == test_type
            && percentage_score >= self.min_score
            && percentage_score <= self.max_score
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecommendationRules {
    rules: Vec<RecommendationRule>,
}

impl RecommendationRules {
    pub fn new(rules: Vec<RecommendationRule>) -> Result<Self> {
        for (idx, rule) in rules.iter().enumerate() {
            if rule.min_score > rule.max_score {
                return Err(Error::Config(format!(
                    "recommendation rule #{} ({}): min_score {} is greater than max_score {}",
                    idx, rule.test_type, rule.min_score, rule.max_score
                )));
            }
            if rule.lines.is_empty() || rule.lines.iter().any(|l| l.trim().is_empty()) {
                return Err(Error::Config(format!(
                    "recommendation rule #{} ({}): lines must be non-empty",
                    idx, rule.test_type
                )));
            }
        }
        Ok(Self { rules })
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let rules: Vec<RecommendationRule> = serde_json::from_str(raw)
            .map_err(|e| Error::Config(format!("invalid recommendation rules: {}", e)))?;
        Self::new(rules)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "cannot read recommendation rules from {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&raw)
    }

    /// Loads the table from `path` when given, otherwise falls back to the built-in one.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => {
                let rules = Self::from_json_file(p)?;
                tracing::info!(path = p, rules = rules.len(), "loaded recommendation rules");
                Ok(rules)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn recommend(&self, test_type: TestType, percentage_score: i32) -> Vec<String> {
        self.rules
            .iter()
            .find(|rule| rule.matches(test_type, percentage_score))
            .map(|rule| rule.lines.clone())
            .unwrap_or_default()
    }

    pub fn rules(&self) -> &[RecommendationRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RecommendationRules {
    fn default() -> Self {
        use TestType::{Cognitive, Personality};

        Self {
            rules: vec![
                RecommendationRule::new(
                    Personality,
                    80,
                    100,
                    [
                        "Strong, well-defined personality profile with clearly expressed traits.",
                        "Well suited for roles that rely on initiative and close collaboration.",
                    ],
                ),
                RecommendationRule::new(
                    Personality,
                    60,
                    79,
                    [
                        "Balanced personality profile with several pronounced traits.",
                        "Use the trait breakdown to discuss team fit during the interview.",
                    ],
                ),
                RecommendationRule::new(
                    Personality,
                    0,
                    59,
                    [
                        "Trait expression is moderate across most categories.",
                        "Review the lowest-scoring traits with the candidate before placement.",
                    ],
                ),
                RecommendationRule::new(
                    Cognitive,
                    80,
                    100,
                    [
                        "Excellent cognitive abilities with strong reasoning and problem solving.",
                        "Well suited for analytically demanding roles.",
                    ],
                ),
                RecommendationRule::new(
                    Cognitive,
                    60,
                    79,
                    [
                        "Good cognitive abilities with solid reasoning in most areas.",
                        "Targeted training can strengthen the weaker domains.",
                    ],
                ),
                RecommendationRule::new(
                    Cognitive,
                    0,
                    59,
                    [
                        "Cognitive results are below the level expected for analytical roles.",
                        "Consider a follow-up assessment or roles with well-structured tasks.",
                    ],
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_covers_three_bands_for_scored_types() {
        let rules = RecommendationRules::default();
        for t in [TestType::Personality, TestType::Cognitive] {
            let high = rules.recommend(t, 80);
            let mid = rules.recommend(t, 79);
            let low = rules.recommend(t, 59);
            assert_eq!(high.len(), 2);
            assert_eq!(mid.len(), 2);
            assert_eq!(low.len(), 2);
            assert_ne!(high, mid);
            assert_ne!(mid, low);
            assert_eq!(rules.recommend(t, 60), mid);
            assert_eq!(rules.recommend(t, 0), low);
            assert_eq!(rules.recommend(t, 100), high);
        }
    }

    #[test]
    fn other_test_types_get_no_guidance() {
        let rules = RecommendationRules::default();
        for t in [
            TestType::Aptitude,
            TestType::EmotionalIntelligence,
            TestType::Integrity,
        ] {
            assert!(rules.recommend(t, 95).is_empty());
            assert!(rules.recommend(t, 10).is_empty());
        }
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = RecommendationRules::from_json_str(
            r#"[
                {"test_type": "integrity", "min_score": 50, "max_score": 100, "lines": ["first"]},
                {"test_type": "integrity", "min_score": 0, "max_score": 100, "lines": ["second"]}
            ]"#,
        )
        .unwrap();

        assert_eq!(rules.recommend(TestType::Integrity, 70), vec!["first"]);
        assert_eq!(rules.recommend(TestType::Integrity, 20), vec!["second"]);
        assert!(rules.recommend(TestType::Cognitive, 70).is_empty());
    }

    #[test]
    fn invalid_tables_are_rejected() {
        let inverted = r#"[{"test_type": "cognitive", "min_score": 80, "max_score": 60, "lines": ["x"]}]"#;
        assert!(matches!(
            RecommendationRules::from_json_str(inverted),
            Err(Error::Config(_))
        ));

        let empty_lines = r#"[{"test_type": "cognitive", "min_score": 0, "max_score": 60, "lines": []}]"#;
        assert!(RecommendationRules::from_json_str(empty_lines).is_err());

        let unknown_type = r#"[{"test_type": "astrology", "min_score": 0, "max_score": 60, "lines": ["x"]}]"#;
        assert!(RecommendationRules::from_json_str(unknown_type).is_err());
    }

    #[test]
    fn loads_table_from_file() {
        let path = std::env::temp_dir().join(format!(
            "recommendation_rules_{}.json",
            uuid::Uuid::new_v4()
        ));
        let table = serde_json::to_string(&RecommendationRules::default()).unwrap();
        std::fs::write(&path, table).unwrap();

        let loaded = RecommendationRules::load(path.to_str()).unwrap();
        assert_eq!(loaded, RecommendationRules::default());

        std::fs::remove_file(&path).ok();
        assert!(RecommendationRules::from_json_file(&path).is_err());
    }
}
