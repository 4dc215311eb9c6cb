use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Test {
    pub id: Uuid,
    pub name: String,
    pub test_type: String,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub time_limit_minutes: Option<i32>,
    pub total_questions: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Test {
    /// `None` for rows whose stored type is not one we know how to score.
    pub fn kind(&self) -> Option<TestType> {
        self.test_type.parse().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    Personality,
    Cognitive,
    Aptitude,
    EmotionalIntelligence,
    Integrity,
}

impl TestType {
    pub const ALL: [TestType; 5] = [
        TestType::Personality,
        TestType::Cognitive,
        TestType::Aptitude,
        TestType::EmotionalIntelligence,
        TestType::Integrity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Personality => "personality",
            TestType::Cognitive => "cognitive",
            TestType::Aptitude => "aptitude",
            TestType::EmotionalIntelligence => "emotional_intelligence",
            TestType::Integrity => "integrity",
        }
    }
}

impl std::fmt::Display for TestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown test type '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_round_trips_through_str() {
        for t in TestType::ALL {
            assert_eq!(t.as_str().parse::<TestType>().unwrap(), t);
        }
        assert!("Personality".parse::<TestType>().is_err());
    }
}
