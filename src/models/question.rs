use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: i32,
    pub test_id: Uuid,
    pub question_text: String,
    pub question_type: String,
    pub options: Option<Json<Vec<String>>>,
    pub correct_answer: Option<String>,
    pub category: Option<String>,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Question {
    pub fn kind(&self) -> Option<QuestionType> {
        self.question_type.parse().ok()
    }

    pub fn option_list(&self) -> &[String] {
        self.options.as_ref().map(|o| o.0.as_slice()).unwrap_or(&[])
    }

    /// Category label, if present and not blank.
    pub fn scoring_category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    Scale,
    YesNo,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::Scale => "scale",
            QuestionType::YesNo => "yes_no",
        }
    }
}

impl std::str::FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "scale" => Ok(QuestionType::Scale),
            "yes_no" => Ok(QuestionType::YesNo),
            other => Err(format!("unknown question type '{}'", other)),
        }
    }
}

/// Candidate-facing view of a question: everything except the correct answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: i32,
    pub question_text: String,
    pub question_type: String,
    pub options: Vec<String>,
    pub category: Option<String>,
    pub order_index: i32,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            question_text: q.question_text.clone(),
            question_type: q.question_type.clone(),
            options: q.option_list().to_vec(),
            category: q.category.clone(),
            order_index: q.order_index,
        }
    }
}
