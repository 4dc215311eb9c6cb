//! Psychometric scoring.
//!
//! Scoring is a pure function of the submitted responses, the test and its
//! question bank. Malformed input never fails: unknown question ids, unparseable
//! scale answers and unscored multiple-choice items contribute zero points.
//! Only the first response to a question counts; repeats are ignored. Responses
//! that could not be matched to a question, and repeated ones, are reported in
//! [`ScoringDiagnostics`] so callers can surface them to operators.

use crate::models::question::{Question, QuestionType};
use crate::models::response::Response;
use crate::models::test::{Test, TestType};
use crate::services::recommendation_rules::RecommendationRules;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

pub const MAX_POINTS_PER_QUESTION: i32 = 5;

const SCALE_MIN: i64 = 1;
const SCALE_MAX: i64 = 5;
const YES_POINTS: i32 = 5;
const NO_POINTS: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub total_score: i32,
    pub percentage_score: i32,
    pub results: AttemptResults,
    pub diagnostics: ScoringDiagnostics,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality_traits: Option<BTreeMap<String, i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cognitive_scores: Option<BTreeMap<String, i32>>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringDiagnostics {
    /// Ids of responses with no matching question, in submission order.
    pub unmatched_question_ids: Vec<i32>,
    /// Question ids answered more than once; only the first answer was scored.
    #[serde(default)]
    pub duplicate_question_ids: Vec<i32>,
    pub matched_responses: usize,
    pub total_responses: usize,
}

impl ScoringDiagnostics {
    pub fn has_unmatched(&self) -> bool {
        !self.unmatched_question_ids.is_empty()
    }

    pub fn has_duplicates(&self) -> bool {
        !self.duplicate_question_ids.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CategoryTally {
    total: i32,
    count: i32,
}

#[derive(Debug, Default)]
struct Tally {
    total: i32,
    categories: BTreeMap<String, CategoryTally>,
    unmatched: Vec<i32>,
    duplicates: Vec<i32>,
    seen: HashSet<i32>,
    matched: usize,
}

impl Tally {
    fn unmatched(mut self, question_id: i32) -> Self {
        self.unmatched.push(question_id);
        self
    }

    fn duplicate(mut self, question_id: i32) -> Self {
        if !self.duplicates.contains(&question_id) {
            self.duplicates.push(question_id);
        }
        self
    }

    fn matched(mut self, question_id: i32, category: Option<&str>, points: i32) -> Self {
        self.seen.insert(question_id);
        self.total += points;
        self.matched += 1;
        if let Some(category) = category {
            let entry = self.categories.entry(category.to_string()).or_default();
            entry.total += points;
            entry.count += 1;
        }
        self
    }
}

#[derive(Clone)]
pub struct ScoringService {
    rules: Arc<RecommendationRules>,
}

impl ScoringService {
    pub fn new(rules: Arc<RecommendationRules>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RecommendationRules {
        &self.rules
    }

    /// Scores `responses` against `questions`.
    ///
    /// Returns `None` when there is no test or the question bank is empty; the
    /// attempt is then recorded unscored.
    pub fn score(
        &self,
        responses: &[Response],
        test: Option<&Test>,
        questions: &[Question],
    ) -> Option<ScoreOutcome> {
        let test = test?;
        if questions.is_empty() {
            return None;
        }

        let mut by_id: HashMap<i32, &Question> = HashMap::with_capacity(questions.len());
        for q in questions {
            by_id.entry(q.id).or_insert(q);
        }

        let tally = responses
            .iter()
            .fold(Tally::default(), |tally, response| {
                match by_id.get(&response.question_id) {
                    Some(_) if tally.seen.contains(&response.question_id) => {
                        tally.duplicate(response.question_id)
                    }
                    Some(question) => tally.matched(
                        question.id,
                        question.scoring_category(),
                        points_for(question, &response.answer),
                    ),
                    None => tally.unmatched(response.question_id),
                }
            });

        let question_count = i32::try_from(questions.len()).unwrap_or(i32::MAX);
        let percentage_score = normalized(tally.total, question_count);

        let kind = test.kind();
        let breakdown = || -> BTreeMap<String, i32> {
            tally
                .categories
                .iter()
                .map(|(name, c)| (name.clone(), normalized(c.total, c.count)))
                .collect()
        };
        let results = AttemptResults {
            personality_traits: (kind == Some(TestType::Personality)).then(breakdown),
            cognitive_scores: (kind == Some(TestType::Cognitive)).then(breakdown),
            recommendations: kind
                .map(|t| self.rules.recommend(t, percentage_score))
                .unwrap_or_default(),
        };

        Some(ScoreOutcome {
            total_score: tally.total,
            percentage_score,
            results,
            diagnostics: ScoringDiagnostics {
                unmatched_question_ids: tally.unmatched,
                duplicate_question_ids: tally.duplicates,
                matched_responses: tally.matched,
                total_responses: responses.len(),
            },
        })
    }
}

/// Points earned by a single answer, between 0 and [`MAX_POINTS_PER_QUESTION`].
pub fn points_for(question: &Question, answer: &str) -> i32 {
    match question.kind() {
        Some(QuestionType::Scale) => parse_leading_int(answer)
            .filter(|v| (SCALE_MIN..=SCALE_MAX).contains(v))
            .map(|v| v as i32)
            .unwrap_or(0),
        Some(QuestionType::YesNo) => {
            if answer == "yes" {
                YES_POINTS
            } else {
                NO_POINTS
            }
        }
        Some(QuestionType::MultipleChoice) => match question.correct_answer.as_deref() {
            Some(correct) if correct == answer => MAX_POINTS_PER_QUESTION,
            _ => 0,
        },
        None => 0,
    }
}

/// Leading integer of `raw`: optional sign followed by digits, surrounding
/// whitespace ignored, anything after the digits discarded (`"4.7"` is 4).
fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let value: i64 = rest[..digits_len].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// `round(points / (items * 5) * 100)`, 0 when there are no items.
fn normalized(points: i32, items: i32) -> i32 {
    if items <= 0 {
        return 0;
    }
    let max = f64::from(items) * f64::from(MAX_POINTS_PER_QUESTION);
    (f64::from(points) / max * 100.0).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn test_of(kind: &str) -> Test {
        Test {
            id: Uuid::new_v4(),
            name: "Assessment".into(),
            test_type: kind.into(),
            description: None,
            instructions: None,
            time_limit_minutes: Some(30),
            total_questions: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn question(id: i32, kind: &str, correct: Option<&str>, category: Option<&str>) -> Question {
        Question {
            id,
            test_id: Uuid::nil(),
            question_text: format!("Question {}", id),
            question_type: kind.into(),
            options: (kind == "multiple_choice")
                .then(|| Json(vec!["a".to_string(), "b".to_string(), "c".to_string()])),
            correct_answer: correct.map(str::to_string),
            category: category.map(str::to_string),
            order_index: id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service() -> ScoringService {
        ScoringService::new(Arc::new(RecommendationRules::default()))
    }

    #[test]
    fn scale_answers_score_their_value() {
        let q = question(1, "scale", None, None);
        assert_eq!(points_for(&q, "3"), 3);
        assert_eq!(points_for(&q, " 5 "), 5);
        assert_eq!(points_for(&q, "4.7"), 4);
        assert_eq!(points_for(&q, "bogus"), 0);
        assert_eq!(points_for(&q, ""), 0);
        assert_eq!(points_for(&q, "0"), 0);
        assert_eq!(points_for(&q, "6"), 0);
        assert_eq!(points_for(&q, "-3"), 0);
        assert_eq!(points_for(&q, "99999999999999999999999"), 0);
    }

    #[test]
    fn yes_no_answers() {
        let q = question(1, "yes_no", None, None);
        assert_eq!(points_for(&q, "yes"), 5);
        assert_eq!(points_for(&q, "no"), 1);
        assert_eq!(points_for(&q, "maybe"), 1);
        assert_eq!(points_for(&q, "Yes"), 1);
    }

    #[test]
    fn multiple_choice_answers() {
        let scored = question(1, "multiple_choice", Some("b"), None);
        assert_eq!(points_for(&scored, "b"), 5);
        assert_eq!(points_for(&scored, "a"), 0);
        assert_eq!(points_for(&scored, "B"), 0);

        let unscored = question(2, "multiple_choice", None, None);
        assert_eq!(points_for(&unscored, "a"), 0);
        assert_eq!(points_for(&unscored, "b"), 0);
    }

    #[test]
    fn unknown_question_type_scores_zero() {
        let q = question(1, "essay", None, None);
        assert_eq!(points_for(&q, "5"), 0);
    }

    #[test]
    fn missing_test_or_empty_bank_leaves_attempt_unscored() {
        let svc = service();
        let responses = vec![Response::new(1, "3")];
        let questions = vec![question(1, "scale", None, None)];

        assert!(svc.score(&responses, None, &questions).is_none());
        assert!(svc
            .score(&responses, Some(&test_of("personality")), &[])
            .is_none());
    }

    #[test]
    fn cognitive_example_lands_in_middle_band() {
        let svc = service();
        let test = test_of("cognitive");
        let questions = vec![
            question(1, "multiple_choice", Some("a"), Some("logical_reasoning")),
            question(2, "multiple_choice", Some("b"), Some("logical_reasoning")),
            question(3, "multiple_choice", Some("c"), Some("numerical")),
        ];
        let responses = vec![
            Response::new(1, "a"),
            Response::new(2, "b"),
            Response::new(3, "a"),
        ];

        let outcome = svc.score(&responses, Some(&test), &questions).unwrap();
        assert_eq!(outcome.total_score, 10);
        assert_eq!(outcome.percentage_score, 67);
        assert_eq!(
            outcome.results.recommendations,
            RecommendationRules::default().recommend(TestType::Cognitive, 67)
        );
        assert_eq!(outcome.results.recommendations.len(), 2);

        let cognitive = outcome.results.cognitive_scores.unwrap();
        assert_eq!(cognitive["logical_reasoning"], 100);
        assert_eq!(cognitive["numerical"], 0);
        assert!(outcome.results.personality_traits.is_none());
    }

    #[test]
    fn personality_example_breaks_down_by_trait() {
        let svc = service();
        let test = test_of("personality");
        let questions = vec![
            question(1, "scale", None, Some("extraversion")),
            question(2, "scale", None, Some("extraversion")),
        ];
        let responses = vec![Response::new(1, "4"), Response::new(2, "5")];

        let outcome = svc.score(&responses, Some(&test), &questions).unwrap();
        assert_eq!(outcome.total_score, 9);
        assert_eq!(outcome.percentage_score, 90);
        let traits = outcome.results.personality_traits.unwrap();
        assert_eq!(traits.len(), 1);
        assert_eq!(traits["extraversion"], 90);
        assert!(outcome.results.cognitive_scores.is_none());
        assert_eq!(
            outcome.results.recommendations,
            RecommendationRules::default().recommend(TestType::Personality, 90)
        );
    }

    #[test]
    fn unmatched_responses_are_skipped_and_reported() {
        let svc = service();
        let test = test_of("personality");
        let questions = vec![
            question(1, "scale", None, Some("openness")),
            question(2, "scale", None, Some("openness")),
        ];
        let responses = vec![
            Response::new(1, "5"),
            Response::new(42, "5"),
            Response::new(7, "yes"),
        ];

        let outcome = svc.score(&responses, Some(&test), &questions).unwrap();
        assert_eq!(outcome.total_score, 5);
        // unanswered question 2 still counts in the denominator
        assert_eq!(outcome.percentage_score, 50);
        assert_eq!(outcome.diagnostics.unmatched_question_ids, vec![42, 7]);
        assert_eq!(outcome.diagnostics.matched_responses, 1);
        assert_eq!(outcome.diagnostics.total_responses, 3);
        assert!(outcome.diagnostics.has_unmatched());

        let traits = outcome.results.personality_traits.unwrap();
        assert_eq!(traits.len(), 1);
        assert_eq!(traits["openness"], 100);
    }

    #[test]
    fn uncategorized_questions_only_count_toward_total() {
        let svc = service();
        let test = test_of("cognitive");
        let questions = vec![
            question(1, "yes_no", None, None),
            question(2, "yes_no", None, Some("  ")),
            question(3, "scale", None, Some("memory")),
        ];
        let responses = vec![
            Response::new(1, "yes"),
            Response::new(2, "no"),
            Response::new(3, "2"),
        ];

        let outcome = svc.score(&responses, Some(&test), &questions).unwrap();
        assert_eq!(outcome.total_score, 8);
        assert_eq!(outcome.percentage_score, 53);
        let scores = outcome.results.cognitive_scores.unwrap();
        assert_eq!(scores.keys().collect::<Vec<_>>(), vec!["memory"]);
        assert_eq!(scores["memory"], 40);
    }

    #[test]
    fn other_test_types_have_no_breakdown_or_guidance() {
        let svc = service();
        let questions = vec![question(1, "scale", None, Some("grit"))];
        let responses = vec![Response::new(1, "5")];

        for kind in ["aptitude", "emotional_intelligence", "integrity", "unknown"] {
            let outcome = svc
                .score(&responses, Some(&test_of(kind)), &questions)
                .unwrap();
            assert_eq!(outcome.total_score, 5);
            assert_eq!(outcome.percentage_score, 100);
            assert!(outcome.results.personality_traits.is_none());
            assert!(outcome.results.cognitive_scores.is_none());
            assert!(outcome.results.recommendations.is_empty());
        }
    }

    #[test]
    fn total_is_sum_of_points_and_percentage_stays_in_range() {
        let svc = service();
        let test = test_of("personality");
        let questions = vec![
            question(1, "scale", None, Some("a")),
            question(2, "yes_no", None, Some("b")),
            question(3, "multiple_choice", Some("c"), Some("a")),
            question(4, "multiple_choice", None, Some("b")),
        ];
        let answers = ["1", "2", "3", "4", "5", "yes", "no", "a", "b", "c", "x"];

        for a1 in answers {
            for a2 in answers {
                let responses = vec![
                    Response::new(1, a1),
                    Response::new(2, a2),
                    Response::new(3, a1),
                    Response::new(4, a2),
                ];
                let expected: i32 = responses
                    .iter()
                    .zip(&questions)
                    .map(|(r, q)| points_for(q, &r.answer))
                    .sum();
                let outcome = svc.score(&responses, Some(&test), &questions).unwrap();
                assert_eq!(outcome.total_score, expected);
                assert!((0..=100).contains(&outcome.percentage_score));
                assert_eq!(
                    outcome.percentage_score,
                    (f64::from(expected) / 20.0 * 100.0).round() as i32
                );
            }
        }
    }

    #[test]
    fn repeated_answers_to_one_question_count_once() {
        let svc = service();
        let test = test_of("personality");
        let questions = vec![question(1, "scale", None, Some("extraversion"))];
        let responses = vec![
            Response::new(1, "5"),
            Response::new(1, "5"),
            Response::new(1, "1"),
        ];

        let outcome = svc.score(&responses, Some(&test), &questions).unwrap();
        assert_eq!(outcome.total_score, 5);
        assert_eq!(outcome.percentage_score, 100);
        assert_eq!(outcome.results.personality_traits.unwrap()["extraversion"], 100);
        assert_eq!(
            outcome.results.recommendations,
            RecommendationRules::default().recommend(TestType::Personality, 100)
        );
        assert!(!outcome.results.recommendations.is_empty());
        assert_eq!(outcome.diagnostics.duplicate_question_ids, vec![1]);
        assert_eq!(outcome.diagnostics.matched_responses, 1);
        assert_eq!(outcome.diagnostics.total_responses, 3);
    }

    #[test]
    fn first_answer_wins_when_a_question_is_repeated() {
        let svc = service();
        let test = test_of("cognitive");
        let questions = vec![
            question(1, "multiple_choice", Some("a"), Some("logic")),
            question(2, "multiple_choice", Some("b"), Some("logic")),
        ];
        let responses = vec![
            Response::new(1, "c"),
            Response::new(1, "a"),
            Response::new(2, "b"),
            Response::new(2, "b"),
        ];

        let outcome = svc.score(&responses, Some(&test), &questions).unwrap();
        assert_eq!(outcome.total_score, 5);
        assert_eq!(outcome.percentage_score, 50);
        assert_eq!(outcome.results.cognitive_scores.unwrap()["logic"], 50);
        assert_eq!(outcome.diagnostics.duplicate_question_ids, vec![1, 2]);
    }

    #[test]
    fn percentage_never_exceeds_100_with_repeated_answers() {
        let svc = service();
        let test = test_of("cognitive");
        let questions = vec![
            question(1, "multiple_choice", Some("a"), None),
            question(2, "scale", None, None),
        ];
        let responses: Vec<Response> = (0..500)
            .map(|i| if i % 2 == 0 { Response::new(1, "a") } else { Response::new(2, "5") })
            .collect();

        let outcome = svc.score(&responses, Some(&test), &questions).unwrap();
        assert_eq!(outcome.total_score, 10);
        assert_eq!(outcome.percentage_score, 100);
        assert!(!outcome.results.recommendations.is_empty());
    }

    #[test]
    fn scoring_is_deterministic() {
        let svc = service();
        let test = test_of("personality");
        let questions = vec![
            question(1, "scale", None, Some("neuroticism")),
            question(2, "scale", None, Some("agreeableness")),
            question(3, "scale", None, Some("conscientiousness")),
        ];
        let responses = vec![
            Response::new(3, "4"),
            Response::new(1, "2"),
            Response::new(2, "5"),
        ];

        let first = svc.score(&responses, Some(&test), &questions).unwrap();
        let second = svc.score(&responses, Some(&test), &questions).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn results_serialize_without_absent_breakdowns() {
        let results = AttemptResults {
            personality_traits: None,
            cognitive_scores: None,
            recommendations: vec![],
        };
        assert_eq!(
            serde_json::to_value(&results).unwrap(),
            serde_json::json!({ "recommendations": [] })
        );
    }
}
