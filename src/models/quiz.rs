// src/models/quiz.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    config::{
        MAX_DESCRIPTION_CHARS, MAX_QUESTIONS_PER_QUIZ, MAX_TIME_LIMIT_MINUTES, MAX_TITLE_CHARS,
    },
    models::{
        Stored,
        question::{PublicQuestion, Question, QuestionInput, QuestionType},
    },
    utils::html::clean_text,
};

/// Represents a document in the `quizzes` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Display order is the vector order.
    pub questions: Vec<Question>,

    /// Minutes; `None` means untimed.
    #[serde(default)]
    pub time_limit: Option<u32>,

    #[serde(default)]
    pub is_published: bool,

    /// Listed on the public catalogue when published.
    #[serde(default)]
    pub is_public: bool,

    /// Owning teacher's user id.
    pub author_id: String,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub submission_count: u64,
}

impl Quiz {
    /// Rules every quiz must satisfy before reaching the store.
    pub fn check(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Quiz title is required".to_string());
        }
        if self.questions.is_empty() {
            return Err("Quiz must contain at least one question".to_string());
        }
        if self.time_limit == Some(0) {
            return Err("Time limit must be at least one minute".to_string());
        }

        let mut ids = HashSet::new();
        for question in &self.questions {
            if !ids.insert(question.id.as_str()) {
                return Err(format!("Question id {} is used twice", question.id));
            }
            question.check()?;
        }
        Ok(())
    }

    pub fn total_points(&self) -> u32 {
        self.questions.iter().map(|q| q.points).sum()
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.author_id == user_id
    }
}

/// DTO for creating or overwriting a quiz.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuizInput {
    #[validate(length(max = MAX_TITLE_CHARS, message = "Title must be at most 200 characters"))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = MAX_DESCRIPTION_CHARS))]
    pub description: String,

    #[serde(default)]
    #[validate(length(max = MAX_QUESTIONS_PER_QUIZ), nested)]
    pub questions: Vec<QuestionInput>,

    #[validate(range(min = 1, max = MAX_TIME_LIMIT_MINUTES))]
    pub time_limit: Option<u32>,

    #[serde(default)]
    pub is_published: bool,

    #[serde(default)]
    pub is_public: bool,

    #[validate(length(max = 100))]
    pub category: Option<String>,

    #[serde(default)]
    #[validate(length(max = 20))]
    pub tags: Vec<String>,
}

impl QuizInput {
    /// Builds the stored form. The submission counter starts at zero.
    pub fn into_quiz(self, author_id: &str) -> Quiz {
        Quiz {
            title: clean_text(self.title.trim()),
            description: clean_text(self.description.trim()),
            questions: self
                .questions
                .into_iter()
                .map(QuestionInput::into_question)
                .collect(),
            time_limit: self.time_limit,
            is_published: self.is_published,
            is_public: self.is_public,
            author_id: author_id.to_string(),
            category: self
                .category
                .map(|c| clean_text(c.trim()))
                .filter(|c| !c.is_empty()),
            tags: self
                .tags
                .iter()
                .map(|t| clean_text(t.trim()))
                .filter(|t| !t.is_empty())
                .collect(),
            submission_count: 0,
        }
    }
}

/// DTO for toggling publication and visibility.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SharingRequest {
    pub is_published: Option<bool>,
    pub is_public: Option<bool>,
}

/// Quiz as served to someone taking it: no correct answers.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuiz {
    pub id: String,
    pub title: String,
    pub description: String,
    pub questions: Vec<PublicQuestion>,
    pub time_limit: Option<u32>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub total_points: u32,
}

impl From<&Stored<Quiz>> for PublicQuiz {
    fn from(quiz: &Stored<Quiz>) -> Self {
        PublicQuiz {
            id: quiz.id.clone(),
            title: quiz.data.title.clone(),
            description: quiz.data.description.clone(),
            questions: quiz.data.questions.iter().map(PublicQuestion::from).collect(),
            time_limit: quiz.data.time_limit,
            category: quiz.data.category.clone(),
            tags: quiz.data.tags.clone(),
            total_points: quiz.data.total_points(),
        }
    }
}

/// Listing row for dashboards and the public catalogue.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub question_count: usize,
    pub total_points: u32,
    pub time_limit: Option<u32>,
    pub is_published: bool,
    pub is_public: bool,
    pub author_id: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub submission_count: u64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Stored<Quiz>> for QuizSummary {
    fn from(quiz: &Stored<Quiz>) -> Self {
        QuizSummary {
            id: quiz.id.clone(),
            title: quiz.data.title.clone(),
            description: quiz.data.description.clone(),
            question_count: quiz.data.questions.len(),
            total_points: quiz.data.total_points(),
            time_limit: quiz.data.time_limit,
            is_published: quiz.data.is_published,
            is_public: quiz.data.is_public,
            author_id: quiz.data.author_id.clone(),
            category: quiz.data.category.clone(),
            tags: quiz.data.tags.clone(),
            submission_count: quiz.data.submission_count,
            created_at: quiz.created_at,
            updated_at: quiz.updated_at,
        }
    }
}

/// One row of an answer key.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerKeyEntry {
    pub question_id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    pub correct_answer: Vec<String>,
    /// Option texts for choice questions, the literal answers otherwise.
    pub correct_answer_text: Vec<String>,
    pub points: u32,
    pub explanation: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerKey {
    pub quiz_id: String,
    pub title: String,
    pub entries: Vec<AnswerKeyEntry>,
}

impl From<&Stored<Quiz>> for AnswerKey {
    fn from(quiz: &Stored<Quiz>) -> Self {
        AnswerKey {
            quiz_id: quiz.id.clone(),
            title: quiz.data.title.clone(),
            entries: quiz
                .data
                .questions
                .iter()
                .map(|q| AnswerKeyEntry {
                    question_id: q.id.clone(),
                    question_type: q.question_type,
                    text: q.text.clone(),
                    correct_answer: q.correct_answer.clone(),
                    correct_answer_text: q.correct_answer_texts(),
                    points: q.points,
                    explanation: q.explanation.clone(),
                })
                .collect(),
        }
    }
}

/// Which quizzes a teacher listing shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Published,
    Draft,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QuizSort {
    #[default]
    Newest,
    Oldest,
    Title,
    Submissions,
}

/// Query parameters for listing the caller's quizzes.
#[derive(Debug, Default, Deserialize)]
pub struct QuizListParams {
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub sort: QuizSort,
    /// Case-insensitive match on title and description.
    pub q: Option<String>,
    pub category: Option<String>,
}

/// Query parameters for the public catalogue.
#[derive(Debug, Default, Deserialize)]
pub struct PublicListParams {
    pub category: Option<String>,
    pub limit: Option<usize>,
}

impl QuizListParams {
    fn matches(&self, quiz: &Quiz) -> bool {
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Published => quiz.is_published,
            StatusFilter::Draft => !quiz.is_published,
        };
        if !status_ok {
            return false;
        }

        if let Some(category) = self.category.as_deref().filter(|c| !c.trim().is_empty()) {
            if quiz.category.as_deref() != Some(category.trim()) {
                return false;
            }
        }

        match self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            Some(needle) => {
                let needle = needle.to_lowercase();
                quiz.title.to_lowercase().contains(&needle)
                    || quiz.description.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }

    /// Filters and sorts a teacher's quizzes in place of a store-side query.
    pub fn apply(&self, mut quizzes: Vec<Stored<Quiz>>) -> Vec<Stored<Quiz>> {
        quizzes.retain(|quiz| self.matches(&quiz.data));

        match self.sort {
            QuizSort::Newest => quizzes.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            QuizSort::Oldest => quizzes.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            QuizSort::Title => quizzes.sort_by_key(|quiz| quiz.data.title.to_lowercase()),
            QuizSort::Submissions => quizzes.sort_by(|a, b| {
                b.data
                    .submission_count
                    .cmp(&a.data.submission_count)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            }),
        }
        quizzes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionOption;

    fn math_quiz() -> Quiz {
        Quiz {
            title: "Math".to_string(),
            description: String::new(),
            questions: vec![Question {
                id: "q1".to_string(),
                question_type: QuestionType::TrueFalse,
                text: "1 + 1 = 2".to_string(),
                options: vec![
                    QuestionOption { id: "o1".to_string(), text: "True".to_string() },
                    QuestionOption { id: "o2".to_string(), text: "False".to_string() },
                ],
                correct_answer: vec!["o1".to_string()],
                points: 10,
                explanation: None,
            }],
            time_limit: None,
            is_published: false,
            is_public: false,
            author_id: "teacher-1".to_string(),
            category: None,
            tags: vec![],
            submission_count: 0,
        }
    }

    #[test]
    fn test_check_accepts_valid_quiz() {
        assert!(math_quiz().check().is_ok());
        assert_eq!(math_quiz().total_points(), 10);
    }

    #[test]
    fn test_check_rejects_blank_title() {
        let mut quiz = math_quiz();
        quiz.title = "   ".to_string();
        assert_eq!(quiz.check().unwrap_err(), "Quiz title is required");
    }

    #[test]
    fn test_check_rejects_empty_questions() {
        let mut quiz = math_quiz();
        quiz.questions.clear();
        assert_eq!(
            quiz.check().unwrap_err(),
            "Quiz must contain at least one question"
        );
    }

    #[test]
    fn test_check_rejects_duplicate_question_ids() {
        let mut quiz = math_quiz();
        let copy = quiz.questions[0].clone();
        quiz.questions.push(copy);
        assert!(quiz.check().is_err());
    }

    #[test]
    fn test_deserialize_defaults() {
        let quiz: Quiz = serde_json::from_value(serde_json::json!({
            "title": "T",
            "questions": [],
            "authorId": "a"
        }))
        .unwrap();
        assert!(!quiz.is_published);
        assert_eq!(quiz.submission_count, 0);
        assert_eq!(quiz.time_limit, None);
    }

    fn stored(title: &str, published: bool, submissions: u64, minutes_ago: i64) -> Stored<Quiz> {
        let mut quiz = math_quiz();
        quiz.title = title.to_string();
        quiz.is_published = published;
        quiz.submission_count = submissions;
        let at = chrono::Utc::now() - chrono::Duration::minutes(minutes_ago);
        Stored {
            id: title.to_lowercase(),
            data: quiz,
            created_at: at,
            updated_at: at,
        }
    }

    fn titles(quizzes: &[Stored<Quiz>]) -> Vec<&str> {
        quizzes.iter().map(|q| q.data.title.as_str()).collect()
    }

    #[test]
    fn test_list_params_filter_by_status_and_search() {
        let quizzes = vec![
            stored("Algebra", true, 3, 30),
            stored("Biology", false, 0, 20),
            stored("Geometry basics", true, 7, 10),
        ];

        let published = QuizListParams {
            status: StatusFilter::Published,
            ..Default::default()
        };
        assert_eq!(titles(&published.apply(quizzes.clone())), vec!["Geometry basics", "Algebra"]);

        let drafts = QuizListParams {
            status: StatusFilter::Draft,
            ..Default::default()
        };
        assert_eq!(titles(&drafts.apply(quizzes.clone())), vec!["Biology"]);

        let search = QuizListParams {
            q: Some("  GEOM ".to_string()),
            ..Default::default()
        };
        assert_eq!(titles(&search.apply(quizzes)), vec!["Geometry basics"]);
    }

    #[test]
    fn test_list_params_sorting() {
        let quizzes = vec![
            stored("b", true, 1, 30),
            stored("C", true, 9, 20),
            stored("a", true, 4, 10),
        ];

        let by = |sort| QuizListParams { sort, ..Default::default() };
        assert_eq!(titles(&by(QuizSort::Oldest).apply(quizzes.clone())), vec!["b", "C", "a"]);
        assert_eq!(titles(&by(QuizSort::Title).apply(quizzes.clone())), vec!["a", "b", "C"]);
        assert_eq!(titles(&by(QuizSort::Submissions).apply(quizzes)), vec!["C", "a", "b"]);
    }
}
