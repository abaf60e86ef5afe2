// src/db/quizzes.rs

use serde_json::Value;

use crate::{
    error::AppError,
    models::{
        Stored,
        collections::QUIZZES,
        quiz::{Quiz, SharingRequest},
    },
    store::{CREATED_AT, Direction, DocumentStore, Query, to_object},
};

/// Fields a quiz overwrite never touches.
const PROTECTED_FIELDS: [&str; 2] = ["authorId", "submissionCount"];

/// Validates and persists a new quiz.
///
/// Invalid quizzes (blank title, no questions, broken question invariants)
/// are rejected before the store is called.
pub async fn save_quiz(store: &dyn DocumentStore, quiz: &Quiz) -> Result<Stored<Quiz>, AppError> {
    quiz.check().map_err(AppError::Validation)?;

    let id = store.create(QUIZZES, to_object(quiz)?).await?;
    tracing::info!("Quiz {} created by {}", id, quiz.author_id);

    require_quiz(store, &id).await
}

pub async fn get_quiz(store: &dyn DocumentStore, id: &str) -> Result<Option<Stored<Quiz>>, AppError> {
    match store.get(QUIZZES, id).await? {
        Some(doc) => Ok(Some(Stored::try_from(doc)?)),
        None => Ok(None),
    }
}

pub async fn require_quiz(store: &dyn DocumentStore, id: &str) -> Result<Stored<Quiz>, AppError> {
    get_quiz(store, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))
}

/// Loads a quiz for editing. Anyone but the author gets `quiz/not-owner`.
pub async fn get_quiz_for_edit(
    store: &dyn DocumentStore,
    id: &str,
    user_id: &str,
) -> Result<Stored<Quiz>, AppError> {
    let quiz = require_quiz(store, id).await?;
    if !quiz.data.is_owned_by(user_id) {
        tracing::warn!("User {} tried to edit quiz {} owned by {}", user_id, id, quiz.data.author_id);
        return Err(AppError::not_owner("quizzes"));
    }
    Ok(quiz)
}

/// Overwrites every authored field of an owned quiz.
pub async fn update_quiz(
    store: &dyn DocumentStore,
    id: &str,
    user_id: &str,
    quiz: &Quiz,
) -> Result<Stored<Quiz>, AppError> {
    get_quiz_for_edit(store, id, user_id).await?;
    quiz.check().map_err(AppError::Validation)?;

    let mut partial = to_object(quiz)?;
    if let Value::Object(fields) = &mut partial {
        for field in PROTECTED_FIELDS {
            fields.remove(field);
        }
    }

    store.update(QUIZZES, id, partial).await?;
    require_quiz(store, id).await
}

pub async fn set_sharing(
    store: &dyn DocumentStore,
    id: &str,
    user_id: &str,
    sharing: &SharingRequest,
) -> Result<Stored<Quiz>, AppError> {
    get_quiz_for_edit(store, id, user_id).await?;

    let mut partial = serde_json::Map::new();
    if let Some(published) = sharing.is_published {
        partial.insert("isPublished".to_string(), Value::Bool(published));
    }
    if let Some(public) = sharing.is_public {
        partial.insert("isPublic".to_string(), Value::Bool(public));
    }
    if partial.is_empty() {
        return Err(AppError::BadRequest(
            "Nothing to change: send isPublished and/or isPublic".to_string(),
        ));
    }

    store.update(QUIZZES, id, Value::Object(partial)).await?;
    require_quiz(store, id).await
}

/// Hard delete. Submissions referencing the quiz are left in place.
pub async fn delete_quiz(store: &dyn DocumentStore, id: &str, user_id: &str) -> Result<(), AppError> {
    get_quiz_for_edit(store, id, user_id).await?;
    store.delete(QUIZZES, id).await?;
    tracing::info!("Quiz {} deleted by {}", id, user_id);
    Ok(())
}

/// Newest first.
pub async fn list_quizzes_by_author(
    store: &dyn DocumentStore,
    author_id: &str,
) -> Result<Vec<Stored<Quiz>>, AppError> {
    let docs = store
        .query(
            QUIZZES,
            &Query::new()
                .where_eq("authorId", author_id)
                .order_by(CREATED_AT, Direction::Desc),
        )
        .await?;

    docs.into_iter()
        .map(|doc| Stored::try_from(doc).map_err(AppError::from))
        .collect()
}

/// Published quizzes flagged public, newest first.
pub async fn list_public_quizzes(
    store: &dyn DocumentStore,
    category: Option<&str>,
    limit: usize,
) -> Result<Vec<Stored<Quiz>>, AppError> {
    let mut query = Query::new()
        .where_eq("isPublished", true)
        .where_eq("isPublic", true);
    if let Some(category) = category {
        query = query.where_eq("category", category);
    }
    let query = query.order_by(CREATED_AT, Direction::Desc).limit(limit);

    let docs = store.query(QUIZZES, &query).await?;
    docs.into_iter()
        .map(|doc| Stored::try_from(doc).map_err(AppError::from))
        .collect()
}

pub async fn increment_submission_count(store: &dyn DocumentStore, id: &str) -> Result<(), AppError> {
    store.increment(QUIZZES, id, "submissionCount", 1).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            question::{Question, QuestionOption, QuestionType},
            quiz::QuizInput,
        },
        store::{Document, MemoryDocumentStore, StoreError},
    };
    use serde_json::json;
    use async_trait::async_trait;

    /// Fails the test if any store method is reached.
    struct UnreachableStore;

    #[async_trait]
    impl DocumentStore for UnreachableStore {
        async fn create(&self, _: &str, _: Value) -> Result<String, StoreError> {
            panic!("create must not be called")
        }
        async fn create_with_id(&self, _: &str, _: &str, _: Value) -> Result<(), StoreError> {
            panic!("create_with_id must not be called")
        }
        async fn get(&self, _: &str, _: &str) -> Result<Option<Document>, StoreError> {
            panic!("get must not be called")
        }
        async fn update(&self, _: &str, _: &str, _: Value) -> Result<(), StoreError> {
            panic!("update must not be called")
        }
        async fn delete(&self, _: &str, _: &str) -> Result<(), StoreError> {
            panic!("delete must not be called")
        }
        async fn query(&self, _: &str, _: &Query) -> Result<Vec<Document>, StoreError> {
            panic!("query must not be called")
        }
        async fn increment(&self, _: &str, _: &str, _: &str, _: i64) -> Result<(), StoreError> {
            panic!("increment must not be called")
        }
    }

    fn question(id: &str) -> Question {
        Question {
            id: id.to_string(),
            question_type: QuestionType::TrueFalse,
            text: format!("Statement {}", id),
            options: vec![
                QuestionOption { id: "o1".to_string(), text: "True".to_string() },
                QuestionOption { id: "o2".to_string(), text: "False".to_string() },
            ],
            correct_answer: vec!["o1".to_string()],
            points: 10,
            explanation: None,
        }
    }

    fn quiz(title: &str, questions: Vec<Question>) -> Quiz {
        Quiz {
            title: title.to_string(),
            description: "Basic arithmetic".to_string(),
            questions,
            time_limit: Some(5),
            is_published: false,
            is_public: false,
            author_id: "teacher-a".to_string(),
            category: None,
            tags: vec![],
            submission_count: 0,
        }
    }

    #[tokio::test]
    async fn test_empty_title_never_reaches_store() {
        let err = save_quiz(&UnreachableStore, &quiz("", vec![question("q1")]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation/failed");
    }

    #[tokio::test]
    async fn test_no_questions_never_reaches_store() {
        let err = save_quiz(&UnreachableStore, &quiz("Math", vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation/failed");
    }

    #[tokio::test]
    async fn test_save_then_fetch_round_trip() {
        let store = MemoryDocumentStore::new();
        let original = quiz("Math", vec![question("q1"), question("q2"), question("q3")]);

        let saved = save_quiz(&store, &original).await.unwrap();
        let fetched = require_quiz(&store, &saved.id).await.unwrap();

        assert_eq!(fetched.data.title, "Math");
        assert_eq!(fetched.data.description, "Basic arithmetic");
        let ids: Vec<_> = fetched.data.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q2", "q3"]);
        assert_eq!(fetched.data, original);
    }

    #[tokio::test]
    async fn test_special_characters_survive_round_trip() {
        let store = MemoryDocumentStore::new();
        let input: QuizInput = serde_json::from_value(json!({
            "title": "Q&A: is 2 < 3?",
            "description": "Tom & Jerry say \"hi\"",
            "questions": [{
                "id": "q1",
                "type": "true-false",
                "text": "2 < 3 & 3 > 2",
                "options": [{"id": "o1", "text": "True"}, {"id": "o2", "text": "False"}],
                "correctAnswer": ["o1"]
            }]
        }))
        .unwrap();

        let saved = save_quiz(&store, &input.into_quiz("teacher-a")).await.unwrap();
        let fetched = require_quiz(&store, &saved.id).await.unwrap();

        assert_eq!(fetched.data.title, "Q&A: is 2 < 3?");
        assert_eq!(fetched.data.description, "Tom & Jerry say \"hi\"");
        assert_eq!(fetched.data.questions[0].text, "2 < 3 & 3 > 2");
        assert_eq!(fetched.data.questions[0].options[0].text, "True");
    }

    #[tokio::test]
    async fn test_other_teacher_cannot_edit() {
        let store = MemoryDocumentStore::new();
        let saved = save_quiz(&store, &quiz("Math", vec![question("q1")])).await.unwrap();

        let err = get_quiz_for_edit(&store, &saved.id, "teacher-b").await.unwrap_err();
        assert_eq!(err.code(), "quiz/not-owner");

        let err = delete_quiz(&store, &saved.id, "teacher-b").await.unwrap_err();
        assert_eq!(err.code(), "quiz/not-owner");
        assert!(get_quiz(&store, &saved.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_keeps_owner_and_counter() {
        let store = MemoryDocumentStore::new();
        let saved = save_quiz(&store, &quiz("Math", vec![question("q1")])).await.unwrap();
        increment_submission_count(&store, &saved.id).await.unwrap();

        let mut edited = quiz("Algebra", vec![question("q9")]);
        edited.author_id = "someone-else".to_string();
        let updated = update_quiz(&store, &saved.id, "teacher-a", &edited).await.unwrap();

        assert_eq!(updated.data.title, "Algebra");
        assert_eq!(updated.data.author_id, "teacher-a");
        assert_eq!(updated.data.submission_count, 1);
    }

    #[tokio::test]
    async fn test_public_listing_requires_both_flags() {
        let store = MemoryDocumentStore::new();
        let mut public = quiz("Public", vec![question("q1")]);
        public.is_published = true;
        public.is_public = true;
        let mut unlisted = quiz("Unlisted", vec![question("q1")]);
        unlisted.is_published = true;

        save_quiz(&store, &public).await.unwrap();
        save_quiz(&store, &unlisted).await.unwrap();

        let listed = list_public_quizzes(&store, None, 10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].data.title, "Public");
    }
}
