// src/store/memory.rs

use std::{cmp::Ordering, collections::HashMap};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{
    CREATED_AT, Direction, Document, DocumentStore, Query, StoreError, StoreErrorCode,
    UPDATED_AT, expect_object,
};

/// Process-local document store.
///
/// Used by the test suite and when no `DATABASE_URL` is configured.
/// Contents are lost on restart.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, HashMap<String, Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.create_with_id(collection, &id, data).await?;
        Ok(id)
    }

    async fn create_with_id(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        let data = Value::Object(expect_object(data)?);
        let now = Utc::now();

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Err(StoreError::already_exists(collection, id));
        }

        docs.insert(
            id.to_string(),
            Document {
                id: id.to_string(),
                collection: collection.to_string(),
                data,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn update(&self, collection: &str, id: &str, partial: Value) -> Result<(), StoreError> {
        let partial = expect_object(partial)?;
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        if let Value::Object(fields) = &mut doc.data {
            for (key, value) in partial {
                fields.insert(key, value);
            }
        }
        doc.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<Document> = docs
            .values()
            .filter(|doc| {
                query
                    .filters
                    .iter()
                    .all(|f| doc.data.get(&f.field) == Some(&f.value))
            })
            .cloned()
            .collect();

        match &query.order_by {
            Some(order) => {
                matches.sort_by(|a, b| {
                    let ord = match order.field.as_str() {
                        CREATED_AT => a.created_at.cmp(&b.created_at),
                        UPDATED_AT => a.updated_at.cmp(&b.updated_at),
                        field => compare_values(a.data.get(field), b.data.get(field)),
                    };
                    match order.direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    }
                });
            }
            // Insertion order is not tracked; fall back to creation time.
            None => matches.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        }

        if let Some(limit) = query.limit {
            matches.truncate(limit);
        }

        Ok(matches)
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        by: i64,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        let Value::Object(fields) = &mut doc.data else {
            return Err(StoreError::new(
                StoreErrorCode::Internal,
                format!("{}/{} is not an object", collection, id),
            ));
        };

        let current = match fields.get(field) {
            None | Some(Value::Null) => 0,
            Some(value) => value.as_i64().ok_or_else(|| {
                StoreError::new(
                    StoreErrorCode::InvalidArgument,
                    format!("{} is not an integer field", field),
                )
            })?,
        };
        fields.insert(field.to_string(), Value::from(current + by));
        doc.updated_at = Utc::now();
        Ok(())
    }
}

/// Orders JSON scalars roughly the way Postgres orders `jsonb`:
/// null < strings < numbers < booleans; missing fields sort first.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::String(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::Bool(_)) => 4,
            Some(Value::Array(_)) => 5,
            Some(Value::Object(_)) => 6,
        }
    }

    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MemoryDocumentStore::new();
        let id = store
            .create("quizzes", json!({"title": "Math"}))
            .await
            .unwrap();

        let doc = store.get("quizzes", &id).await.unwrap().unwrap();
        assert_eq!(doc.id, id);
        assert_eq!(doc.data["title"], "Math");
        assert_eq!(doc.created_at, doc.updated_at);
    }

    #[tokio::test]
    async fn test_create_with_taken_id_keeps_first() {
        let store = MemoryDocumentStore::new();
        store
            .create_with_id("credentials", "ada@example.com", json!({"userId": "u1"}))
            .await
            .unwrap();

        let err = store
            .create_with_id("credentials", "ada@example.com", json!({"userId": "u2"}))
            .await
            .unwrap_err();
        assert_eq!(err.code, StoreErrorCode::AlreadyExists);

        let doc = store.get("credentials", "ada@example.com").await.unwrap().unwrap();
        assert_eq!(doc.data["userId"], "u1");
    }

    #[tokio::test]
    async fn test_create_rejects_non_object() {
        let store = MemoryDocumentStore::new();
        let err = store.create("quizzes", json!([1, 2])).await.unwrap_err();
        assert_eq!(err.code, StoreErrorCode::InvalidArgument);
    }

    #[tokio::test]
    async fn test_update_merges_top_level_fields() {
        let store = MemoryDocumentStore::new();
        let id = store
            .create("quizzes", json!({"title": "Math", "tags": ["a"]}))
            .await
            .unwrap();

        store
            .update("quizzes", &id, json!({"tags": ["b", "c"]}))
            .await
            .unwrap();

        let doc = store.get("quizzes", &id).await.unwrap().unwrap();
        assert_eq!(doc.data["title"], "Math");
        assert_eq!(doc.data["tags"], json!(["b", "c"]));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let store = MemoryDocumentStore::new();
        let err = store.update("quizzes", "nope", json!({})).await.unwrap_err();
        assert_eq!(err.code, StoreErrorCode::NotFound);

        let err = store.delete("quizzes", "nope").await.unwrap_err();
        assert_eq!(err.code, StoreErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_query_filters_orders_and_limits() {
        let store = MemoryDocumentStore::new();
        for (title, owner, count) in [("b", "u1", 3), ("a", "u1", 1), ("c", "u2", 2)] {
            store
                .create(
                    "quizzes",
                    json!({"title": title, "authorId": owner, "submissionCount": count}),
                )
                .await
                .unwrap();
        }

        let docs = store
            .query(
                "quizzes",
                &Query::new()
                    .where_eq("authorId", "u1")
                    .order_by("title", Direction::Asc),
            )
            .await
            .unwrap();
        let titles: Vec<_> = docs.iter().map(|d| d.data["title"].clone()).collect();
        assert_eq!(titles, vec![json!("a"), json!("b")]);

        let docs = store
            .query(
                "quizzes",
                &Query::new()
                    .order_by("submissionCount", Direction::Desc)
                    .limit(2),
            )
            .await
            .unwrap();
        let counts: Vec<_> = docs.iter().map(|d| d.data["submissionCount"].clone()).collect();
        assert_eq!(counts, vec![json!(3), json!(2)]);
    }

    #[tokio::test]
    async fn test_query_unknown_collection_is_empty() {
        let store = MemoryDocumentStore::new();
        let docs = store.query("nothing", &Query::new()).await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_increment_counter() {
        let store = MemoryDocumentStore::new();
        let id = store.create("quizzes", json!({"title": "x"})).await.unwrap();

        store.increment("quizzes", &id, "submissionCount", 1).await.unwrap();
        store.increment("quizzes", &id, "submissionCount", 1).await.unwrap();

        let doc = store.get("quizzes", &id).await.unwrap().unwrap();
        assert_eq!(doc.data["submissionCount"], 2);
    }
}
