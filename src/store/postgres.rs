// src/store/postgres.rs

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, types::Json};

use super::{
    CREATED_AT, Direction, Document, DocumentStore, Query, StoreError, UPDATED_AT, expect_object,
};

/// Document store backed by a single JSONB table (see `migrations/`).
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct DocumentRow {
    id: String,
    collection: String,
    data: Json<Value>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            collection: row.collection,
            data: row.data.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.create_with_id(collection, &id, data).await?;
        Ok(id)
    }

    async fn create_with_id(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        let data = Value::Object(expect_object(data)?);

        let result = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO NOTHING
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(data))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create {}/{}: {:?}", collection, id, e);
            StoreError::from(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::already_exists(collection, id));
        }
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, collection, data, created_at, updated_at
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch {}/{}: {:?}", collection, id, e);
            StoreError::from(e)
        })?;

        Ok(row.map(Document::from))
    }

    async fn update(&self, collection: &str, id: &str, partial: Value) -> Result<(), StoreError> {
        let partial = expect_object(partial)?;

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET data = data || $3, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(Value::Object(partial)))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update {}/{}: {:?}", collection, id, e);
            StoreError::from(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete {}/{}: {:?}", collection, id, e);
                StoreError::from(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT id, collection, data, created_at, updated_at FROM documents WHERE collection = ",
        );
        builder.push_bind(collection.to_string());

        // `@>` on a single-key object is equality on that field and can use the GIN index.
        for filter in &query.filters {
            let mut containment = Map::new();
            containment.insert(filter.field.clone(), filter.value.clone());
            builder.push(" AND data @> ");
            builder.push_bind(Json(Value::Object(containment)));
        }

        match &query.order_by {
            Some(order) => {
                match order.field.as_str() {
                    CREATED_AT => {
                        builder.push(" ORDER BY created_at");
                    }
                    UPDATED_AT => {
                        builder.push(" ORDER BY updated_at");
                    }
                    field => {
                        builder.push(" ORDER BY data -> ");
                        builder.push_bind(field.to_string());
                    }
                }
                builder.push(match order.direction {
                    Direction::Asc => " ASC",
                    Direction::Desc => " DESC",
                });
            }
            None => {
                builder.push(" ORDER BY created_at ASC");
            }
        }

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit as i64);
        }

        let rows: Vec<DocumentRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to query {}: {:?}", collection, e);
                StoreError::from(e)
            })?;

        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        by: i64,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET data = jsonb_set(
                    data,
                    ARRAY[$3::TEXT],
                    to_jsonb(COALESCE((data ->> $3)::BIGINT, 0) + $4)
                ),
                updated_at = NOW()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(field)
        .bind(by)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to increment {}/{}.{}: {:?}", collection, id, field, e);
            StoreError::from(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }
}
