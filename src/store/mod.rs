// src/store/mod.rs

//! Document persistence.
//!
//! Every entity lives in a named collection as a JSON document. The store
//! assigns ids and the `created_at` / `updated_at` timestamps; callers only
//! ever hand it the record body.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

pub mod memory;
pub mod postgres;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

/// Shared handle used by the router state.
pub type Store = Arc<dyn DocumentStore>;

/// A stored record together with its server-assigned metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub collection: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Decodes the record body into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            StoreError::new(
                StoreErrorCode::Internal,
                format!("{}/{} does not match its schema: {}", self.collection, self.id, e),
            )
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Ordering key. `createdAt` and `updatedAt` sort on document metadata,
/// anything else on the top-level data field of that name.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Equality predicate on a top-level data field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Metadata field names understood by `OrderBy`.
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    NotFound,
    AlreadyExists,
    InvalidArgument,
    Unavailable,
    Internal,
}

impl StoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreErrorCode::NotFound => "not-found",
            StoreErrorCode::AlreadyExists => "already-exists",
            StoreErrorCode::InvalidArgument => "invalid-argument",
            StoreErrorCode::Unavailable => "unavailable",
            StoreErrorCode::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreError {
    pub code: StoreErrorCode,
    pub message: String,
}

impl StoreError {
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::new(
            StoreErrorCode::NotFound,
            format!("{}/{} does not exist", collection, id),
        )
    }

    pub fn already_exists(collection: &str, id: &str) -> Self {
        Self::new(
            StoreErrorCode::AlreadyExists,
            format!("{}/{} already exists", collection, id),
        )
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store/{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let code = match &err {
            sqlx::Error::RowNotFound => StoreErrorCode::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreErrorCode::Unavailable
            }
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreErrorCode::AlreadyExists,
            sqlx::Error::Database(db)
                if db.is_check_violation() || db.is_foreign_key_violation() =>
            {
                StoreErrorCode::InvalidArgument
            }
            _ => StoreErrorCode::Internal,
        };
        StoreError::new(code, err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::new(StoreErrorCode::InvalidArgument, err.to_string())
    }
}

/// Contract of the backing document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts `data` (a JSON object) and returns the new document id.
    async fn create(&self, collection: &str, data: Value) -> Result<String, StoreError>;

    /// Inserts `data` under a caller-chosen id. Fails with `AlreadyExists`
    /// if the id is taken; the existing document is left untouched.
    async fn create_with_id(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Overwrites the top-level fields present in `partial`; other fields are kept.
    async fn update(&self, collection: &str, id: &str, partial: Value) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Atomically adds `by` to a numeric top-level field (missing counts as 0).
    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        by: i64,
    ) -> Result<(), StoreError>;
}

/// Serializes a record into the JSON object the store expects.
pub fn to_object<T: Serialize>(record: &T) -> Result<Value, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(Value::Object(map)),
        other => Err(StoreError::new(
            StoreErrorCode::InvalidArgument,
            format!("documents must be JSON objects, got {}", other),
        )),
    }
}

fn expect_object(value: Value) -> Result<Map<String, Value>, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::new(
            StoreErrorCode::InvalidArgument,
            format!("documents must be JSON objects, got {}", other),
        )),
    }
}
