// src/models/mod.rs

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};

use crate::store::{Document, StoreError};

pub mod question;
pub mod quiz;
pub mod submission;
pub mod user;

/// Collection names in the document store.
pub mod collections {
    pub const QUIZZES: &str = "quizzes";
    pub const SUBMISSIONS: &str = "submissions";
    pub const USERS: &str = "users";
    pub const CREDENTIALS: &str = "credentials";
}

/// A record read back from the store, with its id and server timestamps.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stored<T> {
    pub id: String,
    #[serde(flatten)]
    pub data: T,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<T: DeserializeOwned> TryFrom<Document> for Stored<T> {
    type Error = StoreError;

    fn try_from(doc: Document) -> Result<Self, Self::Error> {
        let data = doc.decode()?;
        Ok(Stored {
            id: doc.id,
            data,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        })
    }
}
