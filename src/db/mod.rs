// src/db/mod.rs

//! Data-access functions over the document store.
//!
//! Each function performs one logical read or write and returns the state the
//! store confirmed, so callers never build responses from unconfirmed data.

pub mod quizzes;
pub mod submissions;
pub mod users;
