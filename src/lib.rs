// src/lib.rs

pub mod ai;
pub mod analytics;
pub mod attempts;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod scoring;
pub mod state;
pub mod store;
pub mod timer;
pub mod utils;

pub use routes::create_router;
