// src/handlers/mod.rs

pub mod ai;
pub mod attempt;
pub mod auth;
pub mod dashboard;
pub mod profile;
pub mod quiz;
pub mod submission;
