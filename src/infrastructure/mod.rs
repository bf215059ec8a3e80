//! Infrastructure layer - adapters and rule data

pub mod config;
pub mod persistence;
pub mod rules;
