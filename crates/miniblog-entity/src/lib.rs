//! # miniblog-entity
//!
//! Persisted models for Miniblog. Every struct in this crate represents a
//! database table row or the data needed to create one. Database rows
//! derive `sqlx::FromRow`.

pub mod policy;
pub mod user;
