//! # miniblog-database
//!
//! PostgreSQL connection management, migrations, the user repository and
//! the durable policy store used by the authorization engine.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
