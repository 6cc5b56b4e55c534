//! Authorization rule rows.

pub mod model;

pub use model::PolicyRow;
