//! Core type definitions used across the Miniblog workspace.

pub mod policy;

pub use policy::{DEFAULT_PTYPE, PolicyRule};
