//! Policy-based authorization.
//!
//! Rules are `(subject, object, action)` triples evaluated by a casbin
//! enforcer built from a [`PolicyModel`]. The [`PolicyEngine`] publishes
//! each enforcer as an immutable snapshot that request paths read without
//! locking, while writers and the periodic reload swap in new snapshots.

pub mod authorizer;
pub mod casbin_model;
pub mod engine;
pub mod memory;

pub use authorizer::Authorizer;
pub use casbin_model::{DEFAULT_MODEL, PolicyModel};
pub use engine::{EngineState, PolicyEngine};
pub use memory::MemoryPolicyAdapter;
