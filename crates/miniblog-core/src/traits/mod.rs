//! Core traits defined in `miniblog-core` and implemented by other crates.

pub mod policy;

pub use policy::PolicyAdapter;
