//! Repository implementations for Miniblog entities.

pub mod policy;
pub mod user;

pub use policy::PolicyRepository;
pub use user::UserRepository;
