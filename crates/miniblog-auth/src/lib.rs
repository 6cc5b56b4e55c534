//! # miniblog-auth
//!
//! Authentication and authorization for the Miniblog resource server.
//!
//! ## Modules
//!
//! - `password`: Argon2id hashing and plaintext-vs-hash verification
//! - `jwt`: signed, time-bounded identity tokens and bearer extraction
//! - `policy`: casbin model, snapshot-based policy engine, and store adapters
//! - `error`: the authentication/authorization error taxonomy

pub mod error;
pub mod jwt;
pub mod password;
pub mod policy;

pub use error::AuthError;
pub use jwt::{Claims, Clock, CredentialCarrier, ManualClock, SigningConfig, SystemClock, TokenService};
pub use password::PasswordHasher;
pub use policy::{Authorizer, EngineState, MemoryPolicyAdapter, PolicyEngine, PolicyModel};
