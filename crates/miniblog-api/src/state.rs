//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use miniblog_auth::{Authorizer, PasswordHasher, PolicyEngine, TokenService};
use miniblog_core::config::AppConfig;
use miniblog_database::DatabasePool;
use miniblog_database::repositories::user::UserRepository;

/// Shared dependencies, passed to every handler via `State<AppState>`.
///
/// All fields are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// PostgreSQL connection pool
    pub db: DatabasePool,
    /// Token issuer and verifier
    pub tokens: Arc<TokenService>,
    /// Password hasher (Argon2)
    pub hasher: Arc<PasswordHasher>,
    /// Policy engine, for rule management
    pub policy: Arc<PolicyEngine>,
    /// Decision seam used by the authorization middleware
    pub authorizer: Arc<dyn Authorizer>,
    /// User repository
    pub users: Arc<UserRepository>,
}

impl AppState {
    /// Wires state from its parts. The engine doubles as the authorizer.
    pub fn new(
        config: AppConfig,
        db: DatabasePool,
        tokens: Arc<TokenService>,
        policy: Arc<PolicyEngine>,
    ) -> Self {
        let users = Arc::new(UserRepository::new(db.pool().clone()));
        Self {
            config: Arc::new(config),
            db,
            tokens,
            hasher: Arc::new(PasswordHasher::new()),
            authorizer: Arc::clone(&policy) as Arc<dyn Authorizer>,
            policy,
            users,
        }
    }
}
