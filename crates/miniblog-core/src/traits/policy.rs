//! Durable policy store abstraction.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::policy::PolicyRule;

/// Persists and retrieves authorization rules.
///
/// The policy engine only ever loads the full rule set and adds or removes
/// single rules; it relies on no other capability of the backing store.
#[async_trait]
pub trait PolicyAdapter: Send + Sync + 'static {
    /// Load every stored rule.
    async fn load_policy(&self) -> AppResult<Vec<PolicyRule>>;

    /// Store a rule. Returns `false` if an identical rule already exists.
    async fn add_policy(&self, rule: &PolicyRule) -> AppResult<bool>;

    /// Delete a rule. Returns `false` if no such rule was stored.
    async fn remove_policy(&self, rule: &PolicyRule) -> AppResult<bool>;
}
