//! In-process policy store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use miniblog_core::result::AppResult;
use miniblog_core::traits::PolicyAdapter;
use miniblog_core::types::PolicyRule;

/// Keeps rules in memory.
#[derive(Debug, Default)]
pub struct MemoryPolicyAdapter {
    rules: RwLock<Vec<PolicyRule>>,
}

impl MemoryPolicyAdapter {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `rules`, dropping duplicates.
    pub fn with_rules(rules: impl IntoIterator<Item = PolicyRule>) -> Self {
        let mut unique: Vec<PolicyRule> = Vec::new();
        for rule in rules {
            if !unique.contains(&rule) {
                unique.push(rule);
            }
        }
        Self {
            rules: RwLock::new(unique),
        }
    }

    /// Number of stored rules.
    pub async fn len(&self) -> usize {
        self.rules.read().await.len()
    }

    /// Whether the store holds no rules.
    pub async fn is_empty(&self) -> bool {
        self.rules.read().await.is_empty()
    }
}

#[async_trait]
impl PolicyAdapter for MemoryPolicyAdapter {
    async fn load_policy(&self) -> AppResult<Vec<PolicyRule>> {
        Ok(self.rules.read().await.clone())
    }

    async fn add_policy(&self, rule: &PolicyRule) -> AppResult<bool> {
        let mut rules = self.rules.write().await;
        if rules.contains(rule) {
            return Ok(false);
        }
        rules.push(rule.clone());
        Ok(true)
    }

    async fn remove_policy(&self, rule: &PolicyRule) -> AppResult<bool> {
        let mut rules = self.rules.write().await;
        let before = rules.len();
        rules.retain(|r| r != rule);
        Ok(rules.len() != before)
    }
}
