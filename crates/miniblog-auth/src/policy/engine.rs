//! Snapshot-based policy engine.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use casbin::{CoreApi, Enforcer};
use regex::Regex;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use miniblog_core::error::AppError;
use miniblog_core::result::AppResult;
use miniblog_core::traits::PolicyAdapter;
use miniblog_core::types::{DEFAULT_PTYPE, PolicyRule};

use super::casbin_model::PolicyModel;
use crate::error::AuthError;

/// Lifecycle of the engine's rule snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No rules have been loaded yet.
    Uninitialized,
    /// A snapshot is in place and serving decisions.
    Loaded,
    /// A full reload from the store is in progress. The previous snapshot
    /// keeps serving decisions.
    Reloading,
}

impl EngineState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Loaded,
            2 => Self::Reloading,
            _ => Self::Uninitialized,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Uninitialized => 0,
            Self::Loaded => 1,
            Self::Reloading => 2,
        }
    }
}

/// Compile results for action patterns, keyed by pattern text.
///
/// Most rules share a handful of patterns, so a reload checks each distinct
/// pattern once instead of once per rule.
#[derive(Debug, Default)]
struct ActionPatterns {
    checked: HashMap<String, Result<(), String>>,
}

impl ActionPatterns {
    fn check(&mut self, pattern: &str) -> Result<(), String> {
        if let Some(outcome) = self.checked.get(pattern) {
            return outcome.clone();
        }
        let outcome = Regex::new(pattern).map(|_| ()).map_err(|e| e.to_string());
        self.checked.insert(pattern.to_string(), outcome.clone());
        outcome
    }
}

/// One immutable generation of the rule set.
struct PolicySnapshot {
    enforcer: Enforcer,
    /// Rules handed to the enforcer, in load order.
    rules: Vec<PolicyRule>,
    /// Stored rules whose action pattern does not compile. They never reach
    /// the enforcer; requests from their subject are treated as faults.
    quarantined: Vec<PolicyRule>,
    members: HashSet<PolicyRule>,
}

impl PolicySnapshot {
    async fn build(
        model: &PolicyModel,
        rules: Vec<PolicyRule>,
        patterns: &mut ActionPatterns,
    ) -> Result<Self, AuthError> {
        let mut members = HashSet::with_capacity(rules.len());
        let mut accepted = Vec::with_capacity(rules.len());
        let mut quarantined = Vec::new();

        for rule in rules {
            if rule.ptype != DEFAULT_PTYPE {
                warn!(rule = %rule, "Skipping rule with unsupported policy type");
                continue;
            }
            if members.contains(&rule) {
                continue;
            }
            members.insert(rule.clone());
            match patterns.check(&rule.action) {
                Ok(()) => accepted.push(rule),
                Err(reason) => {
                    error!(rule = %rule, reason = %reason, "Stored rule has an invalid action pattern");
                    quarantined.push(rule);
                }
            }
        }

        let enforcer = model.enforcer(&accepted).await?;
        Ok(Self {
            enforcer,
            rules: accepted,
            quarantined,
            members,
        })
    }

    fn contains(&self, rule: &PolicyRule) -> bool {
        self.members.contains(rule)
    }

    fn all_rules(&self) -> Vec<PolicyRule> {
        self.rules
            .iter()
            .chain(self.quarantined.iter())
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.rules.len() + self.quarantined.len()
    }

    fn decide(&self, subject: &str, object: &str, action: &str) -> Result<bool, AuthError> {
        let allowed = self
            .enforcer
            .enforce((subject, object, action))
            .map_err(|e| AuthError::PolicyEvaluationFault(e.to_string()))?;
        if allowed {
            return Ok(true);
        }
        if let Some(rule) = self.quarantined.iter().find(|r| r.subject == subject) {
            return Err(AuthError::PolicyEvaluationFault(format!(
                "rule '{rule}' cannot be evaluated"
            )));
        }
        Ok(false)
    }
}

/// Evaluates authorization requests against an in-memory casbin enforcer
/// backed by a durable [`PolicyAdapter`].
///
/// Reads never block: [`PolicyEngine::evaluate`] loads the current
/// snapshot atomically. Mutations and reloads are serialized by a writer
/// lock and build the next enforcer to the side before swapping it in, so
/// every decision sees either the old or the new rule set, never a mix.
pub struct PolicyEngine {
    model: PolicyModel,
    adapter: Arc<dyn PolicyAdapter>,
    snapshot: ArcSwap<PolicySnapshot>,
    writer: Mutex<ActionPatterns>,
    state: AtomicU8,
}

impl std::fmt::Debug for PolicyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEngine")
            .field("model", &self.model)
            .field("state", &self.state())
            .field("rules", &self.snapshot.load().len())
            .finish()
    }
}

impl PolicyEngine {
    /// Builds an engine for `model` and performs the initial load from `adapter`.
    pub async fn load(
        model: PolicyModel,
        adapter: Arc<dyn PolicyAdapter>,
    ) -> Result<Self, AuthError> {
        let mut patterns = ActionPatterns::default();
        let rules = load_rules(adapter.as_ref()).await?;
        let snapshot = PolicySnapshot::build(&model, rules, &mut patterns).await?;
        let count = snapshot.len();

        let engine = Self {
            model,
            adapter,
            snapshot: ArcSwap::from_pointee(snapshot),
            writer: Mutex::new(patterns),
            state: AtomicU8::new(EngineState::Uninitialized.as_u8()),
        };
        engine.set_state(EngineState::Loaded);

        info!(rules = count, "Policy engine loaded");
        Ok(engine)
    }

    /// Parses `model_text` and loads the engine from `adapter`.
    pub async fn load_from_text(
        model_text: &str,
        adapter: Arc<dyn PolicyAdapter>,
    ) -> Result<Self, AuthError> {
        let model = PolicyModel::from_text(model_text).await?;
        Self::load(model, adapter).await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: EngineState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// The model rules are matched with.
    pub fn model(&self) -> &PolicyModel {
        &self.model
    }

    /// Rules in the current snapshot, in load order, including rules that
    /// could not be compiled.
    pub fn rules(&self) -> Vec<PolicyRule> {
        self.snapshot.load().all_rules()
    }

    /// Decides a request. Faults surface as errors.
    pub fn enforce(&self, subject: &str, object: &str, action: &str) -> Result<bool, AuthError> {
        self.snapshot.load().decide(subject, object, action)
    }

    /// Decides a request, denying on any evaluation fault.
    pub fn evaluate(&self, subject: &str, object: &str, action: &str) -> bool {
        match self.enforce(subject, object, action) {
            Ok(allowed) => {
                debug!(subject, object, action, allowed, "Policy decision");
                allowed
            }
            Err(e) => {
                error!(subject, object, action, error = %e, "Policy evaluation failed; denying");
                false
            }
        }
    }

    /// Persists a rule and makes it visible to subsequent evaluations.
    ///
    /// Returns `Ok(false)` if the rule already existed. A rule whose action
    /// pattern does not compile is rejected before reaching the store.
    pub async fn add_rule(&self, subject: &str, object: &str, action: &str) -> AppResult<bool> {
        let rule = PolicyRule::new(subject, object, action);

        let mut patterns = self.writer.lock().await;
        if let Err(reason) = patterns.check(&rule.action) {
            return Err(AppError::validation(format!(
                "Invalid action pattern '{}': {reason}",
                rule.action
            )));
        }

        let current = self.snapshot.load_full();
        if current.contains(&rule) {
            debug!(rule = %rule, "Rule already present");
            return Ok(false);
        }

        let added = self.adapter.add_policy(&rule).await?;

        let mut rules = current.all_rules();
        rules.push(rule.clone());
        let next = PolicySnapshot::build(&self.model, rules, &mut patterns).await?;
        self.snapshot.store(Arc::new(next));

        info!(rule = %rule, added, "Policy rule added");
        Ok(added)
    }

    /// Deletes a rule from the store and the snapshot.
    ///
    /// Returns `Ok(false)` if neither held the rule.
    pub async fn remove_rule(&self, subject: &str, object: &str, action: &str) -> AppResult<bool> {
        let rule = PolicyRule::new(subject, object, action);

        let mut patterns = self.writer.lock().await;
        let removed = self.adapter.remove_policy(&rule).await?;

        let current = self.snapshot.load_full();
        let present = current.contains(&rule);
        if present {
            let rules = current
                .all_rules()
                .into_iter()
                .filter(|r| r != &rule)
                .collect();
            let next = PolicySnapshot::build(&self.model, rules, &mut patterns).await?;
            self.snapshot.store(Arc::new(next));
        }

        info!(rule = %rule, removed, "Policy rule removed");
        Ok(removed || present)
    }

    /// Replaces the snapshot with the store's full contents.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn reload(&self) -> Result<usize, AuthError> {
        let mut patterns = self.writer.lock().await;
        self.set_state(EngineState::Reloading);
        let result = self.refresh(&mut patterns).await;
        self.set_state(EngineState::Loaded);
        result
    }

    async fn refresh(&self, patterns: &mut ActionPatterns) -> Result<usize, AuthError> {
        let rules = load_rules(self.adapter.as_ref()).await?;
        let snapshot = PolicySnapshot::build(&self.model, rules, patterns).await?;
        let count = snapshot.len();
        self.snapshot.store(Arc::new(snapshot));
        Ok(count)
    }

    /// Spawns a task that reloads every `period` until `shutdown` flips to
    /// `true` or its sender is dropped.
    pub fn start_auto_reload(
        self: &Arc<Self>,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the initial load already ran.
            ticker.tick().await;

            info!(period_secs = period.as_secs(), "Policy auto-reload started");
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        match engine.reload().await {
                            Ok(count) => debug!(rules = count, "Policy reloaded"),
                            Err(e) => warn!(error = %e, "Policy reload failed; keeping previous rules"),
                        }
                    }
                }
            }
            info!("Policy auto-reload stopped");
        })
    }
}

async fn load_rules(adapter: &dyn PolicyAdapter) -> Result<Vec<PolicyRule>, AuthError> {
    adapter
        .load_policy()
        .await
        .map_err(|e| AuthError::PolicyLoadError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use async_trait::async_trait;

    use super::*;
    use crate::policy::MemoryPolicyAdapter;

    const ALL_METHODS: &str = "(GET)|(POST)|(PUT)|(DELETE)";

    /// Delegates to a memory store but can be told to fail loads.
    #[derive(Default)]
    struct FlakyAdapter {
        inner: MemoryPolicyAdapter,
        fail_loads: AtomicBool,
    }

    #[async_trait]
    impl PolicyAdapter for FlakyAdapter {
        async fn load_policy(&self) -> AppResult<Vec<PolicyRule>> {
            if self.fail_loads.load(Ordering::SeqCst) {
                return Err(AppError::database("store unreachable"));
            }
            self.inner.load_policy().await
        }

        async fn add_policy(&self, rule: &PolicyRule) -> AppResult<bool> {
            self.inner.add_policy(rule).await
        }

        async fn remove_policy(&self, rule: &PolicyRule) -> AppResult<bool> {
            self.inner.remove_policy(rule).await
        }
    }

    /// Returns whatever rows it was given, duplicates included.
    struct FixedAdapter(Vec<PolicyRule>);

    #[async_trait]
    impl PolicyAdapter for FixedAdapter {
        async fn load_policy(&self) -> AppResult<Vec<PolicyRule>> {
            Ok(self.0.clone())
        }

        async fn add_policy(&self, _rule: &PolicyRule) -> AppResult<bool> {
            Ok(true)
        }

        async fn remove_policy(&self, _rule: &PolicyRule) -> AppResult<bool> {
            Ok(true)
        }
    }

    async fn engine_with(rules: Vec<PolicyRule>) -> (Arc<PolicyEngine>, Arc<MemoryPolicyAdapter>) {
        let adapter = Arc::new(MemoryPolicyAdapter::with_rules(rules));
        let engine = PolicyEngine::load(PolicyModel::acl(), adapter.clone())
            .await
            .unwrap();
        (Arc::new(engine), adapter)
    }

    #[tokio::test]
    async fn test_owner_allowed_others_denied() {
        let (engine, _) = engine_with(vec![PolicyRule::new(
            "alice",
            "/v1/users/alice",
            ALL_METHODS,
        )])
        .await;

        assert_eq!(engine.state(), EngineState::Loaded);
        assert!(engine.evaluate("alice", "/v1/users/alice", "GET"));
        assert!(!engine.evaluate("bob", "/v1/users/alice", "GET"));
        assert!(!engine.evaluate("alice", "/v1/users/bob", "GET"));
        assert!(!engine.evaluate("alice", "/v1/users/alice", "PATCH"));
    }

    #[tokio::test]
    async fn test_literal_object_matches_only_itself() {
        let (engine, _) = engine_with(vec![PolicyRule::new(
            "alice",
            "/v1/users/alice",
            ALL_METHODS,
        )])
        .await;

        assert!(!engine.evaluate("alice", "/v1/users/alice/posts/9", "DELETE"));
        assert!(!engine.evaluate("alice", "/v1/users/alice2", "GET"));
    }

    #[tokio::test]
    async fn test_wildcard_object_covers_suffixes() {
        let (engine, _) = engine_with(vec![PolicyRule::new(
            "alice",
            "/v1/users/alice/*",
            ALL_METHODS,
        )])
        .await;

        assert!(engine.evaluate("alice", "/v1/users/alice/change-password", "PUT"));
        assert!(engine.evaluate("alice", "/v1/users/alice/posts/9", "DELETE"));
        assert!(!engine.evaluate("alice", "/v1/users/alice", "GET"));
    }

    #[tokio::test]
    async fn test_empty_store_denies_everything() {
        let (engine, _) = engine_with(Vec::new()).await;
        assert!(engine.rules().is_empty());
        assert!(!engine.evaluate("alice", "/v1/users/alice", "GET"));
    }

    #[tokio::test]
    async fn test_non_allow_rule_types_are_ignored() {
        let grouping = PolicyRule {
            ptype: "g".to_string(),
            subject: "alice".to_string(),
            object: "/v1/admin".to_string(),
            action: String::new(),
        };
        let (engine, _) = engine_with(vec![grouping]).await;

        assert!(engine.rules().is_empty());
        assert!(!engine.evaluate("alice", "/v1/admin", "DELETE"));
        assert!(!engine.evaluate("alice", "/v1/admin/x", "DELETE"));
    }

    #[tokio::test]
    async fn test_add_rule_visible_immediately_and_idempotent() {
        let (engine, adapter) = engine_with(Vec::new()).await;

        assert!(engine.add_rule("bob", "/v1/users/bob", ALL_METHODS).await.unwrap());
        assert!(engine.evaluate("bob", "/v1/users/bob", "DELETE"));

        assert!(!engine.add_rule("bob", "/v1/users/bob", ALL_METHODS).await.unwrap());
        assert_eq!(engine.rules().len(), 1);
        assert_eq!(adapter.len().await, 1);
    }

    #[tokio::test]
    async fn test_add_rule_rejects_bad_action_pattern() {
        let (engine, adapter) = engine_with(Vec::new()).await;
        let err = engine.add_rule("bob", "/v1/users/bob", "(GET").await.unwrap_err();
        assert_eq!(err.kind, miniblog_core::error::ErrorKind::Validation);
        assert!(adapter.is_empty().await);
        assert!(engine.rules().is_empty());
    }

    #[tokio::test]
    async fn test_remove_rule() {
        let (engine, adapter) = engine_with(vec![PolicyRule::new("alice", "/v1/users/alice", "GET")]).await;

        assert!(engine.remove_rule("alice", "/v1/users/alice", "GET").await.unwrap());
        assert!(!engine.evaluate("alice", "/v1/users/alice", "GET"));
        assert!(adapter.is_empty().await);
        assert!(!engine.remove_rule("alice", "/v1/users/alice", "GET").await.unwrap());
    }

    #[tokio::test]
    async fn test_reload_picks_up_external_writes() {
        let (engine, adapter) = engine_with(Vec::new()).await;

        let rule = PolicyRule::new("carol", "/v1/posts/*", "GET");
        adapter.add_policy(&rule).await.unwrap();
        assert!(!engine.evaluate("carol", "/v1/posts/1", "GET"));

        assert_eq!(engine.reload().await.unwrap(), 1);
        assert!(engine.evaluate("carol", "/v1/posts/1", "GET"));

        adapter.remove_policy(&rule).await.unwrap();
        engine.reload().await.unwrap();
        assert!(!engine.evaluate("carol", "/v1/posts/1", "GET"));
    }

    #[tokio::test]
    async fn test_reload_collapses_duplicate_rows() {
        let mut rows = Vec::new();
        for i in 0..2_000 {
            let rule = PolicyRule::new(format!("user{i}"), format!("/v1/users/user{i}"), ALL_METHODS);
            rows.push(rule.clone());
            rows.push(rule);
        }
        let engine = PolicyEngine::load(PolicyModel::acl(), Arc::new(FixedAdapter(rows)))
            .await
            .unwrap();
        assert_eq!(engine.rules().len(), 2_000);

        let reloaded = tokio::time::timeout(Duration::from_secs(30), engine.reload())
            .await
            .expect("reload of a few thousand rules should be quick")
            .unwrap();
        assert_eq!(reloaded, 2_000);
        assert!(engine.evaluate("user1999", "/v1/users/user1999", "PUT"));
        assert_eq!(engine.writer.lock().await.checked.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_snapshot() {
        let adapter = Arc::new(FlakyAdapter::default());
        adapter
            .inner
            .add_policy(&PolicyRule::new("alice", "/v1/users/alice", "GET"))
            .await
            .unwrap();
        let engine = PolicyEngine::load(PolicyModel::acl(), adapter.clone())
            .await
            .unwrap();

        adapter.fail_loads.store(true, Ordering::SeqCst);
        let err = engine.reload().await.unwrap_err();
        assert!(matches!(err, AuthError::PolicyLoadError(_)));
        assert_eq!(engine.state(), EngineState::Loaded);
        assert!(engine.evaluate("alice", "/v1/users/alice", "GET"));
    }

    #[tokio::test]
    async fn test_initial_load_failure() {
        let adapter = Arc::new(FlakyAdapter::default());
        adapter.fail_loads.store(true, Ordering::SeqCst);
        let result = PolicyEngine::load(PolicyModel::acl(), adapter).await;
        assert!(matches!(result, Err(AuthError::PolicyLoadError(_))));
    }

    #[tokio::test]
    async fn test_malformed_model_text() {
        let adapter = Arc::new(MemoryPolicyAdapter::new());
        let result = PolicyEngine::load_from_text("[matchers]\nm = r.sub == p.sub\n", adapter).await;
        assert!(matches!(result, Err(AuthError::PolicyLoadError(_))));
    }

    #[tokio::test]
    async fn test_faulty_stored_rule_denies_its_subject_only() {
        let (engine, _) = engine_with(vec![
            PolicyRule::new("mallory", "/v1/users/mallory", "(GET"),
            PolicyRule::new("alice", "/v1/users/alice", "GET"),
        ])
        .await;

        assert_eq!(engine.rules().len(), 2);
        assert!(matches!(
            engine.enforce("mallory", "/v1/users/mallory", "GET"),
            Err(AuthError::PolicyEvaluationFault(_))
        ));
        assert!(!engine.evaluate("mallory", "/v1/users/mallory", "GET"));
        assert!(engine.evaluate("alice", "/v1/users/alice", "GET"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_reload_applies_external_writes() {
        let (engine, adapter) = engine_with(Vec::new()).await;
        let (tx, rx) = watch::channel(false);
        let handle = engine.start_auto_reload(Duration::from_secs(5), rx);

        adapter
            .add_policy(&PolicyRule::new("dave", "/v1/users/dave", "GET"))
            .await
            .unwrap();
        assert!(!engine.evaluate("dave", "/v1/users/dave", "GET"));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(engine.evaluate("dave", "/v1/users/dave", "GET"));

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_reload_stops_when_sender_dropped() {
        let (engine, _) = engine_with(Vec::new()).await;
        let (tx, rx) = watch::channel(false);
        let handle = engine.start_auto_reload(Duration::from_secs(1), rx);
        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_adds_all_land() {
        let (engine, adapter) = engine_with(Vec::new()).await;

        let mut tasks = Vec::new();
        for i in 0..16 {
            let engine = Arc::clone(&engine);
            tasks.push(tokio::spawn(async move {
                let name = format!("user{i}");
                engine
                    .add_rule(&name, &format!("/v1/users/{name}"), ALL_METHODS)
                    .await
                    .unwrap()
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap());
        }

        assert_eq!(engine.rules().len(), 16);
        assert_eq!(adapter.len().await, 16);
        engine.reload().await.unwrap();
        assert!(engine.evaluate("user7", "/v1/users/user7", "GET"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_see_whole_snapshots_during_writes() {
        let (engine, _) = engine_with(vec![PolicyRule::new(
            "alice",
            "/v1/users/alice",
            ALL_METHODS,
        )])
        .await;
        let done = Arc::new(AtomicBool::new(false));

        let mut readers = Vec::new();
        for _ in 0..4 {
            let engine = Arc::clone(&engine);
            let done = Arc::clone(&done);
            readers.push(tokio::spawn(async move {
                let mut seen = vec![false; 20];
                let mut rounds = 0u64;
                loop {
                    let finished = done.load(Ordering::Acquire);
                    assert!(engine.evaluate("alice", "/v1/users/alice", "GET"));
                    for (i, was_seen) in seen.iter_mut().enumerate() {
                        let name = format!("writer{i}");
                        let allowed = engine.evaluate(&name, &format!("/v1/users/{name}"), "GET");
                        // Once a rule is visible it stays visible.
                        assert!(allowed || !*was_seen, "{name} disappeared");
                        *was_seen |= allowed;
                    }
                    rounds += 1;
                    if finished {
                        break;
                    }
                    tokio::task::yield_now().await;
                }
                rounds
            }));
        }

        for i in 0..20 {
            let name = format!("writer{i}");
            engine
                .add_rule(&name, &format!("/v1/users/{name}"), ALL_METHODS)
                .await
                .unwrap();
            engine.reload().await.unwrap();
        }
        done.store(true, Ordering::Release);

        for reader in readers {
            assert!(reader.await.unwrap() > 0);
        }
        assert_eq!(engine.rules().len(), 21);
    }
}
