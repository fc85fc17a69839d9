//! Bounded capability invocation.
//!
//! The invoker is the only way the pipeline runs a capability. It never
//! returns an error: every failure mode (unknown name, capability error,
//! timeout) is captured as a structured payload on the invocation record,
//! so the specialist loop can always feed *something* back to the model.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::registry::ToolRegistry;
use crate::tool::InvocationContext;

/// Default maximum entries in the result cache before LRU eviction.
const DEFAULT_MAX_CACHE_ENTRIES: usize = 5000;

/// A capability invocation requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// Unique ID assigned by the model to this call.
    pub id: String,
    /// Name of the capability to invoke.
    pub name: String,
    /// Input object as emitted by the model.
    pub input: Value,
}

impl ToolCall {
    /// Create a call.
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

/// The completed record of one capability invocation.
///
/// One-to-one with its [`ToolCall`]; never partial. On failure `output`
/// carries a `{error, message}` descriptor safe to show the model.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub call_id: String,
    pub name: String,
    pub output: Value,
    pub success: bool,
    pub timed_out: bool,
    pub duration_ms: u64,
}

/// Time budget class for a capability.
///
/// Most capabilities answer from a primary store and get the standard
/// budget; capabilities known to call out to secondary services or do
/// heavier analysis get the extended one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    Standard,
    Extended,
}

impl TimeoutClass {
    /// The wall-clock budget for this class.
    pub fn budget(&self) -> Duration {
        match self {
            Self::Standard => Duration::from_secs(15),
            Self::Extended => Duration::from_secs(45),
        }
    }
}

/// Invocation policy: per-capability timeout classes and caching.
#[derive(Debug, Clone)]
pub struct InvokerPolicy {
    /// Timeout class per capability name; unknown names get Standard.
    pub timeout_classes: HashMap<String, TimeoutClass>,
    /// Result cache TTL; `None` disables caching entirely.
    pub cache_ttl: Option<Duration>,
    /// Maximum entries in the result cache before LRU eviction.
    pub max_cache_entries: usize,
}

impl Default for InvokerPolicy {
    fn default() -> Self {
        Self {
            timeout_classes: HashMap::new(),
            cache_ttl: None,
            max_cache_entries: DEFAULT_MAX_CACHE_ENTRIES,
        }
    }
}

impl InvokerPolicy {
    /// Assign a timeout class to a capability.
    pub fn with_timeout_class(
        mut self,
        capability: impl Into<String>,
        class: TimeoutClass,
    ) -> Self {
        self.timeout_classes.insert(capability.into(), class);
        self
    }

    /// Enable result caching with the given TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    fn class_for(&self, capability: &str) -> TimeoutClass {
        self.timeout_classes
            .get(capability)
            .copied()
            .unwrap_or(TimeoutClass::Standard)
    }
}

struct CacheEntry {
    inserted_at: Instant,
    output: Value,
    success: bool,
}

/// Result cache with TTL expiry and LRU eviction.
///
/// Constructed explicitly and handed to the invoker, never a module
/// global; callers that mutate upstream data invalidate by capability
/// name through the hooks below.
pub struct ResultCache {
    entries: Mutex<IndexMap<String, CacheEntry>>,
}

impl ResultCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
        }
    }

    fn key(capability: &str, input: &Value) -> String {
        // Canonicalize object key order so logically equal inputs hit.
        let canonical = match input {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let mut ordered = serde_json::Map::new();
                for k in keys {
                    if let Some(v) = map.get(k) {
                        ordered.insert(k.clone(), v.clone());
                    }
                }
                Value::Object(ordered).to_string()
            }
            other => other.to_string(),
        };
        format!("{}|{}", capability, canonical)
    }

    async fn get(&self, capability: &str, input: &Value, ttl: Duration) -> Option<(Value, bool)> {
        let key = Self::key(capability, input);
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.shift_remove(&key) {
            if entry.inserted_at.elapsed() > ttl {
                return None;
            }
            let hit = (entry.output.clone(), entry.success);
            // Re-insert at the end (LRU behavior).
            entries.insert(key, entry);
            return Some(hit);
        }
        None
    }

    async fn store(
        &self,
        capability: &str,
        input: &Value,
        output: &Value,
        success: bool,
        max_entries: usize,
    ) {
        let key = Self::key(capability, input);
        let mut entries = self.entries.lock().await;

        entries.shift_remove(&key);
        entries.insert(
            key,
            CacheEntry {
                inserted_at: Instant::now(),
                output: output.clone(),
                success,
            },
        );

        while entries.len() > max_entries {
            entries.shift_remove_index(0);
        }
    }

    /// Drop every cached result for one capability.
    pub async fn invalidate(&self, capability: &str) {
        let prefix = format!("{}|", capability);
        let mut entries = self.entries.lock().await;
        entries.retain(|key, _| !key.starts_with(&prefix));
    }

    /// Drop every cached result.
    pub async fn invalidate_all(&self) {
        self.entries.lock().await.clear();
    }

    /// Number of cached results.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Executes capability calls under the policy's time budgets.
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
    policy: InvokerPolicy,
    cache: Arc<ResultCache>,
}

impl ToolInvoker {
    /// Create an invoker with an explicit cache.
    pub fn new(registry: Arc<ToolRegistry>, policy: InvokerPolicy, cache: Arc<ResultCache>) -> Self {
        Self {
            registry,
            policy,
            cache,
        }
    }

    /// Create an invoker with a private cache.
    pub fn with_policy(registry: Arc<ToolRegistry>, policy: InvokerPolicy) -> Self {
        Self::new(registry, policy, Arc::new(ResultCache::new()))
    }

    /// Get the registry.
    pub fn registry(&self) -> &ToolRegistry {
        self.registry.as_ref()
    }

    /// Get the cache, for invalidation hooks.
    pub fn cache(&self) -> Arc<ResultCache> {
        self.cache.clone()
    }

    /// Invoke one capability call within its time budget.
    ///
    /// Never fails: timeouts, unknown capabilities, and capability errors
    /// all produce a completed [`ToolInvocation`] with `success = false`.
    /// On timeout the in-flight execution is dropped; an abandoned call
    /// cannot touch the invocation record.
    pub async fn invoke(&self, call: ToolCall, context: InvocationContext) -> ToolInvocation {
        let started = Instant::now();
        let class = self.policy.class_for(&call.name);
        let budget = class.budget();

        if let Some(ttl) = self.policy.cache_ttl {
            if let Some((output, success)) = self.cache.get(&call.name, &call.input, ttl).await {
                debug!(capability = %call.name, "capability cache hit");
                return ToolInvocation {
                    call_id: call.id,
                    name: call.name,
                    output,
                    success,
                    timed_out: false,
                    duration_ms: started.elapsed().as_millis() as u64,
                };
            }
        }

        let execution = self
            .registry
            .execute(&call.name, call.input.clone(), context);

        let (output, success, timed_out) = match timeout(budget, execution).await {
            Ok(Ok(result)) => (result.content, result.success, false),
            Ok(Err(error)) => {
                warn!(capability = %call.name, error = %error, "capability failed");
                (
                    json!({
                        "error": "execution_failed",
                        "message": format!("The {} lookup could not be completed.", call.name),
                    }),
                    false,
                    false,
                )
            }
            Err(_) => {
                warn!(
                    capability = %call.name,
                    budget_secs = budget.as_secs(),
                    "capability timed out, abandoning call"
                );
                (
                    json!({
                        "error": "timeout",
                        "message": format!(
                            "The {} lookup took longer than {}s and was skipped.",
                            call.name,
                            budget.as_secs()
                        ),
                    }),
                    false,
                    true,
                )
            }
        };

        if success && self.policy.cache_ttl.is_some() {
            self.cache
                .store(
                    &call.name,
                    &call.input,
                    &output,
                    success,
                    self.policy.max_cache_entries,
                )
                .await;
        }

        ToolInvocation {
            call_id: call.id,
            name: call.name,
            output,
            success,
            timed_out,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{Tool, ToolArgs, ToolOutput};
    use crate::ToolError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTool {
        count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            "counting"
        }

        fn description(&self) -> &str {
            "Counts executions"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(&self, _args: ToolArgs) -> Result<ToolOutput, ToolError> {
            let current = self.count.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ToolOutput::success(json!({ "count": current })))
        }
    }

    struct NeverResolves;

    #[async_trait]
    impl Tool for NeverResolves {
        fn name(&self) -> &str {
            "never_resolves"
        }

        fn description(&self) -> &str {
            "Hangs forever"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(&self, _args: ToolArgs) -> Result<ToolOutput, ToolError> {
            futures::future::pending::<()>().await;
            unreachable!()
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "failing"
        }

        fn description(&self) -> &str {
            "Always errors"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(&self, _args: ToolArgs) -> Result<ToolOutput, ToolError> {
            Err(ToolError::ExecutionFailed(
                "upstream returned 500 at https://internal.host/parts".to_string(),
            ))
        }
    }

    fn registry_with_counter(count: Arc<AtomicUsize>) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(CountingTool { count });
        Arc::new(registry)
    }

    fn registry_with_hanging_tool() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(NeverResolves);
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_successful_invocation() {
        let count = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_counter(count.clone());
        let invoker = ToolInvoker::with_policy(registry, InvokerPolicy::default());

        let invocation = invoker
            .invoke(
                ToolCall::new("tu_1", "counting", json!({})),
                InvocationContext::default(),
            )
            .await;

        assert!(invocation.success);
        assert!(!invocation.timed_out);
        assert_eq!(invocation.call_id, "tu_1");
        assert_eq!(invocation.output["count"], 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_produces_user_safe_result() {
        let registry = registry_with_hanging_tool();
        let invoker = ToolInvoker::with_policy(registry, InvokerPolicy::default());

        let invocation = invoker
            .invoke(
                ToolCall::new("tu_1", "never_resolves", json!({})),
                InvocationContext::default(),
            )
            .await;

        assert!(!invocation.success);
        assert!(invocation.timed_out);
        assert_eq!(invocation.output["error"], "timeout");
        // Standard class budget is surfaced in the message.
        assert!(invocation.output["message"]
            .as_str()
            .unwrap()
            .contains("15s"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_extended_class_gets_longer_budget() {
        let registry = registry_with_hanging_tool();
        let policy = InvokerPolicy::default()
            .with_timeout_class("never_resolves", TimeoutClass::Extended);
        let invoker = ToolInvoker::with_policy(registry, policy);

        let invocation = invoker
            .invoke(
                ToolCall::new("tu_1", "never_resolves", json!({})),
                InvocationContext::default(),
            )
            .await;

        assert!(invocation.timed_out);
        assert!(invocation.output["message"]
            .as_str()
            .unwrap()
            .contains("45s"));
    }

    #[tokio::test]
    async fn test_capability_error_is_translated() {
        let mut registry = ToolRegistry::new();
        registry.register(FailingTool);
        let invoker = ToolInvoker::with_policy(Arc::new(registry), InvokerPolicy::default());

        let invocation = invoker
            .invoke(
                ToolCall::new("tu_1", "failing", json!({})),
                InvocationContext::default(),
            )
            .await;

        assert!(!invocation.success);
        assert!(!invocation.timed_out);
        assert_eq!(invocation.output["error"], "execution_failed");
        // The raw error (with the internal URL) must not leak through.
        assert!(!invocation.output["message"]
            .as_str()
            .unwrap()
            .contains("internal.host"));
    }

    #[tokio::test]
    async fn test_unknown_capability() {
        let registry = Arc::new(ToolRegistry::new());
        let invoker = ToolInvoker::with_policy(registry, InvokerPolicy::default());

        let invocation = invoker
            .invoke(
                ToolCall::new("tu_1", "missing", json!({})),
                InvocationContext::default(),
            )
            .await;

        assert!(!invocation.success);
        assert_eq!(invocation.output["error"], "execution_failed");
    }

    #[tokio::test]
    async fn test_cache_hits_skip_execution() {
        let count = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_counter(count.clone());
        let policy = InvokerPolicy::default().with_cache_ttl(Duration::from_secs(60));
        let invoker = ToolInvoker::with_policy(registry, policy);

        let call = ToolCall::new("tu_1", "counting", json!({"q": "intake"}));
        let first = invoker.invoke(call.clone(), InvocationContext::default()).await;
        let second = invoker.invoke(call, InvocationContext::default()).await;

        assert!(first.success && second.success);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_key_ignores_field_order() {
        let count = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_counter(count.clone());
        let policy = InvokerPolicy::default().with_cache_ttl(Duration::from_secs(60));
        let invoker = ToolInvoker::with_policy(registry, policy);

        let a: Value = serde_json::from_str(r#"{"a": 1, "b": 2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"b": 2, "a": 1}"#).unwrap();

        invoker
            .invoke(ToolCall::new("tu_1", "counting", a), InvocationContext::default())
            .await;
        invoker
            .invoke(ToolCall::new("tu_2", "counting", b), InvocationContext::default())
            .await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidation_hook() {
        let count = Arc::new(AtomicUsize::new(0));
        let registry = registry_with_counter(count.clone());
        let policy = InvokerPolicy::default().with_cache_ttl(Duration::from_secs(60));
        let invoker = ToolInvoker::with_policy(registry, policy);

        let call = ToolCall::new("tu_1", "counting", json!({}));
        invoker.invoke(call.clone(), InvocationContext::default()).await;
        assert_eq!(invoker.cache().len().await, 1);

        invoker.cache().invalidate("counting").await;
        assert!(invoker.cache().is_empty().await);

        invoker.invoke(call, InvocationContext::default()).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
