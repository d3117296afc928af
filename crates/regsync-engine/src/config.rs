//! Engine configuration.
//!
//! The source system read these knobs from process-wide properties by
//! string key; they are an explicit struct here, passed into each
//! component at construction.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// When to mark a real-time submission as conditional, so the SIS
/// treats its add and drop lines as one atomic unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionalAddDropPolicy {
    /// Never request atomicity.
    Never,
    /// Request atomicity when the submission contains a drop or the
    /// student already holds registrations.
    WhenNeeded,
    /// Always request atomicity.
    Always,
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Override codes the institution permits the engine to attach
    /// automatically.
    #[serde(default)]
    pub allowed_override_codes: HashSet<String>,
    /// Whether the auto-override retry loop runs at all.
    #[serde(default = "default_true")]
    pub auto_override_enabled: bool,
    /// Cap on auto-override rounds. The loop also stops at the first
    /// round that adds no new override.
    #[serde(default = "default_max_override_rounds")]
    pub max_override_rounds: usize,
    /// Conditional add/drop policy for real-time submissions.
    #[serde(default = "default_conditional")]
    pub conditional_add_drop: ConditionalAddDropPolicy,
    /// Students per remote call during batch reconciliation.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Concurrent per-student workers during batch reconciliation.
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
    /// Requestor note attached to max-credit requests the engine
    /// raises on the student's behalf.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_credit_note: Option<String>,
    /// Institution-specific additions to the error-to-override table
    /// (department/consent error codes and their override codes).
    #[serde(default)]
    pub extra_override_map: HashMap<String, String>,
}

fn default_true() -> bool {
    true
}

fn default_max_override_rounds() -> usize {
    5
}

fn default_conditional() -> ConditionalAddDropPolicy {
    ConditionalAddDropPolicy::WhenNeeded
}

fn default_max_batch_size() -> usize {
    100
}

fn default_batch_concurrency() -> usize {
    4
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allowed_override_codes: HashSet::new(),
            auto_override_enabled: default_true(),
            max_override_rounds: default_max_override_rounds(),
            conditional_add_drop: default_conditional(),
            max_batch_size: default_max_batch_size(),
            batch_concurrency: default_batch_concurrency(),
            max_credit_note: None,
            extra_override_map: HashMap::new(),
        }
    }
}

impl EngineConfig {
    /// Built-in error-code to override-code table. Institution-specific
    /// codes come in through [`EngineConfig::extra_override_map`].
    fn builtin_override_for(code: &str) -> Option<&'static str> {
        match code {
            "TIME" => Some("TIME-CNFLT"),
            "CLOS" => Some("CLOS-OVR"),
            "CORQ" => Some("CORQ-OVR"),
            "LINK" => Some("LINK-OVR"),
            "REPT" => Some("REPT-OVR"),
            _ => None,
        }
    }

    /// The override code to attach automatically for an error code, if
    /// any: the table entry must exist and the code must be in the
    /// allowed set.
    #[must_use]
    pub fn override_for(&self, error_code: &str) -> Option<&str> {
        if !self.auto_override_enabled {
            return None;
        }
        let candidate = self
            .extra_override_map
            .get(error_code)
            .map(String::as_str)
            .or_else(|| Self::builtin_override_for(error_code))?;
        self.allowed_override_codes
            .get(candidate)
            .map(String::as_str)
    }

    /// Number of distinct override codes the engine could ever attach.
    /// The auto-override loop converges within this many rounds.
    #[must_use]
    pub fn override_table_size(&self) -> usize {
        let builtin = ["TIME", "CLOS", "CORQ", "LINK", "REPT"];
        let codes: HashSet<&str> = builtin
            .iter()
            .filter_map(|c| Self::builtin_override_for(c))
            .chain(self.extra_override_map.values().map(String::as_str))
            .collect();
        codes.len()
    }

    /// Allow a set of override codes.
    #[must_use]
    pub fn with_allowed_overrides<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_override_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the conditional add/drop policy.
    #[must_use]
    pub fn with_conditional_add_drop(mut self, policy: ConditionalAddDropPolicy) -> Self {
        self.conditional_add_drop = policy;
        self
    }
}
