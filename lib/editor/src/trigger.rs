//! Trigger metadata: the draft/subscription duality and per-provider
//! configuration.
//!
//! A trigger node starts life as a Draft that exists only in editor
//! memory. On its first successful save it becomes a Subscription — the
//! canonical server-side shape — and never transitions back. The two
//! states are a tagged sum type so every call site matches exhaustively.

use crate::error::ValidationError;
use crate::schedule;
use crate::store::WorkflowInput;
use chrono::{DateTime, Utc};
use flowcanvas_core::{ConnectionId, DraftId, ResourceId, SubscriptionId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The provider a trigger listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKey {
    /// Inbound HTTP webhook.
    Webhook,
    /// Gmail mailbox poll.
    Gmail,
    /// Cron schedule.
    Cron,
    /// Supabase change-data-capture.
    Supabase,
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Webhook => "webhook",
            Self::Gmail => "gmail",
            Self::Cron => "cron",
            Self::Supabase => "supabase",
        };
        write!(f, "{name}")
    }
}

/// Webhook trigger configuration.
///
/// The endpoint URL and secret are server-generated and only available on
/// the Subscription after the first successful save; a Draft has nothing
/// to configure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {}

/// Gmail poll trigger configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GmailConfig {
    /// The ready OAuth connection to poll with. Saving without one is
    /// blocked; the shell offers a connect action and retries.
    pub connection: Option<ConnectionId>,
    /// Optional Gmail search query narrowing the watched messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// Cron trigger configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronConfig {
    /// Five-field cron expression.
    pub expression: String,
    /// IANA timezone the expression is evaluated in.
    pub timezone: String,
}

/// A Supabase event kind to watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatchedEvent {
    Insert,
    Update,
    Delete,
}

/// Supabase change-data-capture trigger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// The bound project resource, obtained through the resource-binding
    /// collaborator (OAuth or manual service-role key).
    pub resource: Option<ResourceId>,
    /// Database schema of the watched table.
    pub schema: String,
    /// The watched table.
    pub table: String,
    /// Event kinds to watch; at least one is required.
    pub events: BTreeSet<WatchedEvent>,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            resource: None,
            schema: "public".to_string(),
            table: String::new(),
            events: BTreeSet::new(),
        }
    }
}

/// Provider-specific trigger configuration.
///
/// The variant is the trigger key, so a trigger with a chosen-but-empty
/// provider is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ProviderConfig {
    Webhook(WebhookConfig),
    Gmail(GmailConfig),
    Cron(CronConfig),
    Supabase(SupabaseConfig),
}

impl ProviderConfig {
    /// Returns the trigger key for this configuration.
    #[must_use]
    pub fn key(&self) -> TriggerKey {
        match self {
            Self::Webhook(_) => TriggerKey::Webhook,
            Self::Gmail(_) => TriggerKey::Gmail,
            Self::Cron(_) => TriggerKey::Cron,
            Self::Supabase(_) => TriggerKey::Supabase,
        }
    }

    /// Validates the configuration for save, accumulating per-field
    /// errors.
    pub fn validate(&self, errors: &mut ValidationError) {
        match self {
            Self::Webhook(_) => {}
            Self::Gmail(config) => {
                if config.connection.is_none() {
                    errors.insert(
                        "connection",
                        "a ready Gmail connection is required before saving",
                    );
                }
            }
            Self::Cron(config) => {
                if let Err(reason) = schedule::validate_cron(&config.expression) {
                    errors.insert("expression", reason);
                }
                if let Err(reason) = schedule::validate_timezone(&config.timezone) {
                    errors.insert("timezone", reason);
                }
            }
            Self::Supabase(config) => {
                if config.resource.is_none() {
                    errors.insert("resource", "bind a Supabase project before saving");
                }
                if config.schema.trim().is_empty() {
                    errors.insert("schema", "schema is required");
                }
                if config.table.trim().is_empty() {
                    errors.insert("table", "table is required");
                }
                if config.events.is_empty() {
                    errors.insert("events", "select at least one event to watch");
                }
            }
        }
    }
}

/// How a workflow input is filled when the trigger fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingMode {
    /// A path into the triggering event's payload.
    Event,
    /// A literal constant.
    Literal,
}

/// The binding of one workflow input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub mode: BindingMode,
    pub value: String,
}

impl Binding {
    /// Creates an event-payload binding.
    #[must_use]
    pub fn event(path: impl Into<String>) -> Self {
        Self {
            mode: BindingMode::Event,
            value: path.into(),
        }
    }

    /// Creates a literal binding.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            mode: BindingMode::Literal,
            value: value.into(),
        }
    }

    /// The default binding for a newly declared input: an event path
    /// under `data.`.
    #[must_use]
    pub fn default_for(input: &str) -> Self {
        Self::event(format!("data.{input}"))
    }
}

/// The bindings of every declared workflow input, keyed by input name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingState(BTreeMap<String, Binding>);

impl BindingState {
    /// Creates default bindings for a set of declared inputs.
    #[must_use]
    pub fn for_inputs(inputs: &[WorkflowInput]) -> Self {
        Self(
            inputs
                .iter()
                .map(|input| (input.name.clone(), Binding::default_for(&input.name)))
                .collect(),
        )
    }

    /// Re-derives bindings after the declared inputs changed.
    ///
    /// New inputs get the event default, removed inputs are dropped, and
    /// surviving inputs keep their current binding — including
    /// in-progress literal edits.
    #[must_use]
    pub fn rederived(&self, inputs: &[WorkflowInput]) -> Self {
        Self(
            inputs
                .iter()
                .map(|input| {
                    let binding = self
                        .0
                        .get(&input.name)
                        .cloned()
                        .unwrap_or_else(|| Binding::default_for(&input.name));
                    (input.name.clone(), binding)
                })
                .collect(),
        )
    }

    /// Returns the binding for an input.
    #[must_use]
    pub fn get(&self, input: &str) -> Option<&Binding> {
        self.0.get(input)
    }

    /// Sets the binding for an input.
    pub fn set(&mut self, input: impl Into<String>, binding: Binding) {
        self.0.insert(input.into(), binding);
    }

    /// Returns true if no input is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of bound inputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over `(input name, binding)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Binding)> {
        self.0.iter()
    }

    /// Validates that every declared input has a non-empty binding,
    /// accumulating per-field errors under `bindings.<input>`.
    pub fn validate(&self, inputs: &[WorkflowInput], errors: &mut ValidationError) {
        for input in inputs {
            match self.0.get(&input.name) {
                None => {
                    errors.insert(format!("bindings.{}", input.name), "missing binding");
                }
                Some(binding) if binding.value.trim().is_empty() => {
                    errors.insert(format!("bindings.{}", input.name), "binding value is empty");
                }
                Some(_) => {}
            }
        }
    }
}

/// A trigger that exists only in editor memory, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerDraft {
    /// Local identifier for this draft.
    pub id: DraftId,
    /// Initial bindings, one per declared workflow input.
    pub bindings: BindingState,
    /// Initial provider configuration.
    pub provider_config: ProviderConfig,
}

impl TriggerDraft {
    /// Creates a draft with default bindings for the declared inputs.
    #[must_use]
    pub fn new(provider_config: ProviderConfig, inputs: &[WorkflowInput]) -> Self {
        Self {
            id: DraftId::new(),
            bindings: BindingState::for_inputs(inputs),
            provider_config,
        }
    }
}

/// A server-persisted trigger subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Server-side identifier.
    pub id: SubscriptionId,
    /// Current bindings.
    pub bindings: BindingState,
    /// Current provider configuration.
    pub provider_config: ProviderConfig,
    /// Whether the trigger fires.
    pub enabled: bool,
    /// Last server-side update.
    pub updated_at: DateTime<Utc>,
    /// Inbound endpoint URL; webhook subscriptions only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Shared secret for validating webhook deliveries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_token: Option<String>,
}

impl Subscription {
    /// Returns the trigger key.
    #[must_use]
    pub fn key(&self) -> TriggerKey {
        self.provider_config.key()
    }
}

/// Trigger metadata on a trigger node: a local Draft or a persisted
/// Subscription. The transition Draft → Subscription happens exactly once,
/// on the first successful save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TriggerMeta {
    Draft(TriggerDraft),
    Subscription(Subscription),
}

impl TriggerMeta {
    /// Returns true for the Draft state.
    #[must_use]
    pub fn is_draft(&self) -> bool {
        matches!(self, Self::Draft(_))
    }

    /// Returns the subscription, if persisted.
    #[must_use]
    pub fn as_subscription(&self) -> Option<&Subscription> {
        match self {
            Self::Draft(_) => None,
            Self::Subscription(subscription) => Some(subscription),
        }
    }

    /// Returns the trigger key of either state.
    #[must_use]
    pub fn key(&self) -> TriggerKey {
        match self {
            Self::Draft(draft) => draft.provider_config.key(),
            Self::Subscription(subscription) => subscription.key(),
        }
    }

    /// Returns the bindings of either state.
    #[must_use]
    pub fn bindings(&self) -> &BindingState {
        match self {
            Self::Draft(draft) => &draft.bindings,
            Self::Subscription(subscription) => &subscription.bindings,
        }
    }
}
