//! Boundary contracts to the engine's external collaborators.
//!
//! The editor core persists graphs, manages trigger subscriptions,
//! declares workflow inputs and binds Supabase project resources through
//! these traits. Implementations — HTTP transports in production,
//! in-memory stores in tests — are out of scope for the engine.

use crate::node::NodeId;
use crate::snapshot::GraphSnapshot;
use crate::error::PersistError;
use crate::trigger::{BindingState, ProviderConfig, Subscription, TriggerKey};
use async_trait::async_trait;
use flowcanvas_core::{ResourceId, SubscriptionId, WorkflowId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, monotonically increasing conflict token for a workflow draft.
///
/// The engine never interprets the value; it only round-trips the last
/// revision it read so the server can detect concurrent edits.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DraftRevision(u64);

impl DraftRevision {
    /// Wraps a raw revision counter.
    #[must_use]
    pub const fn new(revision: u64) -> Self {
        Self(revision)
    }
}

impl fmt::Display for DraftRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A workflow as read from the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedWorkflow {
    /// The persisted graph.
    pub graph: GraphSnapshot,
    /// The draft revision the graph was read at.
    pub draft_revision: DraftRevision,
}

/// A declared workflow input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowInput {
    /// The input name, referenced by trigger bindings as `data.<name>`.
    pub name: String,
}

impl WorkflowInput {
    /// Creates a declared input.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The request shape for creating a subscription from a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubscription {
    /// The trigger node this subscription backs.
    pub node_id: NodeId,
    /// The provider key.
    pub trigger_key: TriggerKey,
    /// Bindings at save time.
    pub bindings: BindingState,
    /// Provider configuration at save time.
    pub provider_config: ProviderConfig,
}

/// Persists and reads workflow graphs.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Saves the graph body, presenting the revision the client last
    /// read.
    ///
    /// # Errors
    ///
    /// `Conflict` when the server's revision advanced past `last_read`;
    /// `Timeout`/`Failed` for transport problems.
    async fn save_graph(
        &self,
        workflow_id: WorkflowId,
        graph: &GraphSnapshot,
        last_read: DraftRevision,
    ) -> Result<DraftRevision, PersistError>;

    /// Reads the authoritative graph and its current revision.
    async fn get_workflow(&self, workflow_id: WorkflowId)
    -> Result<PersistedWorkflow, PersistError>;
}

/// Manages server-side trigger subscriptions.
#[async_trait]
pub trait TriggerStore: Send + Sync {
    /// Creates a subscription from a validated draft.
    async fn create_subscription(
        &self,
        workflow_id: WorkflowId,
        request: &NewSubscription,
    ) -> Result<Subscription, PersistError>;

    /// Updates an existing subscription's bindings and provider
    /// configuration.
    async fn update_subscription(
        &self,
        id: SubscriptionId,
        bindings: &BindingState,
        provider_config: &ProviderConfig,
    ) -> Result<Subscription, PersistError>;

    /// Enables or disables a subscription without touching its
    /// configuration.
    async fn toggle_subscription(
        &self,
        id: SubscriptionId,
        enabled: bool,
    ) -> Result<Subscription, PersistError>;

    /// Deletes a subscription.
    async fn delete_subscription(&self, id: SubscriptionId) -> Result<(), PersistError>;
}

/// Declares the workflow's named inputs.
#[async_trait]
pub trait WorkflowInputsStore: Send + Sync {
    /// Replaces the declared inputs with `inputs`.
    async fn update_workflow_inputs(
        &self,
        workflow_id: WorkflowId,
        inputs: &[WorkflowInput],
    ) -> Result<(), PersistError>;
}

/// Binds Supabase project resources for change-data-capture triggers.
#[async_trait]
pub trait ResourceBinder: Send + Sync {
    /// Binds a project through the OAuth flow.
    async fn bind_project_oauth(&self, project_ref: &str) -> Result<ResourceId, PersistError>;

    /// Binds a project with a manually entered service-role key.
    async fn bind_project_manual(
        &self,
        project_ref: &str,
        service_role_key: &str,
    ) -> Result<ResourceId, PersistError>;
}
