//! Workflow graph edit engine for the flowcanvas platform.
//!
//! This crate owns the authoritative in-memory representation of a
//! workflow while a user edits it, and everything that keeps that
//! representation sound and persisted:
//!
//! - **Graph Model**: typed node/edge collections over petgraph, with
//!   cascade removal and snapshot conversion
//! - **Branch Allocation**: exclusive `true`/`false` and `loop`/`exit`
//!   output slots on branching nodes
//! - **Cycle Policy**: local rejection of self-edges and direct two-node
//!   cycles
//! - **Config Reconciliation**: key-presence merges of partial
//!   configuration updates
//! - **Autosave**: debounced, coalescing persistence with at most one
//!   save in flight and conflict-driven reload
//! - **Trigger Lifecycle**: the draft/subscription duality of trigger
//!   nodes and per-provider configuration (webhook, Gmail, cron,
//!   Supabase)
//!
//! Rendering, transport and OAuth are external collaborators behind the
//! traits in [`store`].

pub mod autosave;
pub mod branch;
pub mod config;
pub mod cycle;
pub mod edge;
pub mod error;
pub mod graph;
pub mod lifecycle;
pub mod node;
pub mod schedule;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod trigger;

pub use autosave::{AutosaveCoordinator, AutosaveEvent, AutosaveHandle, AutosaveOptions};
pub use config::Config;
pub use edge::{BranchLabel, Edge, EdgeId};
pub use error::{GraphError, PersistError, TriggerError, ValidationError};
pub use graph::GraphModel;
pub use lifecycle::TriggerLifecycle;
pub use node::{BlockKind, Node, NodeId, Position};
pub use session::{EditorNotice, EditorSession};
pub use snapshot::{GraphSnapshot, SNAPSHOT_VERSION};
pub use store::{
    DraftRevision, GraphStore, NewSubscription, PersistedWorkflow, ResourceBinder, TriggerStore,
    WorkflowInput, WorkflowInputsStore,
};
pub use trigger::{
    Binding, BindingMode, BindingState, CronConfig, GmailConfig, ProviderConfig, Subscription,
    SupabaseConfig, TriggerDraft, TriggerKey, TriggerMeta, WatchedEvent, WebhookConfig,
};
