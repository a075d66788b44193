//! The per-editor session facade.
//!
//! One `EditorSession` exists per open editor. It exclusively owns the
//! live `GraphModel`, routes structural edits through the cycle and
//! branch gates, feeds every successful mutation to the autosave
//! coordinator, and delegates trigger operations to the lifecycle. There
//! is no process-wide state: closing the session tears everything down.

use crate::autosave::{AutosaveCoordinator, AutosaveEvent, AutosaveHandle, AutosaveOptions};
use crate::edge::{BranchLabel, Edge, EdgeId};
use crate::error::{GraphError, PersistError, TriggerError};
use crate::graph::GraphModel;
use crate::node::{BlockKind, Node, NodeId, Position};
use crate::store::{
    DraftRevision, GraphStore, ResourceBinder, TriggerStore, WorkflowInput, WorkflowInputsStore,
};
use crate::lifecycle::TriggerLifecycle;
use crate::trigger::{Binding, ProviderConfig, Subscription, TriggerDraft, TriggerMeta};
use flowcanvas_core::{ResourceId, WorkflowId};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

/// User-facing outcome of background persistence activity.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorNotice {
    /// The graph was persisted at the given revision.
    Saved { revision: DraftRevision },
    /// The server copy advanced; the session reloaded it and discarded
    /// local pending edits.
    ReloadedDueToConflict,
    /// A save attempt failed; local edits are intact and will be retried.
    SaveFailed(PersistError),
}

/// An open editing session for one workflow.
pub struct EditorSession<T, I, R> {
    workflow_id: WorkflowId,
    model: GraphModel,
    inputs: Vec<WorkflowInput>,
    autosave: AutosaveHandle,
    events: mpsc::UnboundedReceiver<AutosaveEvent>,
    lifecycle: TriggerLifecycle<T, I, R>,
}

impl<T, I, R> EditorSession<T, I, R>
where
    T: TriggerStore,
    I: WorkflowInputsStore,
    R: ResourceBinder,
{
    /// Opens a session: fetches the workflow, builds the live model from
    /// the persisted snapshot and spawns the autosave coordinator with
    /// that snapshot as its baseline.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure; no session state is created.
    pub async fn open<S: GraphStore + 'static>(
        workflow_id: WorkflowId,
        graph_store: Arc<S>,
        triggers: Arc<T>,
        inputs_store: Arc<I>,
        resources: Arc<R>,
        declared_inputs: Vec<WorkflowInput>,
        options: AutosaveOptions,
    ) -> Result<Self, PersistError> {
        let workflow = graph_store.get_workflow(workflow_id).await?;
        let model = GraphModel::from_snapshot(&workflow.graph);
        let (autosave, events) = AutosaveCoordinator::spawn(
            workflow_id,
            graph_store,
            workflow.graph,
            workflow.draft_revision,
            options,
        );
        Ok(Self {
            workflow_id,
            model,
            inputs: declared_inputs,
            autosave,
            events,
            lifecycle: TriggerLifecycle::new(workflow_id, triggers, inputs_store, resources),
        })
    }

    /// The workflow this session edits.
    #[must_use]
    pub fn workflow_id(&self) -> WorkflowId {
        self.workflow_id
    }

    /// The live graph.
    #[must_use]
    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    /// The declared workflow inputs.
    #[must_use]
    pub fn inputs(&self) -> &[WorkflowInput] {
        &self.inputs
    }

    fn record_edit(&self) {
        self.autosave.record_edit(self.model.to_snapshot());
    }

    /// Adds a block to the canvas.
    ///
    /// # Errors
    ///
    /// Propagates `GraphError` from the model.
    pub fn add_block(
        &mut self,
        kind: BlockKind,
        label: impl Into<String>,
        position: Position,
    ) -> Result<NodeId, GraphError> {
        let node_id = self
            .model
            .add_node(Node::new(kind, label).with_position(position))?;
        self.record_edit();
        Ok(node_id)
    }

    /// Adds a trigger block holding a fresh Draft with default bindings
    /// for the declared inputs.
    pub fn add_trigger_block(
        &mut self,
        label: impl Into<String>,
        position: Position,
        provider_config: ProviderConfig,
    ) -> Result<NodeId, GraphError> {
        let node_id = self
            .model
            .add_node(Node::new(BlockKind::Trigger, label).with_position(position))?;
        let draft = TriggerDraft::new(provider_config, &self.inputs);
        self.model
            .set_trigger_meta(node_id, Some(TriggerMeta::Draft(draft)))?;
        self.record_edit();
        Ok(node_id)
    }

    /// Removes a block, cascading its edges.
    ///
    /// For trigger nodes holding a Subscription this does **not** delete
    /// the server-side subscription — use [`Self::delete_trigger`] for
    /// that; removing directly leaves the subscription orphaned.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node is missing.
    pub fn remove_block(&mut self, node_id: NodeId) -> Result<Node, GraphError> {
        let node = self
            .model
            .remove_node(node_id)
            .ok_or(GraphError::NodeNotFound { node_id })?;
        self.record_edit();
        Ok(node)
    }

    /// Connects two blocks, allocating a branch slot when the source is a
    /// branching kind. `slot` is the explicit handle the user targeted,
    /// if any.
    ///
    /// # Errors
    ///
    /// Propagates the gate errors (`CycleRejected`, `BranchesExhausted`,
    /// `BranchOccupied`, `BranchNotSupported`, `NodeNotFound`); on error
    /// nothing is mutated.
    pub fn connect(
        &mut self,
        source: NodeId,
        target: NodeId,
        slot: Option<BranchLabel>,
    ) -> Result<EdgeId, GraphError> {
        let edge_id = self.model.connect(source, target, slot)?;
        self.record_edit();
        Ok(edge_id)
    }

    /// Removes an edge.
    ///
    /// # Errors
    ///
    /// Returns `EdgeNotFound` if the edge is missing.
    pub fn remove_edge(&mut self, edge_id: EdgeId) -> Result<Edge, GraphError> {
        let edge = self
            .model
            .remove_edge(edge_id)
            .ok_or(GraphError::EdgeNotFound { edge_id })?;
        self.record_edit();
        Ok(edge)
    }

    /// Applies a partial configuration update to a block through the
    /// reconciler.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfigShape` for malformed updates (nothing is
    /// applied) or `NodeNotFound`.
    pub fn update_config(&mut self, node_id: NodeId, update: &Value) -> Result<(), GraphError> {
        self.model.update_node_config(node_id, update)?;
        self.record_edit();
        Ok(())
    }

    /// Saves a trigger node: a Draft transitions to Subscribed, a
    /// Subscription pushes its local edits.
    ///
    /// # Errors
    ///
    /// Propagates validation and collaborator failures from the
    /// lifecycle.
    pub async fn save_trigger(&mut self, node_id: NodeId) -> Result<Subscription, TriggerError> {
        let is_draft = match self.model.trigger_meta(node_id) {
            Some(meta) => meta.is_draft(),
            None => {
                return match self.model.node(node_id) {
                    Some(_) => Err(TriggerError::NotADraft { node_id }),
                    None => Err(TriggerError::Graph(GraphError::NodeNotFound { node_id })),
                };
            }
        };
        let subscription = if is_draft {
            self.lifecycle
                .save_draft(&mut self.model, node_id, &self.inputs)
                .await?
        } else {
            self.lifecycle
                .update_subscribed(&mut self.model, node_id, &self.inputs)
                .await?
        };
        self.record_edit();
        Ok(subscription)
    }

    /// Enables or disables a subscribed trigger without re-validating its
    /// provider configuration.
    pub async fn toggle_trigger(
        &mut self,
        node_id: NodeId,
        enabled: bool,
    ) -> Result<Subscription, TriggerError> {
        let subscription = self
            .lifecycle
            .toggle(&mut self.model, node_id, enabled)
            .await?;
        self.record_edit();
        Ok(subscription)
    }

    /// Deletes a trigger node, deleting its server-side subscription
    /// first when one exists.
    pub async fn delete_trigger(&mut self, node_id: NodeId) -> Result<(), TriggerError> {
        self.lifecycle.delete_trigger(&mut self.model, node_id).await?;
        self.record_edit();
        Ok(())
    }

    /// Replaces the declared workflow inputs, re-deriving trigger
    /// bindings.
    pub async fn set_workflow_inputs(
        &mut self,
        inputs: Vec<WorkflowInput>,
    ) -> Result<(), TriggerError> {
        self.lifecycle
            .set_workflow_inputs(&mut self.model, &inputs)
            .await?;
        self.inputs = inputs;
        self.record_edit();
        Ok(())
    }

    /// Sets one input's binding on a trigger node.
    pub fn set_trigger_binding(
        &mut self,
        node_id: NodeId,
        input: &str,
        binding: Binding,
    ) -> Result<(), TriggerError> {
        self.lifecycle
            .set_binding(&mut self.model, node_id, input, binding)?;
        self.record_edit();
        Ok(())
    }

    /// Binds a Supabase project through OAuth for a supabase trigger.
    pub async fn bind_supabase_oauth(
        &mut self,
        node_id: NodeId,
        project_ref: &str,
    ) -> Result<ResourceId, TriggerError> {
        let resource = self
            .lifecycle
            .bind_supabase_oauth(&mut self.model, node_id, project_ref)
            .await?;
        self.record_edit();
        Ok(resource)
    }

    /// Binds a Supabase project with a service-role key for a supabase
    /// trigger.
    pub async fn bind_supabase_manual(
        &mut self,
        node_id: NodeId,
        project_ref: &str,
        service_role_key: &str,
    ) -> Result<ResourceId, TriggerError> {
        let resource = self
            .lifecycle
            .bind_supabase_manual(&mut self.model, node_id, project_ref, service_role_key)
            .await?;
        self.record_edit();
        Ok(resource)
    }

    fn apply_event(&mut self, event: AutosaveEvent) -> EditorNotice {
        match event {
            AutosaveEvent::Saved { revision } => EditorNotice::Saved { revision },
            AutosaveEvent::Conflict(workflow) => {
                self.model = GraphModel::from_snapshot(&workflow.graph);
                EditorNotice::ReloadedDueToConflict
            }
            AutosaveEvent::Failed(error) => EditorNotice::SaveFailed(error),
        }
    }

    /// Waits for the next persistence notice, applying conflict reloads
    /// to the live model. Returns `None` once the session is closed.
    pub async fn next_notice(&mut self) -> Option<EditorNotice> {
        let event = self.events.recv().await?;
        Some(self.apply_event(event))
    }

    /// Returns the next persistence notice without waiting, applying
    /// conflict reloads to the live model.
    pub fn try_notice(&mut self) -> Option<EditorNotice> {
        let event = self.events.try_recv().ok()?;
        Some(self.apply_event(event))
    }

    /// Closes the session, flushing per the close contract: a pending
    /// snapshot is saved once; an already outstanding save carries the
    /// final state and no duplicate request fires.
    pub async fn close(self) {
        self.autosave.close().await;
    }
}
