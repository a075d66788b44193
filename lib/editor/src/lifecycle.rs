//! Trigger lifecycle: Draft → Saving → Subscribed, with discard and
//! delete side paths.
//!
//! Saving a draft validates bindings and provider configuration, creates
//! the server-side subscription and swaps the node's metadata to the
//! Subscription state — a transition that happens exactly once. Toggling
//! `enabled` is a narrow path that never re-validates provider
//! configuration. Deleting a subscribed trigger round-trips to the server
//! before the local node is removed, so a failed delete never orphans the
//! subscription.

use crate::error::{GraphError, TriggerError, ValidationError};
use crate::graph::GraphModel;
use crate::node::{BlockKind, NodeId};
use crate::store::{
    NewSubscription, ResourceBinder, TriggerStore, WorkflowInput, WorkflowInputsStore,
};
use crate::trigger::{
    Binding, BindingState, ProviderConfig, Subscription, TriggerKey, TriggerMeta,
};
use flowcanvas_core::{ResourceId, WorkflowId};
use std::sync::Arc;
use tracing::info;

/// Manages trigger-node state transitions for one workflow.
pub struct TriggerLifecycle<T, I, R> {
    workflow_id: WorkflowId,
    triggers: Arc<T>,
    inputs: Arc<I>,
    resources: Arc<R>,
}

impl<T, I, R> TriggerLifecycle<T, I, R>
where
    T: TriggerStore,
    I: WorkflowInputsStore,
    R: ResourceBinder,
{
    /// Creates a lifecycle bound to a workflow and its collaborators.
    pub fn new(
        workflow_id: WorkflowId,
        triggers: Arc<T>,
        inputs: Arc<I>,
        resources: Arc<R>,
    ) -> Self {
        Self {
            workflow_id,
            triggers,
            inputs,
            resources,
        }
    }

    fn meta_of<'a>(
        model: &'a GraphModel,
        node_id: NodeId,
    ) -> Result<&'a TriggerMeta, TriggerError> {
        let node = model
            .node(node_id)
            .ok_or(TriggerError::Graph(GraphError::NodeNotFound { node_id }))?;
        if node.kind != BlockKind::Trigger {
            return Err(TriggerError::Graph(GraphError::NotATrigger { node_id }));
        }
        node.trigger
            .as_ref()
            .ok_or(TriggerError::NotADraft { node_id })
    }

    fn validate(
        bindings: &BindingState,
        provider_config: &ProviderConfig,
        inputs: &[WorkflowInput],
    ) -> Result<(), TriggerError> {
        let mut errors = ValidationError::new();
        bindings.validate(inputs, &mut errors);
        provider_config.validate(&mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(TriggerError::Validation(errors))
        }
    }

    /// Saves a Draft, transitioning it to Subscribed.
    ///
    /// # Errors
    ///
    /// `Validation` with per-field detail when bindings or provider
    /// configuration are incomplete; `NotADraft` when the node already
    /// holds a subscription; `Store` when the collaborator call fails.
    /// On any error the node keeps its Draft state.
    pub async fn save_draft(
        &self,
        model: &mut GraphModel,
        node_id: NodeId,
        inputs: &[WorkflowInput],
    ) -> Result<Subscription, TriggerError> {
        let draft = match Self::meta_of(model, node_id)? {
            TriggerMeta::Draft(draft) => draft.clone(),
            TriggerMeta::Subscription(_) => return Err(TriggerError::NotADraft { node_id }),
        };

        Self::validate(&draft.bindings, &draft.provider_config, inputs)?;

        let request = NewSubscription {
            node_id,
            trigger_key: draft.provider_config.key(),
            bindings: draft.bindings,
            provider_config: draft.provider_config,
        };
        let subscription = self
            .triggers
            .create_subscription(self.workflow_id, &request)
            .await?;
        info!(
            workflow_id = %self.workflow_id,
            subscription_id = %subscription.id,
            key = %subscription.key(),
            "trigger draft subscribed"
        );

        model.set_trigger_meta(node_id, Some(TriggerMeta::Subscription(subscription.clone())))?;
        Ok(subscription)
    }

    /// Pushes the local edits of a subscribed trigger to the server.
    ///
    /// Runs the same validation as the draft save path so the two agree
    /// on what a saveable trigger is.
    ///
    /// # Errors
    ///
    /// `NotSubscribed` when the node still holds a draft.
    pub async fn update_subscribed(
        &self,
        model: &mut GraphModel,
        node_id: NodeId,
        inputs: &[WorkflowInput],
    ) -> Result<Subscription, TriggerError> {
        let current = match Self::meta_of(model, node_id)? {
            TriggerMeta::Subscription(subscription) => subscription.clone(),
            TriggerMeta::Draft(_) => return Err(TriggerError::NotSubscribed { node_id }),
        };

        Self::validate(&current.bindings, &current.provider_config, inputs)?;

        let subscription = self
            .triggers
            .update_subscription(current.id, &current.bindings, &current.provider_config)
            .await?;
        model.set_trigger_meta(node_id, Some(TriggerMeta::Subscription(subscription.clone())))?;
        Ok(subscription)
    }

    /// Enables or disables a subscribed trigger.
    ///
    /// This path is independent of the general save path and does not
    /// re-validate provider configuration.
    ///
    /// # Errors
    ///
    /// `NotSubscribed` when the node holds a draft.
    pub async fn toggle(
        &self,
        model: &mut GraphModel,
        node_id: NodeId,
        enabled: bool,
    ) -> Result<Subscription, TriggerError> {
        let subscription_id = match Self::meta_of(model, node_id)? {
            TriggerMeta::Subscription(subscription) => subscription.id,
            TriggerMeta::Draft(_) => return Err(TriggerError::NotSubscribed { node_id }),
        };

        let subscription = self
            .triggers
            .toggle_subscription(subscription_id, enabled)
            .await?;
        info!(
            workflow_id = %self.workflow_id,
            subscription_id = %subscription.id,
            enabled,
            "trigger toggled"
        );
        model.set_trigger_meta(node_id, Some(TriggerMeta::Subscription(subscription.clone())))?;
        Ok(subscription)
    }

    /// Deletes a trigger node.
    ///
    /// Discarding a Draft only removes local state. Deleting a
    /// Subscription round-trips to the server first; when that fails the
    /// node stays in place and the error is surfaced.
    pub async fn delete_trigger(
        &self,
        model: &mut GraphModel,
        node_id: NodeId,
    ) -> Result<(), TriggerError> {
        let node = model
            .node(node_id)
            .ok_or(TriggerError::Graph(GraphError::NodeNotFound { node_id }))?;
        if node.kind != BlockKind::Trigger {
            return Err(TriggerError::Graph(GraphError::NotATrigger { node_id }));
        }

        if let Some(TriggerMeta::Subscription(subscription)) = &node.trigger {
            let subscription_id = subscription.id;
            self.triggers.delete_subscription(subscription_id).await?;
            info!(
                workflow_id = %self.workflow_id,
                subscription_id = %subscription_id,
                "subscription deleted"
            );
        }
        model.remove_node(node_id);
        Ok(())
    }

    /// Replaces the declared workflow inputs and re-derives bindings on
    /// every trigger node.
    ///
    /// New inputs get the `data.<name>` event default, removed inputs are
    /// dropped, and in-progress edits for surviving inputs are preserved.
    /// Subscription metadata is updated locally; the server copy catches
    /// up on the next explicit trigger save.
    pub async fn set_workflow_inputs(
        &self,
        model: &mut GraphModel,
        inputs: &[WorkflowInput],
    ) -> Result<(), TriggerError> {
        self.inputs
            .update_workflow_inputs(self.workflow_id, inputs)
            .await?;

        let trigger_nodes: Vec<NodeId> = model
            .nodes()
            .filter(|node| node.kind == BlockKind::Trigger)
            .map(|node| node.id)
            .collect();
        for node_id in trigger_nodes {
            let Some(meta) = model.trigger_meta(node_id).cloned() else {
                continue;
            };
            let meta = match meta {
                TriggerMeta::Draft(mut draft) => {
                    draft.bindings = draft.bindings.rederived(inputs);
                    TriggerMeta::Draft(draft)
                }
                TriggerMeta::Subscription(mut subscription) => {
                    subscription.bindings = subscription.bindings.rederived(inputs);
                    TriggerMeta::Subscription(subscription)
                }
            };
            model.set_trigger_meta(node_id, Some(meta))?;
        }
        Ok(())
    }

    /// Sets one input's binding on a trigger node, draft or subscribed.
    pub fn set_binding(
        &self,
        model: &mut GraphModel,
        node_id: NodeId,
        input: &str,
        binding: Binding,
    ) -> Result<(), TriggerError> {
        let meta = match Self::meta_of(model, node_id)?.clone() {
            TriggerMeta::Draft(mut draft) => {
                draft.bindings.set(input, binding);
                TriggerMeta::Draft(draft)
            }
            TriggerMeta::Subscription(mut subscription) => {
                subscription.bindings.set(input, binding);
                TriggerMeta::Subscription(subscription)
            }
        };
        model.set_trigger_meta(node_id, Some(meta))?;
        Ok(())
    }

    /// Binds a Supabase project through OAuth and stores the resource
    /// handle in the node's provider configuration.
    pub async fn bind_supabase_oauth(
        &self,
        model: &mut GraphModel,
        node_id: NodeId,
        project_ref: &str,
    ) -> Result<ResourceId, TriggerError> {
        let resource = self.resources.bind_project_oauth(project_ref).await?;
        Self::assign_supabase_resource(model, node_id, resource)?;
        Ok(resource)
    }

    /// Binds a Supabase project with a manually entered service-role key
    /// and stores the resource handle in the node's provider
    /// configuration.
    pub async fn bind_supabase_manual(
        &self,
        model: &mut GraphModel,
        node_id: NodeId,
        project_ref: &str,
        service_role_key: &str,
    ) -> Result<ResourceId, TriggerError> {
        let resource = self
            .resources
            .bind_project_manual(project_ref, service_role_key)
            .await?;
        Self::assign_supabase_resource(model, node_id, resource)?;
        Ok(resource)
    }

    fn assign_supabase_resource(
        model: &mut GraphModel,
        node_id: NodeId,
        resource: ResourceId,
    ) -> Result<(), TriggerError> {
        let meta = Self::meta_of(model, node_id)?.clone();
        let assign = |config: &mut ProviderConfig| match config {
            ProviderConfig::Supabase(supabase) => {
                supabase.resource = Some(resource);
                Ok(())
            }
            other => Err(TriggerError::WrongProvider {
                node_id,
                expected: TriggerKey::Supabase,
                actual: other.key(),
            }),
        };
        let meta = match meta {
            TriggerMeta::Draft(mut draft) => {
                assign(&mut draft.provider_config)?;
                TriggerMeta::Draft(draft)
            }
            TriggerMeta::Subscription(mut subscription) => {
                assign(&mut subscription.provider_config)?;
                TriggerMeta::Subscription(subscription)
            }
        };
        model.set_trigger_meta(node_id, Some(meta))?;
        Ok(())
    }
}
