//! Core domain types and utilities for the flowcanvas platform.
//!
//! This crate provides the strongly-typed identifiers and the error
//! handling foundation shared by the flowcanvas crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ConnectionId, DraftId, ResourceId, SubscriptionId, WorkflowId};
