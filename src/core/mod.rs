//! Core statechart types.
//!
//! This module contains the building blocks the engine operates on:
//! - State tree nodes and the arena that owns them
//! - The `StateHandler` hook trait implemented by state-owning code
//! - Events and the request sink hooks use for reentrant requests
//!
//! The tree's shape is frozen once the builder finishes; the engine only
//! mutates the per-node dynamic fields, and only while it holds the
//! transition lock.

mod handler;
mod node;

pub use handler::{Event, HookFault, HookOutcome, RequestSink, StateHandler};
pub use node::StateId;

pub(crate) use handler::Request;
pub(crate) use node::{Node, Tree};
