#![doc(html_root_url = "https://docs.rs/sapwood/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! A component-aware virtual DOM patcher.
//!
//! [`Patcher`] updates a live host node graph (see [`Host`]) to match a new virtual tree of [`VNode`]s,
//! running each [`Component`]'s lifecycle at most once per pass
//! and containing failures at the nearest error boundary.
//!
//! Matching child lists is delegated to a [`ChildReconciler`], which re-enters [`Patcher::patch`] for each child.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod commit;
pub mod component;
pub mod config;
pub mod context;
pub mod diff;
pub mod error;
pub mod host;
pub mod instance;
pub mod node;
pub mod value;
pub mod web;

pub use commit::CommitQueue;
pub use component::{Component, ComponentType, Cx, Lifecycle};
pub use config::PatchConfig;
pub use context::{Context, ContextBag};
pub use diff::Patcher;
pub use error::{ComponentError, HostError, PatchError};
pub use host::{ChildReconciler, Hooks, Host, HostId};
pub use instance::{Instance, InstanceId};
pub use node::{NodeType, Rendered, VNode};
pub use value::{Props, Record, State, Value};
