//! The seams between the patcher and the environment it patches.

use crate::{
	commit::CommitQueue,
	context::ContextBag,
	diff::Patcher,
	error::{HostError, PatchError},
	node::VNode,
	value::{Props, Value},
};
use core::fmt::{self, Debug, Formatter};

/// Handle of a realized host node, as handed out by a [`Host`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostId(u32);

impl HostId {
	#[must_use]
	pub fn new(id: u32) -> Self {
		Self(id)
	}

	#[must_use]
	pub fn get(self) -> u32 {
		self.0
	}
}

/// The mutable node graph being patched.
///
/// Only the operations the update path needs are part of this trait.
/// Creating, inserting and removing nodes is up to the [`ChildReconciler`].
pub trait Host {
	/// Replaces a text node's payload.
	fn set_text(&mut self, node: HostId, data: &str) -> Result<(), HostError>;

	/// The currently rendered markup of an element, if readable.
	fn inner_html(&self, node: HostId) -> Option<String>;

	fn set_inner_html(&mut self, node: HostId, markup: &str) -> Result<(), HostError>;

	/// The live `value` property, which may have drifted from any virtual prop through user input.
	fn value(&self, node: HostId) -> Option<Value>;

	/// The live `checked` property.
	fn checked(&self, node: HostId) -> Option<bool>;

	/// Applies added, changed and removed attributes, listeners and styles.
	///
	/// Implementations must skip `children`, `key`, `value`, `checked` and `dangerouslySetInnerHTML`,
	/// which the patcher handles itself.
	fn diff_props(&mut self, node: HostId, new_props: &Props, old_props: &Props, in_namespace: bool) -> Result<(), HostError>;

	/// Applies a single named property with environment-correct coercion.
	fn set_property(&mut self, node: HostId, name: &str, value: &Value, old_value: Option<&Value>, in_namespace: bool) -> Result<(), HostError>;
}

/// Matches a new child list against the old one and patches each matched pair.
///
/// Implementations call [`Patcher::patch`] for every child they keep or create,
/// and must leave the reconciled list in `new_parent`'s [`VNode::children`].
pub trait ChildReconciler<H: Host> {
	#[allow(clippy::too_many_arguments)]
	fn reconcile(
		&self,
		patcher: &mut Patcher<H>,
		parent_dom: HostId,
		children: Vec<Option<VNode>>,
		new_parent: &VNode,
		old_parent: Option<&VNode>,
		context: &ContextBag,
		in_namespace: bool,
		commit_queue: &mut CommitQueue,
		start: Option<HostId>,
	) -> Result<(), PatchError>;
}

type Hook = Box<dyn Fn(&VNode)>;

/// Optional instrumentation, for developer tooling and profiling.
///
/// None of these are needed for correct patching.
#[derive(Default)]
pub struct Hooks {
	/// Before a node is patched.
	pub diff: Option<Hook>,
	/// After a node was patched successfully.
	pub diffed: Option<Hook>,
	/// Right before a component renders.
	pub render: Option<Hook>,
}

impl Hooks {
	#[must_use]
	pub fn on_diff(mut self, hook: impl Fn(&VNode) + 'static) -> Self {
		self.diff = Some(Box::new(hook));
		self
	}

	#[must_use]
	pub fn on_diffed(mut self, hook: impl Fn(&VNode) + 'static) -> Self {
		self.diffed = Some(Box::new(hook));
		self
	}

	#[must_use]
	pub fn on_render(mut self, hook: impl Fn(&VNode) + 'static) -> Self {
		self.render = Some(Box::new(hook));
		self
	}
}

impl Debug for Hooks {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Hooks")
			.field("diff", &self.diff.is_some())
			.field("diffed", &self.diffed.is_some())
			.field("render", &self.render.is_some())
			.finish()
	}
}
