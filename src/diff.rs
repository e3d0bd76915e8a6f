use crate::{
	commit::CommitQueue,
	component::{Lifecycle, RenderCallback},
	config::PatchConfig,
	context::ContextBag,
	error::PatchError,
	host::{ChildReconciler, Host, HostId, Hooks},
	instance::{Instance, InstanceId, Instances, RenderQueue},
	node::{NodeType, VNode},
	value::Record,
};
use core::mem;
use std::rc::Rc;
use tracing::{error, instrument, trace, trace_span, warn};

mod component;
mod element;

/// Patches a host node graph to match new virtual trees, pass after pass.
///
/// Owns the host, the component instance arena and the collaborators a pass needs.
/// The same `Patcher` must be used for consecutive passes over the same tree,
/// since the previous tree's nodes only refer to their instances by [`InstanceId`].
///
/// # Correct Use
///
/// Passes are synchronous and must not overlap.
/// After each pass, hand its [`CommitQueue`] to [`Patcher::commit`]
/// and the instances from [`Patcher::take_render_queue`] to whatever schedules re-renders.
pub struct Patcher<H: Host> {
	host: H,
	children: Rc<dyn ChildReconciler<H>>,
	hooks: Hooks,
	config: PatchConfig,
	instances: Instances,
	render_queue: RenderQueue,
	/// Component instances enclosing the frame currently being patched, outermost first.
	ancestry: Vec<InstanceId>,
	depth: usize,
}

impl<H: Host> Patcher<H> {
	#[must_use]
	pub fn new(host: H, children: impl ChildReconciler<H> + 'static) -> Self {
		Self::with_config(host, children, PatchConfig::default())
	}

	#[must_use]
	pub fn with_config(host: H, children: impl ChildReconciler<H> + 'static, config: PatchConfig) -> Self {
		Self {
			host,
			children: Rc::new(children),
			hooks: Hooks::default(),
			config,
			instances: Instances::default(),
			render_queue: RenderQueue::default(),
			ancestry: Vec::new(),
			depth: 0,
		}
	}

	#[must_use]
	pub fn with_hooks(mut self, hooks: Hooks) -> Self {
		self.hooks = hooks;
		self
	}

	#[must_use]
	pub fn host(&self) -> &H {
		&self.host
	}

	pub fn host_mut(&mut self) -> &mut H {
		&mut self.host
	}

	#[must_use]
	pub fn config(&self) -> &PatchConfig {
		&self.config
	}

	#[must_use]
	pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
		self.instances.get(id)
	}

	#[must_use]
	pub fn instances(&self) -> &Instances {
		&self.instances
	}

	/// Drops an instance whose component identity left the tree, and unsubscribes it from its provider.
	pub fn remove_instance(&mut self, id: InstanceId) -> Option<Instance> {
		trace!(?id, "Removing instance.");
		let instance = self.instances.remove(id)?;
		if let Some(provider) = instance.provider.and_then(|provider| self.instances.get_mut(provider).ok()) {
			provider.subscribers.retain(|subscriber| *subscriber != id);
		}
		Some(instance)
	}

	/// Runs one full pass from the root and then its commit phase.
	#[instrument(skip(self, new_root, old_root))]
	pub fn update_root(&mut self, container: HostId, new_root: &VNode, old_root: Option<&VNode>) -> Result<(), PatchError> {
		let mut commit_queue = CommitQueue::new();
		let start = old_root.and_then(VNode::dom);
		self.patch(container, new_root, old_root, &ContextBag::new(), false, &mut commit_queue, start)?;
		self.commit(commit_queue)
	}

	/// Patches `new_node` against `old_node`, its counterpart at the same position in the previous tree.
	///
	/// Failures anywhere below are first offered to the nearest enclosing error boundary.
	/// Only an error no boundary absorbed is returned, as [`PatchError::Unhandled`].
	#[allow(clippy::too_many_arguments)]
	#[instrument(level = "trace", skip_all, fields(node = ?new_node))]
	pub fn patch(
		&mut self,
		parent_dom: HostId,
		new_node: &VNode,
		old_node: Option<&VNode>,
		context: &ContextBag,
		in_namespace: bool,
		commit_queue: &mut CommitQueue,
		start: Option<HostId>,
	) -> Result<(), PatchError> {
		if let Some(constructor) = new_node.constructor() {
			warn!(constructor, "Refusing to patch a node that wasn't built by the node constructors.");
			return Ok(());
		}

		if let Some(diff) = &self.hooks.diff {
			diff(new_node)
		}

		let result = if self.depth >= self.config.depth_limit {
			error!("Depth limit reached");
			Err(PatchError::DepthLimit(self.config.depth_limit))
		} else {
			self.depth += 1;
			let result = self.patch_node(parent_dom, new_node, old_node, context, in_namespace, commit_queue, start);
			self.depth -= 1;
			result
		};

		result.or_else(|error| {
			new_node.invalidate();
			self.catch_error(error, new_node)
		})
	}

	#[allow(clippy::too_many_arguments)]
	fn patch_node(
		&mut self,
		parent_dom: HostId,
		new_node: &VNode,
		old_node: Option<&VNode>,
		context: &ContextBag,
		in_namespace: bool,
		commit_queue: &mut CommitQueue,
		start: Option<HostId>,
	) -> Result<(), PatchError> {
		match (new_node.node_type(), old_node) {
			(NodeType::Component(component_type), _) => {
				let component_type = component_type.clone();
				self.reconcile_component(&component_type, parent_dom, new_node, old_node, context, in_namespace, commit_queue, start)?
			}
			(_, Some(old_node)) if new_node.same_original(Some(old_node)) => {
				trace!("Referentially identical. Adopting the previous realization.");
				new_node.set_children(old_node.children());
				new_node.set_dom(old_node.dom());
			}
			_ => {
				let dom = self.reconcile_element(old_node.and_then(VNode::dom), new_node, old_node, context, in_namespace, commit_queue)?;
				new_node.set_dom(Some(dom));
			}
		}

		if let Some(diffed) = &self.hooks.diffed {
			diffed(new_node)
		}
		Ok(())
	}

	/// Hands `children` to the [`ChildReconciler`], which re-enters [`Patcher::patch`] for each of them.
	#[allow(clippy::too_many_arguments)]
	fn reconcile_children(
		&mut self,
		parent_dom: HostId,
		children: Vec<Option<VNode>>,
		new_parent: &VNode,
		old_parent: Option<&VNode>,
		context: &ContextBag,
		in_namespace: bool,
		commit_queue: &mut CommitQueue,
		start: Option<HostId>,
	) -> Result<(), PatchError> {
		let reconciler = Rc::clone(&self.children);
		reconciler.reconcile(self, parent_dom, children, new_parent, old_parent, context, in_namespace, commit_queue, start)
	}

	/// Walks the enclosing component instances, innermost first, for one that absorbs `error`.
	///
	/// An instance absorbs an error if its derive-state-from-error or its did-catch hook leaves it dirty,
	/// i.e. scheduled to re-render. It then holds the error as its pending error.
	/// Instances that are already re-rendering for an error are passed over.
	fn catch_error(&mut self, mut error: PatchError, failed: &VNode) -> Result<(), PatchError> {
		if error.is_unhandled() {
			return Err(error);
		}

		let span = trace_span!("Catching error", %error, ?failed);
		let _enter = span.enter();

		for index in (0..self.ancestry.len()).rev() {
			let id = self.ancestry[index];
			let instance = match self.instances.get_mut(id) {
				Ok(instance) => instance,
				Err(_) => {
					warn!(?id, "Enclosing instance is gone. Passing it over.");
					continue;
				}
			};
			if instance.processing_exception.is_some() {
				continue;
			}

			let component_type = instance.component_type().clone();
			let mut handled = false;

			if let Some(derive) = component_type.derived_state_from_error() {
				let partial = derive(&error);
				let (_, mut cx) = instance.split(&mut self.render_queue);
				cx.set_state(partial);
				handled = instance.dirty;
			}

			if instance.component.lifecycle().contains(Lifecycle::DID_CATCH) {
				let (component, mut cx) = instance.split(&mut self.render_queue);
				match component.did_catch(&mut cx, &error) {
					Ok(()) => handled = instance.dirty,
					Err(source) => {
						warn!(boundary = component_type.name(), "Error boundary failed while handling an error.");
						error = PatchError::Component { component: component_type.name(), source };
						continue;
					}
				}
			}

			if handled {
				warn!(boundary = component_type.name(), ?id, "Error absorbed by boundary.");
				instance.pending_error = Some(error);
				return Ok(());
			}
		}

		error!(%error, "No error boundary absorbed the error.");
		Err(PatchError::Unhandled(Box::new(error)))
	}

	/// Drains the callbacks of every instance in `commit_queue`, in queue order.
	///
	/// All callbacks run even if some fail. The first failure is returned.
	#[instrument(skip(self))]
	pub fn commit(&mut self, commit_queue: CommitQueue) -> Result<(), PatchError> {
		let mut first_error = None;
		for id in commit_queue {
			let instance = match self.instances.get_mut(id) {
				Ok(instance) => instance,
				Err(error) => {
					warn!(?id, "Queued instance is gone. Skipping its callbacks.");
					first_error.get_or_insert(error);
					continue;
				}
			};
			let name = instance.component_type().name();

			for callback in mem::take(&mut instance.render_callbacks) {
				let result = match callback {
					RenderCallback::DidUpdate { old_props, old_state, snapshot } => {
						let (component, mut cx) = instance.split(&mut self.render_queue);
						component.did_update(&mut cx, &old_props, &old_state, snapshot.as_ref())
					}
					RenderCallback::AfterCommit(callback) => callback(),
				};
				if let Err(source) = result {
					error!(component = name, %source, "Commit callback failed.");
					first_error.get_or_insert(PatchError::Component { component: name, source });
				}
			}
		}
		first_error.map_or(Ok(()), Err)
	}

	/// Stages a state update on an instance from outside the tree, for example from an event handler.
	///
	/// The instance is scheduled, see [`Patcher::take_render_queue`].
	pub fn set_state(&mut self, id: InstanceId, partial: impl Into<Record>) -> Result<(), PatchError> {
		let instance = self.instances.get_mut(id)?;
		let (_, mut cx) = instance.split(&mut self.render_queue);
		cx.set_state(partial);
		Ok(())
	}

	/// Schedules an instance to re-render even if its should-update hook would decline.
	pub fn force_update(&mut self, id: InstanceId) -> Result<(), PatchError> {
		let instance = self.instances.get_mut(id)?;
		let (_, mut cx) = instance.split(&mut self.render_queue);
		cx.force_update();
		Ok(())
	}

	/// Re-renders a single dirty instance in place, outside of a full pass, and then commits.
	///
	/// The node the instance last rendered from stays valid as the previous node for its parent's next pass.
	/// Clean instances and instances that never rendered are left alone.
	#[instrument(skip(self))]
	pub fn rerender(&mut self, id: InstanceId) -> Result<(), PatchError> {
		let instance = self.instances.get(id).ok_or(PatchError::UnknownInstance(id))?;
		if !instance.dirty {
			return Ok(());
		}
		let (old_node, parent_dom) = match (instance.vnode.clone(), instance.parent_dom) {
			(Some(old_node), Some(parent_dom)) => (old_node, parent_dom),
			_ => {
				trace!("Never rendered. Skipping.");
				return Ok(());
			}
		};
		let context = instance.global_context.clone();

		let mut ancestry = Vec::new();
		let mut next = instance.parent;
		while let Some(parent) = next {
			ancestry.push(parent);
			next = self.instances.get(parent).and_then(Instance::parent);
		}
		ancestry.reverse();

		let new_node = old_node.renew();
		let mut commit_queue = CommitQueue::new();
		let outer = mem::replace(&mut self.ancestry, ancestry);
		let patched = self.patch(parent_dom, &new_node, Some(&old_node), &context, false, &mut commit_queue, old_node.dom());
		self.ancestry = outer;
		patched?;
		old_node.set_dom(new_node.dom());
		old_node.set_children(new_node.children());
		self.commit(commit_queue)
	}

	/// Instances scheduled for re-rendering since the last call, each once.
	pub fn take_render_queue(&mut self) -> Vec<InstanceId> {
		self.render_queue.drain(&mut self.instances)
	}
}
