//! Long-lived component instances and the arena that owns them.
//!
//! Virtual nodes refer to their instance through an [`InstanceId`] only,
//! so the node ⇄ instance back-references never form an ownership cycle.

use crate::{
	component::{Component, ComponentType, Cx, RenderCallback},
	context::{ComponentContext, ContextBag},
	error::PatchError,
	host::HostId,
	node::VNode,
	value::{Props, State},
};
use core::fmt::{self, Debug, Formatter};
use hashbrown::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u32);

impl InstanceId {
	#[must_use]
	pub fn get(self) -> u32 {
		self.0
	}
}

/// The persistent record behind one component identity.
pub struct Instance {
	id: InstanceId,
	component_type: ComponentType,
	pub(crate) component: Box<dyn Component>,
	pub(crate) props: Props,
	pub(crate) state: State,
	pub(crate) next_state: Option<State>,
	pub(crate) context: ComponentContext,
	pub(crate) global_context: ContextBag,
	pub(crate) dirty: bool,
	pub(crate) force: bool,
	pub(crate) render_callbacks: Vec<RenderCallback>,
	pub(crate) vnode: Option<VNode>,
	pub(crate) parent_dom: Option<HostId>,
	pub(crate) base: Option<HostId>,
	pub(crate) pending_error: Option<PatchError>,
	pub(crate) processing_exception: Option<PatchError>,
	pub(crate) subscribers: Vec<InstanceId>,
	/// The provider this instance subscribed to on creation.
	pub(crate) provider: Option<InstanceId>,
	/// The enclosing instance at creation time.
	pub(crate) parent: Option<InstanceId>,
}

impl Instance {
	/// Freshly created instances are dirty and forced, so their first render can't be skipped.
	pub(crate) fn new(id: InstanceId, component_type: &ComponentType, props: Props, context: ComponentContext, global_context: ContextBag) -> Self {
		let component = component_type.construct(&props, &context);
		let state = component.initial_state().unwrap_or_default();
		Self {
			id,
			component_type: component_type.clone(),
			component,
			props,
			state,
			next_state: None,
			context,
			global_context,
			dirty: true,
			force: true,
			render_callbacks: Vec::new(),
			vnode: None,
			parent_dom: None,
			base: None,
			pending_error: None,
			processing_exception: None,
			subscribers: Vec::new(),
			provider: None,
			parent: None,
		}
	}

	/// Makes the staged state current.
	pub(crate) fn adopt_next_state(&mut self) {
		if let Some(next_state) = &self.next_state {
			self.state = next_state.clone();
		}
	}

	/// Splits the record into the user component and a [`Cx`] over everything else.
	pub(crate) fn split<'a>(&'a mut self, queue: &'a mut RenderQueue) -> (&'a mut dyn Component, Cx<'a>) {
		let Self {
			id,
			component,
			props,
			state,
			next_state,
			context,
			dirty,
			force,
			render_callbacks,
			subscribers,
			..
		} = self;
		(
			&mut **component,
			Cx {
				id: *id,
				props,
				state,
				next_state,
				context,
				dirty,
				force,
				callbacks: render_callbacks,
				subscribers,
				queue,
			},
		)
	}

	#[must_use]
	pub fn id(&self) -> InstanceId {
		self.id
	}

	#[must_use]
	pub fn component_type(&self) -> &ComponentType {
		&self.component_type
	}

	#[must_use]
	pub fn props(&self) -> &Props {
		&self.props
	}

	#[must_use]
	pub fn state(&self) -> &State {
		&self.state
	}

	/// The state the next render will see. Same as [`Instance::state`] unless an update is staged.
	#[must_use]
	pub fn next_state(&self) -> &State {
		self.next_state.as_ref().unwrap_or(&self.state)
	}

	#[must_use]
	pub fn context(&self) -> &ComponentContext {
		&self.context
	}

	/// The context bag this instance was created under.
	#[must_use]
	pub fn global_context(&self) -> &ContextBag {
		&self.global_context
	}

	#[must_use]
	pub fn is_dirty(&self) -> bool {
		self.dirty
	}

	#[must_use]
	pub fn is_forced(&self) -> bool {
		self.force
	}

	/// The first host node of the last render.
	#[must_use]
	pub fn base(&self) -> Option<HostId> {
		self.base
	}

	/// The node that last rendered this instance.
	#[must_use]
	pub fn vnode(&self) -> Option<&VNode> {
		self.vnode.as_ref()
	}

	#[must_use]
	pub fn parent_dom(&self) -> Option<HostId> {
		self.parent_dom
	}

	/// An absorbed descendant error this instance (an error boundary) still has to render for.
	#[must_use]
	pub fn pending_error(&self) -> Option<&PatchError> {
		self.pending_error.as_ref()
	}

	#[must_use]
	pub fn parent(&self) -> Option<InstanceId> {
		self.parent
	}

	#[must_use]
	pub fn provider(&self) -> Option<InstanceId> {
		self.provider
	}

	#[must_use]
	pub fn subscribers(&self) -> &[InstanceId] {
		&self.subscribers
	}

	#[must_use]
	pub fn has_render_callbacks(&self) -> bool {
		!self.render_callbacks.is_empty()
	}
}

impl Debug for Instance {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Instance")
			.field("id", &self.id)
			.field("component_type", &self.component_type)
			.field("dirty", &self.dirty)
			.field("force", &self.force)
			.field("render_callbacks", &self.render_callbacks.len())
			.field("base", &self.base)
			.field("pending_error", &self.pending_error)
			.finish_non_exhaustive()
	}
}

#[derive(Debug, Default)]
pub struct Instances {
	entries: HashMap<InstanceId, Instance>,
	next: u32,
}

impl Instances {
	pub(crate) fn insert_with(&mut self, create: impl FnOnce(InstanceId) -> Instance) -> InstanceId {
		let id = InstanceId(self.next);
		self.next += 1;
		self.entries.insert(id, create(id));
		id
	}

	#[must_use]
	pub fn get(&self, id: InstanceId) -> Option<&Instance> {
		self.entries.get(&id)
	}

	pub(crate) fn get_mut(&mut self, id: InstanceId) -> Result<&mut Instance, PatchError> {
		self.entries.get_mut(&id).ok_or(PatchError::UnknownInstance(id))
	}

	pub(crate) fn remove(&mut self, id: InstanceId) -> Option<Instance> {
		self.entries.remove(&id)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Instances that asked to be re-rendered, collected for the external scheduler.
#[derive(Debug, Default)]
pub struct RenderQueue {
	pending: Vec<InstanceId>,
	forced: Vec<InstanceId>,
}

impl RenderQueue {
	pub(crate) fn enqueue(&mut self, id: InstanceId) {
		self.pending.push(id);
	}

	/// Another instance asked for `id` to re-render regardless of its update-skip hook.
	pub(crate) fn force(&mut self, id: InstanceId) {
		self.forced.push(id);
	}

	/// Raises the forced flag of every instance another instance asked to re-render.
	///
	/// Runs as early as possible, so that a forced instance reached later in the same pass skips its update-skip hook.
	pub(crate) fn apply_forced(&mut self, instances: &mut Instances) {
		for id in self.forced.drain(..) {
			if let Ok(instance) = instances.get_mut(id) {
				instance.force = true;
				if !instance.dirty {
					instance.dirty = true;
					self.pending.push(id);
				}
			}
		}
	}

	/// Applies forced flags and returns each dirty instance once, in scheduling order.
	pub(crate) fn drain(&mut self, instances: &mut Instances) -> Vec<InstanceId> {
		self.apply_forced(instances);

		let mut seen = hashbrown::HashSet::new();
		self.pending
			.drain(..)
			.filter(|id| seen.insert(*id))
			.filter(|id| instances.get(*id).map_or(false, Instance::is_dirty))
			.collect()
	}
}
