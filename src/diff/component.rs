use super::Patcher;
use crate::{
	commit::CommitQueue,
	component::{ComponentType, Lifecycle, RenderCallback},
	context::{provided_value, ComponentContext, ContextBag},
	error::PatchError,
	host::{Host, HostId},
	instance::Instance,
	node::VNode,
	value::Props,
};
use tracing::{trace, trace_span};

impl<H: Host> Patcher<H> {
	/// Runs one update of a component: reuses or creates its instance, stages derived state,
	/// decides whether to skip, runs the pre-render hooks, renders and reconciles the output.
	#[allow(clippy::too_many_arguments)]
	#[allow(clippy::too_many_lines)]
	pub(super) fn reconcile_component(
		&mut self,
		component_type: &ComponentType,
		parent_dom: HostId,
		new_node: &VNode,
		old_node: Option<&VNode>,
		context: &ContextBag,
		in_namespace: bool,
		commit_queue: &mut CommitQueue,
		start: Option<HostId>,
	) -> Result<(), PatchError> {
		let name = component_type.name();
		let span = trace_span!("Reconciling component", component = name);
		let _enter = span.enter();

		self.render_queue.apply_forced(&mut self.instances);
		let new_props = new_node.props().clone();

		let provider = component_type.context_type().and_then(|context_type| context.provider(context_type));
		let component_context = match (component_type.context_type(), provider) {
			(None, _) => ComponentContext::Bag(context.clone()),
			(Some(_), Some(provider)) => ComponentContext::Value(provided_value(self.instances.get(provider).ok_or(PatchError::UnknownInstance(provider))?.props())),
			(Some(context_type), None) => ComponentContext::Value(context_type.default_value().clone()),
		};

		let (id, is_new, clear_processing_exception) = match old_node.and_then(VNode::instance) {
			Some(id) => {
				let instance = self.instances.get_mut(id)?;
				instance.processing_exception = instance.pending_error.clone();
				(id, false, instance.processing_exception.is_some())
			}
			None => {
				let parent = self.ancestry.last().copied();
				let id = self.instances.insert_with(|id| {
					let mut instance = Instance::new(id, component_type, new_props.clone(), component_context.clone(), context.clone());
					instance.parent = parent;
					instance.provider = provider;
					instance
				});
				if let Some(provider) = provider {
					self.instances.get_mut(provider)?.subscribers.push(id);
				}
				trace!(?id, "Created instance.");
				(id, true, false)
			}
		};
		new_node.set_instance(Some(id));

		let instance = self.instances.get_mut(id)?;
		stage_derived_state(instance, component_type, &new_props)?;

		let old_props = instance.props.clone();
		let old_state = instance.state.clone();
		let lifecycle = instance.component.lifecycle();

		if component_type.derived_state_from_props().is_none() && !new_props.ptr_eq(&old_props) && lifecycle.contains(Lifecycle::WILL_RECEIVE_PROPS) {
			let (component, mut cx) = instance.split(&mut self.render_queue);
			component.will_receive_props(&mut cx, &new_props, &component_context).map_err(PatchError::component(name))?;
		}

		let unchanged = new_node.same_original(old_node);
		let declined = if !unchanged && !instance.force && lifecycle.contains(Lifecycle::SHOULD_UPDATE) {
			let (component, mut cx) = instance.split(&mut self.render_queue);
			!component.should_update(&mut cx, &new_props, &component_context).map_err(PatchError::component(name))?
		} else {
			false
		};

		if declined || unchanged {
			trace!(declined, unchanged, "Skipping render.");
			instance.props = new_props;
			instance.adopt_next_state();
			if !unchanged {
				instance.dirty = false;
			}
			instance.vnode = Some(new_node.clone());
			if let Some(old_node) = old_node {
				new_node.set_dom(old_node.dom());
				new_node.set_children(old_node.children());
			}
			if instance.has_render_callbacks() {
				commit_queue.push(id);
			}
			return Ok(());
		}

		if lifecycle.contains(Lifecycle::WILL_UPDATE) {
			let (component, mut cx) = instance.split(&mut self.render_queue);
			component.will_update(&mut cx, &new_props, &component_context).map_err(PatchError::component(name))?;
		}

		let did_update = if !is_new && lifecycle.contains(Lifecycle::DID_UPDATE) {
			instance.render_callbacks.push(RenderCallback::DidUpdate {
				old_props: old_props.clone(),
				old_state: old_state.clone(),
				snapshot: None,
			});
			Some(instance.render_callbacks.len() - 1)
		} else {
			None
		};

		instance.context = component_context;
		instance.props = new_props;
		instance.adopt_next_state();

		if let Some(render) = &self.hooks.render {
			render(new_node)
		}

		instance.dirty = false;
		instance.vnode = Some(new_node.clone());
		instance.parent_dom = Some(parent_dom);

		let rendered = {
			let (component, mut cx) = instance.split(&mut self.render_queue);
			component.render(&mut cx).map_err(PatchError::component(name))?
		};
		// Absorbs state updates made during render.
		instance.adopt_next_state();

		let mut context = context.clone();
		if lifecycle.contains(Lifecycle::CHILD_CONTEXT) {
			let (component, mut cx) = instance.split(&mut self.render_queue);
			let entries = component.child_context(&mut cx).map_err(PatchError::component(name))?;
			context = context.extend(entries);
		}

		if !is_new && lifecycle.contains(Lifecycle::SNAPSHOT_BEFORE_UPDATE) {
			let (component, mut cx) = instance.split(&mut self.render_queue);
			let snapshot = component.snapshot_before_update(&mut cx, &old_props, &old_state).map_err(PatchError::component(name))?;
			if let Some(RenderCallback::DidUpdate { snapshot: slot, .. }) = did_update.and_then(|index| instance.render_callbacks.get_mut(index)) {
				*slot = snapshot;
			}
		}

		self.ancestry.push(id);
		let reconciled = self.reconcile_children(parent_dom, rendered.into_children(), new_node, old_node, &context, in_namespace, commit_queue, start);
		self.ancestry.pop();
		reconciled?;

		let instance = self.instances.get_mut(id)?;
		instance.base = new_node.dom();
		if instance.has_render_callbacks() {
			commit_queue.push(id);
		}
		if clear_processing_exception {
			trace!(?id, "Error boundary re-rendered.");
			instance.pending_error = None;
			instance.processing_exception = None;
		}
		instance.force = false;
		Ok(())
	}

	/// The instance of a component node, if it was ever reconciled.
	#[must_use]
	pub fn instance_of(&self, node: &VNode) -> Option<&Instance> {
		node.instance().and_then(|id| self.instances.get(id))
	}
}

/// Stages `nextState` and merges the derive-from-props result into it.
///
/// Runs on every update, skipped or not.
fn stage_derived_state(instance: &mut Instance, component_type: &ComponentType, new_props: &Props) -> Result<(), PatchError> {
	let Instance { state, next_state, .. } = instance;
	let next = next_state.get_or_insert_with(|| state.clone());
	if let Some(derive) = component_type.derived_state_from_props() {
		if next.ptr_eq(state) {
			*next = state.fork();
		}
		if let Some(partial) = derive(new_props, next).map_err(PatchError::component(component_type.name()))? {
			next.merge(&partial);
		}
	}
	Ok(())
}
