//! Component definitions and the lifecycle surface user code implements.

use crate::{
	context::{ComponentContext, Context, ContextEntry, ContextKey},
	error::{ComponentError, PatchError},
	instance::{InstanceId, RenderQueue},
	node::Rendered,
	value::{Props, Record, State, Value},
};
use bitflags::bitflags;
use core::fmt::{self, Debug, Formatter};
use std::rc::Rc;

bitflags! {
	/// The optional lifecycle slots a [`Component`] implements.
	///
	/// The patcher only calls a hook whose flag is set, which matters wherever
	/// the mere presence of a hook changes behaviour (for example, a `DID_UPDATE`
	/// hook is what puts an instance into the commit queue).
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct Lifecycle: u16 {
		const WILL_RECEIVE_PROPS = 1;
		const SHOULD_UPDATE = 1 << 1;
		const WILL_UPDATE = 1 << 2;
		const DID_UPDATE = 1 << 3;
		const SNAPSHOT_BEFORE_UPDATE = 1 << 4;
		const CHILD_CONTEXT = 1 << 5;
		const DID_CATCH = 1 << 6;
	}
}

/// A stateful component.
///
/// Props, state and context live on the component's [`Instance`](`crate::instance::Instance`)
/// and are reached through [`Cx`]. Implementors only hold whatever private data they need on top.
#[allow(unused_variables)]
pub trait Component: 'static {
	/// Which of the optional hooks below are implemented.
	fn lifecycle(&self) -> Lifecycle {
		Lifecycle::empty()
	}

	/// State for a freshly created instance. An absent initial state is an empty record.
	fn initial_state(&self) -> Option<State> {
		None
	}

	fn render(&mut self, cx: &mut Cx<'_>) -> Result<Rendered, ComponentError>;

	/// `Lifecycle::WILL_RECEIVE_PROPS`
	///
	/// Called with the instance's previous props still in place.
	fn will_receive_props(&mut self, cx: &mut Cx<'_>, new_props: &Props, context: &ComponentContext) -> Result<(), ComponentError> {
		Ok(())
	}

	/// `Lifecycle::SHOULD_UPDATE`
	///
	/// The staged state is available as [`Cx::next_state`]. Returning `false` skips this update's render.
	fn should_update(&mut self, cx: &mut Cx<'_>, new_props: &Props, context: &ComponentContext) -> Result<bool, ComponentError> {
		Ok(true)
	}

	/// `Lifecycle::WILL_UPDATE`
	///
	/// Runs before every render that isn't skipped, including the first one.
	fn will_update(&mut self, cx: &mut Cx<'_>, new_props: &Props, context: &ComponentContext) -> Result<(), ComponentError> {
		Ok(())
	}

	/// `Lifecycle::DID_UPDATE`
	///
	/// Runs during the commit phase, after the whole tree has been patched.
	fn did_update(&mut self, cx: &mut Cx<'_>, old_props: &Props, old_state: &State, snapshot: Option<&Value>) -> Result<(), ComponentError> {
		Ok(())
	}

	/// `Lifecycle::SNAPSHOT_BEFORE_UPDATE`
	fn snapshot_before_update(&mut self, cx: &mut Cx<'_>, old_props: &Props, old_state: &State) -> Result<Option<Value>, ComponentError> {
		Ok(None)
	}

	/// `Lifecycle::CHILD_CONTEXT`
	///
	/// Entries to add to the context bag seen by this component's descendants.
	fn child_context(&mut self, cx: &mut Cx<'_>) -> Result<Vec<(ContextKey, ContextEntry)>, ComponentError> {
		Ok(Vec::new())
	}

	/// `Lifecycle::DID_CATCH`
	///
	/// A descendant failed. Scheduling a re-render (for example through [`Cx::set_state`])
	/// makes this instance absorb the error.
	fn did_catch(&mut self, cx: &mut Cx<'_>, error: &PatchError) -> Result<(), ComponentError> {
		Ok(())
	}
}

pub type RenderFn = dyn Fn(&mut Cx<'_>) -> Result<Rendered, ComponentError>;
pub type ConstructFn = dyn Fn(&Props, &ComponentContext) -> Box<dyn Component>;
pub type DeriveFromPropsFn = dyn Fn(&Props, &State) -> Result<Option<State>, ComponentError>;
pub type DeriveFromErrorFn = dyn Fn(&PatchError) -> State;

enum Kind {
	Class(Rc<ConstructFn>),
	Function(Rc<RenderFn>),
	Fragment,
}

struct Definition {
	name: &'static str,
	kind: Kind,
	context_type: Option<Context>,
	derived_state_from_props: Option<Rc<DeriveFromPropsFn>>,
	derived_state_from_error: Option<Rc<DeriveFromErrorFn>>,
}

/// A component reference, as found in [`NodeType::Component`](`crate::node::NodeType::Component`).
///
/// Types compare by identity, so build each one once and share it.
#[derive(Clone)]
pub struct ComponentType(Rc<Definition>);

thread_local! {
	static FRAGMENT: ComponentType = ComponentType(Rc::new(Definition {
		name: "Fragment",
		kind: Kind::Fragment,
		context_type: None,
		derived_state_from_props: None,
		derived_state_from_error: None,
	}));
}

impl ComponentType {
	fn new(name: &'static str, kind: Kind) -> Self {
		Self(Rc::new(Definition {
			name,
			kind,
			context_type: None,
			derived_state_from_props: None,
			derived_state_from_error: None,
		}))
	}

	/// A component with its own [`Component`] implementation, constructed once per instance.
	pub fn class(name: &'static str, construct: impl Fn(&Props, &ComponentContext) -> Box<dyn Component> + 'static) -> Self {
		Self::new(name, Kind::Class(Rc::new(construct)))
	}

	/// A component that is only a render function.
	pub fn function(name: &'static str, render: impl Fn(&mut Cx<'_>) -> Result<Rendered, ComponentError> + 'static) -> Self {
		Self::new(name, Kind::Function(Rc::new(render)))
	}

	/// The invisible grouping type.
	#[must_use]
	pub fn fragment() -> Self {
		FRAGMENT.with(Clone::clone)
	}

	fn edit(mut self, edit: impl FnOnce(&mut Definition)) -> Self {
		let name = self.0.name;
		match Rc::get_mut(&mut self.0) {
			Some(definition) => edit(definition),
			None => tracing::error!(component = name, "Component types can't be changed once shared. Ignoring."),
		}
		self
	}

	/// Resolve [`Cx::context`] from the nearest provider of `context` instead of the whole context bag.
	#[must_use]
	pub fn with_context(self, context: &Context) -> Self {
		let context = context.clone();
		self.edit(move |definition| definition.context_type = Some(context))
	}

	#[must_use]
	pub fn with_derived_state_from_props(self, derive: impl Fn(&Props, &State) -> Result<Option<State>, ComponentError> + 'static) -> Self {
		self.edit(move |definition| definition.derived_state_from_props = Some(Rc::new(derive)))
	}

	/// Makes instances of this type error boundaries.
	#[must_use]
	pub fn with_derived_state_from_error(self, derive: impl Fn(&PatchError) -> State + 'static) -> Self {
		self.edit(move |definition| definition.derived_state_from_error = Some(Rc::new(derive)))
	}

	#[must_use]
	pub fn name(&self) -> &'static str {
		self.0.name
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	#[must_use]
	pub fn is_fragment(&self) -> bool {
		matches!(self.0.kind, Kind::Fragment)
	}

	#[must_use]
	pub fn context_type(&self) -> Option<&Context> {
		self.0.context_type.as_ref()
	}

	pub(crate) fn derived_state_from_props(&self) -> Option<&DeriveFromPropsFn> {
		self.0.derived_state_from_props.as_deref()
	}

	pub(crate) fn derived_state_from_error(&self) -> Option<&DeriveFromErrorFn> {
		self.0.derived_state_from_error.as_deref()
	}

	pub(crate) fn construct(&self, props: &Props, context: &ComponentContext) -> Box<dyn Component> {
		match &self.0.kind {
			Kind::Class(construct) => construct(props, context),
			Kind::Function(render) => Box::new(FunctionComponent(Rc::clone(render))),
			Kind::Fragment => Box::new(Fragment),
		}
	}
}

impl Debug for ComponentType {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ComponentType").field(&self.0.name).finish()
	}
}

/// Shell around a plain render function. Implements no optional hooks.
struct FunctionComponent(Rc<RenderFn>);
impl Component for FunctionComponent {
	fn render(&mut self, cx: &mut Cx<'_>) -> Result<Rendered, ComponentError> {
		(self.0)(cx)
	}
}

struct Fragment;
impl Component for Fragment {
	fn render(&mut self, cx: &mut Cx<'_>) -> Result<Rendered, ComponentError> {
		Ok(Rendered::Nodes(cx.props().children()))
	}
}

/// Deferred work attached to an instance, drained by the commit phase.
pub enum RenderCallback {
	DidUpdate { old_props: Props, old_state: State, snapshot: Option<Value> },
	AfterCommit(Box<dyn FnOnce() -> Result<(), ComponentError>>),
}

impl Debug for RenderCallback {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::DidUpdate { snapshot, .. } => f.debug_struct("DidUpdate").field("snapshot", snapshot).finish_non_exhaustive(),
			Self::AfterCommit(_) => f.write_str("AfterCommit(..)"),
		}
	}
}

/// A component's view of its own instance while one of its hooks runs.
pub struct Cx<'a> {
	pub(crate) id: InstanceId,
	pub(crate) props: &'a Props,
	pub(crate) state: &'a State,
	pub(crate) next_state: &'a mut Option<State>,
	pub(crate) context: &'a ComponentContext,
	pub(crate) dirty: &'a mut bool,
	pub(crate) force: &'a mut bool,
	pub(crate) callbacks: &'a mut Vec<RenderCallback>,
	pub(crate) subscribers: &'a [InstanceId],
	pub(crate) queue: &'a mut RenderQueue,
}

impl<'a> Cx<'a> {
	#[must_use]
	pub fn id(&self) -> InstanceId {
		self.id
	}

	#[must_use]
	pub fn props(&self) -> &Props {
		self.props
	}

	#[must_use]
	pub fn state(&self) -> &State {
		self.state
	}

	/// The state the next render will see. Same as [`Cx::state`] unless an update is staged.
	#[must_use]
	pub fn next_state(&self) -> &State {
		self.next_state.as_ref().unwrap_or(self.state)
	}

	#[must_use]
	pub fn context(&self) -> &ComponentContext {
		self.context
	}

	/// Stages `partial` on top of the next state and schedules a re-render.
	///
	/// The first staged write forks the next state away from the current one.
	pub fn set_state(&mut self, partial: impl Into<Record>) {
		let state = self.state;
		let next = self.next_state.get_or_insert_with(|| state.clone());
		if next.ptr_eq(state) {
			*next = state.fork();
		}
		next.merge(&partial.into());
		self.enqueue();
	}

	/// Re-renders on the next pass regardless of [`Component::should_update`].
	pub fn force_update(&mut self) {
		*self.force = true;
		self.enqueue();
	}

	/// Runs `callback` in the commit phase following the next render of this instance.
	pub fn after_commit(&mut self, callback: impl FnOnce() -> Result<(), ComponentError> + 'static) {
		self.callbacks.push(RenderCallback::AfterCommit(Box::new(callback)));
	}

	/// Instances registered as depending on this one as a context provider.
	#[must_use]
	pub fn subscribers(&self) -> &[InstanceId] {
		self.subscribers
	}

	/// Force-schedules every subscriber of this provider.
	pub fn notify_subscribers(&mut self) {
		for &subscriber in self.subscribers {
			self.queue.force(subscriber);
		}
	}

	fn enqueue(&mut self) {
		if !*self.dirty {
			*self.dirty = true;
			self.queue.enqueue(self.id);
		}
	}
}
