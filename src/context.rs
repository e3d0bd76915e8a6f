//! Context threaded top-down through the tree.
//!
//! A [`ContextBag`] is never mutated in place. Components that supply child context
//! produce an extended copy for their own subtree, so siblings and ancestors keep seeing the old one.

use crate::{
	component::{Component, ComponentType, Cx, Lifecycle},
	error::ComponentError,
	instance::InstanceId,
	node::Rendered,
	value::{Props, Value, VALUE},
};
use core::{
	fmt::{self, Debug, Formatter},
	sync::atomic::{AtomicU32, Ordering},
};
use hashbrown::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u32);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContextKey {
	/// Slot of the nearest provider of a [`Context`].
	Provider(ContextId),
	Named(Rc<str>),
}

impl From<&str> for ContextKey {
	fn from(name: &str) -> Self {
		Self::Named(name.into())
	}
}

#[derive(Debug, Clone)]
pub enum ContextEntry {
	Provider(InstanceId),
	Value(Value),
}

#[derive(Clone, Default)]
pub struct ContextBag(Rc<HashMap<ContextKey, ContextEntry>>);

impl ContextBag {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn get(&self, key: &ContextKey) -> Option<&ContextEntry> {
		self.0.get(key)
	}

	/// A named plain value, as supplied through [`Component::child_context`].
	#[must_use]
	pub fn value(&self, name: &str) -> Option<&Value> {
		match self.0.get(&ContextKey::Named(name.into()))? {
			ContextEntry::Value(value) => Some(value),
			ContextEntry::Provider(_) => None,
		}
	}

	/// The instance currently providing `context` to this branch.
	#[must_use]
	pub fn provider(&self, context: &Context) -> Option<InstanceId> {
		match self.0.get(&ContextKey::Provider(context.id()))? {
			ContextEntry::Provider(instance) => Some(*instance),
			ContextEntry::Value(_) => None,
		}
	}

	/// A new bag with `entries` layered on top. `self` is left untouched.
	#[must_use]
	pub fn extend(&self, entries: impl IntoIterator<Item = (ContextKey, ContextEntry)>) -> Self {
		let mut entries = entries.into_iter().peekable();
		if entries.peek().is_none() {
			return self.clone();
		}
		let mut map = (*self.0).clone();
		map.extend(entries);
		Self(Rc::new(map))
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl Debug for ContextBag {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.0.iter()).finish()
	}
}

/// What a component sees as its context.
#[derive(Debug, Clone)]
pub enum ComponentContext {
	/// The whole ambient bag, for components without a declared context type.
	Bag(ContextBag),
	/// The resolved value of the declared context type.
	Value(Value),
}

impl ComponentContext {
	#[must_use]
	pub fn as_value(&self) -> Option<&Value> {
		match self {
			Self::Value(value) => Some(value),
			Self::Bag(_) => None,
		}
	}

	#[must_use]
	pub fn as_bag(&self) -> Option<&ContextBag> {
		match self {
			Self::Bag(bag) => Some(bag),
			Self::Value(_) => None,
		}
	}
}

struct ContextData {
	id: ContextId,
	default: Value,
	provider: ComponentType,
}

/// A typed context slot with a default value and a provider component.
///
/// Place `VNode::component(&context.provider(), props)` with a `value` prop above consumers
/// declared with [`ComponentType::with_context`].
#[derive(Clone)]
pub struct Context(Rc<ContextData>);

impl Context {
	pub fn new(default: impl Into<Value>) -> Self {
		static COUNTER: AtomicU32 = AtomicU32::new(0);
		let id = ContextId(COUNTER.fetch_add(1, Ordering::Relaxed));
		Self(Rc::new(ContextData {
			id,
			default: default.into(),
			provider: ComponentType::class("Provider", move |_, _| Box::new(Provider { id })),
		}))
	}

	#[must_use]
	pub fn id(&self) -> ContextId {
		self.0.id
	}

	#[must_use]
	pub fn default_value(&self) -> &Value {
		&self.0.default
	}

	#[must_use]
	pub fn provider(&self) -> ComponentType {
		self.0.provider.clone()
	}
}

impl Debug for Context {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Context").field("id", &self.0.id).field("default", &self.0.default).finish()
	}
}

/// Value of a provider instance, read from its `value` prop.
pub(crate) fn provided_value(props: &Props) -> Value {
	props.get(VALUE).cloned().unwrap_or(Value::Null)
}

struct Provider {
	id: ContextId,
}

impl Component for Provider {
	fn lifecycle(&self) -> Lifecycle {
		Lifecycle::SHOULD_UPDATE | Lifecycle::CHILD_CONTEXT
	}

	fn render(&mut self, cx: &mut Cx<'_>) -> Result<Rendered, ComponentError> {
		Ok(Rendered::Nodes(cx.props().children()))
	}

	fn should_update(&mut self, cx: &mut Cx<'_>, new_props: &Props, _: &ComponentContext) -> Result<bool, ComponentError> {
		if !provided_value(cx.props()).same(&provided_value(new_props)) {
			tracing::trace!(subscribers = cx.subscribers().len(), "Provided value changed.");
			cx.notify_subscribers();
		}
		Ok(true)
	}

	fn child_context(&mut self, cx: &mut Cx<'_>) -> Result<Vec<(ContextKey, ContextEntry)>, ComponentError> {
		Ok(vec![(ContextKey::Provider(self.id), ContextEntry::Provider(cx.id()))])
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extend_leaves_the_original_untouched() {
		let root = ContextBag::new().extend(vec![(ContextKey::from("theme"), ContextEntry::Value("dark".into()))]);
		let branch = root.extend(vec![(ContextKey::from("theme"), ContextEntry::Value("light".into()))]);

		assert_eq!(root.value("theme").and_then(Value::as_str), Some("dark"));
		assert_eq!(branch.value("theme").and_then(Value::as_str), Some("light"));
		assert!(!root.ptr_eq(&branch));
	}

	#[test]
	fn empty_extension_shares_storage() {
		let root = ContextBag::new();
		assert!(root.extend(Vec::new()).ptr_eq(&root));
	}

	#[test]
	fn contexts_are_distinct() {
		let a = Context::new(1);
		let b = Context::new(1);
		assert_ne!(a.id(), b.id());
		assert!(!a.provider().ptr_eq(&b.provider()));
		assert!(a.provider().ptr_eq(&a.provider()));
	}
}
