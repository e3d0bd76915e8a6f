//! Dynamic values carried by props, state and context.

use crate::node::VNode;
use core::{
	any::Any,
	fmt::{self, Debug, Formatter},
	iter::FromIterator,
};
use hashbrown::HashMap;
use std::rc::Rc;

/// Reserved prop holding a node's structured content.
pub const CHILDREN: &str = "children";
/// Reserved prop holding raw markup that replaces the structured content.
pub const RAW_HTML: &str = "dangerouslySetInnerHTML";
/// Reserved prop for list reconciliation, never forwarded to the host.
pub const KEY: &str = "key";

pub const VALUE: &str = "value";
pub const CHECKED: &str = "checked";

/// A single prop, state or context value.
///
/// Scalars compare by value, everything reference-counted compares by identity.
/// See [`Value::same`].
#[derive(Clone)]
pub enum Value {
	Null,
	Bool(bool),
	Number(f64),
	Str(Rc<str>),
	/// Raw markup, as set through [`RAW_HTML`].
	Html(Rc<str>),
	Node(VNode),
	Nodes(Rc<[Option<VNode>]>),
	Record(Record),
	Opaque(Rc<dyn Any>),
}

impl Value {
	/// Strict identity: the comparison used to decide whether anything changed.
	///
	/// Strings compare by content, `NaN` is never the same as itself,
	/// and shared values compare by pointer.
	#[must_use]
	#[allow(clippy::float_cmp)]
	pub fn same(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Null, Self::Null) => true,
			(Self::Bool(a), Self::Bool(b)) => a == b,
			(Self::Number(a), Self::Number(b)) => a == b,
			(Self::Str(a), Self::Str(b)) | (Self::Html(a), Self::Html(b)) => a == b,
			(Self::Node(a), Self::Node(b)) => a.ptr_eq(b),
			(Self::Nodes(a), Self::Nodes(b)) => Rc::ptr_eq(a, b),
			(Self::Record(a), Self::Record(b)) => a.ptr_eq(b),
			(Self::Opaque(a), Self::Opaque(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}

	#[must_use]
	pub fn is_falsy(&self) -> bool {
		match self {
			Self::Null => true,
			Self::Bool(b) => !b,
			Self::Number(n) => *n == 0.0 || n.is_nan(),
			Self::Str(s) => s.is_empty(),
			_ => false,
		}
	}

	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Str(s) => Some(s),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(b) => Some(*b),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Self::Number(n) => Some(*n),
			_ => None,
		}
	}

	#[must_use]
	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		match self {
			Self::Opaque(any) => any.downcast_ref(),
			_ => None,
		}
	}

	pub fn opaque(value: impl Any) -> Self {
		Self::Opaque(Rc::new(value))
	}

	pub fn html(markup: impl Into<Rc<str>>) -> Self {
		Self::Html(markup.into())
	}
}

impl Debug for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Null => f.write_str("Null"),
			Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
			Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
			Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
			Self::Html(h) => f.debug_tuple("Html").field(h).finish(),
			Self::Node(n) => f.debug_tuple("Node").field(n).finish(),
			Self::Nodes(n) => f.debug_tuple("Nodes").field(n).finish(),
			Self::Record(r) => f.debug_tuple("Record").field(r).finish(),
			Self::Opaque(_) => f.write_str("Opaque(..)"),
		}
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}
impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Self::Number(value)
	}
}
impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Self::Number(value.into())
	}
}
impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Self::Str(value.into())
	}
}
impl From<String> for Value {
	fn from(value: String) -> Self {
		Self::Str(value.into())
	}
}
impl From<Rc<str>> for Value {
	fn from(value: Rc<str>) -> Self {
		Self::Str(value)
	}
}
impl From<VNode> for Value {
	fn from(value: VNode) -> Self {
		Self::Node(value)
	}
}
impl From<Vec<VNode>> for Value {
	fn from(value: Vec<VNode>) -> Self {
		Self::Nodes(value.into_iter().map(Some).collect())
	}
}
impl From<Vec<Option<VNode>>> for Value {
	fn from(value: Vec<Option<VNode>>) -> Self {
		Self::Nodes(value.into())
	}
}
impl From<Record> for Value {
	fn from(value: Record) -> Self {
		Self::Record(value)
	}
}
impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Null, Into::into)
	}
}

/// A shared, copy-on-write string-keyed map.
///
/// Clones share storage, so identity ([`Record::ptr_eq`]) is how the patcher
/// notices that a component received new props or that `nextState` was forked.
#[derive(Clone, Default)]
pub struct Record(Rc<HashMap<Rc<str>, Value>>);

pub type Props = Record;
pub type State = Record;

impl Record {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder-style insertion.
	#[must_use]
	pub fn with(mut self, name: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
		self.insert(name, value);
		self
	}

	#[must_use]
	pub fn with_children(self, children: impl Into<Value>) -> Self {
		self.with(CHILDREN, children)
	}

	/// Inserts in place, detaching from other clones first if storage is shared.
	pub fn insert(&mut self, name: impl Into<Rc<str>>, value: impl Into<Value>) -> Option<Value> {
		Rc::make_mut(&mut self.0).insert(name.into(), value.into())
	}

	pub fn remove(&mut self, name: &str) -> Option<Value> {
		if self.0.contains_key(name) {
			Rc::make_mut(&mut self.0).remove(name)
		} else {
			None
		}
	}

	#[must_use]
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.0.get(name)
	}

	#[must_use]
	pub fn contains(&self, name: &str) -> bool {
		self.0.contains_key(name)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.0.iter().map(|(k, v)| (&**k, v))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// A shallow copy with its own storage, so that later writes don't show through `self`.
	#[must_use]
	pub fn fork(&self) -> Self {
		Self(Rc::new((*self.0).clone()))
	}

	/// Shallowly assigns every entry of `partial` onto `self`.
	pub fn merge(&mut self, partial: &Record) {
		if partial.is_empty() {
			return;
		}
		let map = Rc::make_mut(&mut self.0);
		for (name, value) in partial.0.iter() {
			map.insert(Rc::clone(name), value.clone());
		}
	}

	/// The raw markup set through [`RAW_HTML`], if any.
	#[must_use]
	pub fn raw_html(&self) -> Option<&str> {
		match self.get(RAW_HTML) {
			Some(Value::Html(html) | Value::Str(html)) => Some(html),
			_ => None,
		}
	}

	/// The [`CHILDREN`] prop, normalized into a list of child slots.
	///
	/// An absent or null `children` prop is a single empty slot.
	/// Strings and numbers become text nodes.
	#[must_use]
	pub fn children(&self) -> Vec<Option<VNode>> {
		match self.get(CHILDREN) {
			None | Some(Value::Null) => vec![None],
			Some(Value::Nodes(nodes)) => nodes.to_vec(),
			Some(other) => vec![child_node(other)],
		}
	}
}

fn child_node(value: &Value) -> Option<VNode> {
	match value {
		Value::Node(node) => Some(node.clone()),
		Value::Str(text) => Some(VNode::text(Rc::clone(text))),
		Value::Number(n) => Some(VNode::text(n.to_string())),
		_ => None,
	}
}

impl Debug for Record {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.0.iter()).finish()
	}
}

impl<K: Into<Rc<str>>, V: Into<Value>> FromIterator<(K, V)> for Record {
	fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
		Self(Rc::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect()))
	}
}
