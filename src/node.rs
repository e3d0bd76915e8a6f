//! Virtual nodes: lightweight descriptions of the desired tree.
//!
//! A [`VNode`] is created fresh for every render pass and is immutable apart from the bookkeeping
//! the patcher attaches while realizing it (its host node, its realized children,
//! its component instance and its identity token).
//! The tree produced by one pass is the "old" tree of the next.

use crate::{
	component::ComponentType,
	host::HostId,
	instance::InstanceId,
	value::{Props, Value, KEY},
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
	num::NonZeroU64,
	sync::atomic::{AtomicU64, Ordering},
};
use std::rc::Rc;

/// What a [`VNode`] describes, resolved once when the node is created.
#[derive(Clone)]
pub enum NodeType {
	Text,
	Element(Rc<str>),
	Component(ComponentType),
}

impl NodeType {
	/// Whether two nodes of these types may be patched into each other.
	#[must_use]
	pub fn same(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Text, Self::Text) => true,
			(Self::Element(a), Self::Element(b)) => a == b,
			(Self::Component(a), Self::Component(b)) => a.ptr_eq(b),
			_ => false,
		}
	}
}

impl Debug for NodeType {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Text => f.write_str("#text"),
			Self::Element(tag) => write!(f, "<{}>", tag),
			Self::Component(component) => write!(f, "<{}/>", component.name()),
		}
	}
}

/// Identity token shared by a node and the copies made of it.
///
/// Two nodes with the same token describe referentially identical render output,
/// so the second can adopt everything realized for the first without any work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Original(NonZeroU64);

impl Original {
	fn next() -> Self {
		static COUNTER: AtomicU64 = AtomicU64::new(1);
		let id = COUNTER.fetch_add(1, Ordering::Relaxed);
		Self(NonZeroU64::new(id).unwrap_or(NonZeroU64::MAX))
	}
}

struct VNodeData {
	node_type: NodeType,
	props: Props,
	text: Option<Rc<str>>,
	key: Option<Rc<str>>,
	constructor: Option<Rc<str>>,
	original: Cell<Option<Original>>,
	dom: Cell<Option<HostId>>,
	children: RefCell<Option<Rc<[Option<VNode>]>>>,
	instance: Cell<Option<InstanceId>>,
}

impl VNodeData {
	fn new(node_type: NodeType, props: Props) -> Self {
		Self {
			node_type,
			props,
			text: None,
			key: None,
			constructor: None,
			original: Cell::new(Some(Original::next())),
			dom: Cell::new(None),
			children: RefCell::new(None),
			instance: Cell::new(None),
		}
	}
}

/// A reference-counted handle to a virtual node.
///
/// Clones are the *same* node. Use [`VNode::duplicate`] for a distinct node that shares identity.
#[derive(Clone)]
pub struct VNode(Rc<VNodeData>);

impl VNode {
	pub fn text(data: impl Into<Rc<str>>) -> Self {
		let mut node = VNodeData::new(NodeType::Text, Props::new());
		node.text = Some(data.into());
		Self(Rc::new(node))
	}

	/// A host element. A string or number `key` prop is moved into [`VNode::key`].
	pub fn element(tag: impl Into<Rc<str>>, props: Props) -> Self {
		Self::keyed(NodeType::Element(tag.into()), props)
	}

	pub fn component(component: &ComponentType, props: Props) -> Self {
		Self::keyed(NodeType::Component(component.clone()), props)
	}

	/// Groups `children` without a wrapping host node.
	pub fn fragment(children: impl Into<Value>) -> Self {
		Self::component(&ComponentType::fragment(), Props::new().with_children(children))
	}

	fn keyed(node_type: NodeType, mut props: Props) -> Self {
		let key = match props.get(KEY) {
			Some(Value::Str(key)) => Some(Rc::clone(key)),
			Some(Value::Number(n)) => Some(n.to_string().into()),
			_ => None,
		};
		if key.is_some() {
			props.remove(KEY);
		}
		let mut node = VNodeData::new(node_type, props);
		node.key = key;
		Self(Rc::new(node))
	}

	#[must_use]
	pub fn with_key(self, key: impl Into<Rc<str>>) -> Self {
		self.rebuild(|data| data.key = Some(key.into()))
	}

	/// Marks this node as not having been produced by the node constructors,
	/// for example because it was rebuilt from untrusted data.
	/// Such nodes are never patched.
	#[must_use]
	pub fn with_constructor(self, constructor: impl Into<Rc<str>>) -> Self {
		self.rebuild(|data| data.constructor = Some(constructor.into()))
	}

	fn rebuild(mut self, edit: impl FnOnce(&mut VNodeData)) -> Self {
		if let Some(data) = Rc::get_mut(&mut self.0) {
			edit(data);
			return self;
		}
		let mut data = self.duplicate_data();
		edit(&mut data);
		Self(Rc::new(data))
	}

	fn duplicate_data(&self) -> VNodeData {
		VNodeData {
			node_type: self.0.node_type.clone(),
			props: self.0.props.clone(),
			text: self.0.text.clone(),
			key: self.0.key.clone(),
			constructor: self.0.constructor.clone(),
			original: Cell::new(self.original()),
			dom: Cell::new(None),
			children: RefCell::new(None),
			instance: Cell::new(None),
		}
	}

	/// A distinct node with the same description and identity token but none of the realized bookkeeping.
	#[must_use]
	pub fn duplicate(&self) -> Self {
		Self(Rc::new(self.duplicate_data()))
	}

	/// Like [`VNode::duplicate`], but with a fresh identity token, so that patching it against `self` does real work.
	#[must_use]
	pub fn renew(&self) -> Self {
		let data = self.duplicate_data();
		data.original.set(Some(Original::next()));
		Self(Rc::new(data))
	}

	#[must_use]
	pub fn node_type(&self) -> &NodeType {
		&self.0.node_type
	}

	#[must_use]
	pub fn props(&self) -> &Props {
		&self.0.props
	}

	/// The payload of a text node.
	#[must_use]
	pub fn text_data(&self) -> Option<Rc<str>> {
		self.0.text.clone()
	}

	#[must_use]
	pub fn key(&self) -> Option<&str> {
		self.0.key.as_deref()
	}

	#[must_use]
	pub fn constructor(&self) -> Option<&str> {
		self.0.constructor.as_deref()
	}

	#[must_use]
	pub fn is_fragment(&self) -> bool {
		matches!(&self.0.node_type, NodeType::Component(component) if component.is_fragment())
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	#[must_use]
	pub fn original(&self) -> Option<Original> {
		self.0.original.get()
	}

	/// Whether `other` carries the same (valid) identity token.
	#[must_use]
	pub fn same_original(&self, other: Option<&Self>) -> bool {
		match (self.original(), other.and_then(Self::original)) {
			(Some(a), Some(b)) => a == b,
			_ => false,
		}
	}

	/// Drops the identity token, so that no later pass can short-circuit through this node.
	pub fn invalidate(&self) {
		self.0.original.set(None);
	}

	/// The realized host node.
	///
	/// For components this is the first host node of their rendered output.
	#[must_use]
	pub fn dom(&self) -> Option<HostId> {
		self.0.dom.get()
	}

	pub fn set_dom(&self, dom: Option<HostId>) {
		self.0.dom.set(dom);
	}

	/// The realized child list, as left by the child reconciler.
	#[must_use]
	pub fn children(&self) -> Option<Rc<[Option<VNode>]>> {
		self.0.children.borrow().clone()
	}

	pub fn set_children(&self, children: Option<Rc<[Option<VNode>]>>) {
		*self.0.children.borrow_mut() = children;
	}

	#[must_use]
	pub fn instance(&self) -> Option<InstanceId> {
		self.0.instance.get()
	}

	pub fn set_instance(&self, instance: Option<InstanceId>) {
		self.0.instance.set(instance);
	}
}

impl Debug for VNode {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let mut debug = f.debug_struct("VNode");
		debug.field("type", &self.0.node_type);
		if let Some(key) = &self.0.key {
			debug.field("key", key);
		}
		if cfg!(feature = "dangerous-logging") {
			if let Some(text) = &self.0.text {
				debug.field("text", text);
			}
		}
		debug.field("original", &self.original()).field("dom", &self.dom()).finish()
	}
}

/// Returns the first realized host node below `node`, depth-first and left to right, skipping empty slots.
#[must_use]
pub fn first_host_descendant(node: &VNode) -> Option<HostId> {
	node.children()?.iter().flatten().find_map(|child| child.dom().or_else(|| first_host_descendant(child)))
}

/// What a component's render function returned.
#[derive(Debug, Clone)]
pub enum Rendered {
	Empty,
	Node(VNode),
	Nodes(Vec<Option<VNode>>),
}

impl Rendered {
	/// The child slots to reconcile.
	///
	/// A keyless fragment is unwrapped into its own children, so that it never needs a host node.
	#[must_use]
	pub fn into_children(self) -> Vec<Option<VNode>> {
		match self {
			Self::Empty => vec![None],
			Self::Node(node) if node.is_fragment() && node.key().is_none() => node.props().children(),
			Self::Node(node) => vec![Some(node)],
			Self::Nodes(nodes) => nodes,
		}
	}
}

impl From<VNode> for Rendered {
	fn from(node: VNode) -> Self {
		Self::Node(node)
	}
}

impl From<Option<VNode>> for Rendered {
	fn from(node: Option<VNode>) -> Self {
		node.map_or(Self::Empty, Self::Node)
	}
}

impl From<Vec<VNode>> for Rendered {
	fn from(nodes: Vec<VNode>) -> Self {
		Self::Nodes(nodes.into_iter().map(Some).collect())
	}
}
