#![allow(dead_code)]

use sapwood::{
	commit::CommitQueue,
	component::{Component, ComponentType, Cx, Lifecycle},
	context::{ComponentContext, ContextBag},
	diff::Patcher,
	error::{ComponentError, HostError, PatchError},
	host::{ChildReconciler, Host, HostId},
	node::{NodeType, Rendered, VNode},
	value::{Props, State, Value, CHECKED, CHILDREN, KEY, RAW_HTML, VALUE},
};
use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

pub fn init_logging() {
	let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::TRACE).with_test_writer().try_init();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
	Create(HostId),
	Insert { parent: HostId, child: HostId },
	Remove(HostId),
	SetText(HostId),
	SetInnerHtml(HostId),
	SetAttribute(HostId, String),
	RemoveAttribute(HostId, String),
	SetProperty(HostId, String),
}

#[derive(Debug, Clone)]
enum Payload {
	Text(String),
	Element { tag: String, namespaced: Option<bool> },
}

#[derive(Debug)]
struct MemoryNode {
	payload: Payload,
	attributes: BTreeMap<String, String>,
	inner_html: String,
	value: Option<Value>,
	checked: Option<bool>,
	children: Vec<HostId>,
	parent: Option<HostId>,
}

/// A host node graph that records every mutation made to it.
#[derive(Debug, Default)]
pub struct MemoryHost {
	nodes: Vec<MemoryNode>,
	mutations: Vec<Mutation>,
}

impl MemoryHost {
	pub fn new() -> Self {
		Self::default()
	}

	fn push(&mut self, payload: Payload) -> HostId {
		let id = HostId::new(self.nodes.len() as u32);
		self.nodes.push(MemoryNode {
			payload,
			attributes: BTreeMap::new(),
			inner_html: String::new(),
			value: None,
			checked: None,
			children: Vec::new(),
			parent: None,
		});
		self.mutations.push(Mutation::Create(id));
		id
	}

	pub fn create_element(&mut self, tag: &str) -> HostId {
		self.push(Payload::Element { tag: tag.to_owned(), namespaced: None })
	}

	pub fn create_text(&mut self, data: &str) -> HostId {
		self.push(Payload::Text(data.to_owned()))
	}

	fn node(&self, id: HostId) -> Result<&MemoryNode, HostError> {
		self.nodes.get(id.get() as usize).ok_or(HostError::UnknownNode(id.get()))
	}

	fn node_mut(&mut self, id: HostId) -> Result<&mut MemoryNode, HostError> {
		self.nodes.get_mut(id.get() as usize).ok_or(HostError::UnknownNode(id.get()))
	}

	pub fn insert_before(&mut self, parent: HostId, child: HostId, before: Option<HostId>) -> Result<(), HostError> {
		self.detach(child)?;
		let siblings = &mut self.node_mut(parent)?.children;
		let index = before.and_then(|before| siblings.iter().position(|&sibling| sibling == before)).unwrap_or_else(|| siblings.len());
		siblings.insert(index, child);
		self.node_mut(child)?.parent = Some(parent);
		self.mutations.push(Mutation::Insert { parent, child });
		Ok(())
	}

	pub fn remove(&mut self, child: HostId) -> Result<(), HostError> {
		self.detach(child)?;
		self.mutations.push(Mutation::Remove(child));
		Ok(())
	}

	fn detach(&mut self, child: HostId) -> Result<(), HostError> {
		if let Some(parent) = self.node_mut(child)?.parent.take() {
			self.node_mut(parent)?.children.retain(|&sibling| sibling != child);
		}
		Ok(())
	}

	/// Simulates user input that changes the live value without going through the patcher.
	pub fn type_value(&mut self, node: HostId, value: impl Into<Value>) {
		self.nodes[node.get() as usize].value = Some(value.into());
	}

	/// Simulates a user toggling a checkbox.
	pub fn click_checkbox(&mut self, node: HostId) {
		let checked = &mut self.nodes[node.get() as usize].checked;
		*checked = Some(!checked.unwrap_or(false));
	}

	pub fn mutations(&self) -> &[Mutation] {
		&self.mutations
	}

	pub fn clear_mutations(&mut self) {
		self.mutations.clear()
	}

	pub fn children(&self, node: HostId) -> Vec<HostId> {
		self.nodes[node.get() as usize].children.clone()
	}

	pub fn attribute(&self, node: HostId, name: &str) -> Option<&str> {
		self.nodes[node.get() as usize].attributes.get(name).map(String::as_str)
	}

	/// Whether the last attribute diff on `node` ran inside the namespace.
	pub fn namespaced(&self, node: HostId) -> Option<bool> {
		match self.nodes[node.get() as usize].payload {
			Payload::Element { namespaced, .. } => namespaced,
			Payload::Text(_) => None,
		}
	}

	/// Markup-like rendering of `node` and everything attached below it.
	pub fn render(&self, node: HostId) -> String {
		let node = &self.nodes[node.get() as usize];
		match &node.payload {
			Payload::Text(data) => data.clone(),
			Payload::Element { tag, .. } => {
				let mut out = format!("<{}", tag);
				for (name, value) in &node.attributes {
					out += &format!(" {}=\"{}\"", name, value);
				}
				out += ">";
				if node.children.is_empty() {
					out += &node.inner_html;
				}
				for &child in &node.children {
					out += &self.render(child);
				}
				out + &format!("</{}>", tag)
			}
		}
	}

	/// Renders the children of `node`, without `node` itself.
	pub fn render_children(&self, node: HostId) -> String {
		self.nodes[node.get() as usize].children.iter().map(|&child| self.render(child)).collect()
	}
}

fn is_reserved(name: &str) -> bool {
	matches!(name, CHILDREN | KEY | VALUE | CHECKED | RAW_HTML)
}

fn attribute_text(value: &Value) -> Option<String> {
	match value {
		Value::Bool(true) => Some(String::new()),
		Value::Str(text) => Some(text.to_string()),
		Value::Number(number) => Some(number.to_string()),
		_ => None,
	}
}

impl Host for MemoryHost {
	fn set_text(&mut self, node: HostId, data: &str) -> Result<(), HostError> {
		match &mut self.node_mut(node)?.payload {
			Payload::Text(text) => *text = data.to_owned(),
			Payload::Element { .. } => return Err(HostError::Unsupported("not a text node")),
		}
		self.mutations.push(Mutation::SetText(node));
		Ok(())
	}

	fn inner_html(&self, node: HostId) -> Option<String> {
		Some(self.node(node).ok()?.inner_html.clone())
	}

	fn set_inner_html(&mut self, node: HostId, markup: &str) -> Result<(), HostError> {
		let target = self.node_mut(node)?;
		target.inner_html = markup.to_owned();
		let replaced = std::mem::take(&mut target.children);
		for child in replaced {
			self.node_mut(child)?.parent = None;
		}
		self.mutations.push(Mutation::SetInnerHtml(node));
		Ok(())
	}

	fn value(&self, node: HostId) -> Option<Value> {
		self.node(node).ok()?.value.clone()
	}

	fn checked(&self, node: HostId) -> Option<bool> {
		self.node(node).ok()?.checked
	}

	fn diff_props(&mut self, node: HostId, new_props: &Props, old_props: &Props, in_namespace: bool) -> Result<(), HostError> {
		let mut changes = Vec::new();
		for (name, old) in old_props.iter().filter(|(name, _)| !is_reserved(name)) {
			if new_props.get(name).and_then(attribute_text).is_none() && attribute_text(old).is_some() {
				changes.push((name.to_owned(), None));
			}
		}
		for (name, value) in new_props.iter().filter(|(name, _)| !is_reserved(name)) {
			if old_props.get(name).map_or(false, |old| old.same(value)) {
				continue;
			}
			changes.push((name.to_owned(), attribute_text(value)));
		}

		let target = self.node_mut(node)?;
		if let Payload::Element { namespaced, .. } = &mut target.payload {
			*namespaced = Some(in_namespace);
		}
		let mut mutations = Vec::new();
		for (name, value) in changes {
			match value {
				Some(value) => {
					target.attributes.insert(name.clone(), value);
					mutations.push(Mutation::SetAttribute(node, name));
				}
				None => {
					if target.attributes.remove(&name).is_some() {
						mutations.push(Mutation::RemoveAttribute(node, name));
					}
				}
			}
		}
		self.mutations.extend(mutations);
		Ok(())
	}

	fn set_property(&mut self, node: HostId, name: &str, value: &Value, _old_value: Option<&Value>, _in_namespace: bool) -> Result<(), HostError> {
		let target = self.node_mut(node)?;
		match name {
			VALUE => target.value = Some(value.clone()),
			CHECKED => target.checked = value.as_bool(),
			_ => return Err(HostError::Unsupported("only value and checked are properties here")),
		}
		self.mutations.push(Mutation::SetProperty(node, name.to_owned()));
		Ok(())
	}
}

/// Matches children by position, creating host nodes for children without a compatible counterpart
/// and removing whatever the new list doesn't use.
pub struct Positional;

fn compatible(new: &VNode, old: &VNode) -> bool {
	new.node_type().same(old.node_type()) && new.key() == old.key()
}

/// The realized host nodes directly below `parent_dom` that make up `node`.
fn host_roots(node: &VNode, out: &mut Vec<HostId>) {
	match node.node_type() {
		NodeType::Component(_) => {
			for child in node.children().iter().flat_map(|children| children.iter()).flatten() {
				host_roots(child, out)
			}
		}
		_ => out.extend(node.dom()),
	}
}

fn unmount(patcher: &mut Patcher<MemoryHost>, node: &VNode, detach: bool) -> Result<(), PatchError> {
	let is_component = matches!(node.node_type(), NodeType::Component(_));
	if detach && !is_component {
		if let Some(dom) = node.dom() {
			patcher.host_mut().remove(dom)?;
		}
	}
	for child in node.children().iter().flat_map(|children| children.iter()).flatten() {
		unmount(patcher, child, detach && is_component)?;
	}
	if let Some(id) = node.instance() {
		patcher.remove_instance(id);
	}
	Ok(())
}

impl ChildReconciler<MemoryHost> for Positional {
	fn reconcile(
		&self,
		patcher: &mut Patcher<MemoryHost>,
		parent_dom: HostId,
		children: Vec<Option<VNode>>,
		new_parent: &VNode,
		old_parent: Option<&VNode>,
		context: &ContextBag,
		in_namespace: bool,
		commit_queue: &mut CommitQueue,
		start: Option<HostId>,
	) -> Result<(), PatchError> {
		let old_children: Vec<Option<VNode>> = old_parent.and_then(VNode::children).map_or_else(Vec::new, |children| children.to_vec());
		let mut used = vec![false; old_children.len()];
		let mut realized = Vec::with_capacity(children.len());

		for (index, child) in children.into_iter().enumerate() {
			let child = match child {
				Some(child) if child.dom().is_some() || child.instance().is_some() => child.duplicate(),
				Some(child) => child,
				None => {
					realized.push(None);
					continue;
				}
			};

			let old = match old_children.get(index) {
				Some(Some(old)) if compatible(&child, old) => {
					used[index] = true;
					Some(old.clone())
				}
				_ => None,
			};

			let (old, created) = match (old, child.node_type()) {
				(Some(old), _) => (Some(old), None),
				(None, NodeType::Text) => {
					let dom = patcher.host_mut().create_text("");
					let placeholder = VNode::text("");
					placeholder.set_dom(Some(dom));
					(Some(placeholder), Some(dom))
				}
				(None, NodeType::Element(tag)) => {
					let dom = patcher.host_mut().create_element(tag);
					let placeholder = VNode::element(tag.clone(), Props::new());
					placeholder.set_dom(Some(dom));
					(Some(placeholder), Some(dom))
				}
				(None, NodeType::Component(_)) => (None, None),
			};

			let next_old_dom = old_children.iter().skip(index + 1).flatten().find_map(|old| {
				let mut roots = Vec::new();
				host_roots(old, &mut roots);
				roots.first().copied()
			});
			if let Some(created) = created {
				patcher.host_mut().insert_before(parent_dom, created, next_old_dom)?;
			}

			let start = old.as_ref().and_then(VNode::dom).or(start);
			patcher.patch(parent_dom, &child, old.as_ref(), context, in_namespace, commit_queue, start)?;
			realized.push(Some(child));
		}

		for (old, used) in old_children.iter().zip(used) {
			if let (Some(old), false) = (old, used) {
				unmount(patcher, old, true)?;
			}
		}

		new_parent.set_children(Some(realized.into()));
		if let NodeType::Component(_) = new_parent.node_type() {
			let mut roots = Vec::new();
			host_roots(new_parent, &mut roots);
			new_parent.set_dom(roots.first().copied());
		}
		Ok(())
	}
}

/// A patcher over a fresh [`MemoryHost`], plus a container element to render into.
pub fn patcher() -> (Patcher<MemoryHost>, HostId) {
	init_logging();
	let mut host = MemoryHost::new();
	let container = host.create_element("body");
	host.clear_mutations();
	(Patcher::new(host, Positional), container)
}

pub type Log = Rc<RefCell<Vec<String>>>;

pub fn log() -> Log {
	Log::default()
}

pub fn take(log: &Log) -> Vec<String> {
	std::mem::take(&mut *log.borrow_mut())
}

/// Renders its `children` prop and records every hook it implements into a [`Log`].
pub struct Recorder {
	name: &'static str,
	log: Log,
	lifecycle: Lifecycle,
	allow_update: bool,
}

impl Recorder {
	fn record(&self, event: &str) {
		self.log.borrow_mut().push(format!("{} {}", self.name, event));
	}
}

impl Component for Recorder {
	fn lifecycle(&self) -> Lifecycle {
		self.lifecycle
	}

	fn render(&mut self, cx: &mut Cx<'_>) -> Result<Rendered, ComponentError> {
		self.record("render");
		Ok(Rendered::Nodes(cx.props().children()))
	}

	fn will_receive_props(&mut self, _: &mut Cx<'_>, _: &Props, _: &ComponentContext) -> Result<(), ComponentError> {
		self.record("will_receive_props");
		Ok(())
	}

	fn should_update(&mut self, _: &mut Cx<'_>, _: &Props, _: &ComponentContext) -> Result<bool, ComponentError> {
		self.record("should_update");
		Ok(self.allow_update)
	}

	fn will_update(&mut self, _: &mut Cx<'_>, _: &Props, _: &ComponentContext) -> Result<(), ComponentError> {
		self.record("will_update");
		Ok(())
	}

	fn did_update(&mut self, _: &mut Cx<'_>, _: &Props, _: &State, snapshot: Option<&Value>) -> Result<(), ComponentError> {
		match snapshot.and_then(Value::as_str) {
			Some(snapshot) => self.record(&format!("did_update {}", snapshot)),
			None => self.record("did_update"),
		}
		Ok(())
	}

	fn snapshot_before_update(&mut self, _: &mut Cx<'_>, _: &Props, _: &State) -> Result<Option<Value>, ComponentError> {
		self.record("snapshot");
		Ok(Some("snap".into()))
	}
}

pub fn recorder(name: &'static str, log: &Log, lifecycle: Lifecycle, allow_update: bool) -> ComponentType {
	let log = Rc::clone(log);
	ComponentType::class(name, move |_, _| {
		Box::new(Recorder {
			name,
			log: Rc::clone(&log),
			lifecycle,
			allow_update,
		})
	})
}

/// A function component that always fails to render.
pub fn failing() -> ComponentType {
	ComponentType::function("Failing", |_| Err(ComponentError::msg("boom")))
}
