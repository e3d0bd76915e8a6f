use super::Patcher;
use crate::{
	commit::CommitQueue,
	context::ContextBag,
	error::{HostError, PatchError},
	host::{Host, HostId},
	node::{first_host_descendant, NodeType, VNode},
	value::{Props, CHECKED, VALUE},
};
use std::rc::Rc;
use tracing::{trace, trace_span};

impl<H: Host> Patcher<H> {
	/// Patches the host node `dom`, realized for `old_node`, so that it matches `new_node`.
	///
	/// Returns the host node that now represents `new_node`.
	pub(super) fn reconcile_element(
		&mut self,
		dom: Option<HostId>,
		new_node: &VNode,
		old_node: Option<&VNode>,
		context: &ContextBag,
		in_namespace: bool,
		commit_queue: &mut CommitQueue,
	) -> Result<HostId, PatchError> {
		let dom = dom.ok_or(HostError::Detached)?;

		match new_node.node_type() {
			NodeType::Text => {
				let data = new_node.text_data().unwrap_or_else(|| "".into());
				if old_node.and_then(VNode::text_data).as_deref() != Some(&*data) {
					let span = trace_span!("Updating text", ?dom);
					let _enter = span.enter();
					self.host.set_text(dom, &data)?;
				}
			}
			NodeType::Element(tag) => {
				let tag = Rc::clone(tag);
				let span = trace_span!("Updating element", %tag, ?dom);
				let _enter = span.enter();

				let in_namespace = in_namespace || *tag == *self.config.namespace_tag;
				let empty = Props::new();
				let old_props = old_node.map_or(&empty, VNode::props);
				let new_props = new_node.props();

				let new_html = new_props.raw_html();
				let old_html = old_props.raw_html();
				if new_html.is_some() || old_html.is_some() {
					let stale = match new_html {
						None => true,
						Some(new_html) => old_html != Some(new_html) && self.host.inner_html(dom).as_deref() != Some(new_html),
					};
					if stale {
						self.host.set_inner_html(dom, new_html.unwrap_or(""))?;
					} else {
						trace!("Raw content is already in place.");
					}
				}

				self.host.diff_props(dom, new_props, old_props, in_namespace)?;

				if new_html.is_some() {
					new_node.set_children(Some(Rc::from(Vec::new())));
				} else {
					let start = old_node.and_then(first_host_descendant);
					let children_in_namespace = in_namespace && *tag != *self.config.namespace_exit_tag;
					self.reconcile_children(dom, new_props.children(), new_node, old_node, context, children_in_namespace, commit_queue, start)?;
				}

				if let Some(value) = new_props.get(VALUE) {
					let drifted = self.host.value(dom).map_or(true, |live| !live.same(value));
					if drifted || (*tag == *self.config.progress_tag && value.is_falsy()) {
						trace!("Forcing live value.");
						self.host.set_property(dom, VALUE, value, old_props.get(VALUE), false)?;
					}
				}

				if let Some(checked) = new_props.get(CHECKED) {
					if checked.as_bool() != self.host.checked(dom) {
						trace!("Forcing live checked state.");
						self.host.set_property(dom, CHECKED, checked, old_props.get(CHECKED), false)?;
					}
				}
			}
			NodeType::Component(_) => return Err(HostError::Unsupported("component nodes have no host element").into()),
		}

		Ok(dom)
	}
}
