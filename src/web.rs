//! A [`Host`] over the browser DOM.

use crate::{
	error::HostError,
	host::{Host, HostId},
	value::{Props, Value, CHECKED, CHILDREN, KEY, RAW_HTML, VALUE},
};
use core::convert::TryInto;
use tracing::{error, instrument, trace, warn};
use wasm_bindgen::{JsCast, JsValue, UnwrapThrowExt};

/// Maps [`HostId`]s to [`web_sys::Node`]s and applies patches to them.
///
/// Nodes are only ever added, so a [`HostId`] stays valid for the lifetime of the host.
/// Creating, inserting and removing nodes is up to the child reconciler, which registers new nodes through [`WebHost::adopt`].
#[derive(Debug, Default)]
pub struct WebHost {
	nodes: Vec<web_sys::Node>,
}

impl WebHost {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `node` and returns its handle.
	pub fn adopt(&mut self, node: web_sys::Node) -> HostId {
		let id = HostId::new(self.nodes.len().try_into().unwrap_throw());
		self.nodes.push(node);
		id
	}

	#[must_use]
	pub fn node(&self, id: HostId) -> Option<&web_sys::Node> {
		self.nodes.get(id.get() as usize)
	}

	fn get(&self, id: HostId) -> Result<&web_sys::Node, HostError> {
		self.node(id).ok_or(HostError::UnknownNode(id.get()))
	}

	fn element(&self, id: HostId) -> Result<&web_sys::Element, HostError> {
		self.get(id)?.dyn_ref::<web_sys::Element>().ok_or(HostError::Unsupported("not an element"))
	}
}

impl Host for WebHost {
	fn set_text(&mut self, node: HostId, data: &str) -> Result<(), HostError> {
		let character_data = self.get(node)?.dyn_ref::<web_sys::CharacterData>().ok_or(HostError::Unsupported("not a text node"))?;
		character_data.set_data(data);
		Ok(())
	}

	fn inner_html(&self, node: HostId) -> Option<String> {
		self.node(node)?.dyn_ref::<web_sys::Element>().map(web_sys::Element::inner_html)
	}

	fn set_inner_html(&mut self, node: HostId, markup: &str) -> Result<(), HostError> {
		self.element(node)?.set_inner_html(markup);
		Ok(())
	}

	fn value(&self, node: HostId) -> Option<Value> {
		let live = js_sys::Reflect::get(self.node(node)?, &JsValue::from_str(VALUE)).ok()?;
		from_js(&live)
	}

	fn checked(&self, node: HostId) -> Option<bool> {
		js_sys::Reflect::get(self.node(node)?, &JsValue::from_str(CHECKED)).ok()?.as_bool()
	}

	#[instrument(level = "trace", skip(self, new_props, old_props))]
	fn diff_props(&mut self, node: HostId, new_props: &Props, old_props: &Props, in_namespace: bool) -> Result<(), HostError> {
		if new_props.ptr_eq(old_props) {
			return Ok(());
		}
		let element = self.element(node)?;

		for (name, _) in old_props.iter().filter(|(name, _)| !is_reserved(name) && !new_props.contains(name)) {
			trace!(name, "Removing attribute.");
			element.remove_attribute(attribute_name(name, in_namespace)).map_err(js_error)?;
		}

		for (name, value) in new_props.iter().filter(|(name, _)| !is_reserved(name)) {
			if old_props.get(name).map_or(false, |old| old.same(value)) {
				continue;
			}
			let name = attribute_name(name, in_namespace);
			match value {
				Value::Null | Value::Bool(false) => element.remove_attribute(name).map_err(js_error)?,
				Value::Bool(true) => element.set_attribute(name, "").map_err(js_error)?,
				Value::Str(text) => element.set_attribute(name, text).map_err(js_error)?,
				Value::Number(number) => element.set_attribute(name, &number.to_string()).map_err(js_error)?,
				_ => {
					if cfg!(feature = "dangerous-logging") {
						warn!(name, ?value, "Skipping attribute of unsupported shape.");
					} else {
						warn!(name, "Skipping attribute of unsupported shape.");
					}
				}
			}
		}
		Ok(())
	}

	#[instrument(level = "trace", skip(self, value, _old_value))]
	fn set_property(&mut self, node: HostId, name: &str, value: &Value, _old_value: Option<&Value>, _in_namespace: bool) -> Result<(), HostError> {
		let target = self.get(node)?;
		let js_value = match value {
			Value::Null => JsValue::from_str(""),
			Value::Bool(b) => JsValue::from_bool(*b),
			Value::Number(n) => JsValue::from_f64(*n),
			Value::Str(s) | Value::Html(s) => JsValue::from_str(s),
			_ => return Err(HostError::Unsupported("property value of this shape")),
		};
		match js_sys::Reflect::set(target, &JsValue::from_str(name), &js_value) {
			Ok(true) => Ok(()),
			Ok(false) => {
				error!(name, "Property assignment was rejected.");
				Err(HostError::Js(format!("could not assign {:?}", name)))
			}
			Err(error) => Err(js_error(error)),
		}
	}
}

fn is_reserved(name: &str) -> bool {
	matches!(name, CHILDREN | KEY | VALUE | CHECKED | RAW_HTML)
}

fn attribute_name(name: &str, in_namespace: bool) -> &str {
	match (name, in_namespace) {
		("className", _) => "class",
		("htmlFor", false) => "for",
		("xlinkHref", true) => "href",
		(other, _) => other,
	}
}

fn from_js(value: &JsValue) -> Option<Value> {
	if value.is_undefined() {
		None
	} else if value.is_null() {
		Some(Value::Null)
	} else if let Some(text) = value.as_string() {
		Some(text.into())
	} else if let Some(number) = value.as_f64() {
		Some(number.into())
	} else {
		value.as_bool().map(Value::from)
	}
}

fn js_error(error: JsValue) -> HostError {
	HostError::Js(error.as_string().unwrap_or_else(|| format!("{:?}", error)))
}
