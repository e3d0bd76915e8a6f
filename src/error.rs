use crate::instance::InstanceId;
use core::fmt::{self, Debug, Display, Formatter};
use std::{error::Error, rc::Rc};
use thiserror::Error;

/// A failure raised by user code: a component's render function or one of its lifecycle hooks.
///
/// Cheap to clone, since the same error may be stored as a boundary's pending error
/// and handed to several boundary hooks while it travels outwards.
#[derive(Clone)]
pub struct ComponentError(Rc<dyn Error>);
impl ComponentError {
	#[must_use]
	pub fn new(error: impl Error + 'static) -> Self {
		Self(Rc::new(error))
	}

	#[must_use]
	pub fn msg(message: impl Into<String>) -> Self {
		Self::new(Message(message.into()))
	}

	#[must_use]
	pub fn inner(&self) -> &(dyn Error + 'static) {
		&*self.0
	}
}
impl Debug for ComponentError {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		Debug::fmt(&*self.0, f)
	}
}
impl Display for ComponentError {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		Display::fmt(&*self.0, f)
	}
}
impl Error for ComponentError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		self.0.source()
	}
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

/// Failures reported by a [`Host`](`crate::host::Host`) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
	#[error("the previous virtual node has no realized host node")]
	Detached,
	#[error("unknown host node {0}")]
	UnknownNode(u32),
	#[error("unsupported host operation: {0}")]
	Unsupported(&'static str),
	#[error("host exception: {0}")]
	Js(String),
}

#[derive(Debug, Clone, Error)]
pub enum PatchError {
	#[error("component `{component}` failed: {source}")]
	Component {
		component: &'static str,
		#[source]
		source: ComponentError,
	},
	#[error(transparent)]
	Host(#[from] HostError),
	#[error("no live component instance {0:?}")]
	UnknownInstance(InstanceId),
	#[error("depth limit ({0}) reached")]
	DepthLimit(usize),
	/// No error boundary in the ancestry absorbed the contained error.
	#[error("unhandled: {0}")]
	Unhandled(Box<PatchError>),
}
impl PatchError {
	pub(crate) fn component(component: &'static str) -> impl FnOnce(ComponentError) -> Self {
		move |source| Self::Component { component, source }
	}

	/// Strips [`PatchError::Unhandled`] wrapping.
	#[must_use]
	pub fn root_cause(&self) -> &Self {
		match self {
			Self::Unhandled(inner) => inner.root_cause(),
			other => other,
		}
	}

	#[must_use]
	pub fn is_unhandled(&self) -> bool {
		matches!(self, Self::Unhandled(_))
	}
}
