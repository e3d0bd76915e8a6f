use std::rc::Rc;

/// Run-time settings of a [`Patcher`](`crate::diff::Patcher`).
#[derive(Debug, Clone)]
pub struct PatchConfig {
	/// Maximum number of nested [`Patcher::patch`](`crate::diff::Patcher::patch`) frames.
	pub depth_limit: usize,
	/// Elements with this tag and their descendants are in the host's namespaced sub-language.
	pub namespace_tag: Rc<str>,
	/// Children of elements with this tag leave the namespace again.
	pub namespace_exit_tag: Rc<str>,
	/// Elements with this tag get a falsy `value` written unconditionally,
	/// since the host can't tell it apart from "indeterminate".
	pub progress_tag: Rc<str>,
}

impl Default for PatchConfig {
	fn default() -> Self {
		Self {
			depth_limit: 1024,
			namespace_tag: "svg".into(),
			namespace_exit_tag: "foreignObject".into(),
			progress_tag: "progress".into(),
		}
	}
}

impl PatchConfig {
	#[must_use]
	pub fn depth_limit(mut self, depth_limit: usize) -> Self {
		self.depth_limit = depth_limit;
		self
	}

	#[must_use]
	pub fn namespace(mut self, tag: impl Into<Rc<str>>, exit_tag: impl Into<Rc<str>>) -> Self {
		self.namespace_tag = tag.into();
		self.namespace_exit_tag = exit_tag.into();
		self
	}

	#[must_use]
	pub fn progress_tag(mut self, tag: impl Into<Rc<str>>) -> Self {
		self.progress_tag = tag.into();
		self
	}
}
