use crate::instance::InstanceId;

/// Instances with callbacks waiting for the commit phase, in the order they finished reconciling.
///
/// Filled during a pass and drained by [`Patcher::commit`](`crate::diff::Patcher::commit`)
/// only after every host mutation of that pass is done.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommitQueue(Vec<InstanceId>);

impl CommitQueue {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, id: InstanceId) {
		self.0.push(id);
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
	pub fn contains(&self, id: InstanceId) -> bool {
		self.0.contains(&id)
	}

	pub fn iter(&self) -> impl Iterator<Item = InstanceId> + '_ {
		self.0.iter().copied()
	}
}

impl IntoIterator for CommitQueue {
	type Item = InstanceId;
	type IntoIter = std::vec::IntoIter<InstanceId>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}
