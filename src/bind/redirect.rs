use std::collections::HashMap;

use crate::bind::{Schema, StructId};

/// Recorded field renames, consulted when a path segment no longer matches a field.
///
/// Passed explicitly to the resolver; the engine keeps no process-wide registry.
#[derive(Debug, Clone, Default)]
pub struct RedirectRegistry {
	fields: HashMap<(StructId, Box<str>), Box<str>>,
}

impl RedirectRegistry {
	/// Create an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Record that `old` on `owner` is now called `new`.
	pub fn add_field_redirect(&mut self, owner: StructId, old: &str, new: &str) {
		self.fields.insert((owner, old.into()), new.into());
	}

	/// Find the current name of `old` on `owner` or any of its parents.
	pub fn find_field_redirect(&self, schema: &Schema, owner: StructId, old: &str) -> Option<&str> {
		let mut current = Some(owner);
		while let Some(id) = current {
			if let Some(new) = self.fields.get(&(id, Box::<str>::from(old))) {
				return Some(new);
			}
			current = schema.struct_def(id).and_then(|item| item.super_struct);
		}
		None
	}

	/// Number of recorded redirects.
	pub fn len(&self) -> usize {
		self.fields.len()
	}

	/// Return whether no redirects are recorded.
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}
}
