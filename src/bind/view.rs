use crate::bind::{Address, StructId};

/// Non-owning, type-tagged handle to a struct or object value in a heap.
///
/// A view may carry only a type, which is enough for path resolution without
/// live data. A view with memory always carries a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct View {
	ty: Option<StructId>,
	memory: Option<Address>,
}

impl View {
	/// View of a live value; a null address yields a type-only view.
	pub fn new(ty: StructId, memory: Address) -> Self {
		Self {
			ty: Some(ty),
			memory: (memory != 0).then_some(memory),
		}
	}

	/// View carrying a type but no value.
	pub fn type_only(ty: StructId) -> Self {
		Self { ty: Some(ty), memory: None }
	}

	/// The "no value" view.
	pub fn none() -> Self {
		Self::default()
	}

	/// Struct type of the viewed value.
	pub fn ty(&self) -> Option<StructId> {
		self.ty
	}

	/// Address of the viewed value.
	pub fn memory(&self) -> Option<Address> {
		self.memory
	}

	/// Return whether the view points at live memory.
	pub fn is_valid(&self) -> bool {
		self.memory.is_some()
	}
}
