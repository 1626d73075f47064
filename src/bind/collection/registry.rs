use std::fmt::Debug;
use std::hash::Hash;

use crate::bind::{Binding, BindError, Guid, Index16, Result, StructId, View};

/// Small copyable key a consumer maps back to a live bindable struct.
pub trait DataHandle: Copy + Eq + Hash + Debug + Default {}

impl<T: Copy + Eq + Hash + Debug + Default> DataHandle for T {}

/// Which end of a binding a view is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingSide {
	/// Value read by the copy.
	Source,
	/// Value written by the copy.
	Target,
}

impl BindingSide {
	/// Stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Source => "source",
			Self::Target => "target",
		}
	}
}

/// One bindable struct or object in a given context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindableStructDescriptor<H> {
	/// Struct type, patched later when resolved lazily.
	pub ty: Option<StructId>,
	/// Display name.
	pub name: Box<str>,
	/// Stable id that binding paths are rooted at.
	pub id: Guid,
	/// Consumer key used to fetch the live value.
	pub data_handle: H,
}

/// Lookup of bindable struct descriptors by data handle.
pub trait BindableStructRegistry<H: DataHandle> {
	/// Number of registered descriptors.
	fn num_bindable_struct_descriptors(&self) -> usize;

	/// Descriptor registered under `handle`.
	fn bindable_struct_descriptor_from_handle(&self, handle: H) -> Option<&BindableStructDescriptor<H>>;

	/// Visit every descriptor that may act as a binding source; return `false` to stop.
	fn visit_source_struct_descriptors(&self, visitor: &mut dyn FnMut(&BindableStructDescriptor<H>) -> bool);

	/// Descriptor whose id is `id`, including targets the source visitor skips.
	///
	/// Batching looks up both ends of a binding through this.
	fn bindable_struct_descriptor_by_id(&self, id: Guid) -> Option<BindableStructDescriptor<H>>;
}

/// Source of live views for bindings.
pub trait BindingDataProvider<H: DataHandle> {
	/// Live view behind a data handle; `None` when the value is not available.
	fn data_view(&self, handle: H) -> Option<View>;

	/// Live view for one side of a binding.
	fn binding_data_view(&self, binding: &Binding<H>, side: BindingSide) -> Option<View> {
		match side {
			BindingSide::Source => self.data_view(binding.source_data_handle),
			BindingSide::Target => self.data_view(binding.target_data_handle),
		}
	}
}

/// Handle into a [`BindableStructs`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StructHandle(pub Index16);

impl StructHandle {
	/// Table position, `None` for the default handle.
	pub fn index(self) -> Option<usize> {
		self.0.get()
	}
}

#[derive(Debug, Clone)]
struct Entry {
	descriptor: BindableStructDescriptor<StructHandle>,
	view: View,
}

/// Vector-backed registry and data-view provider.
#[derive(Debug, Clone, Default)]
pub struct BindableStructs {
	entries: Vec<Entry>,
}

impl BindableStructs {
	/// Create an empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a bindable struct and its current view.
	pub fn add(&mut self, name: &str, id: Guid, ty: Option<StructId>, view: View) -> Result<StructHandle> {
		if self.entries.iter().any(|entry| entry.descriptor.id == id) {
			return Err(BindError::DuplicateBindableStruct { id });
		}
		let index = Index16::new(self.entries.len()).ok_or(BindError::CollectionFull {
			what: "bindable structs",
			max: Index16::MAX + 1,
		})?;
		let handle = StructHandle(index);
		self.entries.push(Entry {
			descriptor: BindableStructDescriptor {
				ty,
				name: name.into(),
				id,
				data_handle: handle,
			},
			view,
		});
		Ok(handle)
	}

	/// Replace the live view behind `handle`.
	pub fn set_view(&mut self, handle: StructHandle, view: View) -> bool {
		match handle.index().and_then(|index| self.entries.get_mut(index)) {
			Some(entry) => {
				entry.view = view;
				true
			}
			None => false,
		}
	}

	/// Patch the struct type of a lazily resolved descriptor.
	pub fn set_type(&mut self, handle: StructHandle, ty: StructId) -> bool {
		match handle.index().and_then(|index| self.entries.get_mut(index)) {
			Some(entry) => {
				entry.descriptor.ty = Some(ty);
				true
			}
			None => false,
		}
	}

	/// Descriptor by display name.
	pub fn by_name(&self, name: &str) -> Option<&BindableStructDescriptor<StructHandle>> {
		self.entries.iter().map(|entry| &entry.descriptor).find(|item| item.name.as_ref() == name)
	}

	/// Registered descriptors in registration order.
	pub fn descriptors(&self) -> impl Iterator<Item = &BindableStructDescriptor<StructHandle>> {
		self.entries.iter().map(|entry| &entry.descriptor)
	}

	/// Current view per struct id, as consumed by `remove_invalid_bindings`.
	pub fn views_by_id(&self) -> std::collections::HashMap<Guid, View> {
		self.entries.iter().map(|entry| (entry.descriptor.id, entry.view)).collect()
	}
}

impl BindableStructRegistry<StructHandle> for BindableStructs {
	fn num_bindable_struct_descriptors(&self) -> usize {
		self.entries.len()
	}

	fn bindable_struct_descriptor_from_handle(&self, handle: StructHandle) -> Option<&BindableStructDescriptor<StructHandle>> {
		handle.index().and_then(|index| self.entries.get(index)).map(|entry| &entry.descriptor)
	}

	fn bindable_struct_descriptor_by_id(&self, id: Guid) -> Option<BindableStructDescriptor<StructHandle>> {
		self.entries
			.iter()
			.map(|entry| &entry.descriptor)
			.find(|item| item.id == id)
			.cloned()
	}

	fn visit_source_struct_descriptors(&self, visitor: &mut dyn FnMut(&BindableStructDescriptor<StructHandle>) -> bool) {
		for entry in &self.entries {
			if !visitor(&entry.descriptor) {
				break;
			}
		}
	}
}

impl BindingDataProvider<StructHandle> for BindableStructs {
	fn data_view(&self, handle: StructHandle) -> Option<View> {
		handle.index().and_then(|index| self.entries.get(index)).map(|entry| entry.view)
	}
}
