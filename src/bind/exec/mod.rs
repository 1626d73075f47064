use crate::bind::ops::{INSTANCED_ITEM_SIZE, clear_value, copy_struct, copy_value, read_bool, write_bool};
use crate::bind::{
	AccessKind, Address, BindError, BindingCollection, BindingDataProvider, BoolStorage, CopyInfo, CopyType, DataHandle, FieldType, Heap, NumericKind,
	PropertyIndirection, Result, Schema, StructId, View, chain,
};

/// Walk a compiled chain from `view` to the leaf address.
///
/// Returns `None` when a reference on the way is null or dead, when a live
/// runtime type no longer matches the recorded instance type, or when an array
/// has shrunk below the recorded index.
pub fn get_address(schema: &Schema, heap: &Heap, view: View, first: &PropertyIndirection, rest: &[PropertyIndirection]) -> Option<Address> {
	let mut address = view.memory()?;

	for step in chain(first, rest) {
		let at = address + u64::from(step.offset);
		address = match step.access_kind {
			AccessKind::Offset => at,
			AccessKind::Object | AccessKind::WeakObject | AccessKind::SoftObject | AccessKind::ObjectInstance => {
				let ptr = heap.read_u64(at).ok()?;
				if !heap.is_live(ptr) {
					return None;
				}
				if step.access_kind == AccessKind::ObjectInstance || step.instance_type.is_some() {
					check_instance(schema, heap.runtime_type(ptr), step.instance_type)?;
				}
				ptr
			}
			AccessKind::StructInstance => {
				let header = heap.read_instanced_header(at).ok()?;
				check_instance(schema, header.ty, step.instance_type)?;
				non_null(header.memory)?
			}
			AccessKind::SharedStruct => {
				let ptr = non_null(heap.read_u64(at).ok()?)?;
				check_instance(schema, heap.runtime_type(ptr), step.instance_type)?;
				ptr
			}
			AccessKind::StructInstanceContainer => {
				let header = heap.read_array_header(at).ok()?;
				let index = step.array_index.get()?;
				if index >= header.num {
					return None;
				}
				let item = heap.read_instanced_header(header.data + (index * INSTANCED_ITEM_SIZE) as u64).ok()?;
				check_instance(schema, item.ty, step.instance_type)?;
				non_null(item.memory)?
			}
			AccessKind::IndexArray => {
				let header = heap.read_array_header(at).ok()?;
				let index = step.array_index.get()?;
				if index >= header.num {
					return None;
				}
				let inner = match step.array_field.and_then(|field| schema.field(field)).map(|def| &def.ty) {
					Some(FieldType::Array(inner)) => inner,
					_ => return None,
				};
				header.data + (index * schema.element_size(inner)) as u64
			}
			AccessKind::Unset => return None,
		};
	}

	Some(address)
}

fn check_instance(schema: &Schema, live: Option<StructId>, expected: Option<StructId>) -> Option<()> {
	let live = live?;
	match expected {
		Some(expected) if !schema.is_child_of(live, expected) => None,
		_ => Some(()),
	}
}

fn non_null(address: Address) -> Option<Address> {
	(address != 0).then_some(address)
}

impl<H: DataHandle> BindingCollection<H> {
	/// Execute one compiled copy from `source` into `target`.
	///
	/// Unresolved copies succeed without writing. Panics when the collection
	/// has not been resolved.
	pub fn copy_property(&self, schema: &Schema, heap: &mut Heap, copy: &CopyInfo<H>, source: View, target: View) -> bool {
		assert!(self.resolved, "copy_property called before resolve_paths");

		if copy.copy_type == CopyType::None {
			return true;
		}

		let Some(target_address) = get_address(schema, heap, target, &copy.target_indirection, &self.indirections) else {
			tracing::debug!("skipping {} copy: target address is not reachable", copy.copy_type.as_str());
			return false;
		};
		let source_address = get_address(schema, heap, source, &copy.source_indirection, &self.indirections);
		if source_address.is_none() && copy.copy_type != CopyType::CopyObject {
			tracing::debug!("skipping {} copy: source address is not reachable", copy.copy_type.as_str());
			return false;
		}

		match self.perform_copy(schema, heap, copy, source_address, target_address) {
			Ok(()) => true,
			Err(err) => {
				tracing::debug!("{} copy failed: {err}", copy.copy_type.as_str());
				false
			}
		}
	}

	/// Clear every reachable target of one batch to its default.
	///
	/// Panics when the collection has not been resolved or the batch index is invalid.
	pub fn reset_objects(&self, schema: &Schema, heap: &mut Heap, batch_index: usize, target: View) -> bool {
		assert!(self.resolved, "reset_objects called before resolve_paths");
		assert!(batch_index < self.copy_batches.len(), "invalid copy batch index {batch_index}");

		let mut ok = true;
		for copy in self.batch_copies(batch_index) {
			let Some(address) = get_address(schema, heap, target, &copy.target_indirection, &self.indirections) else {
				continue;
			};
			if let Err(err) = self.reset_target(schema, heap, copy, address) {
				tracing::debug!("{} reset failed: {err}", copy.copy_type.as_str());
				ok = false;
			}
		}
		ok
	}

	/// Execute every copy of one batch, fetching each source view from `provider`.
	///
	/// Panics when the collection has not been resolved or the batch index is invalid.
	pub fn copy_batch(&self, schema: &Schema, heap: &mut Heap, provider: &dyn BindingDataProvider<H>, batch_index: usize, target: View) -> bool {
		assert!(self.resolved, "copy_batch called before resolve_paths");
		assert!(batch_index < self.copy_batches.len(), "invalid copy batch index {batch_index}");

		let mut ok = true;
		for copy in self.batch_copies(batch_index) {
			let source = provider.data_view(copy.source_data_handle).unwrap_or_default();
			ok &= self.copy_property(schema, heap, copy, source, target);
		}
		ok
	}

	fn perform_copy(&self, schema: &Schema, heap: &mut Heap, copy: &CopyInfo<H>, source: Option<Address>, target: Address) -> Result<()> {
		let target_ty = copy.target_leaf.and_then(|field| schema.leaf_type(field)).cloned();
		let source_ty = copy.source_leaf.and_then(|field| schema.leaf_type(field)).cloned();
		let dim = copy.target_leaf.map(|field| schema.leaf_array_dim(field)).unwrap_or(1);
		let missing = || BindError::IncompatibleTypes {
			source_desc: source_ty.as_ref().map(|ty| ty.describe(schema)).unwrap_or_else(|| "<struct>".to_owned()),
			target_desc: target_ty.as_ref().map(|ty| ty.describe(schema)).unwrap_or_else(|| "<struct>".to_owned()),
		};
		let Some(target_ty) = target_ty.as_ref() else {
			return Err(missing());
		};

		if copy.copy_type == CopyType::CopyObject {
			let stride = schema.element_size(target_ty) as u64;
			for index in 0..dim as u64 {
				let value = match (source, &source_ty) {
					(None, _) => 0,
					(Some(at), None) => at,
					(Some(at), Some(ty)) => heap.read_u64(at + index * schema.element_size(ty) as u64)?,
				};
				heap.write_u64(target + index * stride, value)?;
			}
			return Ok(());
		}

		let Some(source) = source else {
			return Err(missing());
		};

		match copy.copy_type {
			CopyType::None | CopyType::CopyObject => Ok(()),
			CopyType::CopyPlain => heap.copy_bytes(source, target, copy.copy_size),
			CopyType::CopyComplex => {
				let stride = schema.element_size(target_ty) as u64;
				for index in 0..dim as u64 {
					copy_value(schema, heap, target_ty, source + index * stride, target + index * stride)?;
				}
				Ok(())
			}
			CopyType::CopyBool => {
				let (Some(FieldType::Bool(from)), FieldType::Bool(to)) = (&source_ty, target_ty) else {
					return Err(missing());
				};
				for index in 0..dim as u64 {
					let value = read_bool(heap, *from, source + index)?;
					write_bool(heap, *to, target + index, value)?;
				}
				Ok(())
			}
			CopyType::CopyStruct => {
				let id = match (&source_ty, target_ty) {
					(_, FieldType::Struct(id)) => *id,
					_ => return Err(missing()),
				};
				if copy.source_leaf.is_none() {
					return copy_struct(schema, heap, copy.source_struct_type.unwrap_or(id), source, target);
				}
				let stride = schema.element_size(target_ty) as u64;
				for index in 0..dim as u64 {
					copy_struct(schema, heap, id, source + index * stride, target + index * stride)?;
				}
				Ok(())
			}
			CopyType::CopyName => heap.copy_bytes(source, target, 4 * dim),
			CopyType::CopyFixedArray => {
				let FieldType::Array(inner) = target_ty else {
					return Err(missing());
				};
				let from = heap.read_array_header(source)?;
				let to = heap.read_array_header(target)?;
				let stride = schema.element_size(inner) as u64;
				for index in 0..from.num.min(to.num) as u64 {
					copy_value(schema, heap, inner, from.data + index * stride, to.data + index * stride)?;
				}
				Ok(())
			}
			CopyType::StructReference => {
				let hooks = self.struct_reference.as_ref().ok_or_else(missing)?;
				let source_ty = source_ty.as_ref().ok_or_else(missing)?;
				(hooks.copy)(heap, source_ty, source, target)
			}
			promotion => {
				let (from, to) = promotion.conversion().ok_or_else(missing)?;
				let storage = match &source_ty {
					Some(FieldType::Bool(storage)) => *storage,
					_ => BoolStorage::Native,
				};
				let number = read_number(heap, from, storage, source)?;
				write_number(heap, to, target, number)
			}
		}
	}

	fn reset_target(&self, schema: &Schema, heap: &mut Heap, copy: &CopyInfo<H>, address: Address) -> Result<()> {
		let Some(target_ty) = copy.target_leaf.and_then(|field| schema.leaf_type(field)) else {
			return Ok(());
		};
		let dim = copy.target_leaf.map(|field| schema.leaf_array_dim(field)).unwrap_or(1) as u64;
		let stride = schema.element_size(target_ty) as u64;

		match copy.copy_type {
			CopyType::CopyObject => {
				for index in 0..dim {
					heap.zero(address + index * stride, stride as usize)?;
				}
				Ok(())
			}
			CopyType::CopyStruct => {
				for index in 0..dim {
					clear_value(schema, heap, target_ty, address + index * stride)?;
				}
				Ok(())
			}
			CopyType::CopyFixedArray => {
				let FieldType::Array(inner) = target_ty else {
					return Ok(());
				};
				let header = heap.read_array_header(address)?;
				let elem = schema.element_size(inner) as u64;
				for index in 0..header.num as u64 {
					clear_value(schema, heap, inner, header.data + index * elem)?;
				}
				Ok(())
			}
			CopyType::StructReference => match self.struct_reference.as_ref() {
				Some(hooks) => (hooks.reset)(heap, address),
				None => Ok(()),
			},
			_ => Ok(()),
		}
	}
}

#[derive(Debug, Clone, Copy)]
enum Number {
	Int(i64),
	Real(f64),
}

fn read_number(heap: &Heap, kind: NumericKind, storage: BoolStorage, addr: Address) -> Result<Number> {
	Ok(match kind {
		NumericKind::Bool => Number::Int(i64::from(read_bool(heap, storage, addr)?)),
		NumericKind::Byte => Number::Int(i64::from(heap.read_u8(addr)?)),
		NumericKind::Int32 => Number::Int(i64::from(heap.read_i32(addr)?)),
		NumericKind::UInt32 => Number::Int(i64::from(heap.read_u32(addr)?)),
		NumericKind::Int64 => Number::Int(heap.read_i64(addr)?),
		NumericKind::Float => Number::Real(f64::from(heap.read_f32(addr)?)),
		NumericKind::Double => Number::Real(heap.read_f64(addr)?),
	})
}

fn write_number(heap: &mut Heap, kind: NumericKind, addr: Address, number: Number) -> Result<()> {
	let (int, real) = match number {
		Number::Int(value) => (value, value as f64),
		Number::Real(value) => (value as i64, value),
	};
	match kind {
		NumericKind::Bool => heap.write_u8(addr, u8::from(int != 0)),
		NumericKind::Byte => heap.write_u8(addr, int as u8),
		NumericKind::Int32 => heap.write_i32(addr, int as i32),
		NumericKind::UInt32 => heap.write_u32(addr, int as u32),
		NumericKind::Int64 => heap.write_i64(addr, int),
		NumericKind::Float => heap.write_f32(addr, real as f32),
		NumericKind::Double => heap.write_f64(addr, real),
	}
}

#[cfg(test)]
mod tests;
