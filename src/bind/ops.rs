use crate::bind::{Address, ArrayHeader, BindError, BoolStorage, FieldType, Heap, InstancedHeader, Result, Schema, StructId};

/// Size of one element of an instanced struct container.
pub const INSTANCED_ITEM_SIZE: usize = 16;

/// Deep-copy one value of `ty` from `src` to `dst`, releasing what `dst` owned before.
///
/// Owned storage (strings, arrays, maps, instanced payloads) is duplicated;
/// shared structs and object references copy the address.
pub fn copy_value(schema: &Schema, heap: &mut Heap, ty: &FieldType, src: Address, dst: Address) -> Result<()> {
	if src == dst {
		return Ok(());
	}

	match ty {
		FieldType::Bool(BoolStorage::Bit(mask)) => {
			let value = heap.read_u8(src)? & mask != 0;
			write_bool(heap, BoolStorage::Bit(*mask), dst, value)
		}
		FieldType::String => {
			let text = read_string(heap, src)?;
			write_string(heap, dst, &text)
		}
		FieldType::Map { .. } => {
			let data = heap.read_u64(src)?;
			let copy = clone_allocation(heap, data)?;
			destroy_value(schema, heap, ty, dst)?;
			heap.write_u64(dst, copy)
		}
		FieldType::Struct(id) => copy_struct(schema, heap, *id, src, dst),
		FieldType::Array(inner) => {
			let header = heap.read_array_header(src)?;
			let elem_size = schema.element_size(inner);
			destroy_value(schema, heap, ty, dst)?;
			let data = if header.num == 0 { 0 } else { heap.alloc(None, header.num * elem_size) };
			for index in 0..header.num {
				let offset = (index * elem_size) as u64;
				copy_value(schema, heap, inner, header.data + offset, data + offset)?;
			}
			heap.write_array_header(
				dst,
				ArrayHeader {
					data,
					num: header.num,
					max: header.num,
				},
			)
		}
		FieldType::InstancedStruct { .. } => {
			let header = heap.read_instanced_header(src)?;
			let copy = clone_instanced(schema, heap, header)?;
			destroy_value(schema, heap, ty, dst)?;
			heap.write_instanced_header(dst, copy)
		}
		FieldType::InstancedStructContainer => {
			let header = heap.read_array_header(src)?;
			let mut items = Vec::with_capacity(header.num);
			for index in 0..header.num {
				let item = heap.read_instanced_header(header.data + (index * INSTANCED_ITEM_SIZE) as u64)?;
				items.push(clone_instanced(schema, heap, item)?);
			}
			destroy_value(schema, heap, ty, dst)?;
			let data = if items.is_empty() { 0 } else { heap.alloc(None, items.len() * INSTANCED_ITEM_SIZE) };
			for (index, item) in items.iter().enumerate() {
				heap.write_instanced_header(data + (index * INSTANCED_ITEM_SIZE) as u64, *item)?;
			}
			heap.write_array_header(
				dst,
				ArrayHeader {
					data,
					num: items.len(),
					max: items.len(),
				},
			)
		}
		other => {
			let size = schema.element_size(other);
			heap.copy_bytes(src, dst, size)
		}
	}
}

/// Deep-copy a whole struct value field by field.
pub fn copy_struct(schema: &Schema, heap: &mut Heap, id: StructId, src: Address, dst: Address) -> Result<()> {
	let item = schema.struct_def(id).ok_or_else(|| BindError::UnknownStruct { name: format!("#{}", id.0) })?;
	for field in &item.fields {
		let size = schema.element_size(&field.ty) as u64;
		for index in 0..field.array_dim as u64 {
			let at = field.offset as u64 + index * size;
			copy_value(schema, heap, &field.ty, src + at, dst + at)?;
		}
	}
	Ok(())
}

/// Reset a value to its default, releasing owned storage.
pub fn clear_value(schema: &Schema, heap: &mut Heap, ty: &FieldType, addr: Address) -> Result<()> {
	if let FieldType::Bool(storage @ BoolStorage::Bit(_)) = ty {
		return write_bool(heap, *storage, addr, false);
	}
	destroy_value(schema, heap, ty, addr)?;
	heap.zero(addr, schema.element_size(ty))
}

/// Release storage owned by a value without rewriting it.
pub fn destroy_value(schema: &Schema, heap: &mut Heap, ty: &FieldType, addr: Address) -> Result<()> {
	match ty {
		FieldType::String | FieldType::Map { .. } => {
			let data = heap.read_u64(addr)?;
			heap.free(data);
		}
		FieldType::Struct(id) => destroy_struct(schema, heap, *id, addr)?,
		FieldType::Array(inner) => {
			let header = heap.read_array_header(addr)?;
			let elem_size = schema.element_size(inner);
			for index in 0..header.num {
				destroy_value(schema, heap, inner, header.data + (index * elem_size) as u64)?;
			}
			heap.free(header.data);
		}
		FieldType::InstancedStruct { .. } => {
			let header = heap.read_instanced_header(addr)?;
			destroy_instanced(schema, heap, header)?;
		}
		FieldType::InstancedStructContainer => {
			let header = heap.read_array_header(addr)?;
			for index in 0..header.num {
				let item = heap.read_instanced_header(header.data + (index * INSTANCED_ITEM_SIZE) as u64)?;
				destroy_instanced(schema, heap, item)?;
			}
			heap.free(header.data);
		}
		_ => {}
	}
	Ok(())
}

/// Release storage owned by every field of a struct value.
pub fn destroy_struct(schema: &Schema, heap: &mut Heap, id: StructId, addr: Address) -> Result<()> {
	let item = schema.struct_def(id).ok_or_else(|| BindError::UnknownStruct { name: format!("#{}", id.0) })?;
	for field in &item.fields {
		let size = schema.element_size(&field.ty) as u64;
		for index in 0..field.array_dim as u64 {
			destroy_value(schema, heap, &field.ty, addr + field.offset as u64 + index * size)?;
		}
	}
	Ok(())
}

/// Read a boolean honoring bitfield storage.
pub fn read_bool(heap: &Heap, storage: BoolStorage, addr: Address) -> Result<bool> {
	let byte = heap.read_u8(addr)?;
	Ok(match storage {
		BoolStorage::Native => byte != 0,
		BoolStorage::Bit(mask) => byte & mask != 0,
	})
}

/// Write a boolean honoring bitfield storage.
pub fn write_bool(heap: &mut Heap, storage: BoolStorage, addr: Address, value: bool) -> Result<()> {
	match storage {
		BoolStorage::Native => heap.write_u8(addr, u8::from(value)),
		BoolStorage::Bit(mask) => {
			let byte = heap.read_u8(addr)?;
			heap.write_u8(addr, if value { byte | mask } else { byte & !mask })
		}
	}
}

/// Read an owned string value.
pub fn read_string(heap: &Heap, addr: Address) -> Result<String> {
	let data = heap.read_u64(addr)?;
	if data == 0 {
		return Ok(String::new());
	}
	let len = heap.allocation_size(data).ok_or(BindError::BadAddress { addr: data, len: 0 })?;
	Ok(String::from_utf8_lossy(heap.bytes(data, len)?).into_owned())
}

/// Replace an owned string value.
pub fn write_string(heap: &mut Heap, addr: Address, text: &str) -> Result<()> {
	let old = heap.read_u64(addr)?;
	let data = if text.is_empty() {
		0
	} else {
		let data = heap.alloc(None, text.len());
		heap.bytes_mut(data, text.len())?.copy_from_slice(text.as_bytes());
		data
	};
	heap.free(old);
	heap.write_u64(addr, data)
}

fn clone_allocation(heap: &mut Heap, data: Address) -> Result<Address> {
	if data == 0 {
		return Ok(0);
	}
	let len = heap.allocation_size(data).ok_or(BindError::BadAddress { addr: data, len: 0 })?;
	let ty = heap.runtime_type(data);
	let copy = heap.alloc(ty, len);
	heap.copy_bytes(data, copy, len)?;
	Ok(copy)
}

fn clone_instanced(schema: &Schema, heap: &mut Heap, header: InstancedHeader) -> Result<InstancedHeader> {
	let Some(ty) = header.ty else {
		return Ok(InstancedHeader::default());
	};
	let memory = heap.alloc_struct(schema, ty)?;
	if header.memory != 0 {
		copy_struct(schema, heap, ty, header.memory, memory)?;
	}
	Ok(InstancedHeader { ty: Some(ty), memory })
}

fn destroy_instanced(schema: &Schema, heap: &mut Heap, header: InstancedHeader) -> Result<()> {
	if let Some(ty) = header.ty
		&& header.memory != 0
	{
		destroy_struct(schema, heap, ty, header.memory)?;
		heap.free(header.memory);
	}
	Ok(())
}
