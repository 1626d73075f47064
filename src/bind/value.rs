use crate::bind::ops::{INSTANCED_ITEM_SIZE, destroy_value, read_bool, read_string, write_bool, write_string};
use crate::bind::{Address, ArrayHeader, BindError, FieldType, Heap, InstancedHeader, NumericKind, Result, Schema, StructId};

/// Decoded value tree read from, or written to, a [`Heap`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Null,
	Bool(bool),
	I64(i64),
	U64(u64),
	F32(f32),
	F64(f64),
	String(Box<str>),
	Ptr(u64),
	Array(Vec<Value>),
	Map(Vec<(Value, Value)>),
	Struct(StructValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
	pub type_name: Box<str>,
	pub fields: Vec<FieldValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
	pub name: Box<str>,
	pub value: Value,
}

impl StructValue {
	/// Field value by name.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.fields.iter().find(|item| item.name.as_ref() == name).map(|item| &item.value)
	}
}

impl Value {
	/// Stable kind label used in mismatch errors.
	pub fn kind(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Bool(_) => "bool",
			Value::I64(_) => "i64",
			Value::U64(_) => "u64",
			Value::F32(_) => "f32",
			Value::F64(_) => "f64",
			Value::String(_) => "string",
			Value::Ptr(_) => "ptr",
			Value::Array(_) => "array",
			Value::Map(_) => "map",
			Value::Struct(_) => "struct",
		}
	}

	fn as_i64(&self) -> Option<i64> {
		match self {
			Value::Bool(value) => Some(i64::from(*value)),
			Value::I64(value) => Some(*value),
			Value::U64(value) => Some(*value as i64),
			Value::F32(value) => Some(*value as i64),
			Value::F64(value) => Some(*value as i64),
			_ => None,
		}
	}

	fn as_f64(&self) -> Option<f64> {
		match self {
			Value::Bool(value) => Some(f64::from(u8::from(*value))),
			Value::I64(value) => Some(*value as f64),
			Value::U64(value) => Some(*value as f64),
			Value::F32(value) => Some(f64::from(*value)),
			Value::F64(value) => Some(*value),
			_ => None,
		}
	}
}

/// Read a whole struct value.
pub fn read_struct(schema: &Schema, heap: &Heap, id: StructId, addr: Address) -> Result<StructValue> {
	let item = schema.struct_def(id).ok_or_else(|| BindError::UnknownStruct { name: format!("#{}", id.0) })?;
	let mut fields = Vec::with_capacity(item.fields.len());
	for field in &item.fields {
		let at = addr + field.offset as u64;
		let value = if field.array_dim > 1 {
			let size = schema.element_size(&field.ty) as u64;
			let mut items = Vec::with_capacity(field.array_dim);
			for index in 0..field.array_dim as u64 {
				items.push(read_value(schema, heap, &field.ty, at + index * size)?);
			}
			Value::Array(items)
		} else {
			read_value(schema, heap, &field.ty, at)?
		};
		fields.push(FieldValue {
			name: field.name.clone(),
			value,
		});
	}
	Ok(StructValue {
		type_name: item.name.clone(),
		fields,
	})
}

/// Read one value of `ty` at `addr`.
pub fn read_value(schema: &Schema, heap: &Heap, ty: &FieldType, addr: Address) -> Result<Value> {
	Ok(match ty {
		FieldType::Bool(storage) => Value::Bool(read_bool(heap, *storage, addr)?),
		FieldType::Byte => Value::U64(u64::from(heap.read_u8(addr)?)),
		FieldType::Int32 => Value::I64(i64::from(heap.read_i32(addr)?)),
		FieldType::UInt32 => Value::U64(u64::from(heap.read_u32(addr)?)),
		FieldType::Int64 => Value::I64(heap.read_i64(addr)?),
		FieldType::Float => Value::F32(heap.read_f32(addr)?),
		FieldType::Double => Value::F64(heap.read_f64(addr)?),
		FieldType::Enum { underlying, .. } => read_numeric(heap, *underlying, addr)?,
		FieldType::Name => Value::String(heap.name(heap.read_u32(addr)?).unwrap_or_default().into()),
		FieldType::String => Value::String(read_string(heap, addr)?.into()),
		FieldType::Struct(id) => Value::Struct(read_struct(schema, heap, *id, addr)?),
		FieldType::Object(_) | FieldType::WeakObject(_) | FieldType::SoftObject(_) | FieldType::SharedStruct { .. } => match heap.read_u64(addr)? {
			0 => Value::Null,
			ptr => Value::Ptr(ptr),
		},
		FieldType::Array(inner) => {
			let header = heap.read_array_header(addr)?;
			let size = schema.element_size(inner) as u64;
			let mut items = Vec::with_capacity(header.num);
			for index in 0..header.num as u64 {
				items.push(read_value(schema, heap, inner, header.data + index * size)?);
			}
			Value::Array(items)
		}
		FieldType::Map { key, value } => {
			let data = heap.read_u64(addr)?;
			let key_size = schema.element_size(key);
			let pair_size = key_size + schema.element_size(value);
			let len = if data == 0 { 0 } else { heap.allocation_size(data).unwrap_or(0) };
			let mut pairs = Vec::new();
			for index in 0..len.checked_div(pair_size).unwrap_or(0) {
				let at = data + (index * pair_size) as u64;
				pairs.push((read_value(schema, heap, key, at)?, read_value(schema, heap, value, at + key_size as u64)?));
			}
			Value::Map(pairs)
		}
		FieldType::InstancedStruct { .. } => read_instanced(schema, heap, heap.read_instanced_header(addr)?)?,
		FieldType::InstancedStructContainer => {
			let header = heap.read_array_header(addr)?;
			let mut items = Vec::with_capacity(header.num);
			for index in 0..header.num {
				let item = heap.read_instanced_header(header.data + (index * INSTANCED_ITEM_SIZE) as u64)?;
				items.push(read_instanced(schema, heap, item)?);
			}
			Value::Array(items)
		}
	})
}

/// Write every field present in `value` onto the struct at `addr`; absent fields keep their contents.
pub fn write_struct(schema: &Schema, heap: &mut Heap, id: StructId, addr: Address, value: &StructValue) -> Result<()> {
	let item = schema.struct_def(id).ok_or_else(|| BindError::UnknownStruct { name: format!("#{}", id.0) })?;
	for field_value in &value.fields {
		let Some(field) = item.fields.iter().find(|field| field.name == field_value.name) else {
			return Err(BindError::ValueMismatch {
				expected: format!("field of {}", item.name),
				got: field_value.name.to_string(),
			});
		};
		let at = addr + field.offset as u64;
		match (&field_value.value, field.array_dim) {
			(Value::Array(items), dim) if dim > 1 => {
				if items.len() > dim {
					return Err(BindError::ValueMismatch {
						expected: format!("at most {dim} elements for {}", field.name),
						got: items.len().to_string(),
					});
				}
				let size = schema.element_size(&field.ty) as u64;
				for (index, item) in items.iter().enumerate() {
					write_value(schema, heap, &field.ty, at + index as u64 * size, item)?;
				}
			}
			(item, _) => write_value(schema, heap, &field.ty, at, item)?,
		}
	}
	Ok(())
}

/// Write one value of `ty` at `addr`, replacing owned storage.
pub fn write_value(schema: &Schema, heap: &mut Heap, ty: &FieldType, addr: Address, value: &Value) -> Result<()> {
	let mismatch = || BindError::ValueMismatch {
		expected: ty.describe(schema),
		got: value.kind().to_owned(),
	};

	match ty {
		FieldType::Bool(storage) => match value {
			Value::Bool(flag) => write_bool(heap, *storage, addr, *flag),
			other => write_bool(heap, *storage, addr, other.as_i64().ok_or_else(mismatch)? != 0),
		},
		FieldType::Byte => heap.write_u8(addr, value.as_i64().ok_or_else(mismatch)? as u8),
		FieldType::Int32 => heap.write_i32(addr, value.as_i64().ok_or_else(mismatch)? as i32),
		FieldType::UInt32 => heap.write_u32(addr, value.as_i64().ok_or_else(mismatch)? as u32),
		FieldType::Int64 => heap.write_i64(addr, value.as_i64().ok_or_else(mismatch)?),
		FieldType::Float => heap.write_f32(addr, value.as_f64().ok_or_else(mismatch)? as f32),
		FieldType::Double => heap.write_f64(addr, value.as_f64().ok_or_else(mismatch)?),
		FieldType::Enum { id, underlying } => {
			let raw = match value {
				Value::String(label) => schema
					.enum_def(*id)
					.and_then(|item| item.variants.iter().find(|(name, _)| name == label))
					.map(|(_, raw)| *raw)
					.ok_or_else(mismatch)?,
				other => other.as_i64().ok_or_else(mismatch)?,
			};
			write_numeric(heap, *underlying, addr, raw)
		}
		FieldType::Name => match value {
			Value::String(text) => {
				let id = heap.intern(text);
				heap.write_u32(addr, id)
			}
			Value::Null => heap.write_u32(addr, 0),
			_ => Err(mismatch()),
		},
		FieldType::String => match value {
			Value::String(text) => write_string(heap, addr, text),
			Value::Null => write_string(heap, addr, ""),
			_ => Err(mismatch()),
		},
		FieldType::Struct(id) => match value {
			Value::Struct(item) => write_struct(schema, heap, *id, addr, item),
			_ => Err(mismatch()),
		},
		FieldType::Object(_) | FieldType::WeakObject(_) | FieldType::SoftObject(_) => match value {
			Value::Ptr(ptr) => heap.write_u64(addr, *ptr),
			Value::Null => heap.write_u64(addr, 0),
			_ => Err(mismatch()),
		},
		FieldType::SharedStruct { .. } => match value {
			Value::Ptr(ptr) => heap.write_u64(addr, *ptr),
			Value::Null => heap.write_u64(addr, 0),
			Value::Struct(item) => {
				let ty = struct_by_name(schema, &item.type_name)?;
				let memory = heap.alloc_struct(schema, ty)?;
				write_struct(schema, heap, ty, memory, item)?;
				heap.write_u64(addr, memory)
			}
			_ => Err(mismatch()),
		},
		FieldType::Array(inner) => {
			let Value::Array(items) = value else {
				return Err(mismatch());
			};
			destroy_value(schema, heap, ty, addr)?;
			let size = schema.element_size(inner);
			let data = if items.is_empty() { 0 } else { heap.alloc(None, items.len() * size) };
			heap.write_array_header(
				addr,
				ArrayHeader {
					data,
					num: items.len(),
					max: items.len(),
				},
			)?;
			for (index, item) in items.iter().enumerate() {
				write_value(schema, heap, inner, data + (index * size) as u64, item)?;
			}
			Ok(())
		}
		FieldType::Map { key, value: value_ty } => {
			let Value::Map(pairs) = value else {
				return Err(mismatch());
			};
			destroy_value(schema, heap, ty, addr)?;
			let key_size = schema.element_size(key);
			let pair_size = key_size + schema.element_size(value_ty);
			let data = if pairs.is_empty() { 0 } else { heap.alloc(None, pairs.len() * pair_size) };
			heap.write_u64(addr, data)?;
			for (index, (pair_key, pair_value)) in pairs.iter().enumerate() {
				let at = data + (index * pair_size) as u64;
				write_value(schema, heap, key, at, pair_key)?;
				write_value(schema, heap, value_ty, at + key_size as u64, pair_value)?;
			}
			Ok(())
		}
		FieldType::InstancedStruct { base } => {
			let header = instanced_from_value(schema, heap, *base, value)?;
			destroy_value(schema, heap, ty, addr)?;
			heap.write_instanced_header(addr, header)
		}
		FieldType::InstancedStructContainer => {
			let Value::Array(items) = value else {
				return Err(mismatch());
			};
			let mut headers = Vec::with_capacity(items.len());
			for item in items {
				headers.push(instanced_from_value(schema, heap, None, item)?);
			}
			destroy_value(schema, heap, ty, addr)?;
			let data = if headers.is_empty() { 0 } else { heap.alloc(None, headers.len() * INSTANCED_ITEM_SIZE) };
			for (index, header) in headers.iter().enumerate() {
				heap.write_instanced_header(data + (index * INSTANCED_ITEM_SIZE) as u64, *header)?;
			}
			heap.write_array_header(
				addr,
				ArrayHeader {
					data,
					num: headers.len(),
					max: headers.len(),
				},
			)
		}
	}
}

fn read_numeric(heap: &Heap, kind: NumericKind, addr: Address) -> Result<Value> {
	Ok(match kind {
		NumericKind::Bool => Value::Bool(heap.read_u8(addr)? != 0),
		NumericKind::Byte => Value::U64(u64::from(heap.read_u8(addr)?)),
		NumericKind::Int32 => Value::I64(i64::from(heap.read_i32(addr)?)),
		NumericKind::UInt32 => Value::U64(u64::from(heap.read_u32(addr)?)),
		NumericKind::Int64 => Value::I64(heap.read_i64(addr)?),
		NumericKind::Float => Value::F32(heap.read_f32(addr)?),
		NumericKind::Double => Value::F64(heap.read_f64(addr)?),
	})
}

fn write_numeric(heap: &mut Heap, kind: NumericKind, addr: Address, raw: i64) -> Result<()> {
	match kind {
		NumericKind::Bool => heap.write_u8(addr, u8::from(raw != 0)),
		NumericKind::Byte => heap.write_u8(addr, raw as u8),
		NumericKind::Int32 => heap.write_i32(addr, raw as i32),
		NumericKind::UInt32 => heap.write_u32(addr, raw as u32),
		NumericKind::Int64 => heap.write_i64(addr, raw),
		NumericKind::Float => heap.write_f32(addr, raw as f32),
		NumericKind::Double => heap.write_f64(addr, raw as f64),
	}
}

fn read_instanced(schema: &Schema, heap: &Heap, header: InstancedHeader) -> Result<Value> {
	match header.ty {
		Some(ty) if header.memory != 0 => Ok(Value::Struct(read_struct(schema, heap, ty, header.memory)?)),
		_ => Ok(Value::Null),
	}
}

fn instanced_from_value(schema: &Schema, heap: &mut Heap, base: Option<StructId>, value: &Value) -> Result<InstancedHeader> {
	match value {
		Value::Null => Ok(InstancedHeader::default()),
		Value::Struct(item) => {
			let ty = struct_by_name(schema, &item.type_name)?;
			if let Some(base) = base
				&& !schema.is_child_of(ty, base)
			{
				return Err(BindError::ValueMismatch {
					expected: format!("struct derived from {}", schema.struct_name(base)),
					got: item.type_name.to_string(),
				});
			}
			let memory = heap.alloc_struct(schema, ty)?;
			write_struct(schema, heap, ty, memory, item)?;
			Ok(InstancedHeader { ty: Some(ty), memory })
		}
		other => Err(BindError::ValueMismatch {
			expected: "instanced struct".to_owned(),
			got: other.kind().to_owned(),
		}),
	}
}

fn struct_by_name(schema: &Schema, name: &str) -> Result<StructId> {
	schema.struct_by_name(name).ok_or_else(|| BindError::UnknownStruct { name: name.to_owned() })
}
