use std::collections::HashMap;
use std::fmt;

use bitflags::bitflags;

use crate::bind::{BindError, Result};

/// Fields per struct, inherited ones included; bounded by the 16-bit field index.
pub const MAX_FIELDS: usize = u16::MAX as usize + 1;

/// Index of a struct or class declared in a [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructId(pub u32);

/// Index of an enum declared in a [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnumId(pub u32);

/// Stable 128-bit identifier used for bindable struct ids and property GUIDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Guid(pub u128);

impl Guid {
	/// The all-zero identifier.
	pub const NIL: Guid = Guid(0);

	/// Return whether this is the all-zero identifier.
	pub fn is_nil(self) -> bool {
		self.0 == 0
	}

	/// Parse up to 32 hex digits, ignoring `-` separators.
	pub fn parse_hex(text: &str) -> Option<Self> {
		let digits: String = text.chars().filter(|c| *c != '-').collect();
		if digits.is_empty() || digits.len() > 32 {
			return None;
		}
		u128::from_str_radix(&digits, 16).ok().map(Guid)
	}
}

impl fmt::Display for Guid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:032x}", self.0)
	}
}

/// Scalar storage kinds that take part in numeric promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
	/// One-byte boolean.
	Bool,
	/// Unsigned 8-bit integer.
	Byte,
	/// Signed 32-bit integer.
	Int32,
	/// Unsigned 32-bit integer.
	UInt32,
	/// Signed 64-bit integer.
	Int64,
	/// 32-bit float.
	Float,
	/// 64-bit float.
	Double,
}

impl NumericKind {
	/// Storage size in bytes.
	pub fn size(self) -> usize {
		match self {
			Self::Bool | Self::Byte => 1,
			Self::Int32 | Self::UInt32 | Self::Float => 4,
			Self::Int64 | Self::Double => 8,
		}
	}

	/// Stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Bool => "bool",
			Self::Byte => "byte",
			Self::Int32 => "int32",
			Self::UInt32 => "uint32",
			Self::Int64 => "int64",
			Self::Float => "float",
			Self::Double => "double",
		}
	}

	fn field_type(self) -> FieldType {
		match self {
			Self::Bool => FieldType::Bool(BoolStorage::Native),
			Self::Byte => FieldType::Byte,
			Self::Int32 => FieldType::Int32,
			Self::UInt32 => FieldType::UInt32,
			Self::Int64 => FieldType::Int64,
			Self::Float => FieldType::Float,
			Self::Double => FieldType::Double,
		}
	}
}

/// How a boolean field is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolStorage {
	/// Whole byte, zero or one.
	Native,
	/// One bit of a shared byte, selected by mask.
	Bit(u8),
}

/// Declared type of a struct field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
	/// Boolean value.
	Bool(BoolStorage),
	/// Unsigned 8-bit integer.
	Byte,
	/// Signed 32-bit integer.
	Int32,
	/// Unsigned 32-bit integer.
	UInt32,
	/// Signed 64-bit integer.
	Int64,
	/// 32-bit float.
	Float,
	/// 64-bit float.
	Double,
	/// Enum stored as its underlying integer kind.
	Enum {
		/// Enum identity.
		id: EnumId,
		/// Underlying storage.
		underlying: NumericKind,
	},
	/// Interned name id.
	Name,
	/// Owned UTF-8 string.
	String,
	/// Inline struct value.
	Struct(StructId),
	/// Hard reference to an object of the given class or a subclass.
	Object(StructId),
	/// Weak reference to an object of the given class or a subclass.
	WeakObject(StructId),
	/// Soft reference (address plus path name) to an object of the given class.
	SoftObject(StructId),
	/// Dynamic array of the inner type.
	Array(Box<FieldType>),
	/// Map of plain keys to plain values, stored as packed pairs.
	Map {
		/// Key type.
		key: Box<FieldType>,
		/// Value type.
		value: Box<FieldType>,
	},
	/// Owned struct value whose type is chosen at runtime.
	InstancedStruct {
		/// Optional base struct the payload must derive from.
		base: Option<StructId>,
	},
	/// Shared struct value whose type is chosen at runtime.
	SharedStruct {
		/// Optional base struct the payload must derive from.
		base: Option<StructId>,
	},
	/// Dynamic array of instanced struct values.
	InstancedStructContainer,
}

impl FieldType {
	/// Native boolean shorthand.
	pub fn bool() -> Self {
		Self::Bool(BoolStorage::Native)
	}

	/// Dynamic array shorthand.
	pub fn array(inner: FieldType) -> Self {
		Self::Array(Box::new(inner))
	}

	/// Scalar numeric kind, substituting the underlying kind for enums.
	pub fn numeric_kind(&self) -> Option<NumericKind> {
		match self {
			Self::Bool(_) => Some(NumericKind::Bool),
			Self::Byte => Some(NumericKind::Byte),
			Self::Int32 => Some(NumericKind::Int32),
			Self::UInt32 => Some(NumericKind::UInt32),
			Self::Int64 => Some(NumericKind::Int64),
			Self::Float => Some(NumericKind::Float),
			Self::Double => Some(NumericKind::Double),
			Self::Enum { underlying, .. } => Some(*underlying),
			_ => None,
		}
	}

	/// Replace an enum type by its underlying scalar type.
	pub fn without_enum(&self) -> FieldType {
		match self {
			Self::Enum { underlying, .. } => underlying.field_type(),
			other => other.clone(),
		}
	}

	/// Referenced class for object-like fields.
	pub fn object_class(&self) -> Option<StructId> {
		match self {
			Self::Object(class) | Self::WeakObject(class) | Self::SoftObject(class) => Some(*class),
			_ => None,
		}
	}

	/// Render a short human-readable type label.
	pub fn describe(&self, schema: &Schema) -> String {
		match self {
			Self::Bool(BoolStorage::Native) => "bool".to_owned(),
			Self::Bool(BoolStorage::Bit(_)) => "bool:1".to_owned(),
			Self::Byte => "byte".to_owned(),
			Self::Int32 => "int32".to_owned(),
			Self::UInt32 => "uint32".to_owned(),
			Self::Int64 => "int64".to_owned(),
			Self::Float => "float".to_owned(),
			Self::Double => "double".to_owned(),
			Self::Enum { id, .. } => format!("enum {}", schema.enum_def(*id).map(|item| item.name.as_ref()).unwrap_or("<unknown>")),
			Self::Name => "name".to_owned(),
			Self::String => "string".to_owned(),
			Self::Struct(id) => format!("struct {}", schema.struct_name(*id)),
			Self::Object(id) => format!("object<{}>", schema.struct_name(*id)),
			Self::WeakObject(id) => format!("weak<{}>", schema.struct_name(*id)),
			Self::SoftObject(id) => format!("soft<{}>", schema.struct_name(*id)),
			Self::Array(inner) => format!("array<{}>", inner.describe(schema)),
			Self::Map { key, value } => format!("map<{}, {}>", key.describe(schema), value.describe(schema)),
			Self::InstancedStruct { .. } => "instanced struct".to_owned(),
			Self::SharedStruct { .. } => "shared struct".to_owned(),
			Self::InstancedStructContainer => "instanced struct container".to_owned(),
		}
	}
}

bitflags! {
	/// Per-field behavior flags.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct FieldFlags: u8 {
		/// Dynamic array whose length is owned by the holder; copies never resize it.
		const FIXED_SIZE = 1 << 0;
		/// Object reference that owns a per-holder instance.
		const INSTANCED = 1 << 1;
	}
}

/// Kind of a declared struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructKind {
	/// Value struct, may be embedded inline.
	Struct,
	/// Object class, only reachable through references.
	Class,
}

/// One declared struct or class.
#[derive(Debug, Clone)]
pub struct StructDef {
	/// Type name.
	pub name: Box<str>,
	/// Struct or class.
	pub kind: StructKind,
	/// Parent type for `is_child_of` queries.
	pub super_struct: Option<StructId>,
	/// Size in bytes of one value.
	pub size: usize,
	/// Alignment in bytes.
	pub align: usize,
	/// Fields in layout order, inherited fields first.
	pub fields: Vec<FieldDef>,
	/// Script-defined type whose fields carry GUIDs.
	pub dynamic: bool,
	/// Whether a layout has been provided.
	pub defined: bool,
}

/// One field declaration with computed layout.
#[derive(Debug, Clone)]
pub struct FieldDef {
	/// Field name.
	pub name: Box<str>,
	/// Declared type.
	pub ty: FieldType,
	/// Byte offset inside the owning struct.
	pub offset: usize,
	/// Static array dimension, 1 for scalars.
	pub array_dim: usize,
	/// Stable property id on dynamic structs.
	pub guid: Option<Guid>,
	/// Behavior flags.
	pub flags: FieldFlags,
}

/// Reference to a field, or to the element of an indexed array field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldRef {
	/// Struct the field was looked up on.
	pub owner: StructId,
	/// Field position in the owner's field list.
	pub index: u16,
	/// Refers to one element rather than the whole field.
	pub element: bool,
}

impl FieldRef {
	/// Same field, narrowed to one element.
	pub fn element(self) -> Self {
		Self { element: true, ..self }
	}
}

/// One declared enum.
#[derive(Debug, Clone)]
pub struct EnumDef {
	/// Enum name.
	pub name: Box<str>,
	/// Underlying integer storage.
	pub underlying: NumericKind,
	/// Variant names and values.
	pub variants: Vec<(Box<str>, i64)>,
}

/// Size and alignment of one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
	/// Size in bytes.
	pub size: usize,
	/// Alignment in bytes.
	pub align: usize,
}

impl Layout {
	const fn new(size: usize, align: usize) -> Self {
		Self { size, align }
	}
}

/// Reflection tables describing every bindable type.
#[derive(Debug, Default, Clone)]
pub struct Schema {
	structs: Vec<StructDef>,
	enums: Vec<EnumDef>,
	by_name: HashMap<Box<str>, StructId>,
}

impl Schema {
	/// Create an empty schema.
	pub fn new() -> Self {
		Self::default()
	}

	/// Reserve a class id so reference fields can name it before it is defined.
	pub fn declare_class(&mut self, name: &str) -> StructId {
		if let Some(id) = self.by_name.get(name) {
			return *id;
		}

		let id = StructId(self.structs.len() as u32);
		self.structs.push(StructDef {
			name: name.into(),
			kind: StructKind::Class,
			super_struct: None,
			size: 0,
			align: 1,
			fields: Vec::new(),
			dynamic: false,
			defined: false,
		});
		self.by_name.insert(name.into(), id);
		id
	}

	/// Lay out and register a struct, filling a forward declaration of the same name.
	pub fn add_struct(&mut self, builder: StructBuilder) -> Result<StructId> {
		let existing = self.by_name.get(builder.name.as_ref()).copied();
		if let Some(id) = existing {
			let item = &self.structs[id.0 as usize];
			if item.defined || item.kind != builder.kind {
				return Err(BindError::DuplicateStruct {
					name: builder.name.into_string(),
				});
			}
		}

		let def = self.layout_struct(builder)?;
		match existing {
			Some(id) => {
				self.structs[id.0 as usize] = def;
				Ok(id)
			}
			None => {
				let id = StructId(self.structs.len() as u32);
				self.by_name.insert(def.name.clone(), id);
				self.structs.push(def);
				Ok(id)
			}
		}
	}

	/// Register an enum.
	pub fn add_enum(&mut self, name: &str, underlying: NumericKind, variants: &[(&str, i64)]) -> Result<EnumId> {
		if matches!(underlying, NumericKind::Bool | NumericKind::Float | NumericKind::Double) {
			return Err(BindError::InvalidFieldType {
				struct_name: name.to_owned(),
				field: "<underlying>".to_owned(),
				reason: "enum storage must be an integer kind",
			});
		}

		let id = EnumId(self.enums.len() as u32);
		self.enums.push(EnumDef {
			name: name.into(),
			underlying,
			variants: variants.iter().map(|(label, value)| (Box::<str>::from(*label), *value)).collect(),
		});
		Ok(id)
	}

	/// Enum type shorthand for field declarations.
	pub fn enum_type(&self, id: EnumId) -> Option<FieldType> {
		self.enum_def(id).map(|item| FieldType::Enum {
			id,
			underlying: item.underlying,
		})
	}

	/// Look up a struct by id.
	pub fn struct_def(&self, id: StructId) -> Option<&StructDef> {
		self.structs.get(id.0 as usize)
	}

	/// Look up a struct id by name.
	pub fn struct_by_name(&self, name: &str) -> Option<StructId> {
		self.by_name.get(name).copied()
	}

	/// Return a struct name, or a placeholder for unknown ids.
	pub fn struct_name(&self, id: StructId) -> &str {
		self.struct_def(id).map(|item| item.name.as_ref()).unwrap_or("<unknown>")
	}

	/// Look up an enum by id.
	pub fn enum_def(&self, id: EnumId) -> Option<&EnumDef> {
		self.enums.get(id.0 as usize)
	}

	/// Number of declared structs and classes.
	pub fn len(&self) -> usize {
		self.structs.len()
	}

	/// Return whether `child` is `parent` or derives from it.
	pub fn is_child_of(&self, child: StructId, parent: StructId) -> bool {
		let mut current = Some(child);
		while let Some(id) = current {
			if id == parent {
				return true;
			}
			current = self.struct_def(id).and_then(|item| item.super_struct);
		}
		false
	}

	/// Find a field by name.
	pub fn find_field(&self, owner: StructId, name: &str) -> Option<FieldRef> {
		let item = self.struct_def(owner)?;
		let index = item.fields.iter().position(|field| field.name.as_ref() == name)?;
		Some(FieldRef {
			owner,
			index: u16::try_from(index).ok()?,
			element: false,
		})
	}

	/// Find a field by property GUID.
	pub fn find_field_by_guid(&self, owner: StructId, guid: Guid) -> Option<FieldRef> {
		let item = self.struct_def(owner)?;
		let index = item.fields.iter().position(|field| field.guid == Some(guid))?;
		Some(FieldRef {
			owner,
			index: u16::try_from(index).ok()?,
			element: false,
		})
	}

	/// Return the declaration behind a field reference.
	pub fn field(&self, field: FieldRef) -> Option<&FieldDef> {
		self.struct_def(field.owner)?.fields.get(usize::from(field.index))
	}

	/// Type of the value a field reference designates.
	pub fn leaf_type(&self, field: FieldRef) -> Option<&FieldType> {
		let def = self.field(field)?;
		match (&def.ty, field.element) {
			(FieldType::Array(inner), true) => Some(inner),
			(ty, _) => Some(ty),
		}
	}

	/// Static dimension of the value a field reference designates.
	pub fn leaf_array_dim(&self, field: FieldRef) -> usize {
		match self.field(field) {
			Some(def) if !field.element => def.array_dim,
			_ => 1,
		}
	}

	/// Size and alignment of one value of `ty`.
	pub fn layout(&self, ty: &FieldType) -> Result<Layout> {
		Ok(match ty {
			FieldType::Bool(_) | FieldType::Byte => Layout::new(1, 1),
			FieldType::Int32 | FieldType::UInt32 | FieldType::Float | FieldType::Name => Layout::new(4, 4),
			FieldType::Int64 | FieldType::Double => Layout::new(8, 8),
			FieldType::String | FieldType::Object(_) | FieldType::WeakObject(_) | FieldType::SharedStruct { .. } | FieldType::Map { .. } => {
				Layout::new(8, 8)
			}
			FieldType::Enum { underlying, .. } => Layout::new(underlying.size(), underlying.size()),
			FieldType::SoftObject(_) | FieldType::Array(_) | FieldType::InstancedStruct { .. } | FieldType::InstancedStructContainer => {
				Layout::new(16, 8)
			}
			FieldType::Struct(id) => {
				let item = self.struct_def(*id).ok_or_else(|| BindError::UnknownStruct { name: format!("#{}", id.0) })?;
				if !item.defined {
					return Err(BindError::UndefinedStruct {
						name: item.name.to_string(),
					});
				}
				Layout::new(item.size, item.align)
			}
		})
	}

	/// Size of one value of `ty`, zero when the type is unknown.
	pub fn element_size(&self, ty: &FieldType) -> usize {
		self.layout(ty).map(|layout| layout.size).unwrap_or(0)
	}

	/// Return whether values of `ty` can be copied bytewise.
	pub fn is_plain(&self, ty: &FieldType) -> bool {
		match ty {
			FieldType::Bool(_)
			| FieldType::Byte
			| FieldType::Int32
			| FieldType::UInt32
			| FieldType::Int64
			| FieldType::Float
			| FieldType::Double
			| FieldType::Enum { .. }
			| FieldType::Name
			| FieldType::Object(_)
			| FieldType::WeakObject(_) => true,
			FieldType::Struct(id) => self
				.struct_def(*id)
				.is_some_and(|item| item.fields.iter().all(|field| self.is_plain(&field.ty))),
			_ => false,
		}
	}

	/// Rename a field in place, as an asset edit would.
	pub fn rename_field(&mut self, owner: StructId, old: &str, new: &str) -> Result<()> {
		let item = self
			.structs
			.get_mut(owner.0 as usize)
			.ok_or_else(|| BindError::UnknownStruct { name: format!("#{}", owner.0) })?;
		if item.fields.iter().any(|field| field.name.as_ref() == new) {
			return Err(BindError::DuplicateField {
				struct_name: item.name.to_string(),
				field: new.to_owned(),
			});
		}
		let field = item
			.fields
			.iter_mut()
			.find(|field| field.name.as_ref() == old)
			.ok_or_else(|| BindError::Resolve {
				path: old.to_owned(),
				reason: format!("could not find property {old} on {}", item.name),
			})?;
		field.name = new.into();
		Ok(())
	}

	fn layout_struct(&self, builder: StructBuilder) -> Result<StructDef> {
		let StructBuilder {
			name,
			kind,
			super_struct,
			dynamic,
			fields: pending,
		} = builder;

		let (mut fields, mut offset, mut align) = match super_struct {
			Some(parent) => {
				let item = self.struct_def(parent).ok_or_else(|| BindError::UnknownStruct { name: format!("#{}", parent.0) })?;
				if !item.defined {
					return Err(BindError::UndefinedStruct {
						name: item.name.to_string(),
					});
				}
				if item.kind != kind {
					return Err(BindError::InvalidFieldType {
						struct_name: name.to_string(),
						field: "<super>".to_owned(),
						reason: "structs and classes cannot inherit from each other",
					});
				}
				(item.fields.clone(), item.size, item.align)
			}
			None => (Vec::new(), 0, 1),
		};

		if fields.len() + pending.len() > MAX_FIELDS {
			return Err(BindError::InvalidFieldType {
				struct_name: name.to_string(),
				field: "<fields>".to_owned(),
				reason: "more fields than a 16-bit field index can address",
			});
		}

		let mut bit_slot: Option<(usize, u8)> = None;
		for field in pending {
			if fields.iter().any(|existing| existing.name == field.name) {
				return Err(BindError::DuplicateField {
					struct_name: name.to_string(),
					field: field.name.to_string(),
				});
			}
			self.validate_field(&name, &field)?;

			if let FieldType::Bool(BoolStorage::Bit(_)) = field.ty {
				let (at, mask) = match bit_slot {
					Some((at, mask)) => (at, mask),
					None => {
						let at = offset;
						offset += 1;
						(at, 1)
					}
				};
				bit_slot = mask.checked_shl(1).filter(|next| *next != 0).map(|next| (at, next));
				fields.push(FieldDef {
					name: field.name,
					ty: FieldType::Bool(BoolStorage::Bit(mask)),
					offset: at,
					array_dim: 1,
					guid: field.guid,
					flags: field.flags,
				});
				continue;
			}
			bit_slot = None;

			let layout = self.layout(&field.ty)?;
			offset = align_up(offset, layout.align);
			align = align.max(layout.align);
			fields.push(FieldDef {
				name: field.name,
				ty: field.ty,
				offset,
				array_dim: field.array_dim,
				guid: field.guid,
				flags: field.flags,
			});
			offset += layout.size * field.array_dim;
		}

		Ok(StructDef {
			name,
			kind,
			super_struct,
			size: align_up(offset, align),
			align,
			fields,
			dynamic,
			defined: true,
		})
	}

	fn validate_field(&self, struct_name: &str, field: &PendingField) -> Result<()> {
		let reject = |reason: &'static str| BindError::InvalidFieldType {
			struct_name: struct_name.to_owned(),
			field: field.name.to_string(),
			reason,
		};

		if field.array_dim == 0 {
			return Err(reject("static array dimension must be at least 1"));
		}
		if field.array_dim > 1
			&& matches!(
				field.ty,
				FieldType::Array(_) | FieldType::Map { .. } | FieldType::InstancedStructContainer | FieldType::Bool(BoolStorage::Bit(_))
			) {
			return Err(reject("container and bitfield fields cannot be static arrays"));
		}
		if field.flags.contains(FieldFlags::FIXED_SIZE) && !matches!(field.ty, FieldType::Array(_)) {
			return Err(reject("only dynamic arrays can be fixed size"));
		}
		self.validate_type(&field.ty).map_err(reject)
	}

	fn validate_type(&self, ty: &FieldType) -> std::result::Result<(), &'static str> {
		match ty {
			FieldType::Struct(id) => match self.struct_def(*id) {
				Some(item) if item.kind == StructKind::Struct && item.defined => Ok(()),
				Some(item) if item.kind == StructKind::Class => Err("classes cannot be embedded by value"),
				_ => Err("struct type is unknown or undefined"),
			},
			FieldType::Object(id) | FieldType::WeakObject(id) | FieldType::SoftObject(id) => match self.struct_def(*id) {
				Some(item) if item.kind == StructKind::Class => Ok(()),
				_ => Err("object references must name a class"),
			},
			FieldType::Enum { id, .. } => match self.enum_def(*id) {
				Some(_) => Ok(()),
				None => Err("enum type is unknown"),
			},
			FieldType::Array(inner) => match inner.as_ref() {
				FieldType::Array(_) | FieldType::Map { .. } | FieldType::InstancedStructContainer => Err("nested containers are not supported"),
				FieldType::Bool(BoolStorage::Bit(_)) => Err("bitfields cannot be array elements"),
				other => self.validate_type(other),
			},
			FieldType::Map { key, value } => {
				if self.is_plain(key) && self.is_plain(value) && !matches!(**key, FieldType::Bool(BoolStorage::Bit(_))) {
					Ok(())
				} else {
					Err("map keys and values must be plain")
				}
			}
			FieldType::InstancedStruct { base: Some(id) } | FieldType::SharedStruct { base: Some(id) } => match self.struct_def(*id) {
				Some(item) if item.kind == StructKind::Struct => Ok(()),
				_ => Err("instanced base must be a struct"),
			},
			_ => Ok(()),
		}
	}
}

fn align_up(value: usize, align: usize) -> usize {
	let align = align.max(1);
	value.div_ceil(align) * align
}

#[derive(Debug, Clone)]
struct PendingField {
	name: Box<str>,
	ty: FieldType,
	array_dim: usize,
	guid: Option<Guid>,
	flags: FieldFlags,
}

/// Incremental struct declaration consumed by [`Schema::add_struct`].
#[derive(Debug, Clone)]
pub struct StructBuilder {
	name: Box<str>,
	kind: StructKind,
	super_struct: Option<StructId>,
	dynamic: bool,
	fields: Vec<PendingField>,
}

impl StructBuilder {
	/// Start a value struct declaration.
	pub fn new(name: &str) -> Self {
		Self {
			name: name.into(),
			kind: StructKind::Struct,
			super_struct: None,
			dynamic: false,
			fields: Vec::new(),
		}
	}

	/// Start a class declaration.
	pub fn class(name: &str) -> Self {
		Self {
			kind: StructKind::Class,
			..Self::new(name)
		}
	}

	/// Inherit fields and layout from `parent`.
	pub fn extends(mut self, parent: StructId) -> Self {
		self.super_struct = Some(parent);
		self
	}

	/// Mark as a script-defined type whose fields are identified by GUID.
	pub fn dynamic(mut self) -> Self {
		self.dynamic = true;
		self
	}

	/// Append a field.
	pub fn field(self, name: &str, ty: FieldType) -> Self {
		self.static_array(name, ty, 1)
	}

	/// Append a static array field.
	pub fn static_array(mut self, name: &str, ty: FieldType, array_dim: usize) -> Self {
		self.fields.push(PendingField {
			name: name.into(),
			ty,
			array_dim,
			guid: None,
			flags: FieldFlags::empty(),
		});
		self
	}

	/// Append a bitfield boolean, packed with adjacent bitfields.
	pub fn bitfield(self, name: &str) -> Self {
		self.field(name, FieldType::Bool(BoolStorage::Bit(0)))
	}

	/// Attach a property GUID to the last field.
	pub fn with_guid(mut self, guid: Guid) -> Self {
		if let Some(field) = self.fields.last_mut() {
			field.guid = Some(guid);
		}
		self
	}

	/// Attach flags to the last field.
	pub fn with_flags(mut self, flags: FieldFlags) -> Self {
		if let Some(field) = self.fields.last_mut() {
			field.flags |= flags;
		}
		self
	}
}
