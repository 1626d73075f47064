use crate::bind::{BindError, FieldFlags, FieldRef, FieldType, LeafIndirection, NumericKind, Result, Schema, StructId};

/// Copy strategy chosen for one resolved binding.
///
/// Every variant has exactly one implementation in the executor; adding a
/// variant is a compile error until both the resolver and the executor handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub enum CopyType {
	/// Unresolved binding; copies are no-ops.
	#[default]
	None,
	/// Bytewise copy of `copy_size` bytes.
	CopyPlain,
	/// Deep copy through the field type's own copy semantics.
	CopyComplex,
	/// Boolean copy honoring bitfield storage on either side.
	CopyBool,
	/// Struct value copy.
	CopyStruct,
	/// Object reference copy; a missing source writes null.
	CopyObject,
	/// Interned name copy.
	CopyName,
	/// Elementwise copy into a dynamic array whose length the target owns.
	CopyFixedArray,
	/// Non-owning copy into a struct reference wrapper through the registered hooks.
	StructReference,
	PromoteBoolToByte,
	PromoteBoolToInt32,
	PromoteBoolToUInt32,
	PromoteBoolToInt64,
	PromoteBoolToFloat,
	PromoteBoolToDouble,
	PromoteByteToInt32,
	PromoteByteToUInt32,
	PromoteByteToInt64,
	PromoteByteToFloat,
	PromoteByteToDouble,
	PromoteInt32ToInt64,
	PromoteInt32ToFloat,
	PromoteInt32ToDouble,
	PromoteUInt32ToInt64,
	PromoteUInt32ToFloat,
	PromoteUInt32ToDouble,
	PromoteFloatToInt32,
	PromoteFloatToInt64,
	PromoteFloatToDouble,
	DemoteDoubleToInt32,
	DemoteDoubleToInt64,
	DemoteDoubleToFloat,
}

impl CopyType {
	/// Stable label for diagnostics and JSON output.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::CopyPlain => "copy_plain",
			Self::CopyComplex => "copy_complex",
			Self::CopyBool => "copy_bool",
			Self::CopyStruct => "copy_struct",
			Self::CopyObject => "copy_object",
			Self::CopyName => "copy_name",
			Self::CopyFixedArray => "copy_fixed_array",
			Self::StructReference => "struct_reference",
			Self::PromoteBoolToByte => "promote_bool_to_byte",
			Self::PromoteBoolToInt32 => "promote_bool_to_int32",
			Self::PromoteBoolToUInt32 => "promote_bool_to_uint32",
			Self::PromoteBoolToInt64 => "promote_bool_to_int64",
			Self::PromoteBoolToFloat => "promote_bool_to_float",
			Self::PromoteBoolToDouble => "promote_bool_to_double",
			Self::PromoteByteToInt32 => "promote_byte_to_int32",
			Self::PromoteByteToUInt32 => "promote_byte_to_uint32",
			Self::PromoteByteToInt64 => "promote_byte_to_int64",
			Self::PromoteByteToFloat => "promote_byte_to_float",
			Self::PromoteByteToDouble => "promote_byte_to_double",
			Self::PromoteInt32ToInt64 => "promote_int32_to_int64",
			Self::PromoteInt32ToFloat => "promote_int32_to_float",
			Self::PromoteInt32ToDouble => "promote_int32_to_double",
			Self::PromoteUInt32ToInt64 => "promote_uint32_to_int64",
			Self::PromoteUInt32ToFloat => "promote_uint32_to_float",
			Self::PromoteUInt32ToDouble => "promote_uint32_to_double",
			Self::PromoteFloatToInt32 => "promote_float_to_int32",
			Self::PromoteFloatToInt64 => "promote_float_to_int64",
			Self::PromoteFloatToDouble => "promote_float_to_double",
			Self::DemoteDoubleToInt32 => "demote_double_to_int32",
			Self::DemoteDoubleToInt64 => "demote_double_to_int64",
			Self::DemoteDoubleToFloat => "demote_double_to_float",
		}
	}

	/// Source and target scalar kinds of a numeric conversion.
	pub fn conversion(self) -> Option<(NumericKind, NumericKind)> {
		use NumericKind::{Bool, Byte, Double, Float, Int32, Int64, UInt32};
		Some(match self {
			Self::PromoteBoolToByte => (Bool, Byte),
			Self::PromoteBoolToInt32 => (Bool, Int32),
			Self::PromoteBoolToUInt32 => (Bool, UInt32),
			Self::PromoteBoolToInt64 => (Bool, Int64),
			Self::PromoteBoolToFloat => (Bool, Float),
			Self::PromoteBoolToDouble => (Bool, Double),
			Self::PromoteByteToInt32 => (Byte, Int32),
			Self::PromoteByteToUInt32 => (Byte, UInt32),
			Self::PromoteByteToInt64 => (Byte, Int64),
			Self::PromoteByteToFloat => (Byte, Float),
			Self::PromoteByteToDouble => (Byte, Double),
			Self::PromoteInt32ToInt64 => (Int32, Int64),
			Self::PromoteInt32ToFloat => (Int32, Float),
			Self::PromoteInt32ToDouble => (Int32, Double),
			Self::PromoteUInt32ToInt64 => (UInt32, Int64),
			Self::PromoteUInt32ToFloat => (UInt32, Float),
			Self::PromoteUInt32ToDouble => (UInt32, Double),
			Self::PromoteFloatToInt32 => (Float, Int32),
			Self::PromoteFloatToInt64 => (Float, Int64),
			Self::PromoteFloatToDouble => (Float, Double),
			Self::DemoteDoubleToInt32 => (Double, Int32),
			Self::DemoteDoubleToInt64 => (Double, Int64),
			Self::DemoteDoubleToFloat => (Double, Float),
			_ => return None,
		})
	}
}

/// Relation between a source and a target property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
	/// No copy exists.
	Incompatible,
	/// Values can be copied as-is.
	Compatible,
	/// A numeric conversion exists from source to target.
	Promotable,
}

/// Copy strategy plus the byte count used by plain copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolvedCopy {
	/// Chosen strategy.
	pub copy_type: CopyType,
	/// Bytes copied by `CopyPlain`, zero otherwise.
	pub copy_size: usize,
}

impl ResolvedCopy {
	fn of(copy_type: CopyType) -> Self {
		Self { copy_type, copy_size: 0 }
	}
}

/// Conversion used for a promotable `(source, target)` kind pair.
pub fn promotion(source: NumericKind, target: NumericKind) -> Option<CopyType> {
	use NumericKind::{Bool, Byte, Double, Float, Int32, Int64, UInt32};
	Some(match (source, target) {
		(Bool, Byte) => CopyType::PromoteBoolToByte,
		(Bool, Int32) => CopyType::PromoteBoolToInt32,
		(Bool, UInt32) => CopyType::PromoteBoolToUInt32,
		(Bool, Int64) => CopyType::PromoteBoolToInt64,
		(Bool, Float) => CopyType::PromoteBoolToFloat,
		(Bool, Double) => CopyType::PromoteBoolToDouble,
		(Byte, Int32) => CopyType::PromoteByteToInt32,
		(Byte, UInt32) => CopyType::PromoteByteToUInt32,
		(Byte, Int64) => CopyType::PromoteByteToInt64,
		(Byte, Float) => CopyType::PromoteByteToFloat,
		(Byte, Double) => CopyType::PromoteByteToDouble,
		(Int32, Int64) => CopyType::PromoteInt32ToInt64,
		(Int32, Float) => CopyType::PromoteInt32ToFloat,
		(Int32, Double) => CopyType::PromoteInt32ToDouble,
		(UInt32, Int64) => CopyType::PromoteUInt32ToInt64,
		(UInt32, Float) => CopyType::PromoteUInt32ToFloat,
		(UInt32, Double) => CopyType::PromoteUInt32ToDouble,
		(Float, Int32) => CopyType::PromoteFloatToInt32,
		(Float, Int64) => CopyType::PromoteFloatToInt64,
		(Float, Double) => CopyType::PromoteFloatToDouble,
		(Double, Int32) => CopyType::DemoteDoubleToInt32,
		(Double, Int64) => CopyType::DemoteDoubleToInt64,
		(Double, Float) => CopyType::DemoteDoubleToFloat,
		_ => return None,
	})
}

/// Decide whether values of `source` can be copied into `target`.
pub fn property_compatibility(schema: &Schema, source: FieldRef, target: FieldRef) -> Compatibility {
	if source == target {
		return Compatibility::Compatible;
	}

	let (Some(source_ty), Some(target_ty)) = (schema.leaf_type(source), schema.leaf_type(target)) else {
		return Compatibility::Incompatible;
	};
	let source_dim = schema.leaf_array_dim(source);
	if source_dim != schema.leaf_array_dim(target) {
		return Compatibility::Incompatible;
	}

	if let (Some(source_class), Some(target_class)) = (source_ty.object_class(), target_ty.object_class()) {
		return if schema.is_child_of(source_class, target_class) {
			Compatibility::Compatible
		} else {
			Compatibility::Incompatible
		};
	}

	if let FieldType::Enum { id, .. } = target_ty {
		return match source_ty {
			FieldType::Enum { id: source_id, .. } if source_id == id => Compatibility::Compatible,
			_ => Compatibility::Incompatible,
		};
	}

	let source_ty = source_ty.without_enum();
	if same_type(&source_ty, target_ty) {
		return Compatibility::Compatible;
	}

	match (source_ty.numeric_kind(), target_ty.numeric_kind()) {
		(Some(from), Some(to)) if source_dim == 1 && promotion(from, to).is_some() => Compatibility::Promotable,
		_ => Compatibility::Incompatible,
	}
}

/// Pick the copy strategy between two compiled leaves.
///
/// `struct_reference` names the host's struct reference wrapper type, when one
/// is registered on the collection.
pub fn resolve_copy_type(schema: &Schema, source: &LeafIndirection, target: &LeafIndirection, struct_reference: Option<StructId>) -> Result<ResolvedCopy> {
	let source_container = source.container_type.ok_or(BindError::MissingContainerType { side: "source" })?;
	if target.container_type.is_none() {
		return Err(BindError::MissingContainerType { side: "target" });
	}

	let incompatible = || BindError::IncompatibleTypes {
		source_desc: describe_leaf(schema, source),
		target_desc: describe_leaf(schema, target),
	};

	let Some(target_field) = target.field else {
		return Err(incompatible());
	};
	let target_ty = schema.leaf_type(target_field).ok_or_else(incompatible)?;

	let Some(source_field) = source.field else {
		return match target_ty {
			FieldType::Struct(id) if *id == source_container => Ok(ResolvedCopy::of(CopyType::CopyStruct)),
			FieldType::Object(class) if schema.is_child_of(source_container, *class) => Ok(ResolvedCopy::of(CopyType::CopyObject)),
			_ => Err(incompatible()),
		};
	};
	let source_ty = schema.leaf_type(source_field).ok_or_else(incompatible)?;

	if let Some(reference) = struct_reference
		&& *target_ty == FieldType::Struct(reference)
		&& matches!(source_ty, FieldType::Struct(id) if *id != reference)
	{
		return Ok(ResolvedCopy::of(CopyType::StructReference));
	}

	match property_compatibility(schema, source_field, target_field) {
		Compatibility::Compatible => Ok(compatible_copy(schema, source_ty, target_field, target_ty)),
		Compatibility::Promotable => source_ty
			.numeric_kind()
			.zip(target_ty.numeric_kind())
			.and_then(|(from, to)| promotion(from, to))
			.map(ResolvedCopy::of)
			.ok_or_else(incompatible),
		Compatibility::Incompatible => Err(incompatible()),
	}
}

fn compatible_copy(schema: &Schema, source_ty: &FieldType, target_field: FieldRef, target_ty: &FieldType) -> ResolvedCopy {
	let fixed_size = !target_field.element && schema.field(target_field).is_some_and(|def| def.flags.contains(FieldFlags::FIXED_SIZE));

	match target_ty {
		FieldType::Name => ResolvedCopy::of(CopyType::CopyName),
		FieldType::Bool(_) => ResolvedCopy::of(CopyType::CopyBool),
		FieldType::Struct(_) => ResolvedCopy::of(CopyType::CopyStruct),
		FieldType::SoftObject(_) if matches!(source_ty, FieldType::SoftObject(_)) => ResolvedCopy::of(CopyType::CopyComplex),
		FieldType::Object(_) | FieldType::WeakObject(_) | FieldType::SoftObject(_) => ResolvedCopy::of(CopyType::CopyObject),
		FieldType::Array(_) if fixed_size => ResolvedCopy::of(CopyType::CopyFixedArray),
		ty if schema.is_plain(ty) => ResolvedCopy {
			copy_type: CopyType::CopyPlain,
			copy_size: schema.element_size(ty) * schema.leaf_array_dim(target_field),
		},
		_ => ResolvedCopy::of(CopyType::CopyComplex),
	}
}

fn same_type(a: &FieldType, b: &FieldType) -> bool {
	match (a, b) {
		(FieldType::Bool(_), FieldType::Bool(_)) => true,
		_ => a == b,
	}
}

/// Render a leaf as `Container.field (type)` for diagnostics.
pub fn describe_leaf(schema: &Schema, leaf: &LeafIndirection) -> String {
	let container = leaf.container_type.map(|id| schema.struct_name(id)).unwrap_or("<none>");
	match leaf.field.and_then(|field| Some((schema.field(field)?, schema.leaf_type(field)?))) {
		Some((def, ty)) => format!("{container}.{} ({})", def.name, ty.describe(schema)),
		None => format!("{container} (struct)"),
	}
}
