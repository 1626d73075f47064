use crate::bind::{EnumId, FieldFlags, FieldType, Guid, Heap, Schema, StructBuilder, StructId, View};

/// Ids of the shared unit-test schema.
pub(crate) struct Fixture {
	pub(crate) schema: Schema,
	pub(crate) mode: EnumId,
	pub(crate) vec3: StructId,
	pub(crate) item: StructId,
	pub(crate) actor: StructId,
	pub(crate) pawn: StructId,
	pub(crate) holder: StructId,
	pub(crate) script: StructId,
}

pub(crate) const SCRIPT_SCORE_GUID: Guid = Guid(0x5c0e);

/// Schema covering every field kind the engine handles.
///
/// `Holder` layout (offsets): flag 0, on 1 and off 1 (masks 1 and 2), value 4,
/// big 8, ratio 16, precise 24, mode 32, tag 36, title 40, origin 48, items
/// 64, numbers 80, fixed 96, actor 112, weak 120, payload 128, shared 144,
/// list 152, triple 168, count 180. Size 184.
pub(crate) fn fixture() -> Fixture {
	let mut schema = Schema::new();
	let mode = schema
		.add_enum("Mode", crate::bind::NumericKind::Byte, &[("Off", 0), ("On", 1), ("Auto", 2)])
		.expect("enum registers");
	let mode_ty = schema.enum_type(mode).expect("enum type");

	let vec3 = schema
		.add_struct(
			StructBuilder::new("Vec3")
				.field("x", FieldType::Float)
				.field("y", FieldType::Float)
				.field("z", FieldType::Float),
		)
		.expect("Vec3 registers");
	let item = schema
		.add_struct(
			StructBuilder::new("Item")
				.field("count", FieldType::Int32)
				.field("weight", FieldType::Float)
				.field("label", FieldType::Name),
		)
		.expect("Item registers");
	let actor = schema
		.add_struct(
			StructBuilder::class("Actor")
				.field("health", FieldType::Int32)
				.field("pos", FieldType::Struct(vec3)),
		)
		.expect("Actor registers");
	let pawn = schema
		.add_struct(StructBuilder::class("Pawn").extends(actor).field("speed", FieldType::Float))
		.expect("Pawn registers");
	let holder = schema
		.add_struct(
			StructBuilder::new("Holder")
				.field("flag", FieldType::bool())
				.bitfield("on")
				.bitfield("off")
				.field("value", FieldType::Int32)
				.field("big", FieldType::Int64)
				.field("ratio", FieldType::Float)
				.field("precise", FieldType::Double)
				.field("mode", mode_ty)
				.field("tag", FieldType::Name)
				.field("title", FieldType::String)
				.field("origin", FieldType::Struct(vec3))
				.field("items", FieldType::array(FieldType::Struct(item)))
				.field("numbers", FieldType::array(FieldType::Int32))
				.field("fixed", FieldType::array(FieldType::Int32))
				.with_flags(FieldFlags::FIXED_SIZE)
				.field("actor", FieldType::Object(actor))
				.field("weak", FieldType::WeakObject(actor))
				.field("payload", FieldType::InstancedStruct { base: None })
				.field("shared", FieldType::SharedStruct { base: None })
				.field("list", FieldType::InstancedStructContainer)
				.static_array("triple", FieldType::Int32, 3)
				.field("count", FieldType::UInt32),
		)
		.expect("Holder registers");
	let script = schema
		.add_struct(
			StructBuilder::new("ScriptStruct")
				.dynamic()
				.field("Score_12AB", FieldType::Int32)
				.with_guid(SCRIPT_SCORE_GUID),
		)
		.expect("ScriptStruct registers");

	Fixture {
		schema,
		mode,
		vec3,
		item,
		actor,
		pawn,
		holder,
		script,
	}
}

impl Fixture {
	/// Allocate a zeroed struct and return its view.
	pub(crate) fn alloc(&self, heap: &mut Heap, ty: StructId) -> View {
		let addr = heap.alloc_struct(&self.schema, ty).expect("struct allocates");
		View::new(ty, addr)
	}

	/// Byte offset of a named field.
	pub(crate) fn offset(&self, owner: StructId, name: &str) -> u64 {
		let field = self.schema.find_field(owner, name).expect("field exists");
		self.schema.field(field).expect("field def").offset as u64
	}
}
