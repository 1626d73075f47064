use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::bind::compression::{Compression, decode_bytes};
use crate::bind::{
	Address, BindError, BindableStructs, Binding, BindingCollection, BindingDataProvider, CopyType, EnumId, FieldFlags, FieldType, FieldValue, Guid, Heap, NumericKind, PropertyPath, RedirectRegistry,
	ResolveContext, Result, Schema, StructBuilder, StructHandle, StructId, StructReferenceHooks, StructValue, Value, View, read_struct, write_struct,
};

/// Scenario document: types, instances and the bindings between them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioDocument {
	/// Enum declarations.
	pub enums: Vec<EnumDoc>,
	/// Struct and class declarations, in dependency order.
	pub structs: Vec<StructDoc>,
	/// Allocated values.
	pub instances: Vec<InstanceDoc>,
	/// Declared bindings.
	pub bindings: Vec<BindingDoc>,
	/// Field rename redirects.
	pub redirects: Vec<RedirectDoc>,
	/// Struct type acting as the struct reference wrapper.
	pub struct_reference: Option<String>,
}

/// Enum declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumDoc {
	/// Enum name.
	pub name: String,
	/// Integer storage: `byte`, `int32`, `uint32` or `int64`.
	pub underlying: String,
	/// Variant names and values.
	pub variants: Vec<(String, i64)>,
}

/// Struct or class declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructDoc {
	/// Type name.
	pub name: String,
	/// Declares a class instead of a value struct.
	#[serde(default)]
	pub class: bool,
	/// Parent type name.
	#[serde(default)]
	pub extends: Option<String>,
	/// Script-defined type whose fields carry GUIDs.
	#[serde(default)]
	pub dynamic: bool,
	/// Fields in layout order.
	#[serde(default)]
	pub fields: Vec<FieldDoc>,
}

/// Field declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDoc {
	/// Field name.
	pub name: String,
	/// Type expression, such as `int32`, `array<struct<Item>>` or `object<Actor>`.
	#[serde(rename = "type")]
	pub ty: String,
	/// Static array dimension.
	#[serde(default = "one")]
	pub dim: usize,
	/// Property GUID in hex.
	#[serde(default)]
	pub guid: Option<String>,
	/// Dynamic array whose length the holder owns.
	#[serde(default)]
	pub fixed_size: bool,
	/// Object reference owning a per-holder instance.
	#[serde(default)]
	pub instanced: bool,
}

fn one() -> usize {
	1
}

/// Allocated value; instances with an `id` are bindable.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceDoc {
	/// Instance name, referenced as `@name` from object fields.
	pub name: String,
	/// Struct or class name.
	#[serde(rename = "type")]
	pub ty: String,
	/// Bindable struct id in hex.
	#[serde(default)]
	pub id: Option<String>,
	/// Initial field values.
	#[serde(default)]
	pub values: serde_json::Map<String, serde_json::Value>,
}

/// Binding between two bindable instances.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingDoc {
	/// Source instance name.
	pub source: String,
	/// Source path; empty binds the whole struct.
	#[serde(default)]
	pub source_path: String,
	/// Target instance name.
	pub target: String,
	/// Target path.
	pub target_path: String,
}

/// Field rename redirect.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedirectDoc {
	/// Struct the field lives on.
	#[serde(rename = "struct")]
	pub owner: String,
	/// Name used by stored paths.
	pub old: String,
	/// Current field name.
	pub new: String,
}

/// One allocated scenario value.
#[derive(Debug, Clone)]
pub struct ScenarioInstance {
	/// Instance name.
	pub name: Box<str>,
	/// Struct or class type.
	pub ty: StructId,
	/// Heap address.
	pub address: Address,
	/// Registry handle for bindable instances.
	pub handle: Option<StructHandle>,
}

/// Outcome of resolving a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveSummary {
	/// Whether every binding resolved.
	pub all_resolved: bool,
	/// Number of declared bindings.
	pub bindings: usize,
	/// Number of copies compiled to a no-op.
	pub failed: usize,
}

/// Loaded scenario with its own schema, heap and binding collection.
#[derive(Debug)]
pub struct Scenario {
	/// Type descriptors.
	pub schema: Schema,
	/// Value storage.
	pub heap: Heap,
	/// Bindable struct registry and data-view provider.
	pub structs: BindableStructs,
	/// Bindings and their compiled copies.
	pub collection: BindingCollection<StructHandle>,
	/// Field rename redirects.
	pub redirects: RedirectRegistry,
	/// Input compression detected by [`Scenario::open`].
	pub compression: Compression,
	instances: Vec<ScenarioInstance>,
}

impl Scenario {
	/// Read a scenario document, optionally zstd-compressed.
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let raw = std::fs::read(path)?;
		let (compression, bytes) = decode_bytes(raw)?;
		let document: ScenarioDocument = serde_json::from_slice(&bytes)?;
		let mut scenario = Self::build(&document)?;
		scenario.compression = compression;
		Ok(scenario)
	}

	/// Parse a scenario from JSON text.
	pub fn from_json(text: &str) -> Result<Self> {
		let document: ScenarioDocument = serde_json::from_str(text)?;
		Self::build(&document)
	}

	/// Build schema, values and bindings from a parsed document.
	pub fn build(document: &ScenarioDocument) -> Result<Self> {
		let mut schema = Schema::new();
		let mut enums = HashMap::new();
		for item in &document.enums {
			let underlying = numeric_kind(&item.underlying).ok_or_else(|| scenario_error(format!("enum {}: bad underlying type {}", item.name, item.underlying)))?;
			let variants: Vec<(&str, i64)> = item.variants.iter().map(|(label, raw)| (label.as_str(), *raw)).collect();
			let id = schema.add_enum(&item.name, underlying, &variants)?;
			enums.insert(item.name.clone(), id);
		}

		for item in document.structs.iter().filter(|item| item.class) {
			schema.declare_class(&item.name);
		}
		for item in &document.structs {
			let mut builder = if item.class { StructBuilder::class(&item.name) } else { StructBuilder::new(&item.name) };
			if let Some(parent) = &item.extends {
				builder = builder.extends(lookup_struct(&schema, parent)?);
			}
			if item.dynamic {
				builder = builder.dynamic();
			}
			for field in &item.fields {
				let ty = parse_type(&schema, &enums, &field.ty)?;
				builder = if field.ty == "bitfield" {
					builder.bitfield(&field.name)
				} else {
					builder.static_array(&field.name, ty, field.dim)
				};
				if let Some(guid) = &field.guid {
					builder = builder.with_guid(parse_guid(guid)?);
				}
				let mut flags = FieldFlags::empty();
				flags.set(FieldFlags::FIXED_SIZE, field.fixed_size);
				flags.set(FieldFlags::INSTANCED, field.instanced);
				builder = builder.with_flags(flags);
			}
			schema.add_struct(builder)?;
		}

		let mut redirects = RedirectRegistry::new();
		for item in &document.redirects {
			redirects.add_field_redirect(lookup_struct(&schema, &item.owner)?, &item.old, &item.new);
		}

		let mut heap = Heap::new();
		let mut structs = BindableStructs::new();
		let mut instances = Vec::with_capacity(document.instances.len());
		let mut by_name: HashMap<&str, Address> = HashMap::new();
		for item in &document.instances {
			let ty = lookup_struct(&schema, &item.ty)?;
			let address = heap.alloc_struct(&schema, ty)?;
			if by_name.insert(item.name.as_str(), address).is_some() {
				return Err(scenario_error(format!("instance {} declared twice", item.name)));
			}
			let handle = match &item.id {
				Some(id) => Some(structs.add(&item.name, parse_guid(id)?, Some(ty), View::new(ty, address))?),
				None => None,
			};
			instances.push(ScenarioInstance {
				name: item.name.as_str().into(),
				ty,
				address,
				handle,
			});
		}

		for (item, instance) in document.instances.iter().zip(&instances) {
			let value = struct_from_json(&schema, &by_name, instance.ty, &item.values)?;
			write_struct(&schema, &mut heap, instance.ty, instance.address, &value)?;
		}

		let mut collection = BindingCollection::new();
		if let Some(name) = &document.struct_reference {
			collection.set_struct_reference_hooks(address_reference_hooks(lookup_struct(&schema, name)?));
		}

		let mut scenario = Self {
			schema,
			heap,
			structs,
			collection,
			redirects,
			compression: Compression::None,
			instances,
		};

		for item in &document.bindings {
			let source_path = PropertyPath::parse_with_root(scenario.instance_id(&item.source)?, &item.source_path)?;
			let target_path = PropertyPath::parse_with_root(scenario.instance_id(&item.target)?, &item.target_path)?;
			let ctx = ResolveContext::live(&scenario.schema, &scenario.heap, &scenario.structs, &scenario.structs).with_redirects(Some(&scenario.redirects));
			let mut binding = Binding::new(source_path, target_path);
			binding.source_data_handle = scenario.instance_handle(&item.source)?;
			binding.target_data_handle = scenario.instance_handle(&item.target)?;
			scenario.collection.add_binding(binding, Some(&ctx))?;
		}

		Ok(scenario)
	}

	/// Allocated instances in declaration order.
	pub fn instances(&self) -> &[ScenarioInstance] {
		&self.instances
	}

	/// Instance by name.
	pub fn instance(&self, name: &str) -> Result<&ScenarioInstance> {
		self.instances
			.iter()
			.find(|item| item.name.as_ref() == name)
			.ok_or_else(|| scenario_error(format!("unknown instance {name}")))
	}

	/// Group bindings into batches and resolve every path against the live values.
	pub fn resolve(&mut self) -> Result<ResolveSummary> {
		self.collection.rebuild_batches(&self.structs)?;
		let ctx = ResolveContext::live(&self.schema, &self.heap, &self.structs, &self.structs).with_redirects(Some(&self.redirects));
		let all_resolved = self.collection.resolve_paths(&ctx);
		let failed = self
			.collection
			.copy_batches()
			.iter()
			.flat_map(|batch| &self.collection.copies()[batch.range()])
			.filter(|copy| copy.copy_type == CopyType::None)
			.count();
		Ok(ResolveSummary {
			all_resolved,
			bindings: self.collection.num_bindings(),
			failed,
		})
	}

	/// Run every batch; returns `(batch target name, success)` per batch.
	pub fn copy_all(&mut self) -> Vec<(Box<str>, bool)> {
		let mut out = Vec::with_capacity(self.collection.copy_batches().len());
		for (index, batch) in self.collection.copy_batches().iter().enumerate() {
			let target = self.structs.data_view(batch.target_struct.data_handle).unwrap_or_default();
			let ok = self.collection.copy_batch(&self.schema, &mut self.heap, &self.structs, index, target);
			out.push((batch.target_struct.name.clone(), ok));
		}
		out
	}

	/// Reset every batch's bound targets to their defaults.
	pub fn reset_all(&mut self) -> bool {
		let mut ok = true;
		for (index, batch) in self.collection.copy_batches().iter().enumerate() {
			let target = self.structs.data_view(batch.target_struct.data_handle).unwrap_or_default();
			ok &= self.collection.reset_objects(&self.schema, &mut self.heap, index, target);
		}
		ok
	}

	/// Decode the current value of an instance.
	pub fn read_instance(&self, name: &str) -> Result<StructValue> {
		let instance = self.instance(name)?;
		read_struct(&self.schema, &self.heap, instance.ty, instance.address)
	}

	fn instance_id(&self, name: &str) -> Result<Guid> {
		let handle = self.instance_handle(name)?;
		self.structs
			.descriptors()
			.find(|item| item.data_handle == handle)
			.map(|item| item.id)
			.ok_or_else(|| scenario_error(format!("instance {name} is not bindable")))
	}

	fn instance_handle(&self, name: &str) -> Result<StructHandle> {
		self.instance(name)?
			.handle
			.ok_or_else(|| scenario_error(format!("instance {name} has no id and cannot be bound")))
	}
}

/// Struct reference hooks storing the referenced address in the wrapper's first 8 bytes.
pub fn address_reference_hooks(ty: StructId) -> StructReferenceHooks {
	StructReferenceHooks {
		ty,
		copy: Box::new(|heap: &mut Heap, _source_ty: &FieldType, source: Address, target: Address| heap.write_u64(target, source)),
		reset: Box::new(|heap: &mut Heap, target: Address| heap.write_u64(target, 0)),
	}
}

/// Parse a field type expression.
///
/// Scalars are `bool`, `bitfield`, `byte`, `int32`, `uint32`, `int64`,
/// `float`, `double`, `name` and `string`; compound types are written
/// `struct<T>`, `object<T>`, `weak<T>`, `soft<T>`, `enum<T>`, `array<T>`,
/// `map<K,V>`, `instanced`, `instanced<Base>`, `shared`, `shared<Base>` and
/// `instanced_array`.
pub fn parse_type(schema: &Schema, enums: &HashMap<String, EnumId>, text: &str) -> Result<FieldType> {
	let text = text.trim();
	let bad = || scenario_error(format!("bad type expression {text}"));

	if let Some(kind) = numeric_kind(text) {
		return Ok(match kind {
			NumericKind::Bool => FieldType::bool(),
			NumericKind::Byte => FieldType::Byte,
			NumericKind::Int32 => FieldType::Int32,
			NumericKind::UInt32 => FieldType::UInt32,
			NumericKind::Int64 => FieldType::Int64,
			NumericKind::Float => FieldType::Float,
			NumericKind::Double => FieldType::Double,
		});
	}
	match text {
		"bitfield" => return Ok(FieldType::bool()),
		"name" => return Ok(FieldType::Name),
		"string" => return Ok(FieldType::String),
		"instanced" => return Ok(FieldType::InstancedStruct { base: None }),
		"shared" => return Ok(FieldType::SharedStruct { base: None }),
		"instanced_array" => return Ok(FieldType::InstancedStructContainer),
		_ => {}
	}

	let (head, rest) = text.split_once('<').ok_or_else(bad)?;
	let inner = rest.strip_suffix('>').ok_or_else(bad)?;
	Ok(match head.trim() {
		"struct" => FieldType::Struct(lookup_struct(schema, inner.trim())?),
		"object" => FieldType::Object(lookup_struct(schema, inner.trim())?),
		"weak" => FieldType::WeakObject(lookup_struct(schema, inner.trim())?),
		"soft" => FieldType::SoftObject(lookup_struct(schema, inner.trim())?),
		"instanced" => FieldType::InstancedStruct {
			base: Some(lookup_struct(schema, inner.trim())?),
		},
		"shared" => FieldType::SharedStruct {
			base: Some(lookup_struct(schema, inner.trim())?),
		},
		"enum" => {
			let id = enums.get(inner.trim()).copied().ok_or_else(bad)?;
			schema.enum_type(id).ok_or_else(bad)?
		}
		"array" => FieldType::array(parse_type(schema, enums, inner)?),
		"map" => {
			let (key, value) = split_top_level(inner).ok_or_else(bad)?;
			FieldType::Map {
				key: Box::new(parse_type(schema, enums, key)?),
				value: Box::new(parse_type(schema, enums, value)?),
			}
		}
		_ => return Err(bad()),
	})
}

fn split_top_level(text: &str) -> Option<(&str, &str)> {
	let mut depth = 0_i32;
	for (index, ch) in text.char_indices() {
		match ch {
			'<' => depth += 1,
			'>' => depth -= 1,
			',' if depth == 0 => return Some((&text[..index], &text[index + 1..])),
			_ => {}
		}
	}
	None
}

fn numeric_kind(text: &str) -> Option<NumericKind> {
	Some(match text {
		"bool" => NumericKind::Bool,
		"byte" => NumericKind::Byte,
		"int32" => NumericKind::Int32,
		"uint32" => NumericKind::UInt32,
		"int64" => NumericKind::Int64,
		"float" => NumericKind::Float,
		"double" => NumericKind::Double,
		_ => return None,
	})
}

fn lookup_struct(schema: &Schema, name: &str) -> Result<StructId> {
	schema.struct_by_name(name).ok_or_else(|| BindError::UnknownStruct { name: name.to_owned() })
}

fn parse_guid(text: &str) -> Result<Guid> {
	Guid::parse_hex(text).ok_or_else(|| scenario_error(format!("bad id {text}")))
}

fn scenario_error(reason: String) -> BindError {
	BindError::Scenario { reason }
}

fn struct_from_json(
	schema: &Schema,
	instances: &HashMap<&str, Address>,
	id: StructId,
	values: &serde_json::Map<String, serde_json::Value>,
) -> Result<StructValue> {
	let item = schema.struct_def(id).ok_or_else(|| BindError::UnknownStruct { name: format!("#{}", id.0) })?;
	let ordered: BTreeMap<&str, &serde_json::Value> = values.iter().filter(|(key, _)| key.as_str() != "$type").map(|(key, value)| (key.as_str(), value)).collect();

	let mut fields = Vec::with_capacity(ordered.len());
	for (name, json) in ordered {
		let field = item
			.fields
			.iter()
			.find(|field| field.name.as_ref() == name)
			.ok_or_else(|| scenario_error(format!("{} has no field {name}", item.name)))?;
		let value = match json {
			serde_json::Value::Array(items) if field.array_dim > 1 => Value::Array(
				items
					.iter()
					.map(|item| value_from_json(schema, instances, &field.ty, item))
					.collect::<Result<Vec<_>>>()?,
			),
			other => value_from_json(schema, instances, &field.ty, other)?,
		};
		fields.push(FieldValue { name: field.name.clone(), value });
	}

	Ok(StructValue {
		type_name: item.name.clone(),
		fields,
	})
}

fn value_from_json(schema: &Schema, instances: &HashMap<&str, Address>, ty: &FieldType, json: &serde_json::Value) -> Result<Value> {
	use serde_json::Value as Json;

	let mismatch = || BindError::ValueMismatch {
		expected: ty.describe(schema),
		got: json.to_string(),
	};

	Ok(match (ty, json) {
		(_, Json::Null) => Value::Null,
		(_, Json::Bool(flag)) => Value::Bool(*flag),
		(_, Json::Number(number)) => match (number.as_i64(), number.as_u64(), number.as_f64()) {
			(Some(value), _, _) => Value::I64(value),
			(None, Some(value), _) => Value::U64(value),
			(None, None, Some(value)) => Value::F64(value),
			_ => return Err(mismatch()),
		},
		(FieldType::Object(_) | FieldType::WeakObject(_) | FieldType::SoftObject(_) | FieldType::SharedStruct { .. }, Json::String(text)) => {
			let name = text.strip_prefix('@').unwrap_or(text);
			let address = instances.get(name).copied().ok_or_else(|| scenario_error(format!("unknown instance {name}")))?;
			Value::Ptr(address)
		}
		(_, Json::String(text)) => Value::String(text.as_str().into()),
		(FieldType::Array(inner), Json::Array(items)) => Value::Array(
			items
				.iter()
				.map(|item| value_from_json(schema, instances, inner, item))
				.collect::<Result<Vec<_>>>()?,
		),
		(FieldType::InstancedStructContainer, Json::Array(items)) => Value::Array(
			items
				.iter()
				.map(|item| value_from_json(schema, instances, &FieldType::InstancedStruct { base: None }, item))
				.collect::<Result<Vec<_>>>()?,
		),
		(FieldType::Map { key, value }, Json::Array(pairs)) => {
			let mut out = Vec::with_capacity(pairs.len());
			for pair in pairs {
				let Some([pair_key, pair_value]) = pair.as_array().and_then(|items| <&[_; 2]>::try_from(items.as_slice()).ok()) else {
					return Err(mismatch());
				};
				out.push((
					value_from_json(schema, instances, key, pair_key)?,
					value_from_json(schema, instances, value, pair_value)?,
				));
			}
			Value::Map(out)
		}
		(FieldType::Struct(id), Json::Object(values)) => Value::Struct(struct_from_json(schema, instances, *id, values)?),
		(FieldType::InstancedStruct { .. } | FieldType::SharedStruct { .. }, Json::Object(values)) => {
			let type_name = values.get("$type").and_then(|item| item.as_str()).ok_or_else(mismatch)?;
			Value::Struct(struct_from_json(schema, instances, lookup_struct(schema, type_name)?, values)?)
		}
		_ => return Err(mismatch()),
	})
}

/// Render a decoded value as JSON.
pub fn value_to_json(value: &Value) -> serde_json::Value {
	use serde_json::Value as Json;

	match value {
		Value::Null => Json::Null,
		Value::Bool(flag) => Json::Bool(*flag),
		Value::I64(number) => Json::from(*number),
		Value::U64(number) => Json::from(*number),
		Value::F32(number) => Json::from(f64::from(*number)),
		Value::F64(number) => Json::from(*number),
		Value::String(text) => Json::String(text.to_string()),
		Value::Ptr(ptr) => Json::String(format!("0x{ptr:016x}")),
		Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
		Value::Map(pairs) => Json::Array(pairs.iter().map(|(key, item)| Json::Array(vec![value_to_json(key), value_to_json(item)])).collect()),
		Value::Struct(item) => struct_to_json(item),
	}
}

/// Render a decoded struct as a JSON object with a `$type` member.
pub fn struct_to_json(value: &StructValue) -> serde_json::Value {
	let mut out = serde_json::Map::new();
	out.insert("$type".to_owned(), serde_json::Value::String(value.type_name.to_string()));
	for field in &value.fields {
		out.insert(field.name.to_string(), value_to_json(&field.value));
	}
	serde_json::Value::Object(out)
}
