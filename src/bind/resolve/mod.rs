use crate::bind::ops::INSTANCED_ITEM_SIZE;
use crate::bind::{
	Address, BindError, FieldFlags, FieldRef, FieldType, Guid, Heap, InstanceAccessKind, PathSegment, PropertyPath, RedirectRegistry, Result, Schema, StructId,
	View,
};

/// How one step moves from a container address to the next address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessKind {
	/// Not yet decided; never survives compilation.
	#[default]
	Unset,
	/// Add a byte offset.
	Offset,
	/// Follow a hard object reference stored at the offset.
	Object,
	/// Follow a weak object reference stored at the offset.
	WeakObject,
	/// Follow the resolved address of a soft object reference stored at the offset.
	SoftObject,
	/// Follow an object reference and verify the runtime class.
	ObjectInstance,
	/// Enter an instanced struct payload and verify its type.
	StructInstance,
	/// Enter a shared struct payload and verify its type.
	SharedStruct,
	/// Enter one element of an instanced struct container and verify its type.
	StructInstanceContainer,
	/// Step into one element of a dynamic array.
	IndexArray,
}

impl AccessKind {
	/// Stable label for diagnostics and JSON output.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Unset => "unset",
			Self::Offset => "offset",
			Self::Object => "object",
			Self::WeakObject => "weak_object",
			Self::SoftObject => "soft_object",
			Self::ObjectInstance => "object_instance",
			Self::StructInstance => "struct_instance",
			Self::SharedStruct => "shared_struct",
			Self::StructInstanceContainer => "struct_instance_container",
			Self::IndexArray => "index_array",
		}
	}
}

/// One resolved hop of a path, produced per segment (two for indexed dynamic arrays).
#[derive(Debug, Clone, PartialEq)]
pub struct Indirection {
	/// Field this hop lands on.
	pub field: Option<FieldRef>,
	/// Live container address, when resolving against a value.
	pub container_address: Option<Address>,
	/// Type of the container the field was found on.
	pub container_type: Option<StructId>,
	/// Runtime type entered by this hop.
	pub instance_type: Option<StructId>,
	/// Element index for array and container hops.
	pub array_index: usize,
	/// Byte offset from the container address.
	pub offset: usize,
	/// Index of the path segment that produced this hop.
	pub segment_index: usize,
	/// How the hop is taken.
	pub access_kind: AccessKind,
	/// Current field name when the segment name was recovered through a redirect.
	pub redirected_name: Option<Box<str>>,
	/// Property GUID of the field on script-defined structs.
	pub redirected_guid: Option<Guid>,
}

/// Reflection and memory a path is resolved against.
#[derive(Debug, Clone, Copy)]
pub struct ResolveEnv<'a> {
	/// Type descriptors.
	pub schema: &'a Schema,
	/// Live memory; `None` resolves by type only.
	pub heap: Option<&'a Heap>,
	/// Rename redirects consulted when `handle_redirects` is set.
	pub redirects: Option<&'a RedirectRegistry>,
}

impl<'a> ResolveEnv<'a> {
	/// Type-only environment.
	pub fn types(schema: &'a Schema) -> Self {
		Self {
			schema,
			heap: None,
			redirects: None,
		}
	}

	/// Environment with live memory.
	pub fn with_heap(schema: &'a Schema, heap: &'a Heap) -> Self {
		Self {
			schema,
			heap: Some(heap),
			redirects: None,
		}
	}
}

/// Resolve `path` against `base`, returning every hop or the first failure.
///
/// When `base` carries memory the live value decides instance types and array
/// bounds; otherwise the declared types and the segments' recorded instance
/// types are used.
pub fn resolve_indirections(env: &ResolveEnv<'_>, base: View, path: &PropertyPath, handle_redirects: bool) -> Result<Vec<Indirection>> {
	let schema = env.schema;
	let heap = env.heap;
	let mut address = heap.and(base.memory());
	let mut current = base.ty();
	let mut out = Vec::with_capacity(path.len() + 1);

	for (segment_index, segment) in path.segments().iter().enumerate() {
		let fail = |reason: String| BindError::Resolve {
			path: path.format_prefix(segment_index + 1),
			reason,
		};

		let Some(container) = current else {
			return Err(fail("malformed path: no container type to look up the property on".to_owned()));
		};
		let (field_ref, redirected_name, redirected_guid) = lookup_field(env, container, segment, handle_redirects)
			.ok_or_else(|| fail(format!("could not find property {} on {}", segment.name(), schema.struct_name(container))))?;
		let Some(field) = schema.field(field_ref) else {
			return Err(fail(format!("stale property reference on {}", schema.struct_name(container))));
		};
		let last = segment_index + 1 == path.len();

		let mut hop = Indirection {
			field: Some(field_ref),
			container_address: address,
			container_type: Some(container),
			instance_type: None,
			array_index: 0,
			offset: 0,
			segment_index,
			access_kind: AccessKind::Offset,
			redirected_name,
			redirected_guid,
		};

		let value_type = match (&field.ty, segment.array_index()) {
			(FieldType::Array(inner), Some(index)) => {
				out.push(Indirection {
					access_kind: AccessKind::IndexArray,
					offset: field.offset,
					array_index: index,
					..hop.clone()
				});

				if let (Some(heap), Some(at)) = (heap, address) {
					let header = heap.read_array_header(at + field.offset as u64).map_err(|err| fail(err.to_string()))?;
					if index >= header.num {
						return Err(fail(format!("index {index} out of range (num elements {})", header.num)));
					}
					address = Some(header.data + (index * schema.element_size(inner)) as u64);
				}

				hop.field = Some(field_ref.element());
				hop.container_address = address;
				inner.as_ref().clone()
			}
			(FieldType::InstancedStructContainer, index) => {
				hop.offset = field.offset;
				hop.array_index = index.unwrap_or(0);
				if last && index.is_some() {
					return Err(fail(format!("indexing {} requires a property inside the element", field.name)));
				}
				FieldType::InstancedStructContainer
			}
			(ty, index) => {
				if let Some(index) = index {
					if index >= field.array_dim {
						return Err(fail(format!("index {index} out of range (array dim {})", field.array_dim)));
					}
					hop.field = Some(field_ref.element());
				}
				let index = index.unwrap_or(0);
				hop.offset = field.offset + schema.element_size(ty) * index;
				hop.array_index = index;
				ty.clone()
			}
		};

		if !last {
			let field_address = address.map(|at| at + hop.offset as u64);
			match &value_type {
				FieldType::Struct(id) => {
					address = field_address;
					current = Some(*id);
				}
				FieldType::InstancedStruct { .. } => {
					(address, current) = match (heap, field_address) {
						(Some(heap), Some(at)) => {
							let header = heap.read_instanced_header(at).map_err(|err| fail(err.to_string()))?;
							let ty = header.ty.ok_or_else(|| fail("expecting non-empty instanced struct".to_owned()))?;
							((header.memory != 0).then_some(header.memory), Some(ty))
						}
						_ => (None, segment.instance_type()),
					};
					hop.instance_type = current;
					hop.access_kind = AccessKind::StructInstance;
				}
				FieldType::SharedStruct { .. } => {
					(address, current) = match (heap, field_address) {
						(Some(heap), Some(at)) => {
							let memory = heap.read_u64(at).map_err(|err| fail(err.to_string()))?;
							let ty = heap.runtime_type(memory).ok_or_else(|| fail("expecting non-empty shared struct".to_owned()))?;
							(Some(memory), Some(ty))
						}
						_ => (None, segment.instance_type()),
					};
					hop.instance_type = current;
					hop.access_kind = AccessKind::SharedStruct;
				}
				FieldType::InstancedStructContainer => {
					let Some(index) = segment.array_index() else {
						return Err(fail(format!("expecting array index on {}", field.name)));
					};
					(address, current) = match (heap, field_address) {
						(Some(heap), Some(at)) => {
							let header = heap.read_array_header(at).map_err(|err| fail(err.to_string()))?;
							if index >= header.num {
								return Err(fail(format!("index {index} out of range (num elements {})", header.num)));
							}
							let item = heap
								.read_instanced_header(header.data + (index * INSTANCED_ITEM_SIZE) as u64)
								.map_err(|err| fail(err.to_string()))?;
							let ty = item.ty.ok_or_else(|| fail("expecting non-empty instanced struct".to_owned()))?;
							((item.memory != 0).then_some(item.memory), Some(ty))
						}
						_ => (None, segment.instance_type()),
					};
					hop.instance_type = current;
					hop.array_index = index;
					hop.access_kind = AccessKind::StructInstanceContainer;
				}
				FieldType::Object(class) | FieldType::WeakObject(class) | FieldType::SoftObject(class) => {
					let live = match (heap, field_address) {
						(Some(heap), Some(at)) => {
							let ptr = heap.read_u64(at).map_err(|err| fail(err.to_string()))?;
							Some((heap.is_live(ptr).then_some(ptr), heap))
						}
						_ => None,
					};
					let runtime = match live {
						Some((Some(ptr), heap)) => {
							address = Some(ptr);
							heap.runtime_type(ptr).unwrap_or(*class)
						}
						Some((None, _)) => {
							address = None;
							*class
						}
						None => {
							address = None;
							segment
								.instance_type()
								.filter(|_| segment.instance_access() == InstanceAccessKind::ObjectInstance)
								.unwrap_or(*class)
						}
					};
					current = Some(runtime);

					let derived = runtime != *class;
					hop.access_kind = match &value_type {
						FieldType::Object(_) if derived || field.flags.contains(FieldFlags::INSTANCED) => AccessKind::ObjectInstance,
						FieldType::Object(_) => AccessKind::Object,
						FieldType::WeakObject(_) => AccessKind::WeakObject,
						_ => AccessKind::SoftObject,
					};
					if derived || hop.access_kind == AccessKind::ObjectInstance {
						hop.instance_type = Some(runtime);
					}
				}
				other => {
					return Err(fail(format!("unsupported indirection type {}", other.describe(schema))));
				}
			}
		}

		out.push(hop);
	}

	Ok(out)
}

/// Re-resolve `path` against a live value and record instance types, redirected names and GUIDs.
///
/// A path authored against one snapshot of a value stays resolvable by type
/// after fields are renamed or instance payloads change type.
pub fn update_segments_from_value(env: &ResolveEnv<'_>, path: &mut PropertyPath, view: View) -> Result<()> {
	let indirections = resolve_indirections(env, view, path, true)?;
	let segments = path.segments_mut();

	for hop in &indirections {
		let Some(segment) = segments.get_mut(hop.segment_index) else {
			continue;
		};
		if let Some(name) = &hop.redirected_name {
			segment.set_name(name);
		}
		if hop.redirected_guid.is_some() {
			segment.set_property_guid(hop.redirected_guid);
		}
		if hop.access_kind == AccessKind::IndexArray {
			continue;
		}

		let access = match hop.access_kind {
			AccessKind::Object | AccessKind::WeakObject | AccessKind::SoftObject | AccessKind::ObjectInstance => InstanceAccessKind::ObjectInstance,
			AccessKind::StructInstance => InstanceAccessKind::StructInstance,
			AccessKind::SharedStruct => InstanceAccessKind::SharedStruct,
			AccessKind::StructInstanceContainer => InstanceAccessKind::StructInstanceContainer,
			AccessKind::Offset | AccessKind::IndexArray | AccessKind::Unset => InstanceAccessKind::None,
		};
		segment.set_instance_type(hop.instance_type, access);
	}

	Ok(())
}

fn lookup_field(env: &ResolveEnv<'_>, container: StructId, segment: &PathSegment, handle_redirects: bool) -> Option<(FieldRef, Option<Box<str>>, Option<Guid>)> {
	let schema = env.schema;
	let guid_of = |field: FieldRef| schema.field(field).and_then(|item| item.guid);

	if let Some(field) = schema.find_field(container, segment.name()) {
		let guid = if handle_redirects { guid_of(field) } else { None };
		return Some((field, None, guid));
	}
	if !handle_redirects {
		return None;
	}

	let dynamic = schema.struct_def(container).is_some_and(|item| item.dynamic);
	if dynamic
		&& let Some(guid) = segment.property_guid()
		&& let Some(field) = schema.find_field_by_guid(container, guid)
	{
		let name = schema.field(field).map(|item| item.name.clone());
		tracing::debug!("recovered {} on {} by property guid {guid}", segment.name(), schema.struct_name(container));
		return Some((field, name, Some(guid)));
	}

	let redirected = env.redirects?.find_field_redirect(schema, container, segment.name())?;
	let field = schema.find_field(container, redirected)?;
	tracing::debug!("redirected {} on {} to {redirected}", segment.name(), schema.struct_name(container));
	Some((field, Some(redirected.into()), guid_of(field)))
}

#[cfg(test)]
mod tests;
