use std::fmt;

use crate::bind::{BindError, Guid, Result, Schema, StructId};

/// How a segment's recorded instance type is reached at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InstanceAccessKind {
	/// No instance type recorded.
	#[default]
	None,
	/// Object reference whose runtime class differs from the declared class.
	ObjectInstance,
	/// Instanced struct payload.
	StructInstance,
	/// Shared struct payload.
	SharedStruct,
	/// Element of an instanced struct container.
	StructInstanceContainer,
}

/// One step of a property path: field name, optional index and instance type.
#[derive(Debug, Clone, Default)]
pub struct PathSegment {
	name: Box<str>,
	array_index: Option<usize>,
	instance_type: Option<StructId>,
	instance_access: InstanceAccessKind,
	property_guid: Option<Guid>,
}

impl PathSegment {
	/// Segment selecting a named field.
	pub fn new(name: &str) -> Self {
		Self {
			name: name.into(),
			..Self::default()
		}
	}

	/// Segment selecting one element of a named array field.
	pub fn indexed(name: &str, index: usize) -> Self {
		Self {
			array_index: Some(index),
			..Self::new(name)
		}
	}

	/// Field name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Array index, if the segment selects an element.
	pub fn array_index(&self) -> Option<usize> {
		self.array_index
	}

	/// Instance type discovered when the path was last resolved against a value.
	pub fn instance_type(&self) -> Option<StructId> {
		self.instance_type
	}

	/// How the instance type is reached.
	pub fn instance_access(&self) -> InstanceAccessKind {
		self.instance_access
	}

	/// Property GUID recorded for fields of script-defined structs.
	pub fn property_guid(&self) -> Option<Guid> {
		self.property_guid
	}

	/// Replace the field name.
	pub fn set_name(&mut self, name: &str) {
		self.name = name.into();
	}

	/// Replace the array index.
	pub fn set_array_index(&mut self, index: Option<usize>) {
		self.array_index = index;
	}

	/// Record the instance type and how it is reached.
	pub fn set_instance_type(&mut self, ty: Option<StructId>, access: InstanceAccessKind) {
		self.instance_type = ty;
		self.instance_access = if ty.is_some() { access } else { InstanceAccessKind::None };
	}

	/// Record the property GUID.
	pub fn set_property_guid(&mut self, guid: Option<Guid>) {
		self.property_guid = guid;
	}
}

impl PartialEq for PathSegment {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name && self.instance_type == other.instance_type && self.array_index == other.array_index
	}
}

impl Eq for PathSegment {}

/// Segment wrapped with caller-supplied markers when formatting.
#[derive(Debug, Clone, Copy)]
pub struct PathHighlight<'a> {
	/// Segment index to wrap.
	pub segment: usize,
	/// Text emitted before the segment.
	pub prefix: &'a str,
	/// Text emitted after the segment.
	pub suffix: &'a str,
}

/// Rendering options for [`PropertyPath::format`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PathFormat<'a> {
	/// Optional highlighted segment.
	pub highlight: Option<PathHighlight<'a>>,
	/// Render `(Type)` before segments with a recorded instance type.
	pub include_instance_types: bool,
	/// First segment to render; earlier segments are hidden.
	pub first_segment: usize,
	/// Schema used to name instance types.
	pub schema: Option<&'a Schema>,
}

/// Ordered field path relative to a root struct.
///
/// An empty path designates the root struct itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyPath {
	root: Guid,
	segments: Vec<PathSegment>,
}

impl PropertyPath {
	/// Empty path rooted at `root`.
	pub fn new(root: Guid) -> Self {
		Self {
			root,
			segments: Vec::new(),
		}
	}

	/// Path from explicit segments.
	pub fn from_segments(root: Guid, segments: Vec<PathSegment>) -> Self {
		Self { root, segments }
	}

	/// Parse dotted field syntax with optional `[index]` selectors.
	pub fn parse(input: &str) -> Result<Self> {
		Self::parse_with_root(Guid::NIL, input)
	}

	/// Parse a path and attach it to a root struct id.
	pub fn parse_with_root(root: Guid, input: &str) -> Result<Self> {
		let invalid = || BindError::InvalidPath { path: input.to_owned() };
		let bytes = input.as_bytes();
		let mut idx = 0_usize;
		let mut segments = Vec::new();

		while idx < bytes.len() {
			let start = idx;
			while idx < bytes.len() && is_name_byte(bytes[idx]) {
				idx += 1;
			}
			if idx == start {
				return Err(invalid());
			}

			let mut segment = PathSegment::new(&input[start..idx]);

			if idx < bytes.len() && bytes[idx] == b'[' {
				idx += 1;
				let n_start = idx;
				while idx < bytes.len() && bytes[idx].is_ascii_digit() {
					idx += 1;
				}
				if idx == n_start || idx >= bytes.len() || bytes[idx] != b']' {
					return Err(invalid());
				}

				let number = input[n_start..idx].parse::<usize>().map_err(|_| invalid())?;
				segment.array_index = Some(number);
				idx += 1;
			}

			segments.push(segment);

			if idx < bytes.len() {
				if bytes[idx] != b'.' {
					return Err(invalid());
				}
				idx += 1;
				if idx >= bytes.len() {
					return Err(invalid());
				}
			}
		}

		Ok(Self { root, segments })
	}

	/// Id of the struct the path starts from.
	pub fn root(&self) -> Guid {
		self.root
	}

	/// Rebind the path to another root struct.
	pub fn set_root(&mut self, root: Guid) {
		self.root = root;
	}

	/// Ordered segments.
	pub fn segments(&self) -> &[PathSegment] {
		&self.segments
	}

	/// Mutable segments, used when patching instance types and redirects.
	pub fn segments_mut(&mut self) -> &mut [PathSegment] {
		&mut self.segments
	}

	/// Append a segment.
	pub fn push(&mut self, segment: PathSegment) {
		self.segments.push(segment);
	}

	/// Number of segments.
	pub fn len(&self) -> usize {
		self.segments.len()
	}

	/// Return whether the path designates the root struct itself.
	pub fn is_empty(&self) -> bool {
		self.segments.is_empty()
	}

	/// Return whether `other` is this path or one of its ancestors.
	pub fn includes(&self, other: &PropertyPath) -> bool {
		self.root == other.root && self.segments.len() >= other.segments.len() && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
	}

	/// Render the path with the given options.
	pub fn format(&self, options: &PathFormat<'_>) -> String {
		let mut out = String::new();
		for (index, segment) in self.segments.iter().enumerate().skip(options.first_segment) {
			if index > options.first_segment {
				out.push('.');
			}

			let highlight = options.highlight.filter(|item| item.segment == index);
			if let Some(item) = highlight {
				out.push_str(item.prefix);
			}

			if options.include_instance_types
				&& let Some(ty) = segment.instance_type
			{
				match options.schema {
					Some(schema) => out.push_str(&format!("({})", schema.struct_name(ty))),
					None => out.push_str(&format!("(#{})", ty.0)),
				}
			}

			out.push_str(&segment.name);
			if let Some(array_index) = segment.array_index {
				out.push_str(&format!("[{array_index}]"));
			}

			if let Some(item) = highlight {
				out.push_str(item.suffix);
			}
		}
		out
	}

	/// Render the first `count` segments, used for error sub-paths.
	pub fn format_prefix(&self, count: usize) -> String {
		let prefix = Self {
			root: self.root,
			segments: self.segments[..count.min(self.segments.len())].to_vec(),
		};
		prefix.to_string()
	}
}

impl fmt::Display for PropertyPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.format(&PathFormat::default()))
	}
}

fn is_name_byte(byte: u8) -> bool {
	!matches!(byte, b'.' | b'[' | b']' | b'(' | b')') && !byte.is_ascii_whitespace() && !byte.is_ascii_control()
}
