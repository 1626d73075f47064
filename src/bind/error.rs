use thiserror::Error;

use crate::bind::{Address, Guid, StructId};

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, BindError>;

/// Errors produced while describing types, resolving paths, and copying bound values.
#[derive(Debug, Error)]
pub enum BindError {
	/// Filesystem or stream IO failure.
	#[error("io: {0}")]
	Io(#[from] std::io::Error),
	/// Scenario document was not valid JSON for the expected shape.
	#[error("scenario json: {0}")]
	Json(#[from] serde_json::Error),
	/// Decompression output exceeded configured safety limit.
	#[error("decompressed output exceeded limit {limit} bytes")]
	DecompressedTooLarge {
		/// Maximum allowed output bytes.
		limit: usize,
	},
	/// Path text is malformed.
	#[error("invalid property path: {path}")]
	InvalidPath {
		/// Original path text.
		path: String,
	},
	/// Struct name was registered twice.
	#[error("duplicate struct: {name}")]
	DuplicateStruct {
		/// Struct name.
		name: String,
	},
	/// Field name was declared twice on one struct.
	#[error("duplicate field {field} on {struct_name}")]
	DuplicateField {
		/// Owning struct name.
		struct_name: String,
		/// Field name.
		field: String,
	},
	/// Struct id or name does not exist in the schema.
	#[error("unknown struct: {name}")]
	UnknownStruct {
		/// Struct name or rendered id.
		name: String,
	},
	/// Struct was forward-declared but never defined.
	#[error("struct {name} is declared but has no layout")]
	UndefinedStruct {
		/// Struct name.
		name: String,
	},
	/// Field type cannot be used in the requested position.
	#[error("invalid field {field} on {struct_name}: {reason}")]
	InvalidFieldType {
		/// Owning struct name.
		struct_name: String,
		/// Field name.
		field: String,
		/// Why the declaration was rejected.
		reason: &'static str,
	},
	/// Path could not be resolved against a type or value.
	#[error("{path}: {reason}")]
	Resolve {
		/// Sub-path up to and including the failing segment.
		path: String,
		/// Human-readable failure description.
		reason: String,
	},
	/// Compiled indirection does not fit 16-bit storage.
	#[error("{path}: {what} {value} does not fit in 16 bits")]
	IndexOverflow {
		/// Path being compiled.
		path: String,
		/// Which quantity overflowed.
		what: &'static str,
		/// Offending value.
		value: usize,
	},
	/// Flat collection arrays are full.
	#[error("binding collection limit reached: {what} (max {max})")]
	CollectionFull {
		/// Which array overflowed.
		what: &'static str,
		/// Maximum number of entries.
		max: usize,
	},
	/// No copy operation exists between the two leaf properties.
	#[error("cannot copy {source_desc} to {target_desc}")]
	IncompatibleTypes {
		/// Source property description.
		source_desc: String,
		/// Target property description.
		target_desc: String,
	},
	/// Leaf indirection has no container type.
	#[error("copy type: missing {side} container type")]
	MissingContainerType {
		/// Binding side label.
		side: &'static str,
	},
	/// Bindable struct id was registered twice.
	#[error("duplicate bindable struct id {id}")]
	DuplicateBindableStruct {
		/// Offending id.
		id: Guid,
	},
	/// Bindable struct lookup failed.
	#[error("could not find bindable struct for {what}")]
	MissingBindableStruct {
		/// Which descriptor was looked up.
		what: String,
	},
	/// Heap access fell outside live allocations.
	#[error("bad heap access at 0x{addr:016x} ({len} bytes)")]
	BadAddress {
		/// Address accessed.
		addr: Address,
		/// Access length.
		len: usize,
	},
	/// Heap allocation was requested with an undefined struct type.
	#[error("cannot allocate {ty:?}: {reason}")]
	BadAllocation {
		/// Requested struct type.
		ty: Option<StructId>,
		/// Why the allocation failed.
		reason: &'static str,
	},
	/// Dynamic value did not match the field type it was written to.
	#[error("value mismatch: expected {expected}, got {got}")]
	ValueMismatch {
		/// Expected value kind.
		expected: String,
		/// Value kind supplied.
		got: String,
	},
	/// Scenario document references something it does not declare.
	#[error("scenario: {reason}")]
	Scenario {
		/// Description of the inconsistency.
		reason: String,
	},
}
