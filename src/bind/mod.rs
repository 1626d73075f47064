mod collection;
mod compile;
/// Optional zstd decoding for scenario documents.
pub mod compression;
mod copy_type;
mod error;
mod exec;
mod heap;
/// Deep copy, reset and scalar helpers over heap values.
pub mod ops;
mod path;
mod redirect;
mod resolve;
/// JSON scenario documents and the runner built on them.
pub mod scenario;
mod schema;
#[cfg(test)]
mod test_support;
/// Dynamic value trees for reading and writing heap values.
pub mod value;
mod view;

/// Bindings, compiled copies and the collection that owns them.
pub use collection::{
	BindableStructDescriptor, BindableStructRegistry, BindableStructs, Binding, BindingCollection, BindingDataProvider, BindingSide, CopyBatch, CopyInfo,
	DataHandle, ResolveContext, SearchMode, StructHandle, StructReferenceCopyFn, StructReferenceHooks, StructReferenceResetFn,
};
/// Indirection compilation into compact 16-bit steps.
pub use compile::{Index16, LeafIndirection, PropertyIndirection, chain, compile_indirections};
/// Copy type selection between two leaf properties.
pub use copy_type::{Compatibility, CopyType, ResolvedCopy, describe_leaf, promotion, property_compatibility, resolve_copy_type};
/// Crate error and result aliases.
pub use error::{BindError, Result};
/// Runtime address lookup through compiled chains.
pub use exec::get_address;
/// Allocation-tracking value storage.
pub use heap::{Address, ArrayHeader, Heap, InstancedHeader};
/// Property path model and text format.
pub use path::{InstanceAccessKind, PathFormat, PathHighlight, PathSegment, PropertyPath};
/// Field rename redirects.
pub use redirect::RedirectRegistry;
/// Path resolution into per-segment indirections.
pub use resolve::{AccessKind, Indirection, ResolveEnv, resolve_indirections, update_segments_from_value};
/// Scenario loading and execution.
pub use scenario::{ResolveSummary, Scenario, ScenarioDocument};
/// Reflection types describing structs, fields and enums.
pub use schema::{
	BoolStorage, EnumDef, EnumId, FieldDef, FieldFlags, FieldRef, FieldType, Guid, Layout, MAX_FIELDS, NumericKind, Schema, StructBuilder, StructDef, StructId,
	StructKind,
};
/// Decoded value tree helpers.
pub use value::{FieldValue, StructValue, Value, read_struct, read_value, write_struct, write_value};
/// Typed view over a value in the heap.
pub use view::View;
