use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::bind::{
	Address, BindError, CopyType, FieldRef, FieldType, Guid, Heap, Index16, PropertyIndirection, PropertyPath, RedirectRegistry, ResolveEnv, Result, Schema,
	StructId, View, compile_indirections, describe_leaf, resolve_copy_type, resolve_indirections, update_segments_from_value,
};

mod registry;

pub use registry::{BindableStructDescriptor, BindableStructRegistry, BindableStructs, BindingDataProvider, BindingSide, DataHandle, StructHandle};

/// Declared intent to copy the value at `source_path` into `target_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding<H> {
	/// Path read by the copy, rooted at the source struct id.
	pub source_path: PropertyPath,
	/// Path written by the copy, rooted at the target struct id.
	pub target_path: PropertyPath,
	/// Consumer key of the source struct.
	pub source_data_handle: H,
	/// Consumer key of the target struct.
	pub target_data_handle: H,
}

impl<H: DataHandle> Binding<H> {
	/// Binding without data handles; `rebuild_batches` fills them from a registry.
	pub fn new(source_path: PropertyPath, target_path: PropertyPath) -> Self {
		Self {
			source_path,
			target_path,
			source_data_handle: H::default(),
			target_data_handle: H::default(),
		}
	}

	/// Binding with explicit data handles.
	pub fn with_handles(source_path: PropertyPath, target_path: PropertyPath, source_data_handle: H, target_data_handle: H) -> Self {
		Self {
			source_path,
			target_path,
			source_data_handle,
			target_data_handle,
		}
	}
}

/// Compiled form of one binding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CopyInfo<H> {
	/// First hop of the source chain.
	pub source_indirection: PropertyIndirection,
	/// First hop of the target chain.
	pub target_indirection: PropertyIndirection,
	/// Source leaf field, `None` when the whole source struct is copied.
	pub source_leaf: Option<FieldRef>,
	/// Target leaf field.
	pub target_leaf: Option<FieldRef>,
	/// Container type of the source leaf.
	pub source_struct_type: Option<StructId>,
	/// Bytes copied by `CopyPlain`.
	pub copy_size: usize,
	/// Consumer key of the source struct.
	pub source_data_handle: H,
	/// Copy strategy; `None` marks an unresolved binding.
	pub copy_type: CopyType,
}

/// Copies sharing one target struct, stored as a range of the collection's bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyBatch<H> {
	/// Struct every copy in the batch writes to.
	pub target_struct: BindableStructDescriptor<H>,
	/// First binding of the batch.
	pub bindings_begin: Index16,
	/// One past the last binding of the batch.
	pub bindings_end: Index16,
}

impl<H> CopyBatch<H> {
	/// Binding index range covered by the batch.
	pub fn range(&self) -> std::ops::Range<usize> {
		let begin = self.bindings_begin.get().unwrap_or(0);
		let end = self.bindings_end.get().unwrap_or(begin);
		begin..end
	}
}

/// How `remove_bindings` matches target paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
	/// Target path equals the given path.
	#[default]
	Exact,
	/// Target path is the given path or lies below it.
	Includes,
}

/// Copy functor used by `StructReference` copies: `(heap, source field type, source, target)`.
pub type StructReferenceCopyFn = Box<dyn Fn(&mut Heap, &FieldType, Address, Address) -> Result<()>>;
/// Reset functor used by `StructReference` resets.
pub type StructReferenceResetFn = Box<dyn Fn(&mut Heap, Address) -> Result<()>>;

/// Host struct reference wrapper type and the functors that fill and clear it.
pub struct StructReferenceHooks {
	/// Wrapper struct type.
	pub ty: StructId,
	/// Points the wrapper at a source value.
	pub copy: StructReferenceCopyFn,
	/// Clears the wrapper.
	pub reset: StructReferenceResetFn,
}

impl fmt::Debug for StructReferenceHooks {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StructReferenceHooks").field("ty", &self.ty).finish_non_exhaustive()
	}
}

/// Everything `resolve_paths` and `add_binding` consult.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a, H: DataHandle> {
	/// Type descriptors.
	pub schema: &'a Schema,
	/// Live memory; `None` resolves by type only.
	pub heap: Option<&'a Heap>,
	/// Bindable struct lookup.
	pub registry: &'a dyn BindableStructRegistry<H>,
	/// Live view lookup.
	pub provider: Option<&'a dyn BindingDataProvider<H>>,
	/// Rename redirects consulted when `handle_redirects` is set.
	pub redirects: Option<&'a RedirectRegistry>,
	/// Recover renamed properties through `redirects` and property GUIDs.
	pub handle_redirects: bool,
}

impl<'a, H: DataHandle> ResolveContext<'a, H> {
	/// Context resolving by type only.
	pub fn types(schema: &'a Schema, registry: &'a dyn BindableStructRegistry<H>) -> Self {
		Self {
			schema,
			heap: None,
			registry,
			provider: None,
			redirects: None,
			handle_redirects: false,
		}
	}

	/// Context resolving against live values.
	pub fn live(schema: &'a Schema, heap: &'a Heap, registry: &'a dyn BindableStructRegistry<H>, provider: &'a dyn BindingDataProvider<H>) -> Self {
		Self {
			schema,
			heap: Some(heap),
			registry,
			provider: Some(provider),
			redirects: None,
			handle_redirects: false,
		}
	}

	/// Enable redirect handling, optionally with a rename registry.
	pub fn with_redirects(self, redirects: Option<&'a RedirectRegistry>) -> Self {
		Self {
			redirects,
			handle_redirects: true,
			..self
		}
	}

	fn env(&self) -> ResolveEnv<'a> {
		ResolveEnv {
			schema: self.schema,
			heap: self.heap,
			redirects: self.redirects,
		}
	}
}

/// Editor bindings plus the compiled copy plan built from them.
///
/// Structural mutations drop the compiled plan; call [`rebuild_batches`]
/// (or [`add_copy_batch`]) and [`resolve_paths`] again before copying.
///
/// [`rebuild_batches`]: BindingCollection::rebuild_batches
/// [`add_copy_batch`]: BindingCollection::add_copy_batch
/// [`resolve_paths`]: BindingCollection::resolve_paths
#[derive(Debug)]
pub struct BindingCollection<H: DataHandle> {
	pub(crate) bindings: Vec<Binding<H>>,
	pub(crate) copy_batches: Vec<CopyBatch<H>>,
	pub(crate) copies: Vec<CopyInfo<H>>,
	pub(crate) indirections: Vec<PropertyIndirection>,
	pub(crate) struct_reference: Option<StructReferenceHooks>,
	pub(crate) resolved: bool,
}

impl<H: DataHandle> Default for BindingCollection<H> {
	fn default() -> Self {
		Self {
			bindings: Vec::new(),
			copy_batches: Vec::new(),
			copies: Vec::new(),
			indirections: Vec::new(),
			struct_reference: None,
			resolved: false,
		}
	}
}

impl<H: DataHandle> BindingCollection<H> {
	/// Create an empty collection.
	pub fn new() -> Self {
		Self::default()
	}

	/// Register the struct reference wrapper type and its functors.
	pub fn set_struct_reference_hooks(&mut self, hooks: StructReferenceHooks) {
		self.struct_reference = Some(hooks);
		self.unresolve();
	}

	/// Declared bindings.
	pub fn bindings(&self) -> &[Binding<H>] {
		&self.bindings
	}

	/// Number of declared bindings.
	pub fn num_bindings(&self) -> usize {
		self.bindings.len()
	}

	/// Compiled batches.
	pub fn copy_batches(&self) -> &[CopyBatch<H>] {
		&self.copy_batches
	}

	/// Compiled copies, parallel to `bindings`.
	pub fn copies(&self) -> &[CopyInfo<H>] {
		&self.copies
	}

	/// Compiled copies of one batch.
	pub fn batch_copies(&self, batch_index: usize) -> &[CopyInfo<H>] {
		self.copy_batches
			.get(batch_index)
			.and_then(|batch| self.copies.get(batch.range()))
			.unwrap_or_default()
	}

	/// Shared flat array of non-first hops.
	pub fn property_indirections(&self) -> &[PropertyIndirection] {
		&self.indirections
	}

	/// Return whether `resolve_paths` ran since the last mutation.
	pub fn is_resolved(&self) -> bool {
		self.resolved
	}

	/// Drop every compiled batch, copy and indirection.
	pub fn reset(&mut self) {
		self.copy_batches.clear();
		self.unresolve();
	}

	fn unresolve(&mut self) {
		self.copies.clear();
		self.indirections.clear();
		self.resolved = false;
	}

	/// Add a binding, replacing any binding with the same target path.
	///
	/// With a data-view provider in `ctx`, both paths are patched with the
	/// instance types and redirected names of the live values.
	pub fn add_binding(&mut self, mut binding: Binding<H>, ctx: Option<&ResolveContext<'_, H>>) -> Result<()> {
		if let Some(ctx) = ctx
			&& let Some(provider) = ctx.provider
		{
			let env = ctx.env();
			for side in [BindingSide::Source, BindingSide::Target] {
				let Some(view) = provider.binding_data_view(&binding, side).filter(View::is_valid) else {
					continue;
				};
				let path = match side {
					BindingSide::Source => &mut binding.source_path,
					BindingSide::Target => &mut binding.target_path,
				};
				if let Err(err) = update_segments_from_value(&env, path, view) {
					tracing::debug!("could not patch {} path {path}: {err}", side.as_str());
				}
			}
		}

		self.bindings.retain(|item| item.target_path != binding.target_path);
		if self.bindings.len() >= Index16::MAX {
			return Err(BindError::CollectionFull {
				what: "bindings",
				max: Index16::MAX,
			});
		}
		self.bindings.push(binding);
		self.reset();
		Ok(())
	}

	/// Remove bindings whose target path matches `target`; returns how many were removed.
	pub fn remove_bindings(&mut self, target: &PropertyPath, mode: SearchMode) -> usize {
		let before = self.bindings.len();
		self.bindings.retain(|item| match mode {
			SearchMode::Exact => item.target_path != *target,
			SearchMode::Includes => !item.target_path.includes(target),
		});
		let removed = before - self.bindings.len();
		if removed > 0 {
			self.reset();
		}
		removed
	}

	/// Duplicate every binding targeting `from` as a binding targeting `to`; returns how many were added.
	///
	/// A duplicate replaces any binding already on its target path.
	pub fn copy_bindings(&mut self, from: Guid, to: Guid) -> Result<usize> {
		let copies: Vec<Binding<H>> = self
			.bindings
			.iter()
			.filter(|item| item.target_path.root() == from)
			.map(|item| {
				let mut copy = item.clone();
				copy.target_path.set_root(to);
				copy
			})
			.collect();
		if copies.is_empty() {
			return Ok(0);
		}

		let kept = self
			.bindings
			.iter()
			.filter(|item| !copies.iter().any(|copy| copy.target_path == item.target_path))
			.count();
		if kept + copies.len() > Index16::MAX {
			return Err(BindError::CollectionFull {
				what: "bindings",
				max: Index16::MAX,
			});
		}
		self.bindings.retain(|item| !copies.iter().any(|copy| copy.target_path == item.target_path));
		let added = copies.len();
		self.bindings.extend(copies);
		self.reset();
		Ok(added)
	}

	/// Drop bindings whose structs are gone, whose target path is empty, or whose paths no longer resolve.
	pub fn remove_invalid_bindings(&mut self, env: &ResolveEnv<'_>, valid_structs: &HashMap<Guid, View>) -> usize {
		let before = self.bindings.len();
		self.bindings.retain(|item| {
			let (Some(source), Some(target)) = (valid_structs.get(&item.source_path.root()), valid_structs.get(&item.target_path.root())) else {
				tracing::debug!("dropping binding {} -> {}: struct no longer exists", item.source_path, item.target_path);
				return false;
			};
			if item.target_path.is_empty() {
				tracing::debug!("dropping binding {}: empty target path", item.source_path);
				return false;
			}
			for (path, view) in [(&item.source_path, source), (&item.target_path, target)] {
				if let Err(err) = resolve_indirections(env, *view, path, true) {
					tracing::debug!("dropping binding {} -> {}: {err}", item.source_path, item.target_path);
					return false;
				}
			}
			true
		});
		let removed = before - self.bindings.len();
		if removed > 0 {
			self.reset();
		}
		removed
	}

	/// Binding whose target path equals `target`.
	pub fn find_binding(&self, target: &PropertyPath) -> Option<&Binding<H>> {
		self.bindings.iter().find(|item| item.target_path == *target)
	}

	/// Return whether a binding targets exactly `target`.
	pub fn has_binding(&self, target: &PropertyPath) -> bool {
		self.find_binding(target).is_some()
	}

	/// Bindings writing into the struct with id `id`.
	pub fn bindings_for_target_struct(&self, id: Guid) -> impl Iterator<Item = &Binding<H>> {
		self.bindings.iter().filter(move |item| item.target_path.root() == id)
	}

	/// Return whether any binding touches one of `structs`, through a root struct or a segment instance type.
	pub fn contains_any_struct(&self, structs: &HashSet<StructId>, registry: &dyn BindableStructRegistry<H>) -> bool {
		let root_matches = |root: Guid| {
			registry
				.bindable_struct_descriptor_by_id(root)
				.and_then(|item| item.ty)
				.is_some_and(|ty| structs.contains(&ty))
		};
		let path_matches = |path: &PropertyPath| {
			root_matches(path.root())
				|| path
					.segments()
					.iter()
					.any(|segment| segment.instance_type().is_some_and(|ty| structs.contains(&ty)))
		};
		self.bindings.iter().any(|item| path_matches(&item.source_path) || path_matches(&item.target_path))
	}

	/// Append a batch of bindings all targeting `target_struct`; returns the batch index.
	pub fn add_copy_batch(&mut self, target_struct: BindableStructDescriptor<H>, bindings: impl IntoIterator<Item = Binding<H>>) -> Result<usize> {
		let full = |what: &'static str| BindError::CollectionFull { what, max: Index16::MAX };

		let begin = self.bindings.len();
		self.bindings.extend(bindings.into_iter().map(|mut item| {
			item.target_data_handle = target_struct.data_handle;
			item
		}));
		let end = self.bindings.len();
		let (Some(bindings_begin), Some(bindings_end)) = (Index16::new(begin), Index16::new(end)) else {
			self.bindings.truncate(begin);
			return Err(full("bindings"));
		};
		if self.copy_batches.len() >= Index16::MAX {
			self.bindings.truncate(begin);
			return Err(full("copy batches"));
		}

		self.unresolve();
		self.copy_batches.push(CopyBatch {
			target_struct,
			bindings_begin,
			bindings_end,
		});
		Ok(self.copy_batches.len() - 1)
	}

	/// Regroup bindings into one batch per target struct and fill data handles from `registry`.
	///
	/// Bindings whose target struct is not registered are kept after the last
	/// batch and never copied.
	pub fn rebuild_batches(&mut self, registry: &dyn BindableStructRegistry<H>) -> Result<()> {
		self.reset();

		let mut order: Vec<Guid> = Vec::new();
		let mut groups: HashMap<Guid, Vec<Binding<H>>> = HashMap::new();
		for item in self.bindings.drain(..) {
			let root = item.target_path.root();
			if !groups.contains_key(&root) {
				order.push(root);
			}
			groups.entry(root).or_default().push(item);
		}

		let mut orphans = Vec::new();
		for root in order {
			let Some(mut group) = groups.remove(&root) else {
				continue;
			};
			for item in &mut group {
				if let Some(source) = registry.bindable_struct_descriptor_by_id(item.source_path.root()) {
					item.source_data_handle = source.data_handle;
				}
			}
			match registry.bindable_struct_descriptor_by_id(root) {
				Some(target) => {
					self.add_copy_batch(target, group)?;
				}
				None => {
					tracing::warn!("no bindable struct with id {root}; {} binding(s) left unbatched", group.len());
					orphans.extend(group);
				}
			}
		}
		self.bindings.extend(orphans);
		Ok(())
	}

	/// Resolve and compile every batched binding.
	///
	/// A binding that fails is compiled as a no-op and logged; the rest keep
	/// resolving. Returns `false` when any binding failed.
	pub fn resolve_paths(&mut self, ctx: &ResolveContext<'_, H>) -> bool {
		self.copies.clear();
		self.indirections.clear();
		self.copies.resize(self.bindings.len(), CopyInfo::default());

		let struct_reference = self.struct_reference.as_ref().map(|hooks| hooks.ty);
		let mut all_resolved = true;

		for batch in &self.copy_batches {
			for index in batch.range() {
				let Some(binding) = self.bindings.get(index) else {
					continue;
				};
				let mark = self.indirections.len();
				match resolve_binding(ctx, struct_reference, &batch.target_struct, binding, &mut self.indirections) {
					Ok(copy) => {
						tracing::trace!(
							"resolved {} -> {} as {}",
							binding.source_path,
							binding.target_path,
							copy.copy_type.as_str()
						);
						self.copies[index] = copy;
					}
					Err(err) => {
						tracing::warn!("failed to resolve binding {} -> {}: {err}", binding.source_path, binding.target_path);
						self.indirections.truncate(mark);
						self.copies[index] = CopyInfo {
							source_data_handle: binding.source_data_handle,
							..CopyInfo::default()
						};
						all_resolved = false;
					}
				}
			}
		}

		self.resolved = true;
		all_resolved
	}
}

fn resolve_binding<H: DataHandle>(
	ctx: &ResolveContext<'_, H>,
	struct_reference: Option<StructId>,
	target_struct: &BindableStructDescriptor<H>,
	binding: &Binding<H>,
	flat: &mut Vec<PropertyIndirection>,
) -> Result<CopyInfo<H>> {
	let source_struct = ctx
		.registry
		.bindable_struct_descriptor_from_handle(binding.source_data_handle)
		.ok_or_else(|| BindError::MissingBindableStruct {
			what: format!("source of {}", binding.source_path),
		})?;
	let source_type = source_struct.ty.ok_or_else(|| BindError::MissingBindableStruct {
		what: format!("type of {}", source_struct.name),
	})?;
	let target_type = target_struct.ty.ok_or_else(|| BindError::MissingBindableStruct {
		what: format!("type of {}", target_struct.name),
	})?;

	let view_for = |side: BindingSide, ty: StructId| {
		ctx.provider
			.and_then(|provider| provider.binding_data_view(binding, side))
			.filter(|view| view.is_valid() && view.ty().is_some())
			.unwrap_or_else(|| View::type_only(ty))
	};
	let source_view = view_for(BindingSide::Source, source_type);
	let target_view = view_for(BindingSide::Target, target_type);

	let env = ctx.env();
	let source_hops = resolve_indirections(&env, source_view, &binding.source_path, ctx.handle_redirects)?;
	let target_hops = resolve_indirections(&env, target_view, &binding.target_path, ctx.handle_redirects)?;

	let (source_indirection, source_leaf) = compile_indirections(&binding.source_path, source_view.ty(), &source_hops, flat)?;
	let (target_indirection, target_leaf) = compile_indirections(&binding.target_path, target_view.ty(), &target_hops, flat)?;

	let resolved = resolve_copy_type(ctx.schema, &source_leaf, &target_leaf, struct_reference)?;
	tracing::trace!(
		"copy {} -> {}",
		describe_leaf(ctx.schema, &source_leaf),
		describe_leaf(ctx.schema, &target_leaf)
	);

	Ok(CopyInfo {
		source_indirection,
		target_indirection,
		source_leaf: source_leaf.field,
		target_leaf: target_leaf.field,
		source_struct_type: source_leaf.container_type,
		copy_size: resolved.copy_size,
		source_data_handle: binding.source_data_handle,
		copy_type: resolved.copy_type,
	})
}
