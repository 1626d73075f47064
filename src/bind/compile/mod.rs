use crate::bind::{AccessKind, BindError, FieldRef, Indirection, PropertyPath, Result, StructId};

/// 16-bit index into a flat collection array; `u16::MAX` means "none".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Index16(u16);

impl Index16 {
	/// The "none" index.
	pub const INVALID: Index16 = Index16(u16::MAX);
	/// Largest storable index.
	pub const MAX: usize = u16::MAX as usize - 1;

	/// Wrap `value` if it fits, leaving room for the sentinel.
	pub fn new(value: usize) -> Option<Self> {
		(value <= Self::MAX).then_some(Self(value as u16))
	}

	/// Unwrapped index, `None` for the sentinel.
	pub fn get(self) -> Option<usize> {
		(self != Self::INVALID).then_some(usize::from(self.0))
	}

	/// Return whether this is a real index.
	pub fn is_valid(self) -> bool {
		self != Self::INVALID
	}
}

impl Default for Index16 {
	fn default() -> Self {
		Self::INVALID
	}
}

/// Compiled runtime hop, linked into a chain through `next_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropertyIndirection {
	/// Byte offset applied before the access.
	pub offset: u16,
	/// Element index for array and container hops.
	pub array_index: Index16,
	/// Next hop in the collection's flat indirection array.
	pub next_index: Index16,
	/// How the hop is taken.
	pub access_kind: AccessKind,
	/// Runtime type the hop must land on.
	pub instance_type: Option<StructId>,
	/// Array field for `IndexArray` hops.
	pub array_field: Option<FieldRef>,
}

/// Leaf of a compiled path: the field copied from or to.
///
/// A leaf without a field stands for the whole base struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LeafIndirection {
	/// Leaf field, `None` for the struct itself.
	pub field: Option<FieldRef>,
	/// Type the leaf field lives on, or the base type.
	pub container_type: Option<StructId>,
}

/// Iterate a compiled chain starting at `first`.
pub fn chain<'a>(first: &'a PropertyIndirection, rest: &'a [PropertyIndirection]) -> impl Iterator<Item = &'a PropertyIndirection> + 'a {
	let mut current = Some(first);
	std::iter::from_fn(move || {
		let item = current?;
		current = item.next_index.get().and_then(|index| rest.get(index));
		Some(item)
	})
}

/// Compile resolved hops into a minimal chain, appending all but the first hop to `flat`.
///
/// Adjacent offsets are merged and zero offsets that follow a hop already
/// landing on its target are dropped, so the runtime walk takes as few hops as
/// possible.
pub fn compile_indirections(
	path: &PropertyPath,
	base_type: Option<StructId>,
	resolved: &[Indirection],
	flat: &mut Vec<PropertyIndirection>,
) -> Result<(PropertyIndirection, LeafIndirection)> {
	let Some(leaf) = resolved.last() else {
		let first = PropertyIndirection {
			access_kind: AccessKind::Offset,
			..PropertyIndirection::default()
		};
		return Ok((
			first,
			LeafIndirection {
				field: None,
				container_type: base_type,
			},
		));
	};

	let overflow = |what: &'static str, value: usize| BindError::IndexOverflow {
		path: path.to_string(),
		what,
		value,
	};

	let mut steps = Vec::with_capacity(resolved.len());
	for hop in resolved {
		let mut step = PropertyIndirection {
			offset: u16::try_from(hop.offset).map_err(|_| overflow("offset", hop.offset))?,
			access_kind: hop.access_kind,
			instance_type: hop.instance_type,
			..PropertyIndirection::default()
		};
		match hop.access_kind {
			AccessKind::IndexArray => {
				step.array_index = Index16::new(hop.array_index).ok_or_else(|| overflow("array index", hop.array_index))?;
				step.array_field = hop.field;
			}
			AccessKind::StructInstanceContainer => {
				step.array_index = Index16::new(hop.array_index).ok_or_else(|| overflow("array index", hop.array_index))?;
			}
			_ => {}
		}
		steps.push(step);
	}

	collapse(&mut steps).map_err(|sum| overflow("offset", sum))?;

	let mut first = steps[0];
	let mut prev: Option<usize> = None;
	for step in &steps[1..] {
		let index = Index16::new(flat.len()).ok_or(BindError::CollectionFull {
			what: "property indirections",
			max: Index16::MAX + 1,
		})?;
		flat.push(*step);
		match prev {
			None => first.next_index = index,
			Some(at) => flat[at].next_index = index,
		}
		prev = index.get();
	}

	Ok((
		first,
		LeafIndirection {
			field: leaf.field,
			container_type: leaf.container_type,
		},
	))
}

fn collapse(steps: &mut Vec<PropertyIndirection>) -> std::result::Result<(), usize> {
	let mut index = 0;
	while index + 1 < steps.len() {
		let current = steps[index];
		let next = steps[index + 1];

		if current.access_kind == AccessKind::Offset && next.access_kind == AccessKind::Offset {
			let sum = usize::from(current.offset) + usize::from(next.offset);
			steps[index].offset = u16::try_from(sum).map_err(|_| sum)?;
			steps.remove(index + 1);
			continue;
		}

		if lands_on_target(current.access_kind) && next.access_kind == AccessKind::Offset && next.offset == 0 {
			steps.remove(index + 1);
			continue;
		}

		index += 1;
	}
	Ok(())
}

fn lands_on_target(kind: AccessKind) -> bool {
	matches!(
		kind,
		AccessKind::IndexArray
			| AccessKind::StructInstance
			| AccessKind::SharedStruct
			| AccessKind::StructInstanceContainer
			| AccessKind::Object
			| AccessKind::ObjectInstance
	)
}

#[cfg(test)]
mod tests;
