use std::collections::{BTreeMap, HashMap};

use crate::bind::{BindError, Result, Schema, StructId};

/// Address of a byte inside a [`Heap`]; zero is null.
pub type Address = u64;

const HEAP_BASE: Address = 0x1000;
const ALLOC_GRANULE: u64 = 16;

#[derive(Debug, Clone)]
struct Allocation {
	ty: Option<StructId>,
	bytes: Vec<u8>,
}

/// Caller-owned memory that bound values live in.
///
/// Allocations are keyed by base address and resolved by range lookup, so an
/// address anywhere inside an allocation maps back to it. Addresses are never
/// reused, which keeps stale references detectable.
#[derive(Debug, Clone)]
pub struct Heap {
	allocations: BTreeMap<Address, Allocation>,
	next: Address,
	names: Vec<Box<str>>,
	name_ids: HashMap<Box<str>, u32>,
}

/// Header shared by dynamic arrays and instanced struct containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArrayHeader {
	/// Element storage, null when empty.
	pub data: Address,
	/// Number of live elements.
	pub num: usize,
	/// Number of allocated element slots.
	pub max: usize,
}

/// Header of an instanced struct value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstancedHeader {
	/// Runtime struct type, `None` when empty.
	pub ty: Option<StructId>,
	/// Payload storage, null when empty.
	pub memory: Address,
}

impl Default for Heap {
	fn default() -> Self {
		Self::new()
	}
}

impl Heap {
	/// Create an empty heap; name id 0 is reserved for the empty name.
	pub fn new() -> Self {
		let mut name_ids = HashMap::new();
		name_ids.insert(Box::<str>::from(""), 0);
		Self {
			allocations: BTreeMap::new(),
			next: HEAP_BASE,
			names: vec!["".into()],
			name_ids,
		}
	}

	/// Allocate zeroed storage, optionally tagged with its runtime type.
	pub fn alloc(&mut self, ty: Option<StructId>, size: usize) -> Address {
		let base = self.next;
		let len = size.max(1);
		let span = (len as u64).div_ceil(ALLOC_GRANULE) * ALLOC_GRANULE;
		self.next = base + span + ALLOC_GRANULE;
		self.allocations.insert(base, Allocation { ty, bytes: vec![0; len] });
		base
	}

	/// Allocate a zeroed value of a defined struct or class.
	pub fn alloc_struct(&mut self, schema: &Schema, ty: StructId) -> Result<Address> {
		let item = schema.struct_def(ty).ok_or(BindError::BadAllocation {
			ty: Some(ty),
			reason: "unknown struct",
		})?;
		if !item.defined {
			return Err(BindError::BadAllocation {
				ty: Some(ty),
				reason: "struct has no layout",
			});
		}
		Ok(self.alloc(Some(ty), item.size))
	}

	/// Release an allocation by base address.
	pub fn free(&mut self, addr: Address) -> bool {
		self.allocations.remove(&addr).is_some()
	}

	/// Return whether `addr` is the base of a live allocation.
	pub fn is_live(&self, addr: Address) -> bool {
		addr != 0 && self.allocations.contains_key(&addr)
	}

	/// Runtime type tag of the allocation based at `addr`.
	pub fn runtime_type(&self, addr: Address) -> Option<StructId> {
		self.allocations.get(&addr).and_then(|item| item.ty)
	}

	/// Size of the allocation based at `addr`.
	pub fn allocation_size(&self, addr: Address) -> Option<usize> {
		self.allocations.get(&addr).map(|item| item.bytes.len())
	}

	/// Map an address to `(base, offset)` of its containing allocation.
	pub fn resolve(&self, addr: Address) -> Option<(Address, usize)> {
		if addr == 0 {
			return None;
		}
		let (base, item) = self.allocations.range(..=addr).next_back()?;
		let offset = (addr - base) as usize;
		if offset >= item.bytes.len() {
			return None;
		}
		Some((*base, offset))
	}

	/// Number of live allocations.
	pub fn len(&self) -> usize {
		self.allocations.len()
	}

	/// Borrow `len` bytes at `addr`.
	pub fn bytes(&self, addr: Address, len: usize) -> Result<&[u8]> {
		let bad = BindError::BadAddress { addr, len };
		if addr == 0 {
			return Err(bad);
		}
		let Some((base, item)) = self.allocations.range(..=addr).next_back() else {
			return Err(bad);
		};
		let start = (addr - base) as usize;
		let end = start.checked_add(len).ok_or(BindError::BadAddress { addr, len })?;
		item.bytes.get(start..end).ok_or(bad)
	}

	/// Mutably borrow `len` bytes at `addr`.
	pub fn bytes_mut(&mut self, addr: Address, len: usize) -> Result<&mut [u8]> {
		if addr == 0 {
			return Err(BindError::BadAddress { addr, len });
		}
		let Some((base, item)) = self.allocations.range_mut(..=addr).next_back() else {
			return Err(BindError::BadAddress { addr, len });
		};
		let start = (addr - *base) as usize;
		let end = start.checked_add(len).ok_or(BindError::BadAddress { addr, len })?;
		item.bytes.get_mut(start..end).ok_or(BindError::BadAddress { addr, len })
	}

	/// Copy `len` bytes from `src` to `dst`; the ranges may overlap.
	pub fn copy_bytes(&mut self, src: Address, dst: Address, len: usize) -> Result<()> {
		if len == 0 || src == dst {
			return Ok(());
		}
		let staged = self.bytes(src, len)?.to_vec();
		self.bytes_mut(dst, len)?.copy_from_slice(&staged);
		Ok(())
	}

	/// Zero `len` bytes at `addr`.
	pub fn zero(&mut self, addr: Address, len: usize) -> Result<()> {
		if len == 0 {
			return Ok(());
		}
		self.bytes_mut(addr, len)?.fill(0);
		Ok(())
	}

	fn read_array<const N: usize>(&self, addr: Address) -> Result<[u8; N]> {
		let mut out = [0_u8; N];
		out.copy_from_slice(self.bytes(addr, N)?);
		Ok(out)
	}

	fn write_array<const N: usize>(&mut self, addr: Address, value: [u8; N]) -> Result<()> {
		self.bytes_mut(addr, N)?.copy_from_slice(&value);
		Ok(())
	}

	/// Read one byte.
	pub fn read_u8(&self, addr: Address) -> Result<u8> {
		Ok(self.read_array::<1>(addr)?[0])
	}

	/// Write one byte.
	pub fn write_u8(&mut self, addr: Address, value: u8) -> Result<()> {
		self.write_array(addr, [value])
	}

	/// Read a little-endian `u32`.
	pub fn read_u32(&self, addr: Address) -> Result<u32> {
		self.read_array(addr).map(u32::from_le_bytes)
	}

	/// Write a little-endian `u32`.
	pub fn write_u32(&mut self, addr: Address, value: u32) -> Result<()> {
		self.write_array(addr, value.to_le_bytes())
	}

	/// Read a little-endian `i32`.
	pub fn read_i32(&self, addr: Address) -> Result<i32> {
		self.read_array(addr).map(i32::from_le_bytes)
	}

	/// Write a little-endian `i32`.
	pub fn write_i32(&mut self, addr: Address, value: i32) -> Result<()> {
		self.write_array(addr, value.to_le_bytes())
	}

	/// Read a little-endian `u64`.
	pub fn read_u64(&self, addr: Address) -> Result<u64> {
		self.read_array(addr).map(u64::from_le_bytes)
	}

	/// Write a little-endian `u64`.
	pub fn write_u64(&mut self, addr: Address, value: u64) -> Result<()> {
		self.write_array(addr, value.to_le_bytes())
	}

	/// Read a little-endian `i64`.
	pub fn read_i64(&self, addr: Address) -> Result<i64> {
		self.read_array(addr).map(i64::from_le_bytes)
	}

	/// Write a little-endian `i64`.
	pub fn write_i64(&mut self, addr: Address, value: i64) -> Result<()> {
		self.write_array(addr, value.to_le_bytes())
	}

	/// Read a little-endian `f32`.
	pub fn read_f32(&self, addr: Address) -> Result<f32> {
		self.read_array(addr).map(f32::from_le_bytes)
	}

	/// Write a little-endian `f32`.
	pub fn write_f32(&mut self, addr: Address, value: f32) -> Result<()> {
		self.write_array(addr, value.to_le_bytes())
	}

	/// Read a little-endian `f64`.
	pub fn read_f64(&self, addr: Address) -> Result<f64> {
		self.read_array(addr).map(f64::from_le_bytes)
	}

	/// Write a little-endian `f64`.
	pub fn write_f64(&mut self, addr: Address, value: f64) -> Result<()> {
		self.write_array(addr, value.to_le_bytes())
	}

	/// Read the header of a dynamic array or instanced struct container.
	pub fn read_array_header(&self, addr: Address) -> Result<ArrayHeader> {
		Ok(ArrayHeader {
			data: self.read_u64(addr)?,
			num: self.read_u32(addr + 8)? as usize,
			max: self.read_u32(addr + 12)? as usize,
		})
	}

	/// Write the header of a dynamic array or instanced struct container.
	pub fn write_array_header(&mut self, addr: Address, header: ArrayHeader) -> Result<()> {
		self.write_u64(addr, header.data)?;
		self.write_u32(addr + 8, header.num as u32)?;
		self.write_u32(addr + 12, header.max as u32)
	}

	/// Read the header of an instanced struct.
	pub fn read_instanced_header(&self, addr: Address) -> Result<InstancedHeader> {
		let raw = self.read_u32(addr)?;
		Ok(InstancedHeader {
			ty: raw.checked_sub(1).map(StructId),
			memory: self.read_u64(addr + 8)?,
		})
	}

	/// Write the header of an instanced struct.
	pub fn write_instanced_header(&mut self, addr: Address, header: InstancedHeader) -> Result<()> {
		self.write_u32(addr, header.ty.map(|id| id.0 + 1).unwrap_or(0))?;
		self.write_u32(addr + 4, 0)?;
		self.write_u64(addr + 8, header.memory)
	}

	/// Intern a name and return its id.
	pub fn intern(&mut self, name: &str) -> u32 {
		if let Some(id) = self.name_ids.get(name) {
			return *id;
		}
		let id = self.names.len() as u32;
		self.names.push(name.into());
		self.name_ids.insert(name.into(), id);
		id
	}

	/// Look up an interned name.
	pub fn name(&self, id: u32) -> Option<&str> {
		self.names.get(id as usize).map(|item| item.as_ref())
	}
}
