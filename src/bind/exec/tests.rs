mod unit_exec_copy {

	use crate::bind::ops::{INSTANCED_ITEM_SIZE, read_string, write_string};
	use crate::bind::test_support::{Fixture, fixture};
	use crate::bind::{
		AccessKind, ArrayHeader, BindableStructs, Binding, BindingCollection, CopyInfo, CopyType, FieldType, Guid, Heap, InstancedHeader, PropertyPath,
		ResolveContext, StructBuilder, StructHandle, View,
	};

	struct Bound {
		fx: Fixture,
		heap: Heap,
		structs: BindableStructs,
		collection: BindingCollection<StructHandle>,
		source: View,
		target: View,
	}

	impl Bound {
		fn at(&self, view: View, field: &str) -> u64 {
			view.memory().expect("memory") + self.fx.offset(self.fx.holder, field)
		}

		fn copy(&mut self) -> bool {
			self.collection.copy_batch(&self.fx.schema, &mut self.heap, &self.structs, 0, self.target)
		}
	}

	fn bind(pairs: &[(&str, &str)], prepare: impl FnOnce(&Fixture, &mut Heap, View, View)) -> Bound {
		let fx = fixture();
		let mut heap = Heap::new();
		let source = fx.alloc(&mut heap, fx.holder);
		let target = fx.alloc(&mut heap, fx.holder);
		prepare(&fx, &mut heap, source, target);

		let mut structs = BindableStructs::new();
		let source_handle = structs.add("source", Guid(1), Some(fx.holder), source).expect("source registers");
		let target_handle = structs.add("target", Guid(2), Some(fx.holder), target).expect("target registers");

		let mut collection = BindingCollection::new();
		for (from, to) in pairs {
			let binding = Binding::with_handles(
				PropertyPath::parse_with_root(Guid(1), from).expect("source path"),
				PropertyPath::parse_with_root(Guid(2), to).expect("target path"),
				source_handle,
				target_handle,
			);
			collection
				.add_binding(binding, Some(&ResolveContext::live(&fx.schema, &heap, &structs, &structs)))
				.expect("binding adds");
		}
		collection.rebuild_batches(&structs).expect("batches build");
		collection.resolve_paths(&ResolveContext::live(&fx.schema, &heap, &structs, &structs));

		Bound {
			fx,
			heap,
			structs,
			collection,
			source,
			target,
		}
	}

	fn items(fx: &Fixture, heap: &mut Heap, view: View, weights: &[f32]) {
		let data = heap.alloc(None, weights.len() * 12);
		for (index, weight) in weights.iter().enumerate() {
			heap.write_f32(data + index as u64 * 12 + 4, *weight).expect("weight");
		}
		let at = view.memory().expect("memory") + fx.offset(fx.holder, "items");
		heap.write_array_header(
			at,
			ArrayHeader {
				data,
				num: weights.len(),
				max: weights.len(),
			},
		)
		.expect("items header");
	}

	#[test]
	fn bool_promotes_into_int32() {
		let mut bound = bind(&[("flag", "value")], |fx, heap, source, _| {
			heap.write_u8(source.memory().expect("memory") + fx.offset(fx.holder, "flag"), 1).expect("flag");
		});
		assert_eq!(bound.collection.batch_copies(0)[0].copy_type, CopyType::PromoteBoolToInt32);

		assert!(bound.copy());
		let value = bound.at(bound.target, "value");
		assert_eq!(bound.heap.read_i32(value).expect("value"), 1);
	}

	#[test]
	fn bitfield_bools_only_touch_their_bit() {
		let mut bound = bind(&[("flag", "off")], |fx, heap, source, target| {
			heap.write_u8(source.memory().expect("memory") + fx.offset(fx.holder, "flag"), 1).expect("flag");
			heap.write_u8(target.memory().expect("memory") + fx.offset(fx.holder, "on"), 0b01).expect("bits");
		});

		assert!(bound.copy());
		let bits = bound.at(bound.target, "on");
		assert_eq!(bound.heap.read_u8(bits).expect("bits"), 0b11);
	}

	#[test]
	fn float_promotion_truncates_toward_zero() {
		let mut bound = bind(&[("ratio", "big"), ("precise", "ratio")], |fx, heap, source, _| {
			let at = source.memory().expect("memory");
			heap.write_f32(at + fx.offset(fx.holder, "ratio"), -2.75).expect("ratio");
			heap.write_f64(at + fx.offset(fx.holder, "precise"), 0.5).expect("precise");
		});

		assert!(bound.copy());
		assert_eq!(bound.heap.read_i64(bound.at(bound.target, "big")).expect("big"), -2);
		assert_eq!(bound.heap.read_f32(bound.at(bound.target, "ratio")).expect("ratio"), 0.5);
	}

	#[test]
	fn struct_copy_moves_every_field() {
		let mut bound = bind(&[("origin", "origin")], |fx, heap, source, _| {
			let at = source.memory().expect("memory") + fx.offset(fx.holder, "origin");
			heap.write_f32(at, 1.0).expect("x");
			heap.write_f32(at + 4, 2.0).expect("y");
			heap.write_f32(at + 8, 3.0).expect("z");
		});

		assert!(bound.copy());
		let at = bound.at(bound.target, "origin");
		assert_eq!(bound.heap.read_f32(at + 8).expect("z"), 3.0);
	}

	#[test]
	fn strings_are_deep_copied() {
		let mut bound = bind(&[("title", "title")], |fx, heap, source, _| {
			write_string(heap, source.memory().expect("memory") + fx.offset(fx.holder, "title"), "hello").expect("title");
		});

		assert!(bound.copy());
		let source = bound.at(bound.source, "title");
		let target = bound.at(bound.target, "title");
		assert_eq!(read_string(&bound.heap, target).expect("target title"), "hello");
		assert_ne!(bound.heap.read_u64(source).expect("source data"), bound.heap.read_u64(target).expect("target data"));
	}

	#[test]
	fn stale_array_index_skips_the_copy() {
		let mut bound = bind(&[("items[1].weight", "ratio")], |fx, heap, source, _| items(fx, heap, source, &[1.0, 2.5]));
		assert!(bound.copy());
		let ratio = bound.at(bound.target, "ratio");
		assert_eq!(bound.heap.read_f32(ratio).expect("ratio"), 2.5);

		let source = bound.source;
		items(&bound.fx, &mut bound.heap, source, &[9.0]);
		assert!(!bound.copy());
		assert_eq!(bound.heap.read_f32(ratio).expect("ratio"), 2.5);
	}

	#[test]
	fn object_references_copy_the_address() {
		let mut pawn = 0;
		let mut bound = bind(&[("actor", "weak")], |fx, heap, source, _| {
			pawn = heap.alloc_struct(&fx.schema, fx.pawn).expect("pawn");
			heap.write_u64(source.memory().expect("memory") + fx.offset(fx.holder, "actor"), pawn).expect("actor");
		});

		assert!(bound.copy());
		assert_eq!(bound.heap.read_u64(bound.at(bound.target, "weak")).expect("weak"), pawn);
	}

	#[test]
	fn dead_object_on_the_path_skips_the_copy() {
		let mut pawn = 0;
		let mut bound = bind(&[("actor.health", "value")], |fx, heap, source, _| {
			pawn = heap.alloc_struct(&fx.schema, fx.pawn).expect("pawn");
			heap.write_i32(pawn, 40).expect("health");
			heap.write_u64(source.memory().expect("memory") + fx.offset(fx.holder, "actor"), pawn).expect("actor");
		});
		assert!(bound.copy());
		assert_eq!(bound.heap.read_i32(bound.at(bound.target, "value")).expect("value"), 40);

		bound.heap.free(pawn);
		assert!(!bound.copy());
	}

	#[test]
	fn fixed_arrays_keep_the_target_length() {
		let mut bound = bind(&[("numbers", "fixed")], |fx, heap, source, target| {
			let numbers = heap.alloc(None, 12);
			for index in 0..3 {
				heap.write_i32(numbers + index * 4, 10 + index as i32).expect("number");
			}
			heap.write_array_header(
				source.memory().expect("memory") + fx.offset(fx.holder, "numbers"),
				ArrayHeader { data: numbers, num: 3, max: 3 },
			)
			.expect("numbers");
			let fixed = heap.alloc(None, 8);
			heap.write_array_header(
				target.memory().expect("memory") + fx.offset(fx.holder, "fixed"),
				ArrayHeader { data: fixed, num: 2, max: 2 },
			)
			.expect("fixed");
		});

		assert!(bound.copy());
		let header = bound.heap.read_array_header(bound.at(bound.target, "fixed")).expect("fixed");
		assert_eq!(header.num, 2);
		assert_eq!(bound.heap.read_i32(header.data + 4).expect("second"), 11);
	}

	#[test]
	fn instanced_payload_fields_are_reachable() {
		let mut bound = bind(&[("payload.weight", "ratio")], |fx, heap, source, _| {
			let payload = heap.alloc_struct(&fx.schema, fx.item).expect("payload");
			heap.write_f32(payload + 4, 7.5).expect("weight");
			heap.write_instanced_header(
				source.memory().expect("memory") + fx.offset(fx.holder, "payload"),
				InstancedHeader {
					ty: Some(fx.item),
					memory: payload,
				},
			)
			.expect("payload header");
		});

		assert!(bound.copy());
		assert_eq!(bound.heap.read_f32(bound.at(bound.target, "ratio")).expect("ratio"), 7.5);
	}

	fn list(fx: &Fixture, heap: &mut Heap, view: View, weights: &[f32]) {
		let data = heap.alloc(None, weights.len() * INSTANCED_ITEM_SIZE);
		for (index, weight) in weights.iter().enumerate() {
			let item = heap.alloc_struct(&fx.schema, fx.item).expect("element");
			heap.write_f32(item + 4, *weight).expect("weight");
			heap.write_instanced_header(
				data + (index * INSTANCED_ITEM_SIZE) as u64,
				InstancedHeader {
					ty: Some(fx.item),
					memory: item,
				},
			)
			.expect("element header");
		}
		let at = view.memory().expect("memory") + fx.offset(fx.holder, "list");
		heap.write_array_header(
			at,
			ArrayHeader {
				data,
				num: weights.len(),
				max: weights.len(),
			},
		)
		.expect("list header");
	}

	#[test]
	fn container_elements_are_reachable_by_index() {
		let mut bound = bind(&[("list[1].weight", "ratio")], |fx, heap, source, _| list(fx, heap, source, &[2.0, 4.0]));
		let copy = &bound.collection.batch_copies(0)[0];
		assert_eq!(copy.source_indirection.access_kind, AccessKind::StructInstanceContainer);
		assert_eq!(copy.source_indirection.array_index.get(), Some(1));

		assert!(bound.copy());
		let ratio = bound.at(bound.target, "ratio");
		assert_eq!(bound.heap.read_f32(ratio).expect("ratio"), 4.0);

		let source = bound.source;
		list(&bound.fx, &mut bound.heap, source, &[8.0]);
		assert!(!bound.copy());
		assert_eq!(bound.heap.read_f32(ratio).expect("ratio"), 4.0);
	}

	#[test]
	fn shared_struct_fields_are_reachable() {
		let mut bound = bind(&[("shared.weight", "ratio")], |fx, heap, source, _| {
			let payload = heap.alloc_struct(&fx.schema, fx.item).expect("payload");
			heap.write_f32(payload + 4, 9.0).expect("weight");
			heap.write_u64(source.memory().expect("memory") + fx.offset(fx.holder, "shared"), payload).expect("shared");
		});
		assert_eq!(bound.collection.batch_copies(0)[0].source_indirection.access_kind, AccessKind::SharedStruct);

		assert!(bound.copy());
		assert_eq!(bound.heap.read_f32(bound.at(bound.target, "ratio")).expect("ratio"), 9.0);
	}

	#[test]
	fn weak_object_hop_stops_on_a_dead_object() {
		let mut actor = 0;
		let mut bound = bind(&[("weak.health", "value")], |fx, heap, source, _| {
			actor = heap.alloc_struct(&fx.schema, fx.actor).expect("actor");
			heap.write_i32(actor, 12).expect("health");
			heap.write_u64(source.memory().expect("memory") + fx.offset(fx.holder, "weak"), actor).expect("weak");
		});
		assert_eq!(bound.collection.batch_copies(0)[0].source_indirection.access_kind, AccessKind::WeakObject);

		assert!(bound.copy());
		assert_eq!(bound.heap.read_i32(bound.at(bound.target, "value")).expect("value"), 12);

		bound.heap.free(actor);
		assert!(!bound.copy());
	}

	#[test]
	fn retyped_instanced_payload_skips_the_copy() {
		let mut payload = 0;
		let mut bound = bind(&[("payload.weight", "ratio")], |fx, heap, source, _| {
			payload = heap.alloc_struct(&fx.schema, fx.item).expect("payload");
			heap.write_f32(payload + 4, 7.5).expect("weight");
			heap.write_instanced_header(
				source.memory().expect("memory") + fx.offset(fx.holder, "payload"),
				InstancedHeader {
					ty: Some(fx.item),
					memory: payload,
				},
			)
			.expect("payload header");
		});
		assert_eq!(bound.collection.batch_copies(0)[0].source_indirection.access_kind, AccessKind::StructInstance);

		let header = bound.at(bound.source, "payload");
		let vec3 = bound.fx.vec3;
		bound
			.heap
			.write_instanced_header(
				header,
				InstancedHeader {
					ty: Some(vec3),
					memory: payload,
				},
			)
			.expect("retyped header");

		assert!(!bound.copy());
		assert_eq!(bound.heap.read_f32(bound.at(bound.target, "ratio")).expect("ratio"), 0.0);
	}

	#[test]
	fn soft_object_hop_reads_the_referenced_object() {
		let mut fx = fixture();
		let links = fx
			.schema
			.add_struct(
				StructBuilder::new("Links")
					.field("soft", FieldType::SoftObject(fx.actor))
					.field("value", FieldType::Int32),
			)
			.expect("links registers");

		let mut heap = Heap::new();
		let source = fx.alloc(&mut heap, links);
		let target = fx.alloc(&mut heap, links);
		let actor = heap.alloc_struct(&fx.schema, fx.actor).expect("actor");
		heap.write_i32(actor, 33).expect("health");
		heap.write_u64(source.memory().expect("memory"), actor).expect("soft");

		let mut structs = BindableStructs::new();
		let source_handle = structs.add("source", Guid(1), Some(links), source).expect("source");
		let target_handle = structs.add("target", Guid(2), Some(links), target).expect("target");

		let mut collection = BindingCollection::new();
		collection
			.add_binding(
				Binding::with_handles(
					PropertyPath::parse_with_root(Guid(1), "soft.health").expect("source"),
					PropertyPath::parse_with_root(Guid(2), "value").expect("target"),
					source_handle,
					target_handle,
				),
				None,
			)
			.expect("binding");
		collection.rebuild_batches(&structs).expect("batches");
		assert!(collection.resolve_paths(&ResolveContext::live(&fx.schema, &heap, &structs, &structs)));
		assert_eq!(collection.batch_copies(0)[0].source_indirection.access_kind, AccessKind::SoftObject);

		assert!(collection.copy_batch(&fx.schema, &mut heap, &structs, 0, target));
		let value = target.memory().expect("memory") + fx.offset(links, "value");
		assert_eq!(heap.read_i32(value).expect("value"), 33);
	}

	#[test]
	fn failed_bindings_are_safe_no_ops() {
		let mut bound = bind(&[("title", "value"), ("value", "big")], |fx, heap, source, _| {
			heap.write_i32(source.memory().expect("memory") + fx.offset(fx.holder, "value"), 5).expect("value");
		});
		let kinds: Vec<_> = bound.collection.batch_copies(0).iter().map(|copy| copy.copy_type).collect();
		assert_eq!(kinds, [CopyType::None, CopyType::PromoteInt32ToInt64]);

		assert!(bound.copy());
		assert_eq!(bound.heap.read_i32(bound.at(bound.target, "value")).expect("value"), 0);
		assert_eq!(bound.heap.read_i64(bound.at(bound.target, "big")).expect("big"), 5);
	}

	#[test]
	fn reset_clears_struct_targets() {
		let mut bound = bind(&[("origin", "origin"), ("actor", "actor")], |fx, heap, source, _| {
			let at = source.memory().expect("memory");
			heap.write_f32(at + fx.offset(fx.holder, "origin"), 4.0).expect("x");
			let actor = heap.alloc_struct(&fx.schema, fx.actor).expect("actor");
			heap.write_u64(at + fx.offset(fx.holder, "actor"), actor).expect("actor");
		});
		assert!(bound.copy());
		assert_ne!(bound.heap.read_u64(bound.at(bound.target, "actor")).expect("actor"), 0);

		let target = bound.target;
		assert!(bound.collection.reset_objects(&bound.fx.schema, &mut bound.heap, 0, target));
		assert_eq!(bound.heap.read_f32(bound.at(bound.target, "origin")).expect("x"), 0.0);
		assert_eq!(bound.heap.read_u64(bound.at(bound.target, "actor")).expect("actor"), 0);
	}

	#[test]
	#[should_panic(expected = "before resolve_paths")]
	fn copying_before_resolve_panics() {
		let mut bound = bind(&[("value", "value")], |_, _, _, _| {});
		let binding = Binding::new(
			PropertyPath::parse_with_root(Guid(1), "ratio").expect("source"),
			PropertyPath::parse_with_root(Guid(2), "ratio").expect("target"),
		);
		bound.collection.add_binding(binding, None).expect("binding adds");
		let copy = CopyInfo::default();
		bound.collection.copy_property(&bound.fx.schema, &mut bound.heap, &copy, bound.source, bound.target);
	}

	#[test]
	fn whole_struct_source_copies_into_struct_field() {
		let mut fx = fixture();
		let host = fx
			.schema
			.add_struct(StructBuilder::new("Host").field("at", FieldType::Struct(fx.vec3)))
			.expect("host registers");

		let mut heap = Heap::new();
		let vec = fx.alloc(&mut heap, fx.vec3);
		heap.write_f32(vec.memory().expect("memory") + 4, 6.0).expect("y");
		let target = fx.alloc(&mut heap, host);

		let mut structs = BindableStructs::new();
		let source_handle = structs.add("vec", Guid(1), Some(fx.vec3), vec).expect("vec");
		let target_handle = structs.add("host", Guid(2), Some(host), target).expect("host");

		let mut collection = BindingCollection::new();
		collection
			.add_binding(
				Binding::with_handles(
					PropertyPath::new(Guid(1)),
					PropertyPath::parse_with_root(Guid(2), "at").expect("target"),
					source_handle,
					target_handle,
				),
				None,
			)
			.expect("binding");
		collection.rebuild_batches(&structs).expect("batches");
		assert!(collection.resolve_paths(&ResolveContext::live(&fx.schema, &heap, &structs, &structs)));
		assert_eq!(collection.batch_copies(0)[0].copy_type, CopyType::CopyStruct);

		assert!(collection.copy_batch(&fx.schema, &mut heap, &structs, 0, target));
		assert_eq!(heap.read_f32(target.memory().expect("memory") + 4).expect("y"), 6.0);
	}
}

mod unit_exec_struct_reference {

	use crate::bind::scenario::address_reference_hooks;
	use crate::bind::test_support::fixture;
	use crate::bind::{BindableStructs, Binding, BindingCollection, CopyType, FieldType, Guid, Heap, PropertyPath, ResolveContext, StructBuilder};

	#[test]
	fn struct_reference_hooks_write_and_reset_the_wrapper() {
		let mut fx = fixture();
		let wrapper = fx
			.schema
			.add_struct(StructBuilder::new("StructRef").field("ptr", FieldType::Int64))
			.expect("wrapper");
		let host = fx
			.schema
			.add_struct(
				StructBuilder::new("Host")
					.field("origin", FieldType::Struct(fx.vec3))
					.field("reference", FieldType::Struct(wrapper)),
			)
			.expect("host");

		let mut heap = Heap::new();
		let source = fx.alloc(&mut heap, host);
		let target = fx.alloc(&mut heap, host);
		let mut structs = BindableStructs::new();
		let source_handle = structs.add("source", Guid(1), Some(host), source).expect("source");
		let target_handle = structs.add("target", Guid(2), Some(host), target).expect("target");

		let mut collection = BindingCollection::new();
		collection.set_struct_reference_hooks(address_reference_hooks(wrapper));
		collection
			.add_binding(
				Binding::with_handles(
					PropertyPath::parse_with_root(Guid(1), "origin").expect("source"),
					PropertyPath::parse_with_root(Guid(2), "reference").expect("target"),
					source_handle,
					target_handle,
				),
				None,
			)
			.expect("binding");
		collection.rebuild_batches(&structs).expect("batches");
		assert!(collection.resolve_paths(&ResolveContext::live(&fx.schema, &heap, &structs, &structs)));
		assert_eq!(collection.batch_copies(0)[0].copy_type, CopyType::StructReference);

		let reference = target.memory().expect("memory") + 16;
		assert!(collection.copy_batch(&fx.schema, &mut heap, &structs, 0, target));
		assert_eq!(heap.read_u64(reference).expect("reference"), source.memory().expect("memory"));

		assert!(collection.reset_objects(&fx.schema, &mut heap, 0, target));
		assert_eq!(heap.read_u64(reference).expect("reference"), 0);
	}
}
