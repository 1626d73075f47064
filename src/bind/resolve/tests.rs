mod unit_resolve_types {

	use crate::bind::test_support::fixture;
	use crate::bind::{AccessKind, BindError, PropertyPath, ResolveEnv, View, resolve_indirections};

	#[test]
	fn nested_struct_field_resolves_to_offsets() {
		let fx = fixture();
		let env = ResolveEnv::types(&fx.schema);
		let path = PropertyPath::parse("origin.y").expect("path");
		let hops = resolve_indirections(&env, View::type_only(fx.holder), &path, false).expect("path resolves");

		assert_eq!(hops.len(), 2);
		assert_eq!(hops[0].access_kind, AccessKind::Offset);
		assert_eq!(hops[0].offset, 48);
		assert_eq!(hops[1].offset, 4);
		assert_eq!(hops[1].container_type, Some(fx.vec3));
	}

	#[test]
	fn indexed_dynamic_array_adds_an_index_hop() {
		let fx = fixture();
		let env = ResolveEnv::types(&fx.schema);
		let path = PropertyPath::parse("items[5].weight").expect("path");
		let hops = resolve_indirections(&env, View::type_only(fx.holder), &path, false).expect("type-only resolve ignores bounds");

		assert_eq!(hops.len(), 3);
		assert_eq!(hops[0].access_kind, AccessKind::IndexArray);
		assert_eq!(hops[0].array_index, 5);
		assert_eq!(hops[0].offset, 64);
		assert_eq!(hops[1].field.map(|field| field.element), Some(true));
		assert_eq!(hops[2].offset, 4);
	}

	#[test]
	fn static_array_index_is_bounds_checked() {
		let fx = fixture();
		let env = ResolveEnv::types(&fx.schema);
		let ok = PropertyPath::parse("triple[2]").expect("path");
		let hops = resolve_indirections(&env, View::type_only(fx.holder), &ok, false).expect("in-range index");
		assert_eq!(hops[0].offset, 168 + 8);

		let bad = PropertyPath::parse("triple[3]").expect("path");
		let err = resolve_indirections(&env, View::type_only(fx.holder), &bad, false).expect_err("out-of-range index");
		assert!(matches!(err, BindError::Resolve { .. }));
	}

	#[test]
	fn unknown_field_reports_the_failing_sub_path() {
		let fx = fixture();
		let env = ResolveEnv::types(&fx.schema);
		let path = PropertyPath::parse("origin.w.q").expect("path");
		let err = resolve_indirections(&env, View::type_only(fx.holder), &path, false).expect_err("missing field");

		let BindError::Resolve { path, reason } = err else {
			panic!("expected resolve error");
		};
		assert_eq!(path, "origin.w");
		assert!(reason.contains("could not find property w on Vec3"), "reason: {reason}");
	}

	#[test]
	fn scalar_in_the_middle_of_a_path_is_unsupported() {
		let fx = fixture();
		let env = ResolveEnv::types(&fx.schema);
		let path = PropertyPath::parse("value.x").expect("path");
		let err = resolve_indirections(&env, View::type_only(fx.holder), &path, false).expect_err("scalar container");
		assert!(err.to_string().contains("unsupported indirection type"));
	}

	#[test]
	fn object_hop_uses_declared_class_by_type() {
		let fx = fixture();
		let env = ResolveEnv::types(&fx.schema);
		let path = PropertyPath::parse("actor.health").expect("path");
		let hops = resolve_indirections(&env, View::type_only(fx.holder), &path, false).expect("path resolves");

		assert_eq!(hops[0].access_kind, AccessKind::Object);
		assert_eq!(hops[1].container_type, Some(fx.actor));
	}
}

mod unit_resolve_live {

	use crate::bind::ops::INSTANCED_ITEM_SIZE;
	use crate::bind::test_support::fixture;
	use crate::bind::{
		AccessKind, ArrayHeader, Guid, Heap, InstanceAccessKind, InstancedHeader, PropertyPath, RedirectRegistry, ResolveEnv, View, resolve_indirections,
		update_segments_from_value,
	};

	#[test]
	fn live_array_index_is_bounds_checked() {
		let fx = fixture();
		let mut heap = Heap::new();
		let holder = fx.alloc(&mut heap, fx.holder);
		let data = heap.alloc(None, 2 * 12);
		let at = holder.memory().expect("memory") + 64;
		heap.write_array_header(at, ArrayHeader { data, num: 2, max: 2 }).expect("header");

		let env = ResolveEnv::with_heap(&fx.schema, &heap);
		let ok = PropertyPath::parse("items[1].count").expect("path");
		let hops = resolve_indirections(&env, holder, &ok, false).expect("in-range element");
		assert_eq!(hops[1].container_address, Some(data + 12));

		let stale = PropertyPath::parse("items[2].count").expect("path");
		let err = resolve_indirections(&env, holder, &stale, false).expect_err("out-of-range element");
		assert!(err.to_string().contains("out of range"));
	}

	#[test]
	fn derived_object_records_object_instance() {
		let fx = fixture();
		let mut heap = Heap::new();
		let holder = fx.alloc(&mut heap, fx.holder);
		let pawn = heap.alloc_struct(&fx.schema, fx.pawn).expect("pawn");
		heap.write_u64(holder.memory().expect("memory") + 112, pawn).expect("actor pointer");

		let env = ResolveEnv::with_heap(&fx.schema, &heap);
		let mut path = PropertyPath::parse("actor.speed").expect("path");
		let hops = resolve_indirections(&env, holder, &path, false).expect("derived field resolves");
		assert_eq!(hops[0].access_kind, AccessKind::ObjectInstance);
		assert_eq!(hops[0].instance_type, Some(fx.pawn));

		update_segments_from_value(&env, &mut path, holder).expect("segments update");
		assert_eq!(path.segments()[0].instance_type(), Some(fx.pawn));
		assert_eq!(path.segments()[0].instance_access(), InstanceAccessKind::ObjectInstance);

		let types = ResolveEnv::types(&fx.schema);
		let replay = resolve_indirections(&types, View::type_only(fx.holder), &path, false).expect("recorded type replays");
		assert_eq!(replay[1].container_type, Some(fx.pawn));
	}

	#[test]
	fn instanced_payload_type_comes_from_the_value() {
		let fx = fixture();
		let mut heap = Heap::new();
		let holder = fx.alloc(&mut heap, fx.holder);
		let payload = heap.alloc_struct(&fx.schema, fx.item).expect("payload");
		heap.write_instanced_header(
			holder.memory().expect("memory") + 128,
			InstancedHeader {
				ty: Some(fx.item),
				memory: payload,
			},
		)
		.expect("instanced header");

		let env = ResolveEnv::with_heap(&fx.schema, &heap);
		let path = PropertyPath::parse("payload.weight").expect("path");
		let hops = resolve_indirections(&env, holder, &path, false).expect("payload resolves");
		assert_eq!(hops[0].access_kind, AccessKind::StructInstance);
		assert_eq!(hops[0].instance_type, Some(fx.item));
		assert_eq!(hops[1].container_address, Some(payload));
	}

	#[test]
	fn shared_struct_type_comes_from_the_allocation() {
		let fx = fixture();
		let mut heap = Heap::new();
		let holder = fx.alloc(&mut heap, fx.holder);
		let shared = heap.alloc_struct(&fx.schema, fx.item).expect("shared");
		heap.write_u64(holder.memory().expect("memory") + 144, shared).expect("shared pointer");

		let env = ResolveEnv::with_heap(&fx.schema, &heap);
		let path = PropertyPath::parse("shared.weight").expect("path");
		let hops = resolve_indirections(&env, holder, &path, false).expect("shared resolves");
		assert_eq!(hops[0].access_kind, AccessKind::SharedStruct);
		assert_eq!(hops[0].instance_type, Some(fx.item));
		assert_eq!(hops[1].container_address, Some(shared));
	}

	#[test]
	fn container_element_resolves_through_its_header() {
		let fx = fixture();
		let mut heap = Heap::new();
		let holder = fx.alloc(&mut heap, fx.holder);
		let element = heap.alloc_struct(&fx.schema, fx.item).expect("element");
		let data = heap.alloc(None, 2 * INSTANCED_ITEM_SIZE);
		heap.write_instanced_header(
			data + INSTANCED_ITEM_SIZE as u64,
			InstancedHeader {
				ty: Some(fx.item),
				memory: element,
			},
		)
		.expect("element header");
		heap.write_array_header(holder.memory().expect("memory") + 152, ArrayHeader { data, num: 2, max: 2 })
			.expect("list header");

		let env = ResolveEnv::with_heap(&fx.schema, &heap);
		let path = PropertyPath::parse("list[1].weight").expect("path");
		let hops = resolve_indirections(&env, holder, &path, false).expect("element resolves");
		assert_eq!(hops[0].access_kind, AccessKind::StructInstanceContainer);
		assert_eq!(hops[0].array_index, 1);
		assert_eq!(hops[0].instance_type, Some(fx.item));
		assert_eq!(hops[1].container_address, Some(element));

		let stale = PropertyPath::parse("list[2].weight").expect("path");
		let err = resolve_indirections(&env, holder, &stale, false).expect_err("out-of-range element");
		assert!(err.to_string().contains("out of range"));

		let empty = PropertyPath::parse("list[0].weight").expect("path");
		let err = resolve_indirections(&env, holder, &empty, false).expect_err("empty element");
		assert!(err.to_string().contains("non-empty instanced struct"));

		let bare = PropertyPath::parse("list[1]").expect("path");
		let err = resolve_indirections(&env, holder, &bare, false).expect_err("element without property");
		assert!(err.to_string().contains("requires a property inside the element"));
	}

	#[test]
	fn empty_instanced_struct_fails_live_resolution() {
		let fx = fixture();
		let mut heap = Heap::new();
		let holder = fx.alloc(&mut heap, fx.holder);
		let env = ResolveEnv::with_heap(&fx.schema, &heap);
		let path = PropertyPath::parse("payload.weight").expect("path");

		let err = resolve_indirections(&env, holder, &path, false).expect_err("empty payload");
		assert!(err.to_string().contains("non-empty instanced struct"));
	}

	#[test]
	fn redirects_recover_renamed_fields() {
		let mut fx = fixture();
		fx.schema.rename_field(fx.holder, "value", "amount").expect("rename");
		let mut redirects = RedirectRegistry::new();
		redirects.add_field_redirect(fx.holder, "value", "amount");

		let mut heap = Heap::new();
		let holder = fx.alloc(&mut heap, fx.holder);
		let env = ResolveEnv {
			redirects: Some(&redirects),
			..ResolveEnv::with_heap(&fx.schema, &heap)
		};
		let mut path = PropertyPath::parse("value").expect("path");

		assert!(resolve_indirections(&env, holder, &path, false).is_err());
		update_segments_from_value(&env, &mut path, holder).expect("redirect applies");
		assert_eq!(path.segments()[0].name(), "amount");
	}

	#[test]
	fn script_struct_fields_are_recovered_by_guid() {
		let fx = fixture();
		let mut heap = Heap::new();
		let script = fx.alloc(&mut heap, fx.script);
		let env = ResolveEnv::with_heap(&fx.schema, &heap);

		let mut path = PropertyPath::parse("Score_99FF").expect("path");
		path.segments_mut()[0].set_property_guid(Some(crate::bind::test_support::SCRIPT_SCORE_GUID));
		update_segments_from_value(&env, &mut path, script).expect("guid lookup applies");

		assert_eq!(path.segments()[0].name(), "Score_12AB");
		assert_eq!(path.segments()[0].property_guid(), Some(Guid(0x5c0e)));
	}
}
