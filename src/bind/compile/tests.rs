mod unit_compile {

	use crate::bind::test_support::fixture;
	use crate::bind::{
		AccessKind, BindError, FieldType, Index16, PropertyPath, ResolveEnv, Schema, StructBuilder, View, chain, compile_indirections, resolve_indirections,
	};

	fn compile(path: &str, flat: &mut Vec<crate::bind::PropertyIndirection>) -> (crate::bind::PropertyIndirection, crate::bind::LeafIndirection) {
		let fx = fixture();
		let env = ResolveEnv::types(&fx.schema);
		let path = PropertyPath::parse(path).expect("path parses");
		let hops = resolve_indirections(&env, View::type_only(fx.holder), &path, false).expect("path resolves");
		compile_indirections(&path, Some(fx.holder), &hops, flat).expect("path compiles")
	}

	#[test]
	fn nested_offsets_merge_into_one_step() {
		let mut flat = Vec::new();
		let (first, leaf) = compile("origin.y", &mut flat);

		assert_eq!(first.access_kind, AccessKind::Offset);
		assert_eq!(first.offset, 52);
		assert!(!first.next_index.is_valid());
		assert!(flat.is_empty());
		assert!(leaf.field.is_some());
	}

	#[test]
	fn zero_offset_after_array_index_is_dropped() {
		let mut flat = Vec::new();
		let (first, leaf) = compile("items[1].weight", &mut flat);

		assert_eq!(first.access_kind, AccessKind::IndexArray);
		assert_eq!(first.offset, 64);
		assert_eq!(first.array_index.get(), Some(1));
		assert_eq!(first.next_index.get(), Some(0));
		assert_eq!(flat.len(), 1);
		assert_eq!(flat[0].access_kind, AccessKind::Offset);
		assert_eq!(flat[0].offset, 4);

		let kinds: Vec<_> = chain(&first, &flat).map(|step| step.access_kind).collect();
		assert_eq!(kinds, [AccessKind::IndexArray, AccessKind::Offset]);

		let fx = fixture();
		assert_eq!(leaf.container_type, Some(fx.item));
	}

	#[test]
	fn object_hop_absorbs_zero_offset() {
		let mut flat = Vec::new();
		let (first, _) = compile("actor.health", &mut flat);

		assert_eq!(first.access_kind, AccessKind::Object);
		assert_eq!(first.offset, 112);
		assert!(flat.is_empty());
	}

	#[test]
	fn chains_append_after_existing_entries() {
		let mut flat = Vec::new();
		let (first_a, _) = compile("items[0].weight", &mut flat);
		let (first_b, _) = compile("items[2].label", &mut flat);

		assert_eq!(first_a.next_index.get(), Some(0));
		assert_eq!(first_b.next_index.get(), Some(1));
		assert_eq!(flat[1].offset, 8);
		assert_eq!(chain(&first_b, &flat).count(), 2);
	}

	#[test]
	fn zero_offset_element_field_needs_no_second_step() {
		let mut flat = Vec::new();
		let (first, _) = compile("items[2].count", &mut flat);

		assert_eq!(first.access_kind, AccessKind::IndexArray);
		assert!(!first.next_index.is_valid());
		assert!(flat.is_empty());
	}

	#[test]
	fn empty_path_designates_the_base_struct() {
		let fx = fixture();
		let mut flat = Vec::new();
		let path = PropertyPath::new(crate::bind::Guid(1));
		let (first, leaf) = compile_indirections(&path, Some(fx.vec3), &[], &mut flat).expect("empty path compiles");

		assert_eq!(first.access_kind, AccessKind::Offset);
		assert_eq!(first.offset, 0);
		assert_eq!(leaf.field, None);
		assert_eq!(leaf.container_type, Some(fx.vec3));
	}

	#[test]
	fn offsets_beyond_sixteen_bits_are_rejected() {
		let mut schema = Schema::new();
		let wide = schema
			.add_struct(StructBuilder::new("Wide").static_array("cells", FieldType::Int32, 20_000))
			.expect("wide struct registers");
		let env = ResolveEnv::types(&schema);
		let path = PropertyPath::parse("cells[19000]").expect("path");
		let hops = resolve_indirections(&env, View::type_only(wide), &path, false).expect("path resolves");

		let err = compile_indirections(&path, Some(wide), &hops, &mut Vec::new()).expect_err("offset overflows");
		assert!(matches!(err, BindError::IndexOverflow { what: "offset", .. }));
	}

	#[test]
	fn index16_reserves_the_invalid_sentinel() {
		assert_eq!(Index16::new(Index16::MAX).and_then(Index16::get), Some(Index16::MAX));
		assert!(Index16::new(Index16::MAX + 1).is_none());
		assert!(!Index16::default().is_valid());
	}
}
