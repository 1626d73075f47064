use std::path::PathBuf;

use propbind::bind::{AccessKind, FieldRef, Guid, PropertyIndirection, PropertyPath, Result, Scenario, Schema, chain};

use crate::cmd::util::emit_json;

#[derive(clap::Args)]
pub struct Args {
	/// Scenario document (JSON, optionally zstd-compressed).
	pub path: PathBuf,
	#[arg(long)]
	pub json: bool,
}

/// Resolve every binding of a scenario and print copy types and indirection chains.
pub fn run(args: Args) -> Result<()> {
	let Args { path, json } = args;

	let mut scenario = Scenario::open(&path)?;
	let summary = scenario.resolve()?;
	let batches = describe_batches(&scenario);

	if json {
		let payload = ResolveJson {
			path: path.display().to_string(),
			compression: scenario.compression.as_str(),
			bindings: summary.bindings,
			all_resolved: summary.all_resolved,
			failed: summary.failed,
			batches,
		};
		emit_json(&payload);
		return Ok(());
	}

	println!("path: {}", path.display());
	println!("compression: {}", scenario.compression.as_str());
	println!("bindings: {}", summary.bindings);
	println!("all_resolved: {}", summary.all_resolved);
	println!("failed: {}", summary.failed);
	println!("batches: {}", batches.len());
	for (index, batch) in batches.iter().enumerate() {
		println!("batch {index}: {} ({})", batch.target, batch.id);
		for copy in &batch.copies {
			println!(
				"  {} -> {}: {} size={} source=[{}] target=[{}]",
				copy.source,
				copy.target,
				copy.copy_type,
				copy.copy_size,
				render_chain(&copy.source_chain),
				render_chain(&copy.target_chain)
			);
		}
	}

	Ok(())
}

fn describe_batches(scenario: &Scenario) -> Vec<BatchJson> {
	let collection = &scenario.collection;
	let flat = collection.property_indirections();

	collection
		.copy_batches()
		.iter()
		.map(|batch| BatchJson {
			target: batch.target_struct.name.to_string(),
			id: batch.target_struct.id.to_string(),
			copies: batch
				.range()
				.filter_map(|index| Some((collection.bindings().get(index)?, collection.copies().get(index)?)))
				.map(|(binding, copy)| CopyJson {
					source: qualified(scenario, &binding.source_path),
					target: binding.target_path.to_string(),
					copy_type: copy.copy_type.as_str(),
					copy_size: copy.copy_size,
					source_type: leaf_label(&scenario.schema, copy.source_leaf),
					target_type: leaf_label(&scenario.schema, copy.target_leaf),
					source_chain: chain(&copy.source_indirection, flat).map(hop_json).collect(),
					target_chain: chain(&copy.target_indirection, flat).map(hop_json).collect(),
				})
				.collect(),
		})
		.collect()
}

fn qualified(scenario: &Scenario, path: &PropertyPath) -> String {
	let root = struct_label(scenario, path.root());
	if path.is_empty() { root } else { format!("{root}.{path}") }
}

fn struct_label(scenario: &Scenario, id: Guid) -> String {
	scenario
		.structs
		.descriptors()
		.find(|item| item.id == id)
		.map(|item| item.name.to_string())
		.unwrap_or_else(|| id.to_string())
}

fn leaf_label(schema: &Schema, field: Option<FieldRef>) -> Option<String> {
	field.and_then(|field| schema.leaf_type(field)).map(|ty| ty.describe(schema))
}

fn hop_json(hop: &PropertyIndirection) -> HopJson {
	let indexed = matches!(hop.access_kind, AccessKind::IndexArray | AccessKind::StructInstanceContainer);
	HopJson {
		access: hop.access_kind.as_str(),
		offset: hop.offset,
		index: if indexed { hop.array_index.get() } else { None },
	}
}

fn render_chain(hops: &[HopJson]) -> String {
	hops.iter()
		.map(|hop| match hop.index {
			Some(index) => format!("{}@{}[{index}]", hop.access, hop.offset),
			None => format!("{}@{}", hop.access, hop.offset),
		})
		.collect::<Vec<_>>()
		.join(" > ")
}

#[derive(serde::Serialize)]
struct ResolveJson {
	path: String,
	compression: &'static str,
	bindings: usize,
	all_resolved: bool,
	failed: usize,
	batches: Vec<BatchJson>,
}

#[derive(serde::Serialize)]
struct BatchJson {
	target: String,
	id: String,
	copies: Vec<CopyJson>,
}

#[derive(serde::Serialize)]
struct CopyJson {
	source: String,
	target: String,
	copy_type: &'static str,
	copy_size: usize,
	source_type: Option<String>,
	target_type: Option<String>,
	source_chain: Vec<HopJson>,
	target_chain: Vec<HopJson>,
}

#[derive(serde::Serialize)]
struct HopJson {
	access: &'static str,
	offset: u16,
	index: Option<usize>,
}
