use std::path::PathBuf;

use propbind::bind::{BindError, Guid, InstanceAccessKind, PathFormat, PathHighlight, PropertyPath, ResolveEnv, Result, Scenario, View, update_segments_from_value};

use crate::cmd::util::emit_json;

#[derive(clap::Args)]
pub struct Args {
	/// Path text, such as `items[1].weight`.
	pub path: String,
	/// Root struct id in hex.
	#[arg(long)]
	pub root: Option<String>,
	/// Scenario document used to record instance types along the path.
	#[arg(long)]
	pub scenario: Option<PathBuf>,
	/// Scenario instance the path starts at.
	#[arg(long, requires = "scenario")]
	pub instance: Option<String>,
	/// Segment index wrapped in `[[` and `]]`.
	#[arg(long)]
	pub highlight: Option<usize>,
	#[arg(long)]
	pub json: bool,
}

/// Parse a path, optionally patch it against a scenario value, and print its segments.
pub fn run(args: Args) -> Result<()> {
	let Args {
		path,
		root,
		scenario,
		instance,
		highlight,
		json,
	} = args;

	let root = match root.as_deref() {
		Some(text) => Guid::parse_hex(text).ok_or_else(|| BindError::Scenario {
			reason: format!("bad root id {text}"),
		})?,
		None => Guid::NIL,
	};
	let mut parsed = PropertyPath::parse_with_root(root, &path)?;

	let loaded = match scenario {
		Some(file) => Some(Scenario::open(&file)?),
		None => None,
	};
	if let (Some(scenario), Some(name)) = (&loaded, instance.as_deref()) {
		let item = scenario.instance(name)?;
		if root == Guid::NIL
			&& let Some(descriptor) = scenario.structs.by_name(name)
		{
			parsed = PropertyPath::from_segments(descriptor.id, parsed.segments().to_vec());
		}
		let env = ResolveEnv {
			redirects: Some(&scenario.redirects),
			..ResolveEnv::with_heap(&scenario.schema, &scenario.heap)
		};
		update_segments_from_value(&env, &mut parsed, View::new(item.ty, item.address))?;
	}

	let options = PathFormat {
		highlight: highlight.map(|segment| PathHighlight {
			segment,
			prefix: "[[",
			suffix: "]]",
		}),
		include_instance_types: true,
		first_segment: 0,
		schema: loaded.as_ref().map(|item| &item.schema),
	};
	let formatted = parsed.format(&options);
	let type_name = |segment: &propbind::bind::PathSegment| match (segment.instance_type(), &loaded) {
		(Some(ty), Some(scenario)) => Some(scenario.schema.struct_name(ty).to_owned()),
		(Some(ty), None) => Some(format!("#{}", ty.0)),
		(None, _) => None,
	};

	if json {
		let payload = PathJson {
			input: path,
			root: parsed.root().to_string(),
			formatted,
			segments: parsed
				.segments()
				.iter()
				.map(|segment| SegmentJson {
					name: segment.name().to_owned(),
					array_index: segment.array_index(),
					instance_type: type_name(segment),
					instance_access: access_label(segment.instance_access()),
				})
				.collect(),
		};
		emit_json(&payload);
		return Ok(());
	}

	println!("input: {path}");
	println!("root: {}", parsed.root());
	println!("formatted: {formatted}");
	println!("segments: {}", parsed.segments().len());
	for (index, segment) in parsed.segments().iter().enumerate() {
		let array_index = segment.array_index().map(|item| item.to_string()).unwrap_or_else(|| "-".to_owned());
		let instance_type = type_name(segment).unwrap_or_else(|| "-".to_owned());
		println!(
			"  {index}: name={} index={array_index} instance={instance_type} access={}",
			segment.name(),
			access_label(segment.instance_access())
		);
	}

	Ok(())
}

fn access_label(kind: InstanceAccessKind) -> &'static str {
	match kind {
		InstanceAccessKind::None => "none",
		InstanceAccessKind::ObjectInstance => "object_instance",
		InstanceAccessKind::StructInstance => "struct_instance",
		InstanceAccessKind::SharedStruct => "shared_struct",
		InstanceAccessKind::StructInstanceContainer => "struct_instance_container",
	}
}

#[derive(serde::Serialize)]
struct PathJson {
	input: String,
	root: String,
	formatted: String,
	segments: Vec<SegmentJson>,
}

#[derive(serde::Serialize)]
struct SegmentJson {
	name: String,
	array_index: Option<usize>,
	instance_type: Option<String>,
	instance_access: &'static str,
}

#[cfg(test)]
mod tests;
