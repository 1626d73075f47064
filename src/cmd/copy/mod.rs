use std::path::PathBuf;

use propbind::bind::scenario::struct_to_json;
use propbind::bind::{Result, Scenario};

use crate::cmd::util::{addr_hex, emit_json};

#[derive(clap::Args)]
pub struct Args {
	/// Scenario document (JSON, optionally zstd-compressed).
	pub path: PathBuf,
	/// Only print this instance.
	#[arg(long)]
	pub instance: Option<String>,
	/// Reset every bound target after copying.
	#[arg(long)]
	pub reset: bool,
	#[arg(long)]
	pub json: bool,
}

/// Resolve a scenario, run its copy batches and print instance values.
pub fn run(args: Args) -> Result<()> {
	let Args { path, instance, reset, json } = args;

	let mut scenario = Scenario::open(&path)?;
	let summary = scenario.resolve()?;
	let batches: Vec<BatchResultJson> = scenario
		.copy_all()
		.into_iter()
		.map(|(target, ok)| BatchResultJson { target: target.into(), ok })
		.collect();
	let reset_ok = if reset { Some(scenario.reset_all()) } else { None };

	let names: Vec<String> = match instance {
		Some(name) => vec![scenario.instance(&name)?.name.to_string()],
		None => scenario.instances().iter().map(|item| item.name.to_string()).collect(),
	};
	let mut instances = Vec::with_capacity(names.len());
	for name in names {
		let address = scenario.instance(&name)?.address;
		let value = struct_to_json(&scenario.read_instance(&name)?);
		instances.push(InstanceJson {
			name,
			address: addr_hex(address),
			value,
		});
	}

	if json {
		let payload = CopyJson {
			path: path.display().to_string(),
			all_resolved: summary.all_resolved,
			failed: summary.failed,
			batches,
			reset: reset_ok,
			instances,
		};
		emit_json(&payload);
		return Ok(());
	}

	println!("path: {}", path.display());
	println!("all_resolved: {}", summary.all_resolved);
	println!("failed: {}", summary.failed);
	for batch in &batches {
		println!("batch {}: {}", batch.target, if batch.ok { "ok" } else { "incomplete" });
	}
	if let Some(ok) = reset_ok {
		println!("reset: {}", if ok { "ok" } else { "incomplete" });
	}
	for item in &instances {
		println!("{} @ {}: {}", item.name, item.address, item.value);
	}

	Ok(())
}

#[derive(serde::Serialize)]
struct CopyJson {
	path: String,
	all_resolved: bool,
	failed: usize,
	batches: Vec<BatchResultJson>,
	reset: Option<bool>,
	instances: Vec<InstanceJson>,
}

#[derive(serde::Serialize)]
struct BatchResultJson {
	target: String,
	ok: bool,
}

#[derive(serde::Serialize)]
struct InstanceJson {
	name: String,
	address: String,
	value: serde_json::Value,
}

#[cfg(test)]
mod tests;
