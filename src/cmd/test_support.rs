use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::OnceLock;

static PROPBIND_BIN: OnceLock<PathBuf> = OnceLock::new();

pub(crate) fn fixture_path(name: &str) -> PathBuf {
	Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
}

pub(crate) fn fixture_arg(name: &str) -> String {
	fixture_path(name).to_string_lossy().into_owned()
}

pub(crate) fn run_propbind(args: &[&str]) -> Output {
	Command::new(propbind_bin()).args(args).env_remove("RUST_LOG").output().expect("propbind command executes")
}

pub(crate) fn run_propbind_json(args: &[&str]) -> serde_json::Value {
	let output = run_propbind(args);
	assert!(
		output.status.success(),
		"propbind command failed with status={}: {}",
		output.status,
		String::from_utf8_lossy(&output.stderr)
	);
	serde_json::from_slice(&output.stdout).expect("stdout should be valid json")
}

pub(crate) fn run_propbind_text(args: &[&str]) -> String {
	let output = run_propbind(args);
	assert!(
		output.status.success(),
		"propbind command failed with status={}: {}",
		output.status,
		String::from_utf8_lossy(&output.stderr)
	);
	String::from_utf8(output.stdout).expect("stdout should be utf-8")
}

fn propbind_bin() -> &'static PathBuf {
	PROPBIND_BIN.get_or_init(resolve_propbind_bin)
}

fn resolve_propbind_bin() -> PathBuf {
	if let Ok(path) = std::env::var("CARGO_BIN_EXE_propbind") {
		return PathBuf::from(path);
	}

	let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
	let target_dir = std::env::var_os("CARGO_TARGET_DIR")
		.map(PathBuf::from)
		.unwrap_or_else(|| manifest_dir.join("target"));

	let mut bin = target_dir.join("debug");
	bin.push(if cfg!(windows) { "propbind.exe" } else { "propbind" });

	let status = Command::new("cargo")
		.current_dir(&manifest_dir)
		.args(["build", "--quiet", "--bin", "propbind"])
		.status()
		.expect("cargo build executes");
	assert!(status.success(), "failed to build propbind binary at {}", bin.display());

	bin
}
