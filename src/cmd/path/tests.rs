use crate::cmd::test_support::{fixture_arg, run_propbind, run_propbind_json, run_propbind_text};

#[test]
fn path_json_lists_segments() {
	let json = run_propbind_json(&["path", "items[2].weight", "--highlight", "1", "--json"]);

	assert_eq!(json["formatted"], "items[2].[[weight]]");
	assert_eq!(json["root"], "00000000000000000000000000000000");
	assert_eq!(json["segments"][0]["name"], "items");
	assert_eq!(json["segments"][0]["array_index"], 2);
	assert!(json["segments"][1]["array_index"].is_null());
	assert_eq!(json["segments"][1]["instance_access"], "none");
}

#[test]
fn path_records_runtime_class_from_scenario() {
	let fixture = fixture_arg("rig.json");
	let json = run_propbind_json(&["path", "owner.speed", "--scenario", &fixture, "--instance", "context", "--json"]);

	assert_eq!(json["root"], "000000000000000000000000c0ffee01");
	assert_eq!(json["formatted"], "(Pawn)owner.speed");
	assert_eq!(json["segments"][0]["instance_type"], "Pawn");
	assert_eq!(json["segments"][0]["instance_access"], "object_instance");
}

#[test]
fn path_text_output_names_each_segment() {
	let text = run_propbind_text(&["path", "origin.y", "--root", "ab"]);

	assert!(text.contains("root: 000000000000000000000000000000ab"));
	assert!(text.contains("segments: 2"));
	assert!(text.contains("  1: name=y index=- instance=- access=none"));
}

#[test]
fn malformed_path_fails() {
	let output = run_propbind(&["path", "items[x]"]);
	assert!(!output.status.success());
	assert!(String::from_utf8_lossy(&output.stderr).contains("invalid property path"));
}
