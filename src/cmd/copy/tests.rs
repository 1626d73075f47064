use crate::cmd::test_support::{fixture_arg, run_propbind, run_propbind_json, run_propbind_text};

#[test]
fn copy_json_writes_bound_targets() {
	let fixture = fixture_arg("rig.json");
	let json = run_propbind_json(&["copy", &fixture, "--instance", "widget", "--json"]);

	assert_eq!(json["batches"][0]["target"], "widget");
	assert_eq!(json["batches"][0]["ok"], true);
	assert!(json["reset"].is_null());

	let instances = json["instances"].as_array().expect("instances array");
	assert_eq!(instances.len(), 1);
	assert!(instances[0]["address"].as_str().is_some_and(|item| item.starts_with("0x")));

	let widget = &instances[0]["value"];
	assert_eq!(widget["$type"], "Widget");
	assert_eq!(widget["count"], 1);
	assert_eq!(widget["visible"], true);
	assert_eq!(widget["enabled"], true);
	assert_eq!(widget["opacity"], 12.0);
	assert_eq!(widget["stance"], 2);
	assert_eq!(widget["anchor"]["z"], 3.0);
	assert_eq!(widget["weight"], 1.25);
	assert_eq!(widget["speed"], 3.5);
	assert_eq!(widget["caption"], "Ranger");
	assert_eq!(widget["label"], "knife");
}

#[test]
fn copy_reset_clears_struct_targets_and_keeps_scalars() {
	let fixture = fixture_arg("rig.json");
	let json = run_propbind_json(&["copy", &fixture, "--instance", "widget", "--reset", "--json"]);

	assert_eq!(json["reset"], true);
	let widget = &json["instances"][0]["value"];
	assert_eq!(widget["anchor"]["x"], 0.0);
	assert_eq!(widget["anchor"]["z"], 0.0);
	assert_eq!(widget["count"], 1);
	assert_eq!(widget["caption"], "Ranger");
}

#[test]
fn copy_text_lists_every_instance() {
	let fixture = fixture_arg("broken.json");
	let text = run_propbind_text(&["copy", &fixture]);

	assert!(text.contains("failed: 2"));
	assert!(text.contains("batch target: ok"));
	assert!(text.contains("source @ 0x"));
	assert!(text.contains("\"width\":480"));
}

#[test]
fn copy_rejects_unknown_instance() {
	let fixture = fixture_arg("rig.json");
	let output = run_propbind(&["copy", &fixture, "--instance", "nobody"]);
	assert!(!output.status.success());
	assert!(String::from_utf8_lossy(&output.stderr).contains("unknown instance nobody"));
}
