#![allow(missing_docs)]

use propbind::bind::{Guid, PathFormat, PathHighlight, PropertyPath};

const PATHS: &[&str] = &[
	"value",
	"origin.y",
	"items[0]",
	"items[12].weight",
	"actor.pos.x",
	"list[3].inner[1].leaf",
	"Score_12AB",
];

#[test]
fn format_then_parse_round_trips() {
	for text in PATHS {
		let path = PropertyPath::parse_with_root(Guid(7), text).expect("path parses");
		let again = PropertyPath::parse_with_root(Guid(7), &path.to_string()).expect("formatted path parses");
		assert_eq!(again, path, "{text}");
		assert_eq!(again.to_string(), *text);
	}
}

#[test]
fn highlight_markers_do_not_change_segments() {
	let path = PropertyPath::parse("items[12].weight").expect("path parses");
	let options = PathFormat {
		highlight: Some(PathHighlight {
			segment: 0,
			prefix: "<",
			suffix: ">",
		}),
		..PathFormat::default()
	};
	let shown = path.format(&options);
	assert_eq!(shown, "<items[12]>.weight");

	let stripped: String = shown.chars().filter(|ch| !matches!(ch, '<' | '>')).collect();
	assert_eq!(PropertyPath::parse(&stripped).expect("stripped path parses"), path);
}

#[test]
fn mutual_inclusion_is_equality() {
	let paths: Vec<_> = ["", "items", "items[1]", "items[1].weight", "items[2].weight", "origin", "origin.y"]
		.into_iter()
		.map(|text| PropertyPath::parse_with_root(Guid(3), text).expect("path parses"))
		.collect();

	for a in &paths {
		for b in &paths {
			assert_eq!(a.includes(b) && b.includes(a), a == b, "{a} / {b}");
		}
	}
}

#[test]
fn inclusion_requires_the_same_root() {
	let a = PropertyPath::parse_with_root(Guid(1), "origin").expect("path parses");
	let b = PropertyPath::parse_with_root(Guid(2), "origin.y").expect("path parses");
	assert!(!a.includes(&b));
}
