use tracing_subscriber::{EnvFilter, fmt};

/// Filter directive for a `-v` count.
fn log_directive(verbose: u8) -> &'static str {
	match verbose {
		0 => "propbind=warn",
		1 => "propbind=debug",
		_ => "propbind=trace",
	}
}

/// Install the stderr subscriber; `verbose` counts `-v` flags.
///
/// Without `-v`, `RUST_LOG` overrides the default warn filter.
pub(crate) fn init_logging(verbose: u8) {
	let filter = match verbose {
		0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_directive(0))),
		_ => EnvFilter::new(log_directive(verbose)),
	};

	fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(false)
		.with_target(false)
		.init();
}

/// Print a serializable payload as pretty JSON on stdout.
pub(crate) fn emit_json<T: serde::Serialize>(payload: &T) {
	match serde_json::to_string_pretty(payload) {
		Ok(text) => println!("{text}"),
		Err(err) => eprintln!("error: failed to encode json: {err}"),
	}
}

/// Render an address as fixed-width hex.
pub(crate) fn addr_hex(addr: u64) -> String {
	format!("0x{addr:016x}")
}
