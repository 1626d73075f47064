//! Property binding engine: resolve textual property paths against reflected
//! struct layouts, compile them into compact indirection chains, and copy
//! values between bound properties in batches.

/// Binding engine, reflection model and scenario runner.
pub mod bind;
