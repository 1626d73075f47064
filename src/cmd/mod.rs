/// Scenario copy command.
pub mod copy;
/// Property path parse and format command.
pub mod path;
/// Scenario resolve command.
pub mod resolve;
pub(crate) mod util;

#[cfg(test)]
pub(crate) mod test_support;
