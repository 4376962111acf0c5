//! Process-wide tracing setup shared by the binaries.

/// Subscriber installation and output formats.
pub mod tracing;

pub use crate::tracing::LogFormat;

/// JSON logs at `info`, overridable through `RUST_LOG`.
///
/// Safe to call multiple times; only the first call installs a subscriber.
pub fn init() {
    crate::tracing::init_with(None, LogFormat::Json);
}

/// Explicit filter directive and output format. `RUST_LOG` still wins when set.
pub fn init_with(filter: Option<&str>, format: LogFormat) {
    crate::tracing::init_with(filter, format);
}
