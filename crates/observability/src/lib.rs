//! Tracing/logging setup shared by the binaries.

/// Initialize process-wide tracing with settings from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogSettings::from_env());
}

/// Subscriber configuration (filters, output format).
pub mod tracing;
