//! Tracing/logging setup shared by every binary.

/// Initialize process-wide tracing.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber construction (filters, formatting).
pub mod tracing;
