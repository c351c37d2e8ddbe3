//! Process-wide logging setup shared by every tillbook binary.

/// Tracing configuration (filters, layers).
pub mod tracing;

/// Initialize logging for the process.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init();
}
