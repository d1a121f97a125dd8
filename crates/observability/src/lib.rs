//! Tracing and logging setup shared by the storefront binaries.

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::OutputFormat;

/// Initialize process-wide JSON logging.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(OutputFormat::Json);
}

/// Initialize process-wide logging in the given output format.
pub fn init_with(format: OutputFormat) {
    tracing::init(format);
}
