//! Tracing and logging setup shared by FleetRent binaries.

/// Initialize process-wide tracing.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    subscriber::init(LogFormat::from_env());
}

pub mod subscriber;

pub use subscriber::LogFormat;
