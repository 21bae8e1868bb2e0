//! Logging macros used across the workspace.
//!
//! Thin fronts over `tracing` so call sites read uniformly; the CLI's
//! formatter turns the `sixkit::success` target into its own symbol.

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        ::tracing::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "sixkit::success", $($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        ::tracing::warn!($($arg)*)
    };
}
