//! Optional tracing integration.
//!
//! When the `tracing-integration` feature is enabled, the macros in this
//! module forward to the [`tracing`] macros of the same name. When the
//! feature is disabled they expand to nothing, so instrumented call sites
//! compile to no-ops with zero overhead.

/// Forwards to [`tracing::trace!`] when `tracing-integration` is enabled.
macro_rules! trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing-integration")]
        ::tracing::trace!($($arg)*);
    };
}

/// Forwards to [`tracing::debug!`] when `tracing-integration` is enabled.
macro_rules! debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing-integration")]
        ::tracing::debug!($($arg)*);
    };
}

pub(crate) use {debug, trace};
