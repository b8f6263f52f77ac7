// Conditional logging shim: uses `tracing` when enabled, falls back to
// eprintln! for warnings and errors, drops trace/debug output otherwise.

#[cfg(feature = "tracing")]
macro_rules! trace {
  ($($arg:tt)*) => {{
    tracing::trace!($($arg)*);
  }};
}

#[cfg(feature = "tracing")]
macro_rules! debug {
  ($($arg:tt)*) => {{
    tracing::debug!($($arg)*);
  }};
}

#[cfg(feature = "tracing")]
macro_rules! warning {
  ($($arg:tt)*) => {{
    tracing::warn!($($arg)*);
  }};
}

#[cfg(feature = "tracing")]
macro_rules! error {
  ($($arg:tt)*) => {{
    tracing::error!($($arg)*);
  }};
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace {
  ($($arg:tt)*) => {{}};
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug {
  ($($arg:tt)*) => {{}};
}

#[cfg(not(feature = "tracing"))]
macro_rules! warning {
  ($($arg:tt)*) => {{
    eprintln!($($arg)*);
  }};
}

#[cfg(not(feature = "tracing"))]
macro_rules! error {
  ($($arg:tt)*) => {{
    eprintln!($($arg)*);
  }};
}

pub(crate) use {debug, error, trace, warning};
