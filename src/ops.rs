//! Operators. Each module adds its methods to [`Observable`] directly.
//!
//! [`Observable`]: crate::observable::Observable

pub mod filter;
pub mod lifecycle;
pub mod map;
pub mod observe_on;
pub mod ref_count;
pub mod repeat;
pub mod subscribe_on;
pub mod take;
