//! Host adapter trait interfaces for tickwatchd
//!
//! This crate defines the seams between the monitoring engine and the
//! machinery it drives: the portal page automation primitive and the OS
//! notification primitive. It contains no platform code itself; the mock
//! implementations here are what the engine's tests run against.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
