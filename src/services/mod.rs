//! Services module
//!
//! Contains the accessor facade orchestrating the stores and the environment.

pub mod accessor;

pub use accessor::ConfigAccessor;
