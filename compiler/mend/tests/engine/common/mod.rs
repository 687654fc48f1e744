//! Shared fixtures for the engine tests.

mod calc;

pub use calc::*;
