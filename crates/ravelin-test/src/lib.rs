//! Test harnesses for the Ravelin security layer.
//!
//! Provides `TestPipeline` for in-process gate and signature tests and the
//! subprocess CLI regression suite.

#[cfg(test)]
pub mod cli;
pub mod pipeline;

pub use pipeline::{fixtures, TestError, TestPipeline};
