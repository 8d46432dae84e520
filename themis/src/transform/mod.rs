//! Transformation module.
//!
//! - Stages: the pure, order-dependent dataset transformations
//! - Pipeline: loading, stages and exports wired together

pub mod pipeline;
pub mod stages;

pub use pipeline::*;
pub use stages::*;
