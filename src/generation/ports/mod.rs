//! Port definitions for job generation.

mod generator;

pub use generator::{GenerationError, GenerationResult, JobGenerator};

#[cfg(test)]
pub use generator::MockJobGenerator;
