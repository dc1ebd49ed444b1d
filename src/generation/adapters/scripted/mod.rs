//! Scripted generator for tests and offline runs.

mod generator;

pub use generator::ScriptedJobGenerator;
