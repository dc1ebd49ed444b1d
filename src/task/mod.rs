//! Task record management.
//!
//! A single persisted task carries the automation from "prompt entered" to
//! "job created". This module owns the task state machine, the run lease
//! drivers use to avoid overlapping work, the job fields produced by the
//! generator, and the key/value store they are persisted in. It follows
//! hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
