//! Sona job builder: transcript-to-job automation for the Sona workflow
//! builder.
//!
//! The crate turns a call transcript prompt into a structured job definition
//! with a large-language-model endpoint and then drives the workflow builder
//! page to create and populate that job. Progress is coordinated through a
//! single persisted task record whose state machine tells each page driver
//! what it is allowed to do.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (stores, pages, HTTP)
//!
//! # Modules
//!
//! - [`task`]: Task record, state machine, and persisted store access
//! - [`page`]: DOM model, page port, wait utilities, and locator strategies
//! - [`generation`]: Job generation port and LLM adapters
//! - [`automation`]: Navigator and workflow automator drivers
//! - [`router`]: Message protocol between drivers and the coordinator
//! - [`config`]: Layered runtime settings

pub mod automation;
pub mod config;
pub mod generation;
pub mod page;
pub mod router;
pub mod task;
