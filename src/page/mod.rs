//! Page inspection and manipulation.
//!
//! Drivers never hold live element handles. They take a [`domain::DomSnapshot`],
//! decide on a [`domain::NodeId`] with pure selector and locator logic, and
//! then ask the [`ports::Page`] to act on that id.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Wait utilities and locators in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
