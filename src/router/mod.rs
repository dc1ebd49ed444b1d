//! Request/response protocol between the page drivers and the coordinator.
//!
//! The coordinator owns credentials and the generation endpoint. Drivers
//! reach it by sending `{type, payload}` messages; replies are
//! `{ok: true, result?}` or `{ok: false, error}`. Messages without a known
//! type are ignored and receive no reply.

pub mod domain;
pub mod services;
