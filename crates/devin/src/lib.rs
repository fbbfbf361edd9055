//! Devin AI session adapter.
//!
//! Implements the [`pipeline::SessionApi`] trait over the Devin REST API:
//!
//! - `POST /sessions`: open a session with a prompt and repository URL.
//! - `GET /session/{id}`: poll status, structured output, and messages.
//! - `GET /attachments/{uuid}/{name}`: download files the agent attached.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, authentication, response decoding and
//! attachment discovery live here. The orchestration layer sees only
//! [`pipeline::SessionApi`] and [`pipeline::SessionDetails`]; polling and
//! back-off belong to the caller.

mod client;
mod wire;

pub use client::{DevinClient, DevinConfig, DEFAULT_API_BASE};
