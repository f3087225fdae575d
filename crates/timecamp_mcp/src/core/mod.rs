//! # TimeCamp MCP Server Core
//!
//! This module wraps the TimeCamp REST API for the MCP server.
//!
//! ## Features
//! - Create, list, update and delete time entries
//! - List active tasks in remote order
//! - Uniform success/error envelopes for every operation
//! - Per-call credential resolution
//!
//! ## Modules
//! - `api`: Transport trait and the reqwest-backed implementation
//! - `client`: The client operations and response normalisation
//! - `credentials`: Bearer token resolution
//! - `error`: Custom error types and error handling
//! - `models`: Tool requests, payloads and the result envelope
//! - `utils`: Date, time and duration helpers

pub mod api;
pub mod client;
pub mod credentials;
pub mod error;
pub mod models;
pub mod utils;
