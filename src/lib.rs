//! MCP server wrapping the Monarch Money personal finance API.
//!
//! The crate ships two binaries: the MCP server itself (`monarch-mcp`),
//! which serves tools over stdio, and `monarch-login`, an interactive
//! utility that performs the initial credential (and, where needed,
//! multi-factor) login and saves the resulting session to every location
//! the server searches at startup.
//!
//! The server never logs in eagerly. The first tool call that needs the
//! remote API walks the candidate session files, falls back to
//! environment credentials, and caches the authenticated client for the
//! lifetime of the process.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod params;
pub mod response;
pub mod server;
pub mod session;
