//! Documentation Search Gateway
//!
//! This crate provides a small HTTP service that forwards a natural-language
//! query to a remote documentation search tool exposed over the Model Context
//! Protocol (MCP) and reshapes the tool output into a uniform response envelope.
//!
//! # Features
//!
//! - Denylist-based query sanitization with a length cap
//! - One MCP tool call per search, over streamable HTTP or SSE
//! - Normalization of JSON or plain-text tool output into documentation chunks
//! - Axum HTTP endpoint with 400/500 error mapping
//!
//! # Modules
//!
//! - [`sanitizer`]: Query sanitization
//! - [`invoker`]: Remote tool invocation and payload filtering
//! - [`normalizer`]: Payload normalization into [`models::SearchResponse`]
//! - [`registry`]: Shared endpoint configuration registry
//! - [`search`]: The search pipeline
//! - [`server`]: HTTP routes and server startup

pub mod config;
pub mod error;
pub mod invoker;
pub mod models;
pub mod normalizer;
pub mod registry;
pub mod sanitizer;
pub mod search;
pub mod server;
