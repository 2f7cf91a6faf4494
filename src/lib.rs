//! A host-based HTTP redirector.
//!
//! Every request is matched on its `Host` header against a list of
//! domain mappings (`domain -> target1, target2, ...`). A matching request
//! is answered with a `302 Found` pointing at the next target of that
//! domain in round-robin order; anything else gets a short informational
//! `200` response.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, init, validate, health).
//! - [`config`] -- Mapping model, validation, and the
//!   [`ConfigSource`](config::ConfigSource) trait with environment and
//!   file implementations.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`health`] -- `GET /health` handler served on the admin listener.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`redirect`] -- The dispatch engine: host matching, round-robin
//!   rotation, and `Location` construction.
//! - [`server`] -- Axum routers, shared application state, and graceful
//!   shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML mappings file support _(enabled by default)_ |
//! | `json` | JSON mappings file support |
//! | `toml` | TOML mappings file support |
//! | `file-backends` | All file formats |
//! | `full` | All features |

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod redirect;
pub mod server;
