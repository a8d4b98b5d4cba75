//! Structured, persistent, layered memory for AI agents via MCP.
//!
//! Strata is an [MCP](https://modelcontextprotocol.io/) server that gives AI
//! agents a durable memory organized into six cognitive layers:
//!
//! | Layer | Holds |
//! |-------|-------|
//! | **Episodic** | Events, sessions, conversations |
//! | **Semantic** | Facts and knowledge |
//! | **Procedural** | How-to, workflows, processes |
//! | **Meta** | Insights and reasoning about reasoning |
//! | **Identity** | Values, preferences, self-model |
//! | **Working** | Short-lived task state |
//!
//! # Architecture
//!
//! - **Storage**: one SQLite file per layer under a durable root, optionally
//!   mirrored truth-first into a volatile cache root (dual-write)
//! - **Routing**: content saved without a layer is scored against weighted
//!   linguistic pattern bags and routed to the best-matching layer
//! - **Decay**: a background sweeper materializes an exponentially decayed
//!   effective importance per record; immortal records are exempt
//! - **Transport**: MCP over stdio
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — Layer store initialization, schema, and migrations
//! - [`error`] — The fixed error-code vocabulary surfaced to tool callers
//! - [`limiter`] — Sliding-window admission control
//! - [`memory`] — Core engine: coordinator, router, decay, queries, stats

pub mod config;
pub mod db;
pub mod error;
pub mod limiter;
pub mod memory;
