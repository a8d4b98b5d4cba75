//! Core memory engine — dual-write storage, routing, decay, and queries.
//!
//! This module contains the dual-write path ([`coordinator`]), the filter
//! compiler ([`query`]), content-based routing ([`router`]), the temporal
//! decay engine ([`decay`]), input validation ([`validate`]), per-layer
//! aggregates ([`stats`]), and the operation surface that binds them
//! ([`service`]). Type definitions live in [`types`].

pub mod coordinator;
pub mod decay;
pub mod query;
pub mod router;
pub mod service;
pub mod stats;
pub mod types;
pub mod validate;

/// Current wall-clock time as fractional seconds since the Unix epoch.
pub fn now_secs() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1e6
}
