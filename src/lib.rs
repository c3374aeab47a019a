//! Per-student progress reports: topic flattening, month translation,
//! per-month aggregation and twelve-month series building, plus the
//! providers and session plumbing that feed them.

pub mod api;
pub mod calendar;
pub mod db;
pub mod models;
pub mod progress;
pub mod provider;
pub mod report;
pub mod session;
pub mod topics;
