//! Trellis: feature dependency analysis and planning for AI-assisted
//! development.
//!
//! Feature records live in SQLite ([`db`]); everything analytical is pure
//! and in-memory. [`graph`] answers scheduling questions over hard
//! execution dependencies (cycles, depths, critical paths, readiness) and
//! [`relations`] checks the declared relationship graph for structural
//! defects and scores feature pairs for duplicate risk. [`mcp`] exposes
//! the records and analyses as conversational tools over stdio; [`api`]
//! serves the same surface over HTTP.

pub mod api;
pub mod db;
pub mod graph;
pub mod mcp;
pub mod models;
pub mod relations;
