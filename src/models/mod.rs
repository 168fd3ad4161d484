//! Domain models for Trellis.
//!
//! # Core Concepts
//!
//! - [`Feature`]: a unit of product work and the node type of both analysis
//!   graphs. Hard `execution_dependencies` drive scheduling; declared
//!   `semantic_relationships` describe conceptual structure and are
//!   validated for consistency, never scheduled.
//! - [`Module`]: a bounded area of the product that owns features and
//!   declares which other modules it is expected to talk to.
//! - [`Issue`]: a recorded problem with the plan, optionally linked to a
//!   feature. No analysis reads issues.
//!
//! Ids are opaque strings. The store mints UUIDs, but nothing anywhere
//! parses or dispatches on id shape.

mod feature;
mod issue;
mod module;

pub use feature::*;
pub use issue::*;
pub use module::*;
