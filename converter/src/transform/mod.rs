//! Transformation module.
//!
//! The stages of a conversion, each a pure function over owned collections:
//! - Normalize: raw headers to canonical field names
//! - Merge: left join of the two sheets, with record ids
//! - Project: grouped fields to nested sub-objects
//! - Serialize: records to the JSON document
//! - Pipeline: all of the above, end to end

pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod project;
pub mod serialize;

pub use merge::{merge, MergeOutcome};
pub use normalize::{canonical_name, normalize};
pub use pipeline::*;
pub use project::project;
pub use serialize::serialize;
