//! Multi-source statement collection: locating the dated input folder,
//! running every enabled provider, unifying account names, collapsing
//! overlap, and sanity-checking the sources against each other.

pub mod aggregate;
pub mod collect;
pub mod error;
pub mod normalize;
pub mod provider;
pub mod validate;

pub use crate::aggregate::aggregate;
pub use crate::collect::{Collector, RunOptions, RunOutput};
pub use crate::error::CollectError;
pub use crate::provider::{Provider, build_providers};
pub use crate::validate::{source_totals, validate_cross_source};
