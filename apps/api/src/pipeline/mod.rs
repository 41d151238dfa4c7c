//! Client-side list pipeline: filter → sort → paginate, plus export and selection.
//!
//! Everything here is synchronous and pure; callers pass `now` explicitly so
//! time-dependent rules (date buckets, relevance recency) are reproducible.
//! All stages work in memory over the full collection on every call, which is
//! fine for hundreds of records and not intended for much more.

pub mod date_range;
pub mod export;
pub mod filter;
pub mod paginate;
pub mod schema;
pub mod selection;
pub mod sort;
pub mod view;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("unknown field '{field}' for {collection}")]
    UnknownField {
        collection: &'static str,
        field: String,
    },

    #[error("field '{field}' cannot be used as a {usage}")]
    UnsupportedField { field: String, usage: &'static str },

    #[error("page size must be at least 1")]
    InvalidPageSize,
}
