//! Errors returned by fallible table operations.
use std::alloc::{Layout, LayoutError};

use thiserror::Error;

/// Only operations that allocate can fail: construction, insertion (bucket
/// growth or the preemptive resize) and explicit rehashing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("cannot allocate {what}: allocator refused {layout:?}")]
    AllocFailed { what: &'static str, layout: Layout },
    #[error("invalid allocation layout: {err}")]
    Layout {
        #[from]
        err: LayoutError,
    },
}

pub type Result<T> = core::result::Result<T, TableError>;
