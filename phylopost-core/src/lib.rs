//! Shared primitives and traits for the phylopost workspace.
//!
//! `phylopost-core` provides the foundation that the other phylopost crates
//! build on:
//!
//! - **Error types**: [`PhylopostError`] and [`Result`] for structured error handling
//! - **Traits**: small abstractions like [`Summarizable`], [`Scored`], [`Annotated`]

pub mod error;
pub mod traits;

pub use error::{PhylopostError, Result};
pub use traits::*;
