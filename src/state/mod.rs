//! State module for deciding when a crawl is complete
//!
//! This module provides the load-completion detector in its two modes and the
//! termination reason recorded on every finished session.
//!
//! # Components
//!
//! - `PaginationDetector`: `HasMore` / `NoMore` over explicit page indices
//! - `ScrollDetector`: `Loading` / `Stable` / `TimedOut` over measured document heights
//! - `TerminationReason`: why a session stopped producing new results

mod pagination;
mod scroll;
mod termination;

// Re-export main types
pub use pagination::{PaginationDetector, PaginationState};
pub use scroll::{ScrollDetector, ScrollState};
pub use termination::TerminationReason;
