//! URL handling module
//!
//! This module provides search-query encoding for building listing URLs and
//! link absolutization for turning product card hrefs into deduplication keys.

mod encode;
mod normalize;

// Re-export main functions
pub use encode::{decode_query, encode_query, normalize_query, SpaceEncoding};
pub use normalize::absolutize_link;
