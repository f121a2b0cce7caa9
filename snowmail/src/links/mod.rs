//! Read-later links: extraction from message content and saving to Pocket.
//!
//! ```text
//! content → LinkExtractor → [LinkCandidate] → LinkSaver → Pocket
//! ```

pub mod extract;
pub mod saver;

pub use extract::{parse_candidates, LinkExtractor};
pub use saver::{LinkSaver, SaveFailure, SaveReport};
