//! PPTX (Office Open XML) adapter for in-place slide deck translation.
//!
//! Parses .pptx files which are ZIP archives containing XML documents,
//! and writes translated run text back without touching formatting.

pub mod adapter;
#[cfg(any(test, feature = "test-helpers"))]
pub mod fixtures;
pub mod location;
pub mod parser;

pub use adapter::SlideDeckAdapter;
pub use location::{SlideLocation, TableCell};
pub use parser::{PptxParser, Slide, SlideDeck};
