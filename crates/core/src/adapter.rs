//! Format-specific traversal and writeback over a document tree.

use crate::error::Result;
use crate::types::TextUnit;
use std::fmt::{Debug, Display};

/// Everything the engine needs to know about one document format.
///
/// An adapter parses bytes into its own tree type, walks that tree to
/// produce text units, writes replacement text back at a location, and
/// serializes the tree again. Adapters hold no per-document state; the
/// tree is owned by the caller for the duration of one run.
pub trait FormatAdapter {
    /// In-memory representation of one parsed document.
    type Tree;

    /// Address of a text leaf inside [`Self::Tree`].
    type Location: Clone + Debug + Display + Send + Sync;

    /// Parse a container into a tree. Malformed input is a `ParseError`.
    fn parse(&self, bytes: &[u8]) -> Result<Self::Tree>;

    /// Candidate text units in deterministic traversal order.
    ///
    /// Only units with non-whitespace text are yielded.
    fn text_units<'t>(
        &self,
        tree: &'t Self::Tree,
    ) -> Box<dyn Iterator<Item = TextUnit<Self::Location>> + 't>;

    /// Replace the text at `location`, leaving all other structure intact.
    ///
    /// A location that does not resolve is a `WriteError`.
    fn write(&self, tree: &mut Self::Tree, location: &Self::Location, text: &str) -> Result<()>;

    /// Serialize the tree back into container bytes.
    fn serialize(&self, tree: Self::Tree) -> Result<Vec<u8>>;
}
