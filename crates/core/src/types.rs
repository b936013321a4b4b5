//! Domain types shared by the format adapters and the engine.

use crate::error::{Error, Result};
use crate::package::Package;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Loose BCP-47 shape: a 2-3 letter primary tag plus optional subtags.
static LANGUAGE_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8})*$").unwrap());

/// Source language used when the caller does not pick one.
pub const DEFAULT_SOURCE_LANGUAGE: &str = "ja";

/// Target language used when the caller does not pick one.
pub const DEFAULT_TARGET_LANGUAGE: &str = "en";

/// The office document formats we can rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentFormat {
    /// PresentationML slide deck (.pptx).
    Pptx,
    /// SpreadsheetML workbook (.xlsx).
    Xlsx,
}

impl DocumentFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pptx" => Some(Self::Pptx),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }

    /// Parse a user-supplied format tag ("pptx", "slides", "xlsx", ...).
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag.trim().trim_start_matches('.').to_lowercase().as_str() {
            "pptx" | "slides" | "deck" | "presentation" => Ok(Self::Pptx),
            "xlsx" | "sheet" | "spreadsheet" | "workbook" => Ok(Self::Xlsx),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }

    /// Detect format from a file name's extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        name.rsplit_once('.')
            .and_then(|(_, ext)| Self::from_extension(ext))
    }

    /// Detect format from the container itself.
    ///
    /// Looks for the ZIP signature, then for the part each format's main
    /// document lives in.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if !bytes.starts_with(b"PK\x03\x04") {
            return None;
        }
        let package = Package::from_bytes(bytes.to_vec()).ok()?;
        if package.contains("ppt/presentation.xml") {
            Some(Self::Pptx)
        } else if package.contains("xl/workbook.xml") {
            Some(Self::Xlsx)
        } else {
            None
        }
    }

    /// Canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pptx => "pptx",
            Self::Xlsx => "xlsx",
        }
    }

    /// MIME type of the container.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Source and target language for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePair {
    /// Language the document is written in.
    pub source: String,
    /// Language to translate into.
    pub target: String,
}

impl LanguagePair {
    /// Create a validated language pair.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let target = target.into();
        for code in [&source, &target] {
            if !LANGUAGE_CODE_REGEX.is_match(code) {
                return Err(Error::InvalidLanguage(code.clone()));
            }
        }
        Ok(Self { source, target })
    }

    /// Pair with the default source language and the given target.
    pub fn to_target(target: impl Into<String>) -> Result<Self> {
        Self::new(DEFAULT_SOURCE_LANGUAGE, target)
    }
}

impl Default for LanguagePair {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE_LANGUAGE.to_string(),
            target: DEFAULT_TARGET_LANGUAGE.to_string(),
        }
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// One addressable, translatable fragment of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextUnit<L> {
    /// Where the text lives in the document tree.
    pub location: L,
    /// The text currently at that location.
    pub text: String,
}

impl<L> TextUnit<L> {
    /// Create a new text unit.
    pub fn new(location: L, text: impl Into<String>) -> Self {
        Self {
            location,
            text: text.into(),
        }
    }

    /// Whether this unit should be sent to a translator at all.
    pub fn is_candidate(&self) -> bool {
        is_translatable(&self.text)
    }
}

/// True for text with at least one non-whitespace character.
pub fn is_translatable(text: &str) -> bool {
    !text.trim().is_empty()
}

/// What translating a single unit produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationOutcome {
    /// The port returned a usable translation.
    Translated(String),
    /// Keep the original text (blank input or contained failure).
    Unchanged,
}

impl TranslationOutcome {
    /// The text to write back for a unit whose original text is `original`.
    pub fn resolve<'a>(&'a self, original: &'a str) -> &'a str {
        match self {
            Self::Translated(text) => text,
            Self::Unchanged => original,
        }
    }
}

/// A contained per-unit failure, as recorded in the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    /// Display form of the unit's location.
    pub location: String,
    /// The error that was contained.
    pub error: String,
}

/// Summary of one translation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Number of candidate units extracted.
    pub candidates: usize,
    /// Units whose text was replaced by a translation.
    pub translated: usize,
    /// Units written back with their original text.
    pub unchanged: usize,
    /// Contained failures, in traversal order.
    pub failures: Vec<UnitFailure>,
}

impl RunReport {
    /// Whether every candidate was translated.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
