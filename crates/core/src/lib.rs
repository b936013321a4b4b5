//! Core types, translation engine, and OPC package plumbing for
//! translating office documents in place.

pub mod adapter;
pub mod engine;
pub mod error;
pub mod markup;
pub mod normalize;
pub mod package;
pub mod port;
pub mod types;

pub use adapter::FormatAdapter;
pub use engine::{EngineOptions, TranslationEngine};
pub use error::{Error, Result, TranslationFailure};
pub use markup::{SlotId, Token, XmlPart};
pub use package::{Package, Relationship};
pub use port::{TaggingPort, TranslationPort};
pub use types::{
    DocumentFormat, LanguagePair, RunReport, TextUnit, TranslationOutcome, UnitFailure,
    DEFAULT_SOURCE_LANGUAGE, DEFAULT_TARGET_LANGUAGE,
};
