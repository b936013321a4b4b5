//! Whole-document translation on top of the format adapters.
//!
//! [`DocumentTranslationService`] picks the adapter for a document format,
//! runs the engine over it and hands back the rewritten package bytes.
//! [`GoogleTranslatePort`] is the HTTP-backed [`xlate_core::TranslationPort`].

pub mod google;
pub mod service;

pub use google::{GoogleTranslatePort, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
pub use service::{translated_file_name, DocumentTranslationService, TranslatedDocument};
