//! The translation capability consumed by the engine.

use crate::error::TranslationFailure;

/// Maps one piece of text from a source language to a target language.
///
/// Implementations make a single attempt per call; retries belong to the
/// engine. Ports are shared across worker threads when the engine runs
/// with concurrency, hence the `Send + Sync` bound.
pub trait TranslationPort: Send + Sync {
    /// Translate `text` from `source` to `target`.
    fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> std::result::Result<String, TranslationFailure>;

    /// Short name used in log lines.
    fn name(&self) -> &str {
        "translator"
    }
}

impl<P: TranslationPort + ?Sized> TranslationPort for &P {
    fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> std::result::Result<String, TranslationFailure> {
        (**self).translate(text, source, target)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<P: TranslationPort + ?Sized> TranslationPort for Box<P> {
    fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> std::result::Result<String, TranslationFailure> {
        (**self).translate(text, source, target)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Deterministic port that appends the target language tag.
///
/// Useful for dry runs: the output shows exactly which units would be sent
/// to a real translator without any network traffic.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggingPort;

impl TranslationPort for TaggingPort {
    fn translate(
        &self,
        text: &str,
        _source: &str,
        target: &str,
    ) -> std::result::Result<String, TranslationFailure> {
        Ok(format!("{} [{}]", text, target))
    }

    fn name(&self) -> &str {
        "tagging"
    }
}
