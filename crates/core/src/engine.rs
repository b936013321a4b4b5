//! Drives one translation run: extract, translate, write back.

use crate::adapter::FormatAdapter;
use crate::error::{Result, TranslationFailure};
use crate::normalize::restore_padding;
use crate::port::TranslationPort;
use crate::types::{
    is_translatable, LanguagePair, RunReport, TextUnit, TranslationOutcome, UnitFailure,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Tuning knobs for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Extra attempts after a failed translation call.
    pub retries: u32,
    /// Number of translation calls in flight at once. 1 means sequential.
    pub concurrency: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            retries: 0,
            concurrency: 1,
        }
    }
}

/// Translates every candidate unit of one document tree.
///
/// A failure to translate one unit is contained: the unit keeps its
/// original text, the failure is logged and recorded in the [`RunReport`],
/// and the run carries on. Only writer errors abort a run.
pub struct TranslationEngine<'p> {
    port: &'p dyn TranslationPort,
    languages: LanguagePair,
    options: EngineOptions,
}

impl<'p> TranslationEngine<'p> {
    /// Create an engine with default options.
    pub fn new(port: &'p dyn TranslationPort, languages: LanguagePair) -> Self {
        Self {
            port,
            languages,
            options: EngineOptions::default(),
        }
    }

    /// Replace all options.
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Retry each failed call up to `retries` more times.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.options.retries = retries;
        self
    }

    /// Issue up to `concurrency` translation calls at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.options.concurrency = concurrency.max(1);
        self
    }

    /// Translate a single piece of text, applying the retry policy.
    ///
    /// Blank text is never sent to the port.
    pub fn translate_text(
        &self,
        text: &str,
    ) -> std::result::Result<TranslationOutcome, TranslationFailure> {
        if !is_translatable(text) {
            return Ok(TranslationOutcome::Unchanged);
        }

        let mut attempt = 0;
        loop {
            let result = self
                .port
                .translate(text, &self.languages.source, &self.languages.target)
                .and_then(|translated| {
                    if is_translatable(&translated) {
                        Ok(restore_padding(text, &translated))
                    } else {
                        Err(TranslationFailure::MalformedResponse(
                            "empty translation".to_string(),
                        ))
                    }
                });

            match result {
                Ok(translated) => return Ok(TranslationOutcome::Translated(translated)),
                Err(failure) if attempt < self.options.retries => {
                    attempt += 1;
                    log::debug!(
                        "{} failed ({}), retry {}/{}",
                        self.port.name(),
                        failure,
                        attempt,
                        self.options.retries
                    );
                }
                Err(failure) => return Err(failure),
            }
        }
    }

    /// Run the full extract → translate → write cycle over `tree`.
    pub fn run<A: FormatAdapter>(&self, adapter: &A, tree: &mut A::Tree) -> Result<RunReport> {
        let units: Vec<TextUnit<A::Location>> = adapter.text_units(tree).collect();
        let mut report = RunReport {
            candidates: units.len(),
            ..RunReport::default()
        };
        log::debug!(
            "Translating {} units ({}) via {}",
            units.len(),
            self.languages,
            self.port.name()
        );

        match self.thread_pool(units.len()) {
            Some(pool) => {
                let outcomes: Vec<_> = pool.install(|| {
                    units
                        .par_iter()
                        .map(|unit| self.translate_text(&unit.text))
                        .collect()
                });
                for (unit, outcome) in units.iter().zip(outcomes) {
                    apply(adapter, tree, unit, outcome, &mut report)?;
                }
            }
            None => {
                for unit in &units {
                    let outcome = self.translate_text(&unit.text);
                    apply(adapter, tree, unit, outcome, &mut report)?;
                }
            }
        }

        log::info!(
            "Translated {}/{} units ({} failed)",
            report.translated,
            report.candidates,
            report.failures.len()
        );
        Ok(report)
    }

    fn thread_pool(&self, unit_count: usize) -> Option<rayon::ThreadPool> {
        if self.options.concurrency <= 1 || unit_count <= 1 {
            return None;
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.concurrency.min(unit_count))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                log::warn!("Falling back to sequential translation: {}", e);
                None
            }
        }
    }
}

/// Write the outcome of one unit back into the tree and record it.
fn apply<A: FormatAdapter>(
    adapter: &A,
    tree: &mut A::Tree,
    unit: &TextUnit<A::Location>,
    outcome: std::result::Result<TranslationOutcome, TranslationFailure>,
    report: &mut RunReport,
) -> Result<()> {
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(failure) => {
            log::warn!(
                "Failed to translate {} ({:?}): {}; keeping original text",
                unit.location,
                unit.text,
                failure
            );
            report.failures.push(UnitFailure {
                location: unit.location.to_string(),
                error: failure.to_string(),
            });
            TranslationOutcome::Unchanged
        }
    };

    adapter.write(tree, &unit.location, outcome.resolve(&unit.text))?;
    match outcome {
        TranslationOutcome::Translated(_) => report.translated += 1,
        TranslationOutcome::Unchanged => report.unchanged += 1,
    }
    Ok(())
}
