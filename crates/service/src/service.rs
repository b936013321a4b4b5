//! One call per document: bytes in, translated bytes out.

use serde::Serialize;
use xlate_core::{
    DocumentFormat, EngineOptions, Error, FormatAdapter, LanguagePair, Result, RunReport,
    TranslationEngine, TranslationPort,
};
use xlate_pptx::SlideDeckAdapter;
use xlate_xlsx::SpreadsheetAdapter;

/// A rewritten document and what happened to its units.
#[derive(Debug, Clone, Serialize)]
pub struct TranslatedDocument {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub format: DocumentFormat,
    pub report: RunReport,
}

/// Translates whole .pptx / .xlsx documents through one port.
pub struct DocumentTranslationService<P> {
    port: P,
    options: EngineOptions,
}

impl<P: TranslationPort> DocumentTranslationService<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            options: EngineOptions::default(),
        }
    }

    /// Retry and concurrency settings for every run.
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Translate `bytes` and return only the new document.
    pub fn translate(
        &self,
        bytes: &[u8],
        format: DocumentFormat,
        source: &str,
        target: &str,
    ) -> Result<Vec<u8>> {
        let languages = LanguagePair::new(source, target)?;
        Ok(self.translate_document(bytes, format, &languages)?.bytes)
    }

    /// Translate `bytes` declared as `format`.
    ///
    /// A container that is not a `format` document, or is not a ZIP package
    /// at all, is a [`Error::ParseError`] and nothing is produced.
    pub fn translate_document(
        &self,
        bytes: &[u8],
        format: DocumentFormat,
        languages: &LanguagePair,
    ) -> Result<TranslatedDocument> {
        if let Some(actual) = DocumentFormat::sniff(bytes) {
            if actual != format {
                return Err(Error::ParseError(format!(
                    "Declared {} but the document is {}",
                    format, actual
                )));
            }
        }

        log::debug!("Translating {} document ({} bytes)", format, bytes.len());
        let (bytes, report) = match format {
            DocumentFormat::Pptx => self.run(&SlideDeckAdapter::new(), bytes, languages)?,
            DocumentFormat::Xlsx => self.run(&SpreadsheetAdapter::new(), bytes, languages)?,
        };
        Ok(TranslatedDocument {
            bytes,
            format,
            report,
        })
    }

    fn run<A: FormatAdapter>(
        &self,
        adapter: &A,
        bytes: &[u8],
        languages: &LanguagePair,
    ) -> Result<(Vec<u8>, RunReport)> {
        let mut tree = adapter.parse(bytes)?;
        let report = TranslationEngine::new(&self.port, languages.clone())
            .with_options(self.options)
            .run(adapter, &mut tree)?;
        Ok((adapter.serialize(tree)?, report))
    }
}

/// Name of the translated copy of `name`: `deck.pptx` → `translated_deck.pptx`.
pub fn translated_file_name(name: &str) -> String {
    format!("translated_{}", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xlate_core::{TaggingPort, TranslationFailure};
    use xlate_pptx::fixtures::{table_shape, text_shape, DeckBuilder};
    use xlate_xlsx::fixtures::{Cell, WorkbookBuilder};
    use xlate_xlsx::CellRef;

    /// Fails every call.
    struct DownPort;

    impl TranslationPort for DownPort {
        fn translate(
            &self,
            _text: &str,
            _source: &str,
            _target: &str,
        ) -> std::result::Result<String, TranslationFailure> {
            Err(TranslationFailure::Network("connection refused".to_string()))
        }
    }

    fn deck() -> Vec<u8> {
        DeckBuilder::new()
            .slide(text_shape(2, &[&["こんにちは"]]))
            .slide(table_shape(2, &[&["猫", "犬"]]))
            .build()
    }

    fn workbook() -> Vec<u8> {
        WorkbookBuilder::new()
            .sheet("Sheet1", vec![vec![Cell::Text("税金"), Cell::Number("100")]])
            .build()
    }

    #[test]
    fn test_translate_deck() {
        let service = DocumentTranslationService::new(TaggingPort);
        let output = service
            .translate(&deck(), DocumentFormat::Pptx, "ja", "en")
            .unwrap();
        let adapter = SlideDeckAdapter::new();
        let translated = adapter.parse(&output).unwrap();
        let texts: Vec<_> = adapter.text_units(&translated).map(|u| u.text).collect();
        assert_eq!(texts, vec!["こんにちは [en]", "猫 [en]", "犬 [en]"]);
    }

    #[test]
    fn test_translate_workbook_report() {
        let service = DocumentTranslationService::new(TaggingPort).with_options(EngineOptions {
            retries: 1,
            concurrency: 4,
        });
        let languages = LanguagePair::new("ja", "fr").unwrap();
        let document = service
            .translate_document(&workbook(), DocumentFormat::Xlsx, &languages)
            .unwrap();
        assert_eq!(document.report.candidates, 1);
        assert_eq!(document.report.translated, 1);
        assert!(document.report.is_complete());

        let translated = SpreadsheetAdapter::new().parse(&document.bytes).unwrap();
        assert_eq!(
            translated.string_at("Sheet1", CellRef::new(1, 1)).as_deref(),
            Some("税金 [fr]")
        );
    }

    #[test]
    fn test_port_outage_keeps_document() {
        let input = workbook();
        let service = DocumentTranslationService::new(DownPort);
        let document = service
            .translate_document(&input, DocumentFormat::Xlsx, &LanguagePair::default())
            .unwrap();
        assert_eq!(document.report.failures.len(), 1);
        assert_eq!(document.bytes, input);
    }

    #[test]
    fn test_format_mismatch_is_parse_error() {
        let service = DocumentTranslationService::new(TaggingPort);
        assert!(matches!(
            service.translate(&workbook(), DocumentFormat::Pptx, "ja", "en"),
            Err(Error::ParseError(_))
        ));
        assert!(matches!(
            service.translate(b"not a zip", DocumentFormat::Xlsx, "ja", "en"),
            Err(Error::ParseError(_))
        ));
    }

    #[test]
    fn test_invalid_language() {
        let service = DocumentTranslationService::new(TaggingPort);
        assert!(matches!(
            service.translate(&deck(), DocumentFormat::Pptx, "ja", "??"),
            Err(Error::InvalidLanguage(_))
        ));
    }

    #[test]
    fn test_translated_file_name() {
        assert_eq!(translated_file_name("売上.xlsx"), "translated_売上.xlsx");
        assert_eq!(translated_file_name("deck.pptx"), "translated_deck.pptx");
    }
}
