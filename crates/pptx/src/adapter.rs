//! [`FormatAdapter`] implementation for slide decks.

use crate::location::SlideLocation;
use crate::parser::{PptxParser, SlideDeck};
use xlate_core::{Error, FormatAdapter, Package, Result, TextUnit};

/// Extracts and rewrites run text in .pptx slide decks.
///
/// Traversal order: slides in deck order, shapes in document order, then
/// paragraphs and runs. Table frames are walked row by row, cell by cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlideDeckAdapter;

impl SlideDeckAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl FormatAdapter for SlideDeckAdapter {
    type Tree = SlideDeck;
    type Location = SlideLocation;

    fn parse(&self, bytes: &[u8]) -> Result<SlideDeck> {
        let package = Package::from_bytes(bytes.to_vec())?;
        PptxParser::new().parse(package)
    }

    fn text_units<'t>(
        &self,
        tree: &'t SlideDeck,
    ) -> Box<dyn Iterator<Item = TextUnit<SlideLocation>> + 't> {
        Box::new(tree.slides.iter().flat_map(|slide| {
            slide.runs.iter().filter_map(move |(location, &slot)| {
                let unit = TextUnit::new(*location, slide.part.text(slot)?);
                unit.is_candidate().then_some(unit)
            })
        }))
    }

    fn write(&self, tree: &mut SlideDeck, location: &SlideLocation, text: &str) -> Result<()> {
        let slide = tree
            .slides
            .get_mut(location.slide)
            .ok_or_else(|| Error::write(location, "slide does not exist"))?;
        let slot = *slide
            .runs
            .get(location)
            .ok_or_else(|| Error::write(location, "run does not exist"))?;
        slide
            .part
            .set_text(slot, text)
            .ok_or_else(|| Error::write(location, "run has no text slot"))?;
        Ok(())
    }

    fn serialize(&self, tree: SlideDeck) -> Result<Vec<u8>> {
        let SlideDeck { mut package, slides } = tree;
        for slide in slides.iter().filter(|slide| slide.part.is_modified()) {
            log::debug!("Rewriting {}", slide.path);
            package.replace(&slide.path, slide.part.to_xml()?)?;
        }
        package.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{table_shape, text_shape, DeckBuilder};
    use crate::location::TableCell;
    use xlate_core::{LanguagePair, TaggingPort, TranslationEngine, TranslationFailure, TranslationPort};

    /// Maps a handful of Japanese words to uppercase placeholders.
    struct GlossaryPort;

    impl TranslationPort for GlossaryPort {
        fn translate(
            &self,
            text: &str,
            _source: &str,
            _target: &str,
        ) -> std::result::Result<String, TranslationFailure> {
            match text {
                "こんにちは" => Ok("HELLO".to_string()),
                "猫" => Ok("CAT".to_string()),
                "犬" => Ok("DOG".to_string()),
                other => Err(TranslationFailure::Rejected(format!("unknown word {}", other))),
            }
        }
    }

    fn two_slide_deck() -> Vec<u8> {
        DeckBuilder::new()
            .slide(text_shape(2, &[&["こんにちは"]]))
            .slide(table_shape(2, &[&["猫", "犬"]]))
            .build()
    }

    fn translate(bytes: &[u8], port: &dyn TranslationPort) -> Vec<u8> {
        let adapter = SlideDeckAdapter::new();
        let mut deck = adapter.parse(bytes).unwrap();
        TranslationEngine::new(port, LanguagePair::new("ja", "en").unwrap())
            .run(&adapter, &mut deck)
            .unwrap();
        adapter.serialize(deck).unwrap()
    }

    fn all_texts(bytes: &[u8]) -> Vec<String> {
        let adapter = SlideDeckAdapter::new();
        let deck = adapter.parse(bytes).unwrap();
        deck.locations()
            .map(|location| deck.text_at(location).unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_units_follow_traversal_order() {
        let adapter = SlideDeckAdapter::new();
        let deck = adapter.parse(&two_slide_deck()).unwrap();
        let units: Vec<_> = adapter.text_units(&deck).collect();
        let texts: Vec<_> = units.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(texts, vec!["こんにちは", "猫", "犬"]);
        assert_eq!(
            units[2].location,
            SlideLocation {
                slide: 1,
                shape: 0,
                cell: Some(TableCell { row: 0, col: 1 }),
                paragraph: 0,
                run: 0,
            }
        );
    }

    #[test]
    fn test_two_slide_scenario() {
        let input = two_slide_deck();
        let output = translate(&input, &GlossaryPort);
        assert_eq!(all_texts(&output), vec!["HELLO", "CAT", "DOG"]);

        let adapter = SlideDeckAdapter::new();
        let before = adapter.parse(&input).unwrap();
        let after = adapter.parse(&output).unwrap();
        assert_eq!(after.slides().len(), 2);
        for (a, b) in before.slides().iter().zip(after.slides()) {
            assert_eq!(a.path, b.path);
            assert_eq!(a.shape_count(), b.shape_count());
            assert_eq!(a.run_count(), b.run_count());
        }
    }

    #[test]
    fn test_formatting_is_untouched() {
        let input = two_slide_deck();
        let output = translate(&input, &GlossaryPort);
        let read = |bytes: &[u8], part: &str| {
            Package::from_bytes(bytes.to_vec())
                .unwrap()
                .read_string(part)
                .unwrap()
        };

        for part in ["ppt/slides/slide1.xml", "ppt/slides/slide2.xml"] {
            let expected = read(&input, part)
                .replace("こんにちは", "HELLO")
                .replace("猫", "CAT")
                .replace("犬", "DOG");
            assert_eq!(read(&output, part), expected);
        }
        for part in ["[Content_Types].xml", "ppt/presentation.xml", "docProps/thumbnail.jpeg"] {
            assert_eq!(read(&output, part), read(&input, part));
        }
    }

    #[test]
    fn test_blank_runs_pass_through() {
        let input = DeckBuilder::new()
            .slide(text_shape(2, &[&["猫", "  ", ""]]))
            .build();
        let output = translate(&input, &GlossaryPort);
        assert_eq!(all_texts(&output), vec!["CAT", "  ", ""]);
    }

    #[test]
    fn test_failed_run_keeps_original_text() {
        let input = DeckBuilder::new()
            .slide(text_shape(2, &[&["猫", "鳥", "犬"]]))
            .build();
        let output = translate(&input, &GlossaryPort);
        assert_eq!(all_texts(&output), vec!["CAT", "鳥", "DOG"]);
    }

    #[test]
    fn test_output_is_deterministic() {
        let input = two_slide_deck();
        assert_eq!(translate(&input, &TaggingPort), translate(&input, &TaggingPort));
    }

    #[test]
    fn test_untranslated_deck_is_byte_identical() {
        let input = DeckBuilder::new().slide(text_shape(2, &[&["鳥"]])).build();
        assert_eq!(translate(&input, &GlossaryPort), input);
    }

    #[test]
    fn test_stale_location_is_write_error() {
        let adapter = SlideDeckAdapter::new();
        let mut deck = adapter.parse(&two_slide_deck()).unwrap();
        let missing = SlideLocation {
            slide: 0,
            shape: 9,
            cell: None,
            paragraph: 0,
            run: 0,
        };
        assert!(matches!(
            adapter.write(&mut deck, &missing, "x"),
            Err(Error::WriteError { .. })
        ));
        let no_slide = SlideLocation { slide: 7, ..missing };
        assert!(adapter.write(&mut deck, &no_slide, "x").is_err());
    }

    #[test]
    fn test_wrong_container_is_parse_error() {
        let adapter = SlideDeckAdapter::new();
        assert!(matches!(
            adapter.parse(b"PK not really"),
            Err(Error::ParseError(_))
        ));
    }
}
