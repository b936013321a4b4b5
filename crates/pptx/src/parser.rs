//! PPTX package parser: slide order and run indexing.

use crate::location::{SlideLocation, TableCell};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;
use xlate_core::markup::{local_name, prefixed_attribute};
use xlate_core::package::{part_relationships, resolve_target};
use xlate_core::{Error, Package, Result, SlotId, Token, XmlPart};

const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// A parsed slide deck: the package plus every slide's XML and run index.
pub struct SlideDeck {
    pub(crate) package: Package,
    pub(crate) slides: Vec<Slide>,
}

impl SlideDeck {
    /// Slides in presentation order.
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    /// Text currently stored at `location`.
    pub fn text_at(&self, location: &SlideLocation) -> Option<&str> {
        let slide = self.slides.get(location.slide)?;
        let slot = *slide.runs.get(location)?;
        slide.part.text(slot)
    }

    /// Every run location in traversal order, blank runs included.
    pub fn locations(&self) -> impl Iterator<Item = &SlideLocation> + '_ {
        self.slides.iter().flat_map(|slide| slide.runs.keys())
    }
}

/// One slide part.
pub struct Slide {
    /// 1-based slide number.
    pub number: usize,
    /// Part name inside the package (`ppt/slides/slide3.xml`).
    pub path: String,
    pub(crate) part: XmlPart,
    pub(crate) runs: BTreeMap<SlideLocation, SlotId>,
}

impl Slide {
    /// Number of shapes that can carry text (`p:sp` and `p:graphicFrame`).
    pub fn shape_count(&self) -> usize {
        self.part
            .tokens()
            .iter()
            .filter(|token| match token {
                Token::Markup(Event::Start(e)) | Token::Markup(Event::Empty(e)) => {
                    matches!(local_name(e.name().as_ref()), b"sp" | b"graphicFrame")
                }
                _ => false,
            })
            .count()
    }

    /// Number of runs, blank ones included.
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }
}

/// Parser for PPTX (Office Open XML) files.
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a PPTX package into a [`SlideDeck`].
    pub fn parse(&self, package: Package) -> Result<SlideDeck> {
        if !package.contains(PRESENTATION_PART) {
            return Err(Error::ParseError(format!(
                "Not a presentation: '{}' is missing",
                PRESENTATION_PART
            )));
        }

        let slide_order = self.get_slide_order(&package)?;
        log::debug!("Found {} slides", slide_order.len());

        let mut slides = Vec::with_capacity(slide_order.len());
        for (idx, slide_path) in slide_order.into_iter().enumerate() {
            slides.push(self.parse_slide(&package, slide_path, idx)?);
        }

        Ok(SlideDeck { package, slides })
    }

    /// Get the ordered list of slide paths.
    ///
    /// Order comes from `p:sldIdLst` in presentation.xml. Decks without one
    /// fall back to slide relationships sorted by their trailing number.
    fn get_slide_order(&self, package: &Package) -> Result<Vec<String>> {
        let relationships = part_relationships(package, PRESENTATION_PART)?;
        let presentation = package.read_string(PRESENTATION_PART)?;

        let mut slides = Vec::new();
        for rel_id in self.slide_id_list(&presentation)? {
            let rel = relationships
                .iter()
                .find(|rel| rel.id == rel_id && rel.is_kind("slide"))
                .ok_or_else(|| {
                    Error::ParseError(format!("Slide relationship '{}' not found", rel_id))
                })?;
            slides.push(resolve_target(PRESENTATION_PART, &rel.target));
        }
        if !slides.is_empty() {
            return Ok(slides);
        }

        let mut fallback: Vec<(String, Option<usize>)> = relationships
            .iter()
            .filter(|rel| rel.is_kind("slide") && !rel.external)
            .map(|rel| {
                let order_num =
                    extract_slide_number(&rel.target).or_else(|| extract_slide_number(&rel.id));
                (resolve_target(PRESENTATION_PART, &rel.target), order_num)
            })
            .collect();

        fallback.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(fallback.into_iter().map(|(path, _)| path).collect())
    }

    /// Relationship ids listed in `p:sldIdLst`, in order.
    fn slide_id_list(&self, xml: &str) -> Result<Vec<String>> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);
        let mut ids = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if local_name(e.name().as_ref()) == b"sldId" =>
                {
                    if let Some(id) = prefixed_attribute(e, b"id") {
                        ids.push(id);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::ParseError(format!(
                        "Error parsing presentation.xml: {}",
                        e
                    )));
                }
                _ => {}
            }
        }

        Ok(ids)
    }

    /// Parse a single slide and index its runs.
    fn parse_slide(&self, package: &Package, slide_path: String, index: usize) -> Result<Slide> {
        let content = package.read_string(&slide_path)?;
        let part = XmlPart::parse(&content, |name| name == b"t")
            .map_err(|e| Error::ParseError(format!("{}: {}", slide_path, e)))?;
        let runs = index_runs(&part, index);
        log::debug!("{}: {} runs", slide_path, runs.len());

        Ok(Slide {
            number: index + 1,
            path: slide_path,
            part,
            runs,
        })
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters for walking a slide's shape tree.
#[derive(Debug, Default)]
struct RunWalker {
    stack: Vec<Vec<u8>>,
    next_shape: usize,
    shape: Option<usize>,
    row: Option<usize>,
    col: Option<usize>,
    cell: Option<TableCell>,
    paragraph: Option<usize>,
    run: Option<usize>,
}

impl RunWalker {
    fn open(&mut self, name: &[u8]) {
        let parent = self.stack.last().map(Vec::as_slice);
        match name {
            b"sp" | b"graphicFrame" => {
                self.shape = Some(self.next_shape);
                self.next_shape += 1;
                self.row = None;
                self.cell = None;
            }
            b"tbl" => self.row = None,
            b"tr" => {
                self.row = Some(self.row.map_or(0, |r| r + 1));
                self.col = None;
            }
            b"tc" => {
                let col = self.col.map_or(0, |c| c + 1);
                self.col = Some(col);
                self.cell = self.row.map(|row| TableCell { row, col });
            }
            b"txBody" => self.paragraph = None,
            b"p" if parent == Some(b"txBody".as_slice()) => {
                self.paragraph = Some(self.paragraph.map_or(0, |p| p + 1));
                self.run = None;
            }
            b"r" if parent == Some(b"p".as_slice()) => {
                self.run = Some(self.run.map_or(0, |r| r + 1));
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"sp" | b"graphicFrame" => self.shape = None,
            b"tc" => self.cell = None,
            _ => {}
        }
    }

    /// Location of a `t` slot, if the walker is inside a run's text.
    fn run_location(&self, slide: usize) -> Option<SlideLocation> {
        let depth = self.stack.len();
        if depth < 2
            || self.stack[depth - 1].as_slice() != b"t"
            || self.stack[depth - 2].as_slice() != b"r"
        {
            return None;
        }
        Some(SlideLocation {
            slide,
            shape: self.shape?,
            cell: self.cell,
            paragraph: self.paragraph?,
            run: self.run?,
        })
    }
}

/// Map every run's `a:t` slot to its location.
fn index_runs(part: &XmlPart, slide: usize) -> BTreeMap<SlideLocation, SlotId> {
    let mut walker = RunWalker::default();
    let mut runs = BTreeMap::new();

    for (id, token) in part.tokens().iter().enumerate() {
        match token {
            Token::Markup(Event::Start(e)) => {
                let name = local_name(e.name().as_ref()).to_vec();
                walker.open(&name);
                walker.stack.push(name);
            }
            Token::Markup(Event::Empty(e)) => {
                let name = local_name(e.name().as_ref()).to_vec();
                walker.open(&name);
                walker.close(&name);
            }
            Token::Markup(Event::End(_)) => {
                if let Some(name) = walker.stack.pop() {
                    walker.close(&name);
                }
            }
            Token::Text(_) => {
                if let Some(location) = walker.run_location(slide) {
                    runs.insert(location, id);
                }
            }
            Token::Markup(_) => {}
        }
    }

    runs
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{table_shape, text_shape, DeckBuilder};

    fn parse(bytes: Vec<u8>) -> Result<SlideDeck> {
        PptxParser::new().parse(Package::from_bytes(bytes)?)
    }

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("rId1"), Some(1));
        assert_eq!(extract_slide_number("rId12"), Some(12));
        assert_eq!(extract_slide_number("slides/slide1.xml"), Some(1));
        assert_eq!(extract_slide_number("slide123.xml"), Some(123));
        assert_eq!(extract_slide_number("nodigits"), None);
    }

    #[test]
    fn test_indexes_text_runs() {
        let bytes = DeckBuilder::new()
            .slide(text_shape(2, &[&["Hello ", "world"], &[], &["second"]]))
            .build();
        let deck = parse(bytes).unwrap();
        let slide = &deck.slides()[0];
        assert_eq!(slide.number, 1);
        assert_eq!(slide.path, "ppt/slides/slide1.xml");
        assert_eq!(slide.shape_count(), 1);

        let locations: Vec<_> = deck.locations().copied().collect();
        let at = |paragraph, run| SlideLocation {
            slide: 0,
            shape: 0,
            cell: None,
            paragraph,
            run,
        };
        assert_eq!(locations, vec![at(0, 0), at(0, 1), at(2, 0)]);
        assert_eq!(deck.text_at(&at(0, 0)), Some("Hello "));
        assert_eq!(deck.text_at(&at(2, 0)), Some("second"));
        assert_eq!(deck.text_at(&at(1, 0)), None);
    }

    #[test]
    fn test_indexes_table_cells() {
        let bytes = DeckBuilder::new()
            .slide(format!(
                "{}{}",
                text_shape(2, &[&["title"]]),
                table_shape(3, &[&["a", "b"], &["", "d"]])
            ))
            .build();
        let deck = parse(bytes).unwrap();
        let cell = |row, col| SlideLocation {
            slide: 0,
            shape: 1,
            cell: Some(TableCell { row, col }),
            paragraph: 0,
            run: 0,
        };
        assert_eq!(deck.slides()[0].shape_count(), 2);
        assert_eq!(deck.text_at(&cell(0, 0)), Some("a"));
        assert_eq!(deck.text_at(&cell(0, 1)), Some("b"));
        assert_eq!(deck.text_at(&cell(1, 0)), None);
        assert_eq!(deck.text_at(&cell(1, 1)), Some("d"));
    }

    #[test]
    fn test_field_text_is_not_a_run() {
        let shape = r#"<p:sp><p:txBody><a:bodyPr/><a:p><a:fld id="{1}" type="slidenum"><a:t>3</a:t></a:fld><a:r><a:t>run</a:t></a:r></a:p></p:txBody></p:sp>"#;
        let deck = parse(DeckBuilder::new().slide(shape).build()).unwrap();
        let texts: Vec<_> = deck.locations().map(|l| deck.text_at(l).unwrap()).collect();
        assert_eq!(texts, vec!["run"]);
    }

    #[test]
    fn test_group_shapes_are_visited_in_document_order() {
        let group = format!(
            "<p:grpSp><p:nvGrpSpPr/><p:grpSpPr/>{}{}</p:grpSp>{}",
            text_shape(4, &[&["inner one"]]),
            text_shape(5, &[&["inner two"]]),
            text_shape(6, &[&["outer"]]),
        );
        let deck = parse(DeckBuilder::new().slide(group).build()).unwrap();
        let shapes: Vec<_> = deck.locations().map(|l| l.shape).collect();
        assert_eq!(shapes, vec![0, 1, 2]);
        assert_eq!(deck.slides()[0].shape_count(), 3);
    }

    #[test]
    fn test_slide_order_follows_slide_id_list() {
        let slide = |text: &str| DeckBuilder::slide_xml(&text_shape(2, &[&[text]]));
        let package = Package::from_parts([
            ("[Content_Types].xml", DeckBuilder::content_types(2)),
            (
                "ppt/presentation.xml",
                r#"<p:presentation xmlns:p="urn:p" xmlns:r="urn:r"><p:sldIdLst><p:sldId id="257" r:id="rId7"/><p:sldId id="256" r:id="rId3"/></p:sldIdLst></p:presentation>"#.to_string(),
            ),
            (
                "ppt/_rels/presentation.xml.rels",
                r#"<Relationships xmlns="urn:rels"><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide1.xml"/><Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide2.xml"/></Relationships>"#.to_string(),
            ),
            ("ppt/slides/slide1.xml", slide("first file")),
            ("ppt/slides/slide2.xml", slide("second file")),
        ])
        .unwrap();

        let deck = PptxParser::new().parse(package).unwrap();
        let paths: Vec<_> = deck.slides().iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["ppt/slides/slide2.xml", "ppt/slides/slide1.xml"]);
        assert_eq!(deck.slides()[1].number, 2);
    }

    #[test]
    fn test_missing_presentation_is_parse_error() {
        let package = Package::from_parts([("xl/workbook.xml", "<workbook/>")]).unwrap();
        assert!(matches!(
            PptxParser::new().parse(package),
            Err(Error::ParseError(_))
        ));
    }

    #[test]
    fn test_malformed_slide_is_parse_error() {
        let package = Package::from_parts([
            (
                "ppt/presentation.xml",
                r#"<p:presentation xmlns:p="urn:p" xmlns:r="urn:r"><p:sldIdLst><p:sldId id="256" r:id="rId2"/></p:sldIdLst></p:presentation>"#,
            ),
            (
                "ppt/_rels/presentation.xml.rels",
                r#"<Relationships><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide1.xml"/></Relationships>"#,
            ),
            ("ppt/slides/slide1.xml", "<p:sld><p:cSld></p:sld>"),
        ])
        .unwrap();
        assert!(matches!(
            PptxParser::new().parse(package),
            Err(Error::ParseError(_))
        ));
    }
}
