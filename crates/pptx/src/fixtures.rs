//! In-memory PPTX builders for tests.

use quick_xml::escape::escape;
use xlate_core::Package;

const SLIDE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";

/// Builds a minimal but well-formed .pptx package.
#[derive(Debug, Default)]
pub struct DeckBuilder {
    slides: Vec<String>,
}

impl DeckBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slide whose shape tree contains `shapes` (raw `p:spTree` children).
    pub fn slide(mut self, shapes: impl Into<String>) -> Self {
        self.slides.push(shapes.into());
        self
    }

    /// Package bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut parts = vec![
            ("[Content_Types].xml".to_string(), Self::content_types(self.slides.len())),
            ("_rels/.rels".to_string(), ROOT_RELS.to_string()),
            ("ppt/presentation.xml".to_string(), self.presentation_xml()),
            ("ppt/_rels/presentation.xml.rels".to_string(), self.presentation_rels()),
        ];
        for (idx, shapes) in self.slides.iter().enumerate() {
            parts.push((format!("ppt/slides/slide{}.xml", idx + 1), Self::slide_xml(shapes)));
        }
        parts.push(("docProps/thumbnail.jpeg".to_string(), "\u{ff}\u{d8}binary".to_string()));

        match Package::from_parts(parts).and_then(|package| package.to_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => panic!("fixture package failed to build: {}", e),
        }
    }

    /// `[Content_Types].xml` for `slides` slides.
    pub fn content_types(slides: usize) -> String {
        let overrides: String = (1..=slides)
            .map(|n| {
                format!(
                    r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
                    n
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>{}</Types>"#,
            overrides
        )
    }

    /// A complete slide part around the given shapes.
    pub fn slide_xml(shapes: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/></a:xfrm></p:grpSpPr>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
            shapes
        )
    }

    fn presentation_xml(&self) -> String {
        let ids: String = (0..self.slides.len())
            .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 2))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:sldIdLst>{}</p:sldIdLst><p:sldSz cx="12192000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
            ids
        )
    }

    fn presentation_rels(&self) -> String {
        let rels: String = (0..self.slides.len())
            .map(|i| {
                format!(
                    r#"<Relationship Id="rId{}" Type="{}" Target="slides/slide{}.xml"/>"#,
                    i + 2,
                    SLIDE_REL_TYPE,
                    i + 1
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
            rels
        )
    }
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#;

/// A formatted run.
pub fn run(text: &str) -> String {
    format!(
        r#"<a:r><a:rPr lang="ja-JP" altLang="en-US" sz="2400" b="1" dirty="0"><a:solidFill><a:srgbClr val="C00000"/></a:solidFill><a:latin typeface="Meiryo"/></a:rPr><a:t>{}</a:t></a:r>"#,
        escape(text)
    )
}

/// A text box; each inner slice is one paragraph of runs.
pub fn text_shape(id: usize, paragraphs: &[&[&str]]) -> String {
    let body: String = paragraphs
        .iter()
        .map(|runs| {
            let runs: String = runs.iter().map(|text| run(text)).collect();
            format!(
                r#"<a:p><a:pPr marL="342900" lvl="1" indent="-342900"><a:buChar char="•"/></a:pPr>{}<a:endParaRPr lang="en-US" dirty="0"/></a:p>"#,
                runs
            )
        })
        .collect();
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="TextBox {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="838200" y="365125"/><a:ext cx="10515600" cy="1325563"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr><p:txBody><a:bodyPr wrap="square"><a:spAutoFit/></a:bodyPr><a:lstStyle/>{body}</p:txBody></p:sp>"#,
        id = id,
        body = body
    )
}

/// A table frame; each cell holds a single run (or none for "").
pub fn table_shape(id: usize, rows: &[&[&str]]) -> String {
    let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let grid: String = (0..columns).map(|_| r#"<a:gridCol w="4064000"/>"#).collect();
    let body: String = rows
        .iter()
        .map(|cells| {
            let cells: String = cells
                .iter()
                .map(|text| {
                    let content = if text.is_empty() { String::new() } else { run(text) };
                    format!(
                        r#"<a:tc><a:txBody><a:bodyPr/><a:lstStyle/><a:p>{}<a:endParaRPr lang="en-US"/></a:p></a:txBody><a:tcPr><a:lnL w="12700"><a:solidFill><a:srgbClr val="000000"/></a:solidFill></a:lnL></a:tcPr></a:tc>"#,
                        content
                    )
                })
                .collect();
            format!(r#"<a:tr h="370840">{}</a:tr>"#, cells)
        })
        .collect();
    format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{id}" name="Table {id}"/><p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr/></p:nvGraphicFramePr><p:xfrm><a:off x="1524000" y="1397000"/><a:ext cx="8128000" cy="741680"/></p:xfrm><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblPr firstRow="1" bandRow="1"/><a:tblGrid>{grid}</a:tblGrid>{body}</a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#,
        id = id,
        grid = grid,
        body = body
    )
}
